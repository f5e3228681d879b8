pub mod byte_counter;
pub mod convert;
pub mod encode;
pub mod error;
pub mod map;
pub mod map_writer;
pub mod model;
pub mod model_impls;
pub mod read;
pub mod transform;
pub mod window;
pub mod zones;
