use std::process::ExitStatus;

/// The ways in which processing a track can fail. Recoverable conditions
/// (a constant metric series, a missing secondary metric) never surface here,
/// they are dealt with where they occur.
#[derive(Debug, thiserror::Error)]
pub enum TrackMapError {
    #[error("Source data is not usable: {0}")]
    SourceFormat(String),

    #[error("Sequence '{name}' has {actual} values but {expected} were expected")]
    ShapeMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Timestamps go backwards between samples {index} and {}", index + 1)]
    OutOfOrderTimestamps { index: usize },

    #[error("{tool} failed with {status}")]
    ExternalToolFailure { tool: String, status: ExitStatus },

    #[error("{tool} reported success but did not produce {output}")]
    ExternalToolNoOutput { tool: String, output: String },

    #[error("Cannot build heart rate zones for age {age} and resting rate {resting_rate}")]
    InvalidZoneParameters { age: u8, resting_rate: f64 },

    #[error("Window length must be positive, got {0} seconds")]
    InvalidWindow(f64),
}

/// Checks that a sequence has the length of the sequence it is aligned with.
pub(crate) fn check_shape(
    name: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), TrackMapError> {
    if expected != actual {
        return Err(TrackMapError::ShapeMismatch {
            name,
            expected,
            actual,
        });
    }

    Ok(())
}
