use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use trackmap_core::{
    encode::{ColorMapName, EncoderParameters},
    map::MapParameters,
    map_writer::MapStyle,
    transform::SpeedConversion,
    zones::ZoneParameters,
};

/*
 -f ride.gpx                          speed map 'ride-map.html'
 -f ride.gpx -r ride-hr.gpx           speed and heart rate maps 'ride-speed-map.html', 'ride-hr-map.html'
 -f ride.fit                          converted with gpsbabel, then as above
 --age 45 --resting-rate 55           also print the time spent in each heart rate zone
 --label-interval 300                 add a label with the 5 minute average
*/

/// Returns the parsed command line options. Uses the 'wild' crate to do glob
/// expansion on Windows. so that Windows and Linux behave identically.
pub fn parse_args() -> Args {
    Args::parse_from(wild::args())
}

#[derive(Debug, Parser)]
#[command(version, about = "Plot GPX data onto a map", long_about = None)]
pub struct Args {
    #[arg(
        short,
        long,
        help = "Input file, either GPX or FIT. FIT files are converted to GPX with gpsbabel"
    )]
    pub file: PathBuf,

    #[arg(
        short = 'r',
        long,
        help = "Heart rate file (must be GPX). Matched to the input file point by point"
    )]
    pub hr_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value = "map.html",
        help = "Output map name. The input file name and the map type are prepended to it"
    )]
    pub output: String,

    #[arg(
        long,
        default_value = "false",
        help = "Overwrite output files even if they already exist"
    )]
    pub force: bool,

    #[arg(
        long,
        help = "Your age, used to work out the heart rate zones. If given, a zone report is printed \
                for every track with heart rate data"
    )]
    pub age: Option<u8>,

    #[arg(long, default_value = "60.0", help = "Your resting heart rate in bpm")]
    pub resting_rate: f64,

    #[arg(
        long,
        help = "Add a label with the average of the map's metric every SECONDS seconds",
        value_name = "SECONDS"
    )]
    pub label_interval: Option<f64>,

    #[arg(
        long,
        default_value = "1.60934",
        help = "Factor applied to the recorded speed to convert it to km/h"
    )]
    pub speed_unit_factor: f64,

    #[arg(
        long,
        default_value = "2.0",
        help = "Extra scaling applied to the converted speed so the markers are a useful size"
    )]
    pub speed_visual_scale: f64,

    #[arg(
        long,
        default_value = "0.01",
        help = "Value substituted for zeros so that every marker is visible"
    )]
    pub zero_epsilon: f64,

    #[arg(
        long,
        default_value = "8.0",
        help = "Speed markers have a radius of speed^2 / DIVISOR",
        value_name = "DIVISOR"
    )]
    pub speed_radius_divisor: f64,

    #[arg(
        long,
        default_value = "5.0",
        help = "Heart rate markers have a radius of ((hr - min hr) / SCALE)^2",
        value_name = "SCALE"
    )]
    pub hr_radius_scale: f64,

    #[arg(long, value_enum, default_value_t = ColorMapOpt::Plasma, help = "Color map for the markers")]
    pub colormap: ColorMapOpt,

    #[arg(long, default_value = "0.2", help = "Opacity of the marker fill, 0 to 1")]
    pub fill_opacity: f64,

    #[arg(
        long,
        default_value = "15",
        help = "Initial zoom level of the map",
        value_parser = clap::value_parser!(u8).range(1..=19)
    )]
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMapOpt {
    Plasma,
    Viridis,
    Inferno,
    Magma,
    Cividis,
    Turbo,
}

impl From<ColorMapOpt> for ColorMapName {
    fn from(value: ColorMapOpt) -> Self {
        match value {
            ColorMapOpt::Plasma => ColorMapName::Plasma,
            ColorMapOpt::Viridis => ColorMapName::Viridis,
            ColorMapOpt::Inferno => ColorMapName::Inferno,
            ColorMapOpt::Magma => ColorMapName::Magma,
            ColorMapOpt::Cividis => ColorMapName::Cividis,
            ColorMapOpt::Turbo => ColorMapName::Turbo,
        }
    }
}

impl Args {
    pub fn map_parameters(&self) -> MapParameters {
        MapParameters {
            speed: SpeedConversion {
                unit_factor: self.speed_unit_factor,
                visual_scale: self.speed_visual_scale,
            },
            encoder: EncoderParameters {
                zero_epsilon: self.zero_epsilon,
                speed_radius_divisor: self.speed_radius_divisor,
                hr_radius_scale: self.hr_radius_scale,
                colormap: self.colormap.into(),
            },
            style: MapStyle {
                zoom: self.zoom,
                fill_opacity: self.fill_opacity,
                ..Default::default()
            },
            label_interval_seconds: self.label_interval,
        }
    }

    /// The zone report is only produced if the user told us their age.
    pub fn zone_parameters(&self) -> Option<ZoneParameters> {
        self.age.map(|age| ZoneParameters {
            age,
            resting_rate: self.resting_rate,
        })
    }
}
