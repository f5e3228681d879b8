//! Turns metric values into things that can be drawn: marker radius, fill
//! color and tooltip text.

use std::fmt;

use crate::{
    model::{LabelDescriptor, MarkerDescriptor, Position, TrackRecord},
    transform::{clamp_zero, clamp_zeros, Normalization, DEFAULT_ZERO_EPSILON},
    window::WindowAverage,
};

/// The metrics a map can be keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Speed,
    HeartRate,
}

impl Metric {
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Speed => "km/h",
            Metric::HeartRate => "bpm",
        }
    }

    /// Formats a value with one decimal place and the unit suffix.
    pub fn format(&self, value: f64) -> String {
        format!("{:.1} {}", value, self.unit())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Speed => write!(f, "speed"),
            Metric::HeartRate => write!(f, "heart rate"),
        }
    }
}

/// Maps a value in [0, 1] onto a CSS color.
pub trait ColorMapper {
    fn hex_color(&self, normalized: f64) -> String;
}

impl ColorMapper for colorous::Gradient {
    fn hex_color(&self, normalized: f64) -> String {
        format!("#{:x}", self.eval_continuous(normalized.clamp(0.0, 1.0)))
    }
}

/// The perceptually uniform color maps that can be used for the markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMapName {
    #[default]
    Plasma,
    Viridis,
    Inferno,
    Magma,
    Cividis,
    Turbo,
}

impl ColorMapName {
    pub fn gradient(&self) -> colorous::Gradient {
        match self {
            ColorMapName::Plasma => colorous::PLASMA,
            ColorMapName::Viridis => colorous::VIRIDIS,
            ColorMapName::Inferno => colorous::INFERNO,
            ColorMapName::Magma => colorous::MAGMA,
            ColorMapName::Cividis => colorous::CIVIDIS,
            ColorMapName::Turbo => colorous::TURBO,
        }
    }
}

/// Radius of every heart rate marker when the heart rate never changes. The
/// offset formula would make them all invisibly small.
pub const CONSTANT_SERIES_RADIUS: f64 = 5.0;

/// How big a marker is for a given metric value. The base value is clamped
/// away from zero before squaring so the radius is always positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadiusFormula {
    /// `metric^2 / divisor`, used for speed.
    Squared { divisor: f64 },
    /// `((metric - min) / scale)^2`, used for heart rate.
    OffsetSquared { min: f64, scale: f64 },
    /// The same radius for every value.
    Fixed { radius: f64 },
}

impl RadiusFormula {
    pub fn radius(&self, metric: f64, zero_epsilon: f64) -> f64 {
        match *self {
            RadiusFormula::Squared { divisor } => clamp_zero(metric, zero_epsilon).powi(2) / divisor,
            RadiusFormula::OffsetSquared { min, scale } => {
                (clamp_zero(metric - min, zero_epsilon) / scale).powi(2)
            }
            RadiusFormula::Fixed { radius } => radius,
        }
    }
}

/// Tunable values used when building markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderParameters {
    pub zero_epsilon: f64,
    pub speed_radius_divisor: f64,
    pub hr_radius_scale: f64,
    pub colormap: ColorMapName,
}

impl Default for EncoderParameters {
    fn default() -> Self {
        Self {
            zero_epsilon: DEFAULT_ZERO_EPSILON,
            speed_radius_divisor: 8.0,
            hr_radius_scale: 5.0,
            colormap: ColorMapName::default(),
        }
    }
}

/// Builds the tooltip text. A secondary metric that is not available is
/// simply left out.
pub fn format_tooltip(primary: Metric, value: f64, secondary: Option<(Metric, f64)>) -> String {
    match secondary {
        Some((metric, v)) => format!("{}, {}", primary.format(value), metric.format(v)),
        None => primary.format(value),
    }
}

/// Everything needed to draw one track keyed on one metric. The values are
/// owned by the view; they are the display-ready values, already converted.
#[derive(Debug, Clone)]
pub struct MetricView<'a> {
    pub metric: Metric,
    pub values: Vec<f64>,
    pub normalization: Normalization,
    pub radius: RadiusFormula,
    /// Another metric shown in the tooltip, looked up by index.
    pub secondary: Option<(Metric, &'a [f64])>,
}

impl<'a> MetricView<'a> {
    /// A view keyed on speed. `speeds_kmh` should already be converted; zero
    /// speeds are clamped here. Returns None for an empty series.
    pub fn speed(
        speeds_kmh: Vec<f64>,
        heart_rates: Option<&'a [f64]>,
        params: &EncoderParameters,
    ) -> Option<Self> {
        let values = clamp_zeros(&speeds_kmh, params.zero_epsilon);
        let normalization = Normalization::from_values(&values)?;

        Some(Self {
            metric: Metric::Speed,
            values,
            normalization,
            radius: RadiusFormula::Squared {
                divisor: params.speed_radius_divisor,
            },
            secondary: heart_rates.map(|hr| (Metric::HeartRate, hr)),
        })
    }

    /// A view keyed on heart rate, with the speed in the tooltip.
    pub fn heart_rate(
        heart_rates: Vec<f64>,
        speeds_kmh: Option<&'a [f64]>,
        params: &EncoderParameters,
    ) -> Option<Self> {
        let normalization = Normalization::from_values(&heart_rates)?;
        let radius = if normalization.is_degenerate() {
            RadiusFormula::Fixed {
                radius: CONSTANT_SERIES_RADIUS,
            }
        } else {
            RadiusFormula::OffsetSquared {
                min: normalization.min,
                scale: params.hr_radius_scale,
            }
        };

        Some(Self {
            metric: Metric::HeartRate,
            values: heart_rates,
            normalization,
            radius,
            secondary: speeds_kmh.map(|s| (Metric::Speed, s)),
        })
    }

    fn secondary_at(&self, idx: usize) -> Option<(Metric, f64)> {
        let (metric, values) = self.secondary?;
        values.get(idx).map(|&v| (metric, v))
    }
}

/// Builds the marker for one point.
pub fn encode_marker(
    position: Position,
    value: f64,
    normalized: f64,
    secondary: Option<(Metric, f64)>,
    view: &MetricView<'_>,
    colors: &dyn ColorMapper,
    zero_epsilon: f64,
) -> MarkerDescriptor {
    MarkerDescriptor {
        position,
        radius: view.radius.radius(value, zero_epsilon),
        fill_color: colors.hex_color(normalized),
        tooltip: format_tooltip(view.metric, value, secondary),
    }
}

/// Builds one marker per point of the track.
pub fn encode_markers(
    track: &TrackRecord,
    view: &MetricView<'_>,
    colors: &dyn ColorMapper,
    zero_epsilon: f64,
) -> Vec<MarkerDescriptor> {
    view.values
        .iter()
        .enumerate()
        .take(track.len())
        .map(|(idx, &value)| {
            encode_marker(
                track.position(idx),
                value,
                view.normalization.normalize(value),
                view.secondary_at(idx),
                view,
                colors,
                zero_epsilon,
            )
        })
        .collect()
}

/// Turns windowed averages into text labels placed at the point where each
/// window finished.
pub fn encode_labels(
    track: &TrackRecord,
    metric: Metric,
    windows: &[WindowAverage],
) -> Vec<LabelDescriptor> {
    windows
        .iter()
        .filter(|w| w.index < track.len())
        .map(|w| LabelDescriptor {
            position: track.position(w.index),
            text: format!("avg {}", metric.format(w.average)),
        })
        .collect()
}
