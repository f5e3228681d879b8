//! Turns raw recorded values into values that are ready for display. Nothing
//! in here modifies its input, every transform returns a new series.

/// Miles per hour to kilometres per hour.
pub const MPH_TO_KMH: f64 = 1.60934;

/// The value that exactly-zero metrics are replaced with, so that markers
/// always have a visible size.
pub const DEFAULT_ZERO_EPSILON: f64 = 0.01;

/// The parameters of the speed conversion. The unit factor and the visual
/// scale are both empirical; the scale just makes the markers a reasonable
/// size on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedConversion {
    pub unit_factor: f64,
    pub visual_scale: f64,
}

impl Default for SpeedConversion {
    fn default() -> Self {
        Self {
            unit_factor: MPH_TO_KMH,
            visual_scale: 2.0,
        }
    }
}

impl SpeedConversion {
    pub fn convert_speed_unit(&self, raw: f64) -> f64 {
        raw * self.unit_factor * self.visual_scale
    }

    /// Converts a whole series, returning a new one.
    pub fn convert_speeds(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter().map(|&s| self.convert_speed_unit(s)).collect()
    }
}

/// Replaces an exactly-zero value with `epsilon`. Radius formulas square the
/// value, so a zero would give an invisible marker.
pub fn clamp_zero(value: f64, epsilon: f64) -> f64 {
    if value == 0.0 {
        epsilon
    } else {
        value
    }
}

/// Applies `clamp_zero` to a whole series, returning a new one.
pub fn clamp_zeros(values: &[f64], epsilon: f64) -> Vec<f64> {
    values.iter().map(|&v| clamp_zero(v, epsilon)).collect()
}

/// Returns the (min, max) of the series, or None if it is empty.
pub fn normalize_range(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(min, max), &v| (min.min(v), max.max(v))),
    )
}

/// A linear mapping from [min, max] onto [0, 1], as needed by the color map.
/// Values outside the range are clipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub min: f64,
    pub max: f64,
}

impl Normalization {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Builds the normalization from the extremes of the series.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        normalize_range(values).map(|(min, max)| Self::new(min, max))
    }

    /// True when every value in the series was the same.
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Maps `value` into [0, 1]. A constant series has no spread to map, so
    /// everything goes to the middle of the color scale.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return 0.5;
        }

        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_mph_with_visual_scale() {
        let conv = SpeedConversion::default();
        assert!((conv.convert_speed_unit(10.0) - 32.1868).abs() < 1e-9);
        assert_eq!(conv.convert_speed_unit(0.0), 0.0);
    }

    #[test]
    fn conversion_constants_are_configurable() {
        let conv = SpeedConversion {
            unit_factor: 3.6,
            visual_scale: 1.0,
        };
        assert!((conv.convert_speed_unit(10.0) - 36.0).abs() < 1e-9);
    }

    #[test]
    fn convert_speeds_leaves_input_alone() {
        let raw = vec![0.0, 10.0, 20.0];
        let converted = SpeedConversion::default().convert_speeds(&raw);
        assert_eq!(raw, vec![0.0, 10.0, 20.0]);
        assert_eq!(converted.len(), 3);
        assert!((converted[2] - 64.3736).abs() < 1e-9);
    }

    #[test]
    fn clamp_zero_only_touches_zero() {
        assert_eq!(clamp_zero(0.0, 0.01), 0.01);
        assert_eq!(clamp_zero(-0.0, 0.01), 0.01);
        assert_eq!(clamp_zero(3.5, 0.01), 3.5);
        assert_eq!(clamp_zero(0.001, 0.01), 0.001);
    }

    #[test]
    fn three_point_speed_scenario() {
        let conv = SpeedConversion::default();
        let speeds = clamp_zeros(&conv.convert_speeds(&[0.0, 10.0, 20.0]), DEFAULT_ZERO_EPSILON);
        assert_eq!(speeds[0], 0.01);

        let (min, max) = normalize_range(&speeds).unwrap();
        assert_eq!(min, 0.01);
        assert!((max - 64.37).abs() < 0.01);
    }

    #[test]
    fn normalize_range_of_empty_series() {
        assert_eq!(normalize_range(&[]), None);
        assert_eq!(Normalization::from_values(&[]), None);
    }

    #[test]
    fn constant_series_maps_to_midpoint() {
        let norm = Normalization::from_values(&[7.0, 7.0, 7.0]).unwrap();
        assert!(norm.is_degenerate());
        assert_eq!(norm.normalize(7.0), 0.5);
        assert_eq!(norm.normalize(100.0), 0.5);
    }

    #[test]
    fn normalize_is_linear_and_clipped() {
        let norm = Normalization::new(10.0, 20.0);
        assert_eq!(norm.normalize(10.0), 0.0);
        assert_eq!(norm.normalize(15.0), 0.5);
        assert_eq!(norm.normalize(20.0), 1.0);
        assert_eq!(norm.normalize(5.0), 0.0);
        assert_eq!(norm.normalize(25.0), 1.0);
    }
}
