//! Heart rate training zones, and the time spent in each of them.
//!
//! The zones are derived from age and resting heart rate using the heart
//! rate reserve: `max = 220 - age`, `reserve = max - resting`, and each zone
//! is a fraction of the reserve added on to the resting rate.

use std::{collections::BTreeMap, fmt};

use log::debug;
use logging_timer::time;
use time::{Duration, OffsetDateTime};

use crate::error::{check_shape, TrackMapError};

/// Identifies a zone. The ordering is the ranking of the zones, from lowest
/// to highest intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ZoneId {
    Resting,
    Easy,
    Fatburn,
    Cardio,
    Sprint,
    Anaerobic,
}

impl ZoneId {
    pub const ALL: [ZoneId; 6] = [
        ZoneId::Resting,
        ZoneId::Easy,
        ZoneId::Fatburn,
        ZoneId::Cardio,
        ZoneId::Sprint,
        ZoneId::Anaerobic,
    ];

    /// The fractions of the heart rate reserve that bound the zone.
    pub fn reserve_fractions(&self) -> (f64, f64) {
        match self {
            ZoneId::Resting => (0.0, 0.5),
            ZoneId::Easy => (0.5, 0.6),
            ZoneId::Fatburn => (0.6, 0.7),
            ZoneId::Cardio => (0.7, 0.8),
            ZoneId::Sprint => (0.8, 0.9),
            ZoneId::Anaerobic => (0.9, 1.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ZoneId::Resting => "resting",
            ZoneId::Easy => "easy",
            ZoneId::Fatburn => "fatburn",
            ZoneId::Cardio => "cardio",
            ZoneId::Sprint => "sprint",
            ZoneId::Anaerobic => "anaerobic",
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The inputs to the zone calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneParameters {
    pub age: u8,
    pub resting_rate: f64,
}

impl Default for ZoneParameters {
    fn default() -> Self {
        Self {
            age: 45,
            resting_rate: 60.0,
        }
    }
}

impl ZoneParameters {
    pub fn max_rate(&self) -> f64 {
        220.0 - self.age as f64
    }

    /// The heart rate reserve, the span between maximum and resting rate.
    pub fn reserve(&self) -> f64 {
        self.max_rate() - self.resting_rate
    }

    fn validate(&self) -> Result<(), TrackMapError> {
        if self.age >= 220
            || !self.resting_rate.is_finite()
            || self.resting_rate < 0.0
            || self.reserve() <= 0.0
        {
            return Err(TrackMapError::InvalidZoneParameters {
                age: self.age,
                resting_rate: self.resting_rate,
            });
        }
        Ok(())
    }
}

/// An immutable zone definition: [lower_bpm, upper_bpm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartRateZone {
    pub id: ZoneId,
    pub lower_bpm: f64,
    pub upper_bpm: f64,
}

impl HeartRateZone {
    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Half-open containment test. The lowest zone also takes anything below
    /// the resting rate and the highest anything above the maximum rate, so
    /// every reading lands in exactly one zone.
    pub fn contains(&self, bpm: f64) -> bool {
        let above_lower = self.id == ZoneId::Resting || bpm >= self.lower_bpm;
        let below_upper = self.id == ZoneId::Anaerobic || bpm < self.upper_bpm;
        above_lower && below_upper
    }
}

/// Builds the six zones, in ascending order.
pub fn build_zones(params: ZoneParameters) -> Result<Vec<HeartRateZone>, TrackMapError> {
    params.validate()?;
    let reserve = params.reserve();

    Ok(ZoneId::ALL
        .iter()
        .map(|&id| {
            let (low, high) = id.reserve_fractions();
            HeartRateZone {
                id,
                lower_bpm: reserve * low + params.resting_rate,
                upper_bpm: reserve * high + params.resting_rate,
            }
        })
        .collect())
}

/// Returns the zone that `bpm` falls in.
pub fn classify(zones: &[HeartRateZone], bpm: f64) -> Option<ZoneId> {
    zones.iter().find(|z| z.contains(bpm)).map(|z| z.id)
}

/// The time spent in each zone over one track.
#[derive(Debug, Clone)]
pub struct ZoneReport {
    pub zones: Vec<HeartRateZone>,
    /// Raw accumulated seconds per zone.
    pub per_zone_seconds: BTreeMap<ZoneId, f64>,
    /// Seconds between the first and last samples.
    pub total_elapsed: f64,
}

impl ZoneReport {
    fn empty(zones: Vec<HeartRateZone>) -> Self {
        let per_zone_seconds = zones.iter().map(|z| (z.id, 0.0)).collect();
        Self {
            zones,
            per_zone_seconds,
            total_elapsed: 0.0,
        }
    }

    /// True if there was not enough data to measure any time.
    pub fn is_empty(&self) -> bool {
        self.total_elapsed == 0.0
    }

    pub fn seconds(&self, id: ZoneId) -> f64 {
        self.per_zone_seconds.get(&id).copied().unwrap_or_default()
    }

    fn accumulated(&self) -> f64 {
        self.per_zone_seconds.values().sum()
    }

    /// The seconds in the zone, rescaled so that the durations of all the
    /// zones add up to exactly `total_elapsed`.
    pub fn normalized_seconds(&self, id: ZoneId) -> f64 {
        let accumulated = self.accumulated();
        if accumulated == 0.0 {
            return 0.0;
        }

        self.seconds(id) * self.total_elapsed / accumulated
    }

    /// Percentage of the total elapsed time spent in the zone.
    pub fn percentage(&self, id: ZoneId) -> f64 {
        if self.total_elapsed == 0.0 {
            return 0.0;
        }

        self.normalized_seconds(id) / self.total_elapsed * 100.0
    }
}

impl fmt::Display for ZoneReport {
    /// One line per zone: name, bounds, duration and percentage.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for zone in &self.zones {
            writeln!(
                f,
                "{:<10} {:>6.1} - {:<6.1} bpm  {}  {:>5.1}%",
                zone.name(),
                zone.lower_bpm,
                zone.upper_bpm,
                format_duration(self.normalized_seconds(zone.id)),
                self.percentage(zone.id)
            )?;
        }
        write!(f, "{:<10} {:>24}", "total", format_duration(self.total_elapsed))
    }
}

/// Formats seconds as "HH:MM:SS".
pub fn format_duration(seconds: f64) -> String {
    let d = Duration::seconds_f64(seconds.round());
    format!(
        "{:02}:{:02}:{:02}",
        d.whole_hours(),
        d.whole_minutes() % 60,
        d.whole_seconds() % 60
    )
}

/// Works out how long was spent in each heart rate zone. The time between
/// sample `i` and sample `i + 1` is attributed to the zone of sample `i`.
#[time]
pub fn compute_zone_report(
    heart_rate: &[f64],
    timestamps: &[OffsetDateTime],
    params: ZoneParameters,
) -> Result<ZoneReport, TrackMapError> {
    check_shape("heart_rate", timestamps.len(), heart_rate.len())?;
    let zones = build_zones(params)?;
    let mut report = ZoneReport::empty(zones);

    if timestamps.len() < 2 {
        return Ok(report);
    }

    for (idx, pair) in timestamps.windows(2).enumerate() {
        let dt = (pair[1] - pair[0]).as_seconds_f64();
        if dt < 0.0 {
            return Err(TrackMapError::OutOfOrderTimestamps { index: idx });
        }

        if let Some(id) = classify(&report.zones, heart_rate[idx]) {
            *report.per_zone_seconds.entry(id).or_default() += dt;
        }
    }

    report.total_elapsed = (timestamps[timestamps.len() - 1] - timestamps[0]).as_seconds_f64();
    debug!(
        "Accumulated {} seconds of heart rate data over {} seconds elapsed",
        report.accumulated(),
        report.total_elapsed
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(spacing: i64, n: usize) -> Vec<OffsetDateTime> {
        (0..n)
            .map(|i| OffsetDateTime::UNIX_EPOCH + Duration::seconds(spacing * i as i64))
            .collect()
    }

    fn params(age: u8, resting_rate: f64) -> ZoneParameters {
        ZoneParameters { age, resting_rate }
    }

    #[test]
    fn resting_zone_for_age_45() {
        let zones = build_zones(params(45, 50.0)).unwrap();
        assert_eq!(zones.len(), 6);
        assert_eq!(zones[0].id, ZoneId::Resting);
        assert_eq!(zones[0].lower_bpm, 50.0);
        assert_eq!(zones[0].upper_bpm, 112.5);
        assert_eq!(zones[5].id, ZoneId::Anaerobic);
        assert_eq!(zones[5].upper_bpm, 175.0);
    }

    #[test]
    fn zone_bounds_are_monotonic() {
        for age in [0u8, 18, 45, 80, 219] {
            let max = 220.0 - age as f64;
            for resting in [0.0, 40.0, 60.0, max - 1.0] {
                if resting >= max {
                    continue;
                }
                let zones = build_zones(params(age, resting)).unwrap();
                for w in zones.windows(2) {
                    assert!(w[0].lower_bpm <= w[0].upper_bpm);
                    assert!(w[0].upper_bpm <= w[1].lower_bpm);
                }
            }
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            build_zones(params(220, 50.0)),
            Err(TrackMapError::InvalidZoneParameters { .. })
        ));
        assert!(matches!(
            build_zones(params(45, 175.0)),
            Err(TrackMapError::InvalidZoneParameters { .. })
        ));
        for resting in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                build_zones(params(45, resting)),
                Err(TrackMapError::InvalidZoneParameters { .. })
            ));
        }
    }

    #[test]
    fn boundaries_are_half_open() {
        let zones = build_zones(params(45, 50.0)).unwrap();
        assert_eq!(classify(&zones, 112.5), Some(ZoneId::Easy));
        assert_eq!(classify(&zones, 112.49), Some(ZoneId::Resting));
        assert_eq!(classify(&zones, 162.5), Some(ZoneId::Anaerobic));
        assert_eq!(classify(&zones, 200.0), Some(ZoneId::Anaerobic));
        assert_eq!(classify(&zones, 30.0), Some(ZoneId::Resting));
    }

    #[test]
    fn all_resting_scenario() {
        let report = compute_zone_report(&[60.0, 60.0, 60.0], &times(10, 3), params(45, 50.0))
            .unwrap();
        assert_eq!(report.total_elapsed, 20.0);
        assert_eq!(report.seconds(ZoneId::Resting), 20.0);
        assert_eq!(report.percentage(ZoneId::Resting), 100.0);
        assert_eq!(report.percentage(ZoneId::Easy), 0.0);
    }

    #[test]
    fn time_goes_to_the_zone_of_the_earlier_sample() {
        // Zones for age 45, resting 50: easy starts at 112.5, anaerobic at 162.5.
        let report = compute_zone_report(
            &[60.0, 120.0, 170.0, 170.0],
            &times(10, 4),
            params(45, 50.0),
        )
        .unwrap();
        assert_eq!(report.seconds(ZoneId::Resting), 10.0);
        assert_eq!(report.seconds(ZoneId::Easy), 10.0);
        assert_eq!(report.seconds(ZoneId::Anaerobic), 10.0);
        assert_eq!(report.total_elapsed, 30.0);
    }

    #[test]
    fn normalized_durations_sum_to_total() {
        let ts: Vec<OffsetDateTime> = [0.0, 0.7, 2.1, 2.9, 4.4, 7.3]
            .iter()
            .map(|&s| OffsetDateTime::UNIX_EPOCH + Duration::seconds_f64(s))
            .collect();
        let hr = [55.0, 118.0, 131.0, 143.0, 158.0, 171.0];
        let report = compute_zone_report(&hr, &ts, params(45, 50.0)).unwrap();

        let sum: f64 = ZoneId::ALL.iter().map(|&id| report.normalized_seconds(id)).sum();
        assert!((sum - report.total_elapsed).abs() < 1e-9);

        let pct: f64 = ZoneId::ALL.iter().map(|&id| report.percentage(id)).sum();
        assert!((pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_two_samples_is_empty() {
        let report = compute_zone_report(&[80.0], &times(10, 1), params(45, 50.0)).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.total_elapsed, 0.0);
        assert_eq!(report.percentage(ZoneId::Resting), 0.0);

        let report = compute_zone_report(&[], &[], params(45, 50.0)).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = compute_zone_report(&[60.0, 60.0], &times(10, 3), params(45, 50.0)).unwrap_err();
        assert!(matches!(err, TrackMapError::ShapeMismatch { .. }));
    }

    #[test]
    fn backwards_time_fails() {
        let mut ts = times(10, 3);
        ts.swap(1, 2);
        let err = compute_zone_report(&[60.0, 60.0, 60.0], &ts, params(45, 50.0)).unwrap_err();
        assert!(matches!(err, TrackMapError::OutOfOrderTimestamps { index: 1 }));
    }

    #[test]
    fn report_prints_one_line_per_zone() {
        let report = compute_zone_report(&[60.0, 60.0, 60.0], &times(10, 3), params(45, 50.0))
            .unwrap();
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("resting"));
        assert!(lines[0].contains("50.0 - 112.5"));
        assert!(lines[0].contains("00:00:20"));
        assert!(lines[0].ends_with("100.0%"));
    }

    #[test]
    fn durations_format_as_hms() {
        assert_eq!(format_duration(0.0), "00:00:00");
        assert_eq!(format_duration(3725.4), "01:02:05");
    }
}
