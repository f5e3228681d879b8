use geo::{point, BoundingRect, GeodesicDistance, LineString, Point};
use log::{debug, warn};
use time::OffsetDateTime;

use crate::{
    error::{check_shape, TrackMapError},
    model::{Gpx, HeartRateTrack, Lat, Lon, Position, Track, TrackRecord, Waypoint},
};

/// Beyond this the track and heart rate file are probably not from the same
/// recording.
pub const MAX_ENDPOINT_OFFSET_METRES: f64 = 100.0;

impl Gpx {
    /// Returns the total number of points across all tracks and segments.
    pub fn num_points(&self) -> usize {
        self.tracks.iter().map(|track| track.num_points()).sum()
    }

    /// Extracts the heart rate stream from a GPX that was written purely to
    /// carry heart rate (e.g. gpsbabel's 'garminextensions' output). Only the
    /// last track in the file is used.
    pub fn into_heart_rate_track(mut self) -> Result<HeartRateTrack, TrackMapError> {
        let track = self.tracks.pop().ok_or_else(|| {
            TrackMapError::SourceFormat("the heart rate file does not contain any tracks".into())
        })?;

        let mut hr = HeartRateTrack {
            heart_rates: Vec::with_capacity(track.num_points()),
            lats: Vec::with_capacity(track.num_points()),
            lons: Vec::with_capacity(track.num_points()),
        };

        for (idx, wp) in track.points().enumerate() {
            let heart_rate = wp.heart_rate.ok_or_else(|| {
                TrackMapError::SourceFormat(format!("trackpoint {idx} has no heart rate"))
            })?;
            hr.heart_rates.push(heart_rate);
            hr.lats.push(wp.lat);
            hr.lons.push(wp.lon);
        }

        Ok(hr)
    }
}

impl Track {
    /// Returns the number of points across all segments.
    pub fn num_points(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    /// Iterates the points of all segments in order.
    pub fn points(&self) -> impl Iterator<Item = &Waypoint> {
        self.segments.iter().flat_map(|s| s.points.iter())
    }

    /// Flattens the segments of the track into a TrackRecord.
    ///
    /// Every point must have a time. Speed must be on every point or on none
    /// of them; in the latter case it is derived from the distance between
    /// consecutive points. Heart rate is only kept if every point has one.
    pub fn to_track_record(&self) -> Result<TrackRecord, TrackMapError> {
        let n = self.num_points();
        let mut record = TrackRecord {
            name: self.name.clone(),
            times: Vec::with_capacity(n),
            lats: Vec::with_capacity(n),
            lons: Vec::with_capacity(n),
            elevations: Vec::with_capacity(n),
            raw_speeds: Vec::with_capacity(n),
            heart_rates: None,
        };

        let mut speeds = Vec::with_capacity(n);
        let mut heart_rates = Vec::with_capacity(n);

        for (idx, wp) in self.points().enumerate() {
            let time = wp.time.ok_or_else(|| {
                TrackMapError::SourceFormat(format!("trackpoint {idx} has no time"))
            })?;
            record.times.push(time);
            record.lats.push(wp.lat);
            record.lons.push(wp.lon);
            record.elevations.push(wp.ele);
            speeds.push(wp.speed);
            heart_rates.push(wp.heart_rate);
        }

        let with_speed = speeds.iter().filter(|s| s.is_some()).count();
        record.raw_speeds = if with_speed == n {
            speeds.into_iter().flatten().collect()
        } else if with_speed == 0 {
            debug!(
                "Track {:?} has no speed data, deriving it from the trackpoint positions",
                self.name
            );
            derive_speeds(&record.lats, &record.lons, &record.times)?
        } else {
            return Err(TrackMapError::SourceFormat(format!(
                "only {with_speed} of {n} trackpoints have a speed"
            )));
        };

        let with_hr = heart_rates.iter().filter(|hr| hr.is_some()).count();
        if n > 0 && with_hr == n {
            record.heart_rates = Some(heart_rates.into_iter().flatten().collect());
        } else if with_hr > 0 {
            warn!(
                "Only {with_hr} of {n} trackpoints in track {:?} have a heart rate, ignoring it",
                self.name
            );
        }

        Ok(record)
    }
}

/// Speed in metres per second between consecutive points, which is the unit
/// gpsbabel writes into <speed>. The first point has a speed of zero, as do
/// points with the same timestamp as their predecessor.
fn derive_speeds(
    lats: &[Lat],
    lons: &[Lon],
    times: &[OffsetDateTime],
) -> Result<Vec<f64>, TrackMapError> {
    let mut speeds = Vec::with_capacity(times.len());
    if times.is_empty() {
        return Ok(speeds);
    }

    speeds.push(0.0);
    // n.b. x=lon, y=lat. If you do it the other way round the
    // distances are wrong - a lot wrong.
    let mut p1: Point = point! { x: lons[0], y: lats[0] };
    for idx in 1..times.len() {
        let p2: Point = point! { x: lons[idx], y: lats[idx] };
        let seconds = (times[idx] - times[idx - 1]).as_seconds_f64();
        if seconds < 0.0 {
            return Err(TrackMapError::OutOfOrderTimestamps { index: idx - 1 });
        }

        let speed = if seconds == 0.0 {
            0.0
        } else {
            p1.geodesic_distance(&p2) / seconds
        };
        speeds.push(speed);
        p1 = p2;
    }

    Ok(speeds)
}

fn first_point(lats: &[Lat], lons: &[Lon]) -> Option<Point> {
    Some(point! { x: *lons.first()?, y: *lats.first()? })
}

fn last_point(lats: &[Lat], lons: &[Lon]) -> Option<Point> {
    Some(point! { x: *lons.last()?, y: *lats.last()? })
}

impl TrackRecord {
    /// The number of points in the track.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn position(&self, idx: usize) -> Position {
        Position(self.lats[idx], self.lons[idx])
    }

    /// Seconds between the first and last points.
    pub fn elapsed_seconds(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => (*last - *first).as_seconds_f64(),
            _ => 0.0,
        }
    }

    /// Checks that all the sequences are the same length.
    pub fn validate(&self) -> Result<(), TrackMapError> {
        let n = self.len();
        check_shape("lats", n, self.lats.len())?;
        check_shape("lons", n, self.lons.len())?;
        check_shape("elevations", n, self.elevations.len())?;
        check_shape("raw_speeds", n, self.raw_speeds.len())?;
        if let Some(hr) = &self.heart_rates {
            check_shape("heart_rates", n, hr.len())?;
        }
        Ok(())
    }

    /// Attaches the heart rate from a separate file. The two files are
    /// matched by index so they must have the same number of points; nothing
    /// is truncated or padded.
    pub fn with_heart_rate(mut self, hr: HeartRateTrack) -> Result<Self, TrackMapError> {
        check_shape("heart_rates", self.len(), hr.heart_rates.len())?;
        if self.heart_rates.is_some() {
            debug!("Replacing embedded heart rate with the separate heart rate file");
        }

        if let Some((start, end)) = self.endpoint_offsets(&hr) {
            debug!("Heart rate file is {start:.1}m from the track at the start and {end:.1}m at the end");
            if start > MAX_ENDPOINT_OFFSET_METRES || end > MAX_ENDPOINT_OFFSET_METRES {
                warn!(
                    "The heart rate file does not line up with the track ({start:.0}m apart at the start, \
                     {end:.0}m at the end), are they from the same activity?"
                );
            }
        }
        self.heart_rates = Some(hr.heart_rates);
        Ok(self)
    }

    /// Geodesic distance in metres between the first points of the track and
    /// the heart rate file, and between their last points. None if either
    /// is empty.
    pub fn endpoint_offsets(&self, hr: &HeartRateTrack) -> Option<(f64, f64)> {
        let start = first_point(&self.lats, &self.lons)?
            .geodesic_distance(&first_point(&hr.lats, &hr.lons)?);
        let end = last_point(&self.lats, &self.lons)?
            .geodesic_distance(&last_point(&hr.lats, &hr.lons)?);
        Some((start, end))
    }

    /// Returns the south-west and north-east corners of the track.
    pub fn bounds(&self) -> Option<(Position, Position)> {
        let line_string: LineString = self
            .lons
            .iter()
            .zip(&self.lats)
            .map(|(&lon, &lat)| (lon, lat))
            .collect();

        line_string.bounding_rect().map(|rect| {
            (
                Position(rect.min().y, rect.min().x),
                Position(rect.max().y, rect.max().x),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::model::TrackSegment;

    fn waypoint(secs: i64, lat: f64, speed: Option<f64>, hr: Option<f64>) -> Waypoint {
        Waypoint {
            lat,
            lon: -1.5,
            ele: Some(100.0),
            time: Some(OffsetDateTime::UNIX_EPOCH + Duration::seconds(secs)),
            speed,
            heart_rate: hr,
        }
    }

    fn track(points: Vec<Waypoint>) -> Track {
        Track {
            name: Some("test".into()),
            segments: vec![TrackSegment { points }],
        }
    }

    #[test]
    fn segments_are_concatenated() {
        let t = Track {
            name: None,
            segments: vec![
                TrackSegment {
                    points: vec![waypoint(0, 53.0, Some(1.0), None)],
                },
                TrackSegment {
                    points: vec![
                        waypoint(10, 53.1, Some(2.0), None),
                        waypoint(20, 53.2, Some(3.0), None),
                    ],
                },
            ],
        };

        let record = t.to_track_record().unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.raw_speeds, vec![1.0, 2.0, 3.0]);
        assert!(record.heart_rates.is_none());
        assert!(record.validate().is_ok());
        assert_eq!(record.elapsed_seconds(), 20.0);
    }

    #[test]
    fn missing_time_is_a_source_error() {
        let mut wp = waypoint(0, 53.0, Some(1.0), None);
        wp.time = None;
        let err = track(vec![wp]).to_track_record().unwrap_err();
        assert!(matches!(err, TrackMapError::SourceFormat(_)));
    }

    #[test]
    fn partial_speed_is_a_source_error() {
        let t = track(vec![
            waypoint(0, 53.0, Some(1.0), None),
            waypoint(10, 53.0, None, None),
        ]);
        assert!(matches!(
            t.to_track_record(),
            Err(TrackMapError::SourceFormat(_))
        ));
    }

    #[test]
    fn speed_is_derived_when_absent() {
        // 0.001 degrees of latitude is roughly 111 metres.
        let t = track(vec![
            waypoint(0, 53.000, None, None),
            waypoint(10, 53.001, None, None),
        ]);
        let record = t.to_track_record().unwrap();
        assert_eq!(record.raw_speeds[0], 0.0);
        assert!((record.raw_speeds[1] - 11.1).abs() < 0.2);
    }

    #[test]
    fn embedded_heart_rate_is_kept_only_when_complete() {
        let full = track(vec![
            waypoint(0, 53.0, Some(1.0), Some(120.0)),
            waypoint(10, 53.0, Some(1.0), Some(125.0)),
        ]);
        assert_eq!(
            full.to_track_record().unwrap().heart_rates,
            Some(vec![120.0, 125.0])
        );

        let partial = track(vec![
            waypoint(0, 53.0, Some(1.0), Some(120.0)),
            waypoint(10, 53.0, Some(1.0), None),
        ]);
        assert!(partial.to_track_record().unwrap().heart_rates.is_none());
    }

    #[test]
    fn heart_rate_file_length_must_match() {
        let record = track(vec![
            waypoint(0, 53.0, Some(1.0), None),
            waypoint(10, 53.0, Some(1.0), None),
        ])
        .to_track_record()
        .unwrap();

        let hr = HeartRateTrack {
            heart_rates: vec![100.0, 110.0, 120.0],
            lats: vec![53.0; 3],
            lons: vec![-1.5; 3],
        };

        let err = record.clone().with_heart_rate(hr).unwrap_err();
        assert!(matches!(
            err,
            TrackMapError::ShapeMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));

        let hr = HeartRateTrack {
            heart_rates: vec![100.0, 110.0],
            lats: vec![53.0; 2],
            lons: vec![-1.5; 2],
        };
        let record = record.with_heart_rate(hr).unwrap();
        assert_eq!(record.heart_rates, Some(vec![100.0, 110.0]));
    }

    #[test]
    fn endpoint_offsets_measure_both_ends() {
        let record = track(vec![
            waypoint(0, 53.0, Some(1.0), None),
            waypoint(10, 53.01, Some(1.0), None),
        ])
        .to_track_record()
        .unwrap();

        let same = HeartRateTrack {
            heart_rates: vec![100.0, 110.0],
            lats: vec![53.0, 53.01],
            lons: vec![-1.5; 2],
        };
        let (start, end) = record.endpoint_offsets(&same).unwrap();
        assert!(start < 1e-6 && end < 1e-6);

        // 0.01 degrees of latitude is a little over 1km.
        let shifted = HeartRateTrack {
            lats: vec![53.0, 53.02],
            ..same
        };
        let (start, end) = record.endpoint_offsets(&shifted).unwrap();
        assert!(start < 1e-6);
        assert!(end > 1000.0 && end < 1200.0);
        assert!(end > MAX_ENDPOINT_OFFSET_METRES);

        // A far-off heart rate file is only a warning.
        assert!(record.with_heart_rate(shifted).is_ok());

        assert_eq!(
            TrackRecord::default().endpoint_offsets(&HeartRateTrack::default()),
            None
        );
    }

    #[test]
    fn heart_rate_track_uses_last_track() {
        let gpx = Gpx {
            filename: None,
            tracks: vec![
                track(vec![waypoint(0, 53.0, None, Some(90.0))]),
                track(vec![
                    waypoint(0, 53.0, None, Some(100.0)),
                    waypoint(1, 53.0, None, Some(101.0)),
                ]),
            ],
        };
        assert_eq!(gpx.num_points(), 3);
        let hr = gpx.into_heart_rate_track().unwrap();
        assert_eq!(hr.heart_rates, vec![100.0, 101.0]);
    }

    #[test]
    fn bounds_cover_all_points() {
        let record = track(vec![
            waypoint(0, 53.0, Some(1.0), None),
            waypoint(10, 53.5, Some(1.0), None),
            waypoint(20, 52.9, Some(1.0), None),
        ])
        .to_track_record()
        .unwrap();

        let (sw, ne) = record.bounds().unwrap();
        assert_eq!(sw, Position(52.9, -1.5));
        assert_eq!(ne, Position(53.5, -1.5));
    }
}
