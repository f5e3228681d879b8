use std::path::PathBuf;

use serde::Serialize;
use time::OffsetDateTime;

pub type Lat = f64; // -90..90
pub type Lon = f64; // -180..180

/// Data parsed from a GPX file. Only the parts of the XSD at
/// https://www.topografix.com/GPX/1/1/gpx.xsd that we need to draw a map
/// are kept, everything else is skipped by the reader.
#[derive(Debug, Clone, Default)]
pub struct Gpx {
    /// The filename field is not part of the XSD, but it is convenient to have
    /// it so it can be used as an identifier for the GPX data.
    pub filename: Option<PathBuf>,
    /// A list of tracks.
    pub tracks: Vec<Track>,
}

/// A Track is an ordered list of points describing a path.
#[derive(Debug, Clone, Default)]
pub struct Track {
    /// GPS name of the track.
    pub name: Option<String>,
    /// List of segments in the track. A Track Segment holds a list of Track
    /// Points which are logically connected in order.
    pub segments: Vec<TrackSegment>,
}

/// A Track Segment holds a list of Track Points which are logically connected
/// in order. A new segment is started each time GPS reception was lost.
#[derive(Debug, Clone, Default)]
pub struct TrackSegment {
    /// The set of points in the segment.
    pub points: Vec<Waypoint>,
}

/// A point within a track, with the handful of fields that GPS units (and
/// gpsbabel) actually fill in.
#[derive(Debug, Clone, Default)]
pub struct Waypoint {
    /// The latitude of the point, decimal degrees, WGS84.
    pub lat: Lat,
    /// The longitude of the point, decimal degrees, WGS84.
    pub lon: Lon,
    /// Elevation (in meters) of the point.
    pub ele: Option<f64>,
    /// Timestamp of the point, always UTC.
    pub time: Option<OffsetDateTime>,
    /// Instantaneous speed from the <speed> element (GPX 1.0, or gpsbabel's
    /// `-x track,speed` filter). Metres per second.
    pub speed: Option<f64>,
    /// Heart rate in beats per minute, from the Garmin TrackPointExtension.
    pub heart_rate: Option<f64>,
}

/// One activity track flattened into parallel, index-aligned sequences.
/// Index `i` in every sequence describes the same instant. The record is
/// never modified by the metric transforms, they produce new series.
#[derive(Debug, Clone, Default)]
pub struct TrackRecord {
    /// The name of the track, if the GPX gave it one.
    pub name: Option<String>,
    pub times: Vec<OffsetDateTime>,
    pub lats: Vec<Lat>,
    pub lons: Vec<Lon>,
    pub elevations: Vec<Option<f64>>,
    /// Speed as recorded, before any unit conversion.
    pub raw_speeds: Vec<f64>,
    /// Heart rate, either embedded in the track or attached from a separate
    /// heart rate file.
    pub heart_rates: Option<Vec<f64>>,
}

/// The heart rate stream of a separate heart rate file. It is matched to a
/// TrackRecord by index, so the lengths must agree.
#[derive(Debug, Clone, Default)]
pub struct HeartRateTrack {
    pub heart_rates: Vec<f64>,
    pub lats: Vec<Lat>,
    pub lons: Vec<Lon>,
}

/// A geographic position, serialized as a `[lat, lon]` pair which is what
/// Leaflet expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position(pub Lat, pub Lon);

/// Everything needed to draw one circle on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDescriptor {
    pub position: Position,
    pub radius: f64,
    /// A CSS hex color such as "#0d0887".
    pub fill_color: String,
    pub tooltip: String,
}

/// A text label placed on the map, used for the periodic averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelDescriptor {
    pub position: Position,
    pub text: String,
}
