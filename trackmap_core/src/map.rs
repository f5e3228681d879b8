use log::debug;
use logging_timer::time;

use crate::{
    encode::{encode_labels, encode_markers, EncoderParameters, Metric, MetricView},
    error::TrackMapError,
    map_writer::{MapDocument, MapStyle},
    model::TrackRecord,
    transform::SpeedConversion,
    window::aggregate_windows,
};

/// Everything that controls how a track is drawn.
#[derive(Debug, Clone, Default)]
pub struct MapParameters {
    pub speed: SpeedConversion,
    pub encoder: EncoderParameters,
    pub style: MapStyle,
    /// If set, a label with the average of the metric is added every this
    /// many seconds.
    pub label_interval_seconds: Option<f64>,
}

/// Builds the map of a track keyed on `metric`. A heart rate map needs the
/// track to have heart rate.
#[time]
pub fn build_map(
    track: &TrackRecord,
    metric: Metric,
    params: &MapParameters,
) -> Result<MapDocument, TrackMapError> {
    track.validate()?;
    if track.is_empty() {
        return Err(TrackMapError::SourceFormat(
            "the track does not have any points".into(),
        ));
    }

    let speeds = params.speed.convert_speeds(&track.raw_speeds);
    let heart_rates = track.heart_rates.as_deref();

    let view = match metric {
        Metric::Speed => MetricView::speed(speeds.clone(), heart_rates, &params.encoder),
        Metric::HeartRate => {
            let hr = heart_rates.ok_or_else(|| {
                TrackMapError::SourceFormat("the track does not have heart rate data".into())
            })?;
            MetricView::heart_rate(hr.to_vec(), Some(&speeds), &params.encoder)
        }
    }
    .ok_or_else(|| TrackMapError::SourceFormat(format!("no {metric} values in the track")))?;

    if view.normalization.is_degenerate() {
        debug!("Every {metric} value is {}, using a single color", view.normalization.min);
    }

    let gradient = params.encoder.colormap.gradient();
    let markers = encode_markers(track, &view, &gradient, params.encoder.zero_epsilon);

    let labels = match params.label_interval_seconds {
        Some(interval) => {
            let windows = aggregate_windows(&view.values, &track.times, interval)?;
            encode_labels(track, metric, &windows)
        }
        None => Vec::new(),
    };

    let title = match &track.name {
        Some(name) => format!("{name} - {metric}"),
        None => format!("Track {metric}"),
    };

    Ok(MapDocument {
        title,
        center: track.position(0),
        bounds: track.bounds(),
        markers,
        labels,
        style: params.style.clone(),
    })
}
