use time::OffsetDateTime;

use crate::error::{check_shape, TrackMapError};

/// The average of a metric over one window of time, anchored at the sample
/// where the window was completed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverage {
    pub index: usize,
    pub average: f64,
}

/// Walks the series once, emitting the average of the samples seen since the
/// previous emission each time the elapsed time reaches the next multiple of
/// `window_seconds`. A series shorter than one window yields nothing.
///
/// A gap in the recording that spans several boundaries produces a single
/// label; the boundaries it skipped are not emitted afterwards.
pub fn aggregate_windows(
    values: &[f64],
    timestamps: &[OffsetDateTime],
    window_seconds: f64,
) -> Result<Vec<WindowAverage>, TrackMapError> {
    check_shape("values", timestamps.len(), values.len())?;
    if window_seconds.is_nan() || window_seconds <= 0.0 {
        return Err(TrackMapError::InvalidWindow(window_seconds));
    }

    let mut windows = Vec::new();
    let mut elapsed = 0.0;
    let mut next_threshold = window_seconds;
    let mut sum = 0.0;
    let mut count = 0usize;

    for (idx, &value) in values.iter().enumerate() {
        if idx > 0 {
            let dt = (timestamps[idx] - timestamps[idx - 1]).as_seconds_f64();
            if dt < 0.0 {
                return Err(TrackMapError::OutOfOrderTimestamps { index: idx - 1 });
            }
            elapsed += dt;
        }

        sum += value;
        count += 1;

        if elapsed >= next_threshold {
            windows.push(WindowAverage {
                index: idx,
                average: sum / count as f64,
            });
            sum = 0.0;
            count = 0;
            while next_threshold <= elapsed {
                next_threshold += window_seconds;
            }
        }
    }

    Ok(windows)
}
