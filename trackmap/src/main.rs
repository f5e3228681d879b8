use std::{
    io::Write,
    path::Path,
};

use anyhow::{bail, Context, Result};
use args::{parse_args, Args};
use clap::builder::styling::AnsiColor;
use env_logger::{Builder, Env};
use formatting::{format_utc_date, to_local_date};
use log::{debug, error, info, warn};
use logging_timer::time;
use outputs::get_required_outputs;
use trackmap_core::{
    convert::{convert_fit_to_gpx, is_fit_file},
    encode::Metric,
    map::{build_map, MapParameters},
    map_writer::write_map_to_file,
    model::{Gpx, HeartRateTrack, Track, TrackRecord},
    read::read_gpx_from_file,
    zones::{compute_zone_report, format_duration},
};

mod args;
mod formatting;
mod outputs;

pub const PROGRAM_NAME: &str = env!("CARGO_PKG_NAME");

#[time]
fn main() -> Result<()> {
    configure_logging();
    info!("Starting {PROGRAM_NAME}");

    let args = parse_args();
    debug!("{:?}", &args);
    if args.force {
        info!("'--force' specified, all existing output files will be overwritten");
    }

    // A FIT file is turned into two GPX files, one with speed and one with
    // heart rate. They only need to live until we have read them.
    let temp_dir;
    let (track_file, hr_file, hr_required) = if is_fit_file(&args.file) {
        temp_dir = tempfile::tempdir().context("Could not create a temporary directory")?;
        let converted = convert_fit_to_gpx(&args.file, temp_dir.path())?;
        match &args.hr_file {
            Some(hr_file) => (converted.speed_file, Some(hr_file.clone()), true),
            None => (converted.speed_file, Some(converted.hr_file), false),
        }
    } else {
        (args.file.clone(), args.hr_file.clone(), true)
    };

    let heart_rate = match &hr_file {
        Some(f) => load_heart_rate(f, hr_required)?,
        None => None,
    };

    let gpx = read_gpx_from_file(&track_file)?;
    map_tracks(&gpx, heart_rate.as_ref(), &args)
}

/// Draws the maps of every track in the file. A bad track does not stop the
/// others from being drawn, but the result is an error if any failed.
fn map_tracks(gpx: &Gpx, heart_rate: Option<&HeartRateTrack>, args: &Args) -> Result<()> {
    let num_tracks = gpx.tracks.len();
    if num_tracks == 0 {
        warn!("No tracks found in {:?}, nothing to do", args.file);
        return Ok(());
    }

    let mut failures = 0;
    for (idx, track) in gpx.tracks.iter().enumerate() {
        let track_number = (num_tracks > 1).then_some(idx + 1);
        if let Err(e) = process_track(track, heart_rate, args, track_number) {
            error!("Track {} of {:?} failed: {:#}", idx + 1, args.file, e);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} of {num_tracks} tracks in {:?} could not be mapped", args.file);
    }

    Ok(())
}

/// Reads the heart rate file. When the file came out of a FIT conversion the
/// activity may simply not have had a heart rate monitor, so a file without
/// heart rate is only an error when the user asked for it.
fn load_heart_rate(hr_file: &Path, required: bool) -> Result<Option<HeartRateTrack>> {
    let gpx = read_gpx_from_file(hr_file)?;
    let source = gpx.filename.clone().unwrap_or_else(|| hr_file.to_owned());
    match gpx.into_heart_rate_track() {
        Ok(hr) => {
            info!("Loaded {} heart rate samples from {:?}", hr.heart_rates.len(), source);
            Ok(Some(hr))
        }
        Err(e) if !required => {
            warn!("No usable heart rate data ({e}), only the speed map will be drawn");
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Could not read heart rate from {:?}", source)),
    }
}

fn process_track(
    track: &Track,
    heart_rate: Option<&HeartRateTrack>,
    args: &Args,
    track_number: Option<usize>,
) -> Result<()> {
    let mut record = track.to_track_record()?;
    if let Some(hr) = heart_rate {
        record = record.with_heart_rate(hr.clone())?;
    }

    if let Some(start) = record.times.first() {
        info!(
            "Track {:?} has {} points over {}, starting at {} (local time {})",
            record.name.as_deref().unwrap_or("unnamed"),
            record.len(),
            format_duration(record.elapsed_seconds()),
            format_utc_date(start)?,
            format_utc_date(&to_local_date(*start))?
        );
    }

    if let (Some(zone_params), Some(hr)) = (args.zone_parameters(), &record.heart_rates) {
        let report = compute_zone_report(hr, &record.times, zone_params)?;
        if report.is_empty() {
            warn!("Not enough heart rate samples for a zone report");
        } else {
            println!("{report}");
        }
    }

    let rof = get_required_outputs(
        &args.file,
        &args.output,
        track_number,
        record.heart_rates.is_some(),
    );
    debug!("{:?}", &rof);

    let params = args.map_parameters();
    write_map(&record, Metric::Speed, &params, &rof.speed_map, args.force)?;
    if let Some(hr_map) = &rof.hr_map {
        write_map(&record, Metric::HeartRate, &params, hr_map, args.force)?;
    }

    Ok(())
}

fn write_map(
    record: &TrackRecord,
    metric: Metric,
    params: &MapParameters,
    output_file: &Path,
    force: bool,
) -> Result<()> {
    if output_file.exists() && !force {
        info!(
            "{:?} already exists, skipping (use '--force' to overwrite)",
            output_file
        );
        return Ok(());
    }

    let doc = build_map(record, metric, params)?;
    write_map_to_file(output_file, &doc)
}

fn configure_logging() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder.format(|buf, record| {
        let color = match record.level() {
            log::Level::Error => AnsiColor::Red,
            log::Level::Warn => AnsiColor::Yellow,
            log::Level::Info => AnsiColor::Green,
            log::Level::Debug => AnsiColor::Blue,
            log::Level::Trace => AnsiColor::Magenta,
        };
        let level_style = buf
            .default_level_style(record.level())
            .fg_color(Some(color.into()));

        let location = match (record.file(), record.line()) {
            (Some(file), Some(line)) => format!(" {file}/{line}"),
            (Some(file), None) => format!(" {file}"),
            _ => String::new(),
        };

        writeln!(
            buf,
            "[{} {level_style}{}{level_style:#}{}] {}",
            buf.timestamp(),
            record.level(),
            location,
            record.args()
        )
    });

    builder.init();
}
