//! Conversion of binary FIT files to GPX by running gpsbabel.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result};
use log::{debug, info};
use logging_timer::time;

use crate::error::TrackMapError;

/// The environment variable that can be used to point at a gpsbabel binary
/// that is not on the PATH.
pub const GPSBABEL_ENV: &str = "TRACKMAP_GPSBABEL";

/// The two GPX files made from one FIT file.
#[derive(Debug, Clone)]
pub struct ConvertedFit {
    /// A GPX with a <speed> on every trackpoint.
    pub speed_file: PathBuf,
    /// A GPX with the Garmin extensions, which is where the heart rate is.
    pub hr_file: PathBuf,
}

/// Returns true if the file looks like a FIT file, based on its extension.
pub fn is_fit_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("fit"))
}

/// Returns the gpsbabel program to run.
pub fn gpsbabel_program() -> OsString {
    std::env::var_os(GPSBABEL_ENV).unwrap_or_else(|| "gpsbabel".into())
}

/// Converts `fit_file` into a speed GPX and a heart rate GPX inside
/// `output_dir`. Each run of gpsbabel blocks until it exits.
#[time]
pub fn convert_fit_to_gpx<P: AsRef<Path>, D: AsRef<Path>>(
    fit_file: P,
    output_dir: D,
) -> Result<ConvertedFit> {
    let fit_file = fit_file.as_ref();
    let output_dir = output_dir.as_ref();
    let converted = ConvertedFit {
        speed_file: output_dir.join("speed.gpx"),
        hr_file: output_dir.join("hr.gpx"),
    };

    let program = gpsbabel_program();
    info!("Converting {:?} to GPX using {:?}", fit_file, program);

    run_gpsbabel(
        &program,
        &speed_args(fit_file, &converted.speed_file),
        &converted.speed_file,
    )?;
    run_gpsbabel(
        &program,
        &hr_args(fit_file, &converted.hr_file),
        &converted.hr_file,
    )?;

    Ok(converted)
}

/// gpsbabel arguments for a GPX with computed speed on every trackpoint.
pub fn speed_args(fit_file: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-t".into(),
        "-i".into(),
        "garmin_fit".into(),
        "-x".into(),
        "track,speed".into(),
        "-f".into(),
        fit_file.into(),
        "-o".into(),
        "gpx".into(),
        "-F".into(),
        output.into(),
    ]
}

/// gpsbabel arguments for a GPX that keeps the Garmin extensions.
pub fn hr_args(fit_file: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-t".into(),
        "-i".into(),
        "garmin_fit".into(),
        "-f".into(),
        fit_file.into(),
        "-o".into(),
        "gpx,garminextensions".into(),
        "-F".into(),
        output.into(),
    ]
}

/// Runs a conversion tool to completion. A non-zero exit, or an output file
/// that is missing or empty afterwards, is an error.
pub fn run_gpsbabel(program: &OsString, args: &[OsString], expected_output: &Path) -> Result<()> {
    let tool = program.to_string_lossy().into_owned();
    debug!("Running {} {:?}", tool, args);

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {tool}, is it installed?"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TrackMapError::ExternalToolFailure {
            tool,
            status: output.status,
        })
        .with_context(|| format!("stderr: {}", stderr.trim()));
    }

    let len = std::fs::metadata(expected_output)
        .map(|m| m.len())
        .unwrap_or_default();
    if len == 0 {
        return Err(TrackMapError::ExternalToolNoOutput {
            tool,
            output: expected_output.display().to_string(),
        }
        .into());
    }

    debug!("{} wrote {} bytes to {:?}", tool, len, expected_output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_fit_extension() {
        assert!(is_fit_file("ride.fit"));
        assert!(is_fit_file("/tmp/RIDE.FIT"));
        assert!(!is_fit_file("ride.gpx"));
        assert!(!is_fit_file("fit"));
    }

    #[test]
    fn arguments_match_gpsbabel_usage() {
        let args = speed_args(Path::new("a.fit"), Path::new("/tmp/speed.gpx"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into()).collect();
        assert_eq!(
            args.join(" "),
            "-t -i garmin_fit -x track,speed -f a.fit -o gpx -F /tmp/speed.gpx"
        );

        let args = hr_args(Path::new("a.fit"), Path::new("/tmp/hr.gpx"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into()).collect();
        assert_eq!(
            args.join(" "),
            "-t -i garmin_fit -f a.fit -o gpx,garminextensions -F /tmp/hr.gpx"
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_gpsbabel(&"false".into(), &[], &dir.path().join("out.gpx")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackMapError>(),
            Some(TrackMapError::ExternalToolFailure { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn success_without_output_is_a_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_gpsbabel(&"true".into(), &[], &dir.path().join("out.gpx")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackMapError>(),
            Some(TrackMapError::ExternalToolNoOutput { .. })
        ));
    }

    #[test]
    fn missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_gpsbabel(
            &"trackmap-no-such-program".into(),
            &[],
            &dir.path().join("out.gpx"),
        );
        assert!(result.is_err());
    }
}
