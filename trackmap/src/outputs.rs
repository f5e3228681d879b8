use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// The map files to write for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredOutputFiles {
    pub speed_map: PathBuf,
    /// Only written when the track has heart rate data.
    pub hr_map: Option<PathBuf>,
}

/// Works out the output filenames. The extension of the input file is
/// replaced by a role suffix and the output name, so 'ride.gpx' with an
/// output of 'map.html' gives 'ride-map.html', or 'ride-speed-map.html' and
/// 'ride-hr-map.html' when there is heart rate. When the input holds more
/// than one track the track number is added too ('ride-2-speed-map.html')
/// so the tracks do not overwrite each other.
pub fn get_required_outputs(
    input_file: &Path,
    output: &str,
    track_number: Option<usize>,
    with_heart_rate: bool,
) -> RequiredOutputFiles {
    let mut stem = input_file.with_extension("").into_os_string();
    if let Some(n) = track_number {
        stem.push(format!("-{n}"));
    }

    let make = |role: Option<&str>| {
        let mut name: OsString = stem.clone();
        if let Some(role) = role {
            name.push(format!("-{role}"));
        }
        name.push("-");
        name.push(output);
        PathBuf::from(name)
    };

    if with_heart_rate {
        RequiredOutputFiles {
            speed_map: make(Some("speed")),
            hr_map: Some(make(Some("hr"))),
        }
    } else {
        RequiredOutputFiles {
            speed_map: make(None),
            hr_map: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_map_without_heart_rate() {
        let rof = get_required_outputs(Path::new("rides/ride.gpx"), "map.html", None, false);
        assert_eq!(rof.speed_map, PathBuf::from("rides/ride-map.html"));
        assert_eq!(rof.hr_map, None);
    }

    #[test]
    fn role_suffixes_with_heart_rate() {
        let rof = get_required_outputs(Path::new("ride.fit"), "out.html", None, true);
        assert_eq!(rof.speed_map, PathBuf::from("ride-speed-out.html"));
        assert_eq!(rof.hr_map, Some(PathBuf::from("ride-hr-out.html")));
    }

    #[test]
    fn track_number_keeps_tracks_apart() {
        let rof = get_required_outputs(Path::new("ride.gpx"), "map.html", Some(2), true);
        assert_eq!(rof.speed_map, PathBuf::from("ride-2-speed-map.html"));
        assert_eq!(rof.hr_map, Some(PathBuf::from("ride-2-hr-map.html")));
    }
}
