use anyhow::{bail, Result};
use quick_xml::{events::Event, Reader};

use crate::model::Gpx;

use super::{track::parse_track, XmlReaderExtensions};

/// Parses the contents of the 'gpx' element. Only tracks are of interest,
/// metadata, waypoints and routes are skipped.
pub(crate) fn parse_gpx(xml_reader: &mut Reader<&[u8]>) -> Result<Gpx> {
    let mut gpx = Gpx::default();

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"trk" => {
                    let track = parse_track(xml_reader)?;
                    gpx.tracks.push(track);
                }
                _ => xml_reader.skip_element(&e)?,
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"gpx" => {
                    return Ok(gpx);
                }
                _ => (),
            },
            Ok(Event::Eof) => {
                bail!("Reached EOF unexpectedly. File is probably corrupt.");
            }
            Err(e) => bail!("Error at position {}: {:?}", xml_reader.error_position(), e),
            _ => (),
        }
    }
}
