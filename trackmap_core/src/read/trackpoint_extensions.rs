use anyhow::{bail, Result};
use quick_xml::{events::Event, Reader};

use super::XmlReaderExtensions;

/// Parses the 'extensions' element of a trackpoint, returning the heart rate
/// from the Garmin TrackPointExtension
/// (https://www8.garmin.com/xmlschemas/TrackPointExtensionv1.xsd) if there is
/// one. Namespace prefixes vary between writers so only local names are
/// compared.
pub(crate) fn parse_trackpoint_extensions(xml_reader: &mut Reader<&[u8]>) -> Result<Option<f64>> {
    let mut heart_rate = None;

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"TrackPointExtension" => { /* ignore, just a container element */ }
                b"hr" => {
                    heart_rate = Some(xml_reader.read_inner_as()?);
                }
                _ => xml_reader.skip_element(&e)?,
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"extensions" => {
                    return Ok(heart_rate);
                }
                _ => { /* ignore, just the closing tags */ }
            },
            Ok(Event::Eof) => bail!("Reached EOF inside an 'extensions' element"),
            Err(e) => bail!("Error at position {}: {:?}", xml_reader.error_position(), e),
            // Ignore spurious Event::Text, I think they are newlines.
            _ => {}
        }
    }
}
