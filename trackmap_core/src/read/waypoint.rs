use anyhow::{bail, Result};
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::model::Waypoint;

use super::{
    read_attribute_as, trackpoint_extensions::parse_trackpoint_extensions, XmlReaderExtensions,
};

/// Makes a waypoint from the 'lat' and 'lon' attributes of a 'trkpt' tag.
pub(crate) fn waypoint_from_tag(tag: &BytesStart<'_>) -> Result<Waypoint> {
    Ok(Waypoint {
        lat: read_attribute_as(tag, "lat")?,
        lon: read_attribute_as(tag, "lon")?,
        ..Default::default()
    })
}

pub(crate) fn parse_waypoint(
    start: &BytesStart<'_>,
    xml_reader: &mut Reader<&[u8]>,
) -> Result<Waypoint> {
    let mut wp = waypoint_from_tag(start)?;

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"ele" => {
                    wp.ele = Some(xml_reader.read_inner_as()?);
                }
                b"time" => {
                    wp.time = Some(xml_reader.read_inner_as_time()?);
                }
                b"speed" => {
                    wp.speed = Some(xml_reader.read_inner_as()?);
                }
                b"extensions" => {
                    wp.heart_rate = parse_trackpoint_extensions(xml_reader)?;
                }
                _ => xml_reader.skip_element(&e)?,
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"trkpt" => {
                    return Ok(wp);
                }
                _ => {}
            },
            Ok(Event::Eof) => bail!("Reached EOF inside a 'trkpt' element"),
            Err(e) => bail!("Error at position {}: {:?}", xml_reader.error_position(), e),
            // Ignore spurious Event::Text, I think they are newlines.
            _ => {}
        }
    }
}
