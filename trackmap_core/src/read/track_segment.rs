use anyhow::{bail, Result};
use quick_xml::{events::Event, Reader};

use crate::model::TrackSegment;

use super::{waypoint::parse_waypoint, waypoint::waypoint_from_tag, XmlReaderExtensions};

pub(crate) fn parse_track_segment(xml_reader: &mut Reader<&[u8]>) -> Result<TrackSegment> {
    let mut segment = TrackSegment::default();

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"trkpt" => {
                    let point = parse_waypoint(&e, xml_reader)?;
                    segment.points.push(point);
                }
                _ => xml_reader.skip_element(&e)?,
            },
            // A trackpoint with nothing but a position.
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"trkpt" => {
                    segment.points.push(waypoint_from_tag(&e)?);
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"trkseg" => {
                    return Ok(segment);
                }
                _ => {}
            },
            Ok(Event::Eof) => bail!("Reached EOF inside a 'trkseg' element"),
            Err(e) => bail!("Error at position {}: {:?}", xml_reader.error_position(), e),
            // Ignore spurious Event::Text, I think they are newlines.
            _ => {}
        }
    }
}
