#![allow(clippy::single_match)]

use std::{borrow::Cow, path::Path, str::FromStr};

use anyhow::{bail, Context, Result};
use gpx::parse_gpx;
use log::info;
use logging_timer::time;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use time::{format_description::well_known, OffsetDateTime};

use crate::{error::TrackMapError, model::Gpx};

mod gpx;
mod track;
mod track_segment;
mod trackpoint_extensions;
mod waypoint;

/*
<gpx>                          parse_gpx
   <trk>                       parse_track
       <trkseg>                parse_track_segment
           <trkpt>             parse_waypoint
               <extensions>    parse_trackpoint_extensions

Everything else (metadata, waypoints, routes, unknown extensions) is skipped.
*/

/// Reads a GPX file into memory and parses it. The XSD, which defines the
/// format of a GPX file, is at https://www.topografix.com/GPX/1/1/gpx.xsd
#[time]
pub fn read_gpx_from_file<P: AsRef<Path>>(input_file: P) -> Result<Gpx> {
    let input_file = input_file.as_ref();
    info!("Reading GPX file {:?}", input_file);
    let contents = std::fs::read(input_file)
        .with_context(|| format!("Failed to read {:?}", input_file))?;
    let mut gpx = read_gpx_from_slice(&contents)
        .with_context(|| format!("Failed to parse {:?}", input_file))?;
    gpx.filename = Some(input_file.to_owned());
    info!(
        "Read {} tracks with {} trackpoints from {:?}",
        gpx.tracks.len(),
        gpx.num_points(),
        input_file
    );
    Ok(gpx)
}

/// Parses a GPX document held in memory. Any failure is reported as a
/// `TrackMapError::SourceFormat`.
pub fn read_gpx_from_slice(data: &[u8]) -> Result<Gpx> {
    let xml_reader = Reader::from_reader(data);
    read_gpx_from_reader(xml_reader)
        .map_err(|e| TrackMapError::SourceFormat(format!("{e:#}")).into())
}

fn read_gpx_from_reader(mut xml_reader: Reader<&[u8]>) -> Result<Gpx> {
    let mut gpx: Option<Gpx> = None;

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"gpx" => {
                    gpx = Some(parse_gpx(&mut xml_reader)?);
                }
                e => bail!("Unexpected Start element {:?}", xml_reader.bytes_to_cow(e)?),
            },
            Ok(Event::Eof) => {
                // We should already have consumed the closing '</gpx>' tag in parse_gpx().
                // So the next thing will be EOF.
                return gpx.context("Did not find the 'gpx' element");
            }
            Err(e) => bail!("Error at position {}: {:?}", xml_reader.error_position(), e),
            _ => (),
        }
    }
}

pub(crate) trait XmlReaderConversions {
    fn bytes_to_cow<'a, 'b>(&'a self, bytes: &'b [u8]) -> Result<Cow<'b, str>>;
}

impl<R> XmlReaderConversions for Reader<R> {
    #[inline]
    fn bytes_to_cow<'a, 'b>(&'a self, bytes: &'b [u8]) -> Result<Cow<'b, str>> {
        Ok(self.decoder().decode(bytes)?)
    }
}

pub(crate) trait XmlReaderExtensions {
    fn read_inner_as_string(&mut self) -> Result<String>;
    fn read_inner_as_time(&mut self) -> Result<OffsetDateTime>;
    fn read_inner_as<T: FromStr>(&mut self) -> Result<T>;
    fn skip_element(&mut self, start: &BytesStart<'_>) -> Result<()>;
}

impl XmlReaderExtensions for Reader<&[u8]> {
    #[inline]
    fn read_inner_as_string(&mut self) -> Result<String> {
        match self.read_event() {
            Ok(Event::Text(text)) => {
                let s = text.unescape()?;
                Ok(s.trim().to_owned())
            }
            e => bail!(
                "Got unexpected XML element {:?} (was expecting Event::Text), this is either a bug or the document is corrupt",
                e
            ),
        }
    }

    #[inline]
    fn read_inner_as_time(&mut self) -> Result<OffsetDateTime> {
        let t = self.read_inner_as_string()?;
        Ok(OffsetDateTime::parse(&t, &well_known::Rfc3339)
            .with_context(|| format!("Could not parse {t:?} as an RFC 3339 time"))?)
    }

    #[inline]
    fn read_inner_as<T: FromStr>(&mut self) -> Result<T> {
        let t = self.read_inner_as_string()?;

        match t.parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => bail!("Could not parse {} into {}", t, std::any::type_name::<T>()),
        }
    }

    /// Consumes everything up to and including the matching end tag.
    #[inline]
    fn skip_element(&mut self, start: &BytesStart<'_>) -> Result<()> {
        let end = start.to_end().into_owned();
        self.read_to_end(end.name())?;
        Ok(())
    }
}

/// Reads a mandatory attribute from a tag and parses it.
pub(crate) fn read_attribute_as<T: FromStr>(tag: &BytesStart<'_>, key: &str) -> Result<T> {
    let attr = tag
        .try_get_attribute(key)?
        .with_context(|| format!("Mandatory attribute '{key}' is missing"))?;
    let value = attr.unescape_value()?;

    match value.trim().parse::<T>() {
        Ok(v) => Ok(v),
        Err(_) => bail!(
            "Could not parse attribute '{key}' value {value} into {}",
            std::any::type_name::<T>()
        ),
    }
}
