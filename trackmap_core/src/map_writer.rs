use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use log::info;
use logging_timer::time;
use serde::Serialize;

use crate::{
    byte_counter::ByteCounter,
    model::{LabelDescriptor, MarkerDescriptor, Position},
};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

/// Presentation settings that apply to the whole map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStyle {
    /// Initial zoom level. Also the maximum zoom used when fitting the map to
    /// the track.
    pub zoom: u8,
    pub fill_opacity: f64,
    pub tile_url: String,
    pub attribution: String,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            zoom: 15,
            fill_opacity: 0.2,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            attribution: "&copy; OpenStreetMap contributors".into(),
        }
    }
}

/// An interactive map: circle markers for every trackpoint plus optional
/// text labels. Rendering is done by Leaflet in the browser.
#[derive(Debug, Clone)]
pub struct MapDocument {
    pub title: String,
    pub center: Position,
    /// South-west and north-east corners to fit the view to.
    pub bounds: Option<(Position, Position)>,
    pub markers: Vec<MarkerDescriptor>,
    pub labels: Vec<LabelDescriptor>,
    pub style: MapStyle,
}

/// The part of the document handed to the browser as JSON.
#[derive(Serialize)]
struct MapData<'a> {
    center: Position,
    zoom: u8,
    bounds: Option<[Position; 2]>,
    fill_opacity: f64,
    tile_url: &'a str,
    attribution: &'a str,
    markers: &'a [MarkerDescriptor],
    labels: &'a [LabelDescriptor],
}

/// Writes the map to an HTML file. The file is flushed before returning and
/// closed on every path by drop.
pub fn write_map_to_file<P: AsRef<Path>>(output_file: P, doc: &MapDocument) -> Result<()> {
    let output_file = output_file.as_ref();
    let file =
        File::create(output_file).with_context(|| format!("Failed to create {:?}", output_file))?;
    let w = BufWriter::new(file);
    let mut w = ByteCounter::new(w);
    write_map_to_writer(&mut w, doc)
        .with_context(|| format!("Failed to write {:?}", output_file))?;
    info!(
        "Map file {:?}, {} markers, {} Kb",
        output_file,
        doc.markers.len(),
        w.bytes_written() / 1024
    );
    Ok(())
}

/// Writes the map as a self-contained HTML page.
#[time]
pub fn write_map_to_writer<W: Write>(w: &mut W, doc: &MapDocument) -> Result<()> {
    let data = MapData {
        center: doc.center,
        zoom: doc.style.zoom,
        bounds: doc.bounds.map(|(sw, ne)| [sw, ne]),
        fill_opacity: doc.style.fill_opacity,
        tile_url: &doc.style.tile_url,
        attribution: &doc.style.attribution,
        markers: &doc.markers,
        labels: &doc.labels,
    };

    // A "</script>" inside a string would end the script element early.
    let json = serde_json::to_string(&data)
        .context("Failed to serialize map data")?
        .replace("</", "<\\/");

    write_head(w, &doc.title).context("Failed to write <head> element")?;
    writeln!(w, "<body>")?;
    writeln!(w, "<div id=\"map\"></div>")?;
    writeln!(w, "<script>")?;
    writeln!(w, "const data = {};", json)?;
    w.write_all(SCRIPT.as_bytes())?;
    writeln!(w, "</script>")?;
    writeln!(w, "</body>")?;
    writeln!(w, "</html>")?;

    w.flush()?;
    Ok(())
}

fn write_head<W: Write>(w: &mut W, title: &str) -> Result<()> {
    writeln!(w, "<!DOCTYPE html>")?;
    writeln!(w, "<html>")?;
    writeln!(w, "<head>")?;
    writeln!(w, "<meta charset=\"utf-8\">")?;
    writeln!(
        w,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    )?;
    writeln!(w, "<title>{}</title>", escape_html(title))?;
    writeln!(w, "<link rel=\"stylesheet\" href=\"{}\">", LEAFLET_CSS)?;
    writeln!(w, "<script src=\"{}\"></script>", LEAFLET_JS)?;
    writeln!(w, "<style>")?;
    writeln!(w, "html, body, #map {{ height: 100%; margin: 0; }}")?;
    writeln!(
        w,
        ".trackmap-label {{ font: bold 11px sans-serif; background: rgba(255,255,255,0.8); }}"
    )?;
    writeln!(w, "</style>")?;
    writeln!(w, "</head>")?;
    Ok(())
}

const SCRIPT: &str = r#"const map = L.map('map').setView(data.center, data.zoom);
L.tileLayer(data.tile_url, { maxZoom: 19, attribution: data.attribution }).addTo(map);
for (const m of data.markers) {
  L.circleMarker(m.position, {
    radius: m.radius,
    fill: true,
    fillColor: m.fill_color,
    fillOpacity: data.fill_opacity,
    weight: 0,
  }).bindTooltip(m.tooltip).addTo(map);
}
for (const l of data.labels) {
  L.tooltip({ permanent: true, direction: 'center', className: 'trackmap-label' })
    .setLatLng(l.position)
    .setContent(l.text)
    .addTo(map);
}
if (data.bounds) {
  map.fitBounds(data.bounds, { maxZoom: data.zoom });
}
"#;

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> MapDocument {
        MapDocument {
            title: "Ride <1>".into(),
            center: Position(53.0, -1.5),
            bounds: Some((Position(53.0, -1.5), Position(53.1, -1.4))),
            markers: vec![MarkerDescriptor {
                position: Position(53.0, -1.5),
                radius: 2.5,
                fill_color: "#0d0887".into(),
                tooltip: "10.0 km/h</script>".into(),
            }],
            labels: vec![LabelDescriptor {
                position: Position(53.1, -1.4),
                text: "avg 10.0 km/h".into(),
            }],
            style: MapStyle::default(),
        }
    }

    #[test]
    fn writes_self_contained_html() {
        let mut buf = Vec::new();
        write_map_to_writer(&mut buf, &doc()).unwrap();
        let html = String::from_utf8(buf).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Ride &lt;1&gt;</title>"));
        assert!(html.contains(LEAFLET_JS));
        assert!(html.contains("\"position\":[53.0,-1.5]"));
        assert!(html.contains("\"fill_color\":\"#0d0887\""));
        assert!(html.contains("\"text\":\"avg 10.0 km/h\""));
        assert!(html.contains("\"fill_opacity\":0.2"));
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn writes_file_and_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.html");
        write_map_to_file(&path, &doc()).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("L.circleMarker"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("map.html");
        assert!(write_map_to_file(&path, &doc()).is_err());
    }
}
