use std::io::BufRead;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::model::{GeoPoint, ParsedRoute, PlacemarkAnnotation};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("could not read document: {0}")]
    Read(#[from] std::io::Error),
    #[error("malformed markup: {0}")]
    Markup(#[from] quick_xml::Error),
    #[error("document contains no path geometry")]
    NoPathGeometry,
}

/// Geometry container the cursor is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum GeometryScope {
    #[default]
    None,
    Path,
    Point,
}

/// Child element whose character data is pending.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum TextTarget {
    #[default]
    None,
    Name,
    Description,
    Coordinates,
}

/// Name/description captured for the placemark currently open, before its
/// geometry decides whether it becomes a stop marker.
#[derive(Debug, Default)]
struct ItemDraft {
    name: String,
    description: String,
}

pub fn parse_file(path: &Path) -> Result<ParsedRoute, ParseError> {
    let file = std::fs::File::open(path)?;
    parse_route(std::io::BufReader::new(file))
}

/// Parses a KML-style geo-markup document in a single forward pass.
///
/// Path container (`LineString`) coordinates are concatenated, in document
/// order, into the route's dense path. Point container (`Point`) coordinates
/// become labeled stop markers when the enclosing placemark carries a name.
/// A document without any path geometry is a failure, not an empty route.
pub fn parse_route<R: BufRead>(reader: R) -> Result<ParsedRoute, ParseError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut builder = RouteBuilder::default();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => builder.open(e.local_name().as_ref()),
            Event::Text(ref t) => builder.text(t.unescape()?.into_owned()),
            Event::CData(ref t) => builder.text(String::from_utf8_lossy(t.as_ref()).into_owned()),
            Event::End(ref e) => builder.close(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    builder.finish()
}

/// Accumulates the document while tracking nesting context explicitly, so
/// overlapping or malformed nesting cannot confuse scope resolution.
#[derive(Debug, Default)]
struct RouteBuilder {
    doc_name: String,
    doc_description: String,
    coordinates: Vec<GeoPoint>,
    annotations: Vec<PlacemarkAnnotation>,
    item: Option<ItemDraft>,
    geometry: GeometryScope,
    target: TextTarget,
}

impl RouteBuilder {
    fn open(&mut self, element: &[u8]) {
        match element {
            b"Placemark" => self.item = Some(ItemDraft::default()),
            b"LineString" => self.geometry = GeometryScope::Path,
            b"Point" => self.geometry = GeometryScope::Point,
            b"name" => self.target = TextTarget::Name,
            b"description" => self.target = TextTarget::Description,
            b"coordinates" => self.target = TextTarget::Coordinates,
            _ => {}
        }
    }

    fn close(&mut self, element: &[u8]) {
        match element {
            b"Placemark" => self.item = None,
            b"LineString" | b"Point" => self.geometry = GeometryScope::None,
            _ => {}
        }
        self.target = TextTarget::None;
    }

    fn text(&mut self, text: String) {
        match self.target {
            // First occurrence wins in each scope: the open placemark if its
            // slot is still unset, otherwise the document.
            TextTarget::Name => match self.item.as_mut() {
                Some(draft) if draft.name.is_empty() => draft.name = text,
                _ => {
                    if self.doc_name.is_empty() {
                        self.doc_name = text;
                    }
                }
            },
            TextTarget::Description => match self.item.as_mut() {
                Some(draft) if draft.description.is_empty() => draft.description = text,
                _ => {
                    if self.doc_description.is_empty() {
                        self.doc_description = text;
                    }
                }
            },
            TextTarget::Coordinates => self.coordinates_text(&text),
            TextTarget::None => {}
        }
    }

    fn coordinates_text(&mut self, text: &str) {
        match self.geometry {
            GeometryScope::Path => self.coordinates.extend(parse_coordinate_list(text)),
            GeometryScope::Point => {
                // A point marker is kept only when its placemark is named.
                let point = parse_coordinate_list(text).into_iter().next();
                if let (Some(location), Some(draft)) = (point, self.item.as_ref()) {
                    if !draft.name.is_empty() {
                        self.annotations.push(PlacemarkAnnotation {
                            name: draft.name.clone(),
                            description: draft.description.clone(),
                            location,
                        });
                    }
                }
            }
            GeometryScope::None => {}
        }
    }

    fn finish(self) -> Result<ParsedRoute, ParseError> {
        if self.coordinates.is_empty() {
            return Err(ParseError::NoPathGeometry);
        }
        Ok(ParsedRoute {
            name: non_empty_or(self.doc_name, "Unnamed Route"),
            description: non_empty_or(self.doc_description, "No description"),
            coordinates: self.coordinates,
            annotations: self.annotations,
        })
    }
}

/// Parses a whitespace-separated list of `lng,lat[,alt]` tokens. Tokens that
/// fail numeric parsing are dropped; altitude is ignored. Note the axis swap:
/// the markup stores longitude first, the catalog stores latitude first.
fn parse_coordinate_list(text: &str) -> Vec<GeoPoint> {
    let mut points = Vec::new();
    for token in text.split_whitespace() {
        let mut parts = token.split(',');
        let lng = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
        let lat = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
        if let (Some(lng), Some(lat)) = (lng, lat) {
            points.push(GeoPoint::new(lat, lng));
        }
    }
    points
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(document: &str) -> Result<ParsedRoute, ParseError> {
        parse_route(document.as_bytes())
    }

    #[test]
    fn parses_line_string_with_axis_swap() {
        let route = parse(
            r#"<kml><Document><name>Test Route</name><description>A test.</description>
            <Placemark><LineString><coordinates>
                123.70,13.10 123.71,13.11
            </coordinates></LineString></Placemark>
            </Document></kml>"#,
        )
        .unwrap();

        assert_eq!(route.name, "Test Route");
        assert_eq!(route.description, "A test.");
        assert_eq!(
            route.coordinates,
            vec![GeoPoint::new(13.10, 123.70), GeoPoint::new(13.11, 123.71)]
        );
    }

    #[test]
    fn drops_malformed_tokens_without_aborting() {
        let route = parse(
            r#"<kml><Placemark><LineString><coordinates>
                123.70,13.10 not,valid 123.71,13.11
            </coordinates></LineString></Placemark></kml>"#,
        )
        .unwrap();

        assert_eq!(
            route.coordinates,
            vec![GeoPoint::new(13.10, 123.70), GeoPoint::new(13.11, 123.71)]
        );
    }

    #[test]
    fn ignores_altitude_component() {
        let route = parse(
            r#"<kml><Placemark><LineString><coordinates>
                123.70,13.10,24.0 123.71,13.11,25.5
            </coordinates></LineString></Placemark></kml>"#,
        )
        .unwrap();

        assert_eq!(route.coordinates.len(), 2);
        assert_eq!(route.coordinates[0], GeoPoint::new(13.10, 123.70));
    }

    #[test]
    fn concatenates_multiple_path_containers_in_order() {
        let route = parse(
            r#"<kml>
            <Placemark><LineString><coordinates>123.70,13.10</coordinates></LineString></Placemark>
            <Placemark><LineString><coordinates>123.71,13.11 123.72,13.12</coordinates></LineString></Placemark>
            </kml>"#,
        )
        .unwrap();

        assert_eq!(
            route.coordinates,
            vec![
                GeoPoint::new(13.10, 123.70),
                GeoPoint::new(13.11, 123.71),
                GeoPoint::new(13.12, 123.72),
            ]
        );
    }

    #[test]
    fn named_point_becomes_annotation() {
        let route = parse(
            r#"<kml><Document><name>Route</name>
            <Placemark><LineString><coordinates>123.70,13.10 123.71,13.11</coordinates></LineString></Placemark>
            <Placemark><name>Terminal</name><description>Main stop</description>
                <Point><coordinates>123.705,13.105 123.9,13.9</coordinates></Point>
            </Placemark>
            </Document></kml>"#,
        )
        .unwrap();

        assert_eq!(route.annotations.len(), 1);
        let stop = &route.annotations[0];
        assert_eq!(stop.name, "Terminal");
        assert_eq!(stop.description, "Main stop");
        // Only the first valid token of a point container is used.
        assert_eq!(stop.location, GeoPoint::new(13.105, 123.705));
    }

    #[test]
    fn unnamed_point_is_discarded() {
        let route = parse(
            r#"<kml>
            <Placemark><LineString><coordinates>123.70,13.10</coordinates></LineString></Placemark>
            <Placemark><Point><coordinates>123.705,13.105</coordinates></Point></Placemark>
            </kml>"#,
        )
        .unwrap();

        assert!(route.annotations.is_empty());
    }

    #[test]
    fn first_name_wins_in_each_scope() {
        let route = parse(
            r#"<kml><Document><name>First</name><name>Second</name>
            <Placemark><name>Stop A</name><name>Stop B</name>
                <Point><coordinates>123.70,13.10</coordinates></Point>
            </Placemark>
            <Placemark><LineString><coordinates>123.70,13.10</coordinates></LineString></Placemark>
            </Document></kml>"#,
        )
        .unwrap();

        assert_eq!(route.name, "First");
        assert_eq!(route.annotations[0].name, "Stop A");
    }

    #[test]
    fn missing_name_and_description_fall_back() {
        let route = parse(
            r#"<kml><Placemark><LineString>
            <coordinates>123.70,13.10 123.71,13.11</coordinates>
            </LineString></Placemark></kml>"#,
        )
        .unwrap();

        assert_eq!(route.name, "Unnamed Route");
        assert_eq!(route.description, "No description");
    }

    #[test]
    fn cdata_description_is_captured() {
        let route = parse(
            r#"<kml><Document><name>Route</name>
            <description><![CDATA[Via <b>Washington Drive</b>]]></description>
            <Placemark><LineString><coordinates>123.70,13.10</coordinates></LineString></Placemark>
            </Document></kml>"#,
        )
        .unwrap();

        assert_eq!(route.description, "Via <b>Washington Drive</b>");
    }

    #[test]
    fn document_without_path_geometry_is_an_error() {
        let result = parse(
            r#"<kml><Document><name>Stops only</name>
            <Placemark><name>A</name><Point><coordinates>123.70,13.10</coordinates></Point></Placemark>
            </Document></kml>"#,
        );

        assert!(matches!(result, Err(ParseError::NoPathGeometry)));
    }

    #[test]
    fn point_coordinates_do_not_leak_into_the_path() {
        let route = parse(
            r#"<kml>
            <Placemark><name>Stop</name><Point><coordinates>120.0,10.0</coordinates></Point></Placemark>
            <Placemark><LineString><coordinates>123.70,13.10 123.71,13.11</coordinates></LineString></Placemark>
            </kml>"#,
        )
        .unwrap();

        assert_eq!(route.coordinates.len(), 2);
        assert_eq!(route.coordinates[0], GeoPoint::new(13.10, 123.70));
    }

    #[test]
    fn namespaced_elements_are_recognized() {
        let route = parse(
            r#"<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2">
            <kml:Document><kml:name>Spaced</kml:name>
            <kml:Placemark><kml:LineString>
            <kml:coordinates>123.70,13.10 123.71,13.11</kml:coordinates>
            </kml:LineString></kml:Placemark>
            </kml:Document></kml:kml>"#,
        )
        .unwrap();

        assert_eq!(route.name, "Spaced");
        assert_eq!(route.coordinates.len(), 2);
    }
}
