use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }
}

/// One parsed geo-markup document: the dense path plus any labeled stop markers.
#[derive(Debug, Clone)]
pub struct ParsedRoute {
    pub name: String,
    pub description: String,
    pub coordinates: Vec<GeoPoint>,
    pub annotations: Vec<PlacemarkAnnotation>,
}

/// A labeled point embedded in the source document, distinct from the path itself.
#[derive(Debug, Clone)]
pub struct PlacemarkAnnotation {
    pub name: String,
    pub description: String,
    pub location: GeoPoint,
}

/// One route to import. The manifest of these is compiled into the importer;
/// `route_id` is stable across catalog versions.
#[derive(Debug, Clone)]
pub struct RouteConfigEntry {
    pub source_file: String,
    pub route_id: i64,
    pub category: String,
    pub fare_min: f64,
    pub fare_max: f64,
    pub title_override: Option<String>,
    pub summary_override: Option<String>,
}

/// The persisted, catalog-visible route. Created or fully replaced during a
/// rebuild, never partially mutated.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRecord {
    pub id: i64,
    pub title: String,
    pub fare_min: f64,
    pub fare_max: f64,
    pub summary: String,
    pub category: String,
    pub coordinates: Vec<GeoPoint>,
    pub is_active: bool,
}

/// A persisted stop along a route, derived from the document's point markers.
#[derive(Debug, Clone, Serialize)]
pub struct RouteStop {
    pub route_id: i64,
    pub stop_order: i64,
    pub name: String,
    pub description: String,
    pub location: GeoPoint,
    pub is_start: bool,
    pub is_end: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DestinationRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: GeoPoint,
    pub is_popular: bool,
}

/// A point-of-interest to seed into the catalog during a rebuild.
#[derive(Debug, Clone)]
pub struct DestinationSeed {
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: GeoPoint,
    pub is_popular: bool,
}
