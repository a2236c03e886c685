use crate::model::{DestinationSeed, GeoPoint, RouteConfigEntry};

/// Catalog version the compiled-in configuration corresponds to. Bump this
/// whenever the manifest or seed list below changes; the next synchronization
/// then rebuilds the catalog.
pub const TARGET_CATALOG_VERSION: i64 = 3;

/// Everything one catalog version is built from: the route manifest, the
/// destination seeds and the version they together correspond to.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub target_version: i64,
    pub routes: Vec<RouteConfigEntry>,
    pub destinations: Vec<DestinationSeed>,
}

impl CatalogConfig {
    pub fn compiled() -> CatalogConfig {
        CatalogConfig {
            target_version: TARGET_CATALOG_VERSION,
            routes: route_manifest(),
            destinations: destination_seeds(),
        }
    }
}

/// The ordered route manifest. Entries are processed strictly in this order;
/// a later entry with the same route id deliberately replaces an earlier one.
fn route_manifest() -> Vec<RouteConfigEntry> {
    vec![
        entry(
            "route_1_daraga-legazpi-washington.kml",
            1,
            "Jeepney",
            13.0,
            15.0,
            Some("Daraga - Legazpi City (A)"),
            Some("A jeepney route between Daraga and Legazpi City via Washington Drive, returning via Old Albay."),
        ),
        entry(
            "route_2_daraga-legazpi-old-albay.kml",
            2,
            "Jeepney",
            13.0,
            15.0,
            Some("Daraga - Legazpi City (B)"),
            Some("A jeepney route between Daraga and Legazpi City via Old Albay, returning via Washington Drive."),
        ),
        entry(
            "route_3_legazpi-daraga-loop.kml",
            3,
            "Jeepney",
            13.0,
            15.0,
            Some("Legazpi - Daraga Loop"),
            Some("Loop route connecting Legazpi and Daraga."),
        ),
        entry(
            "route_4_malabog-legazpi.kml",
            4,
            "Jeepney",
            13.0,
            15.0,
            Some("Malabog - Legazpi Express"),
            Some("Connects Malabog to Legazpi City via the main highway"),
        ),
        // Title and summary come from the document itself.
        entry("route_5_camalig-legazpi.kml", 5, "Inter-City", 18.0, 22.0, None, None),
    ]
}

fn destination_seeds() -> Vec<DestinationSeed> {
    vec![
        seed("Cagsawa Ruins", "Historic ruins", "Tourist", 13.14, 123.71),
        seed("Pacific Mall Legazpi", "Shopping mall", "Shopping", 13.14, 123.73),
        seed("Embarcadero de Legazpi", "Waterfront lifestyle hub", "Lifestyle", 13.14, 123.74),
        seed("Bicol University", "Premier university", "Education", 13.14, 123.72),
        seed("Mayon Volcano Natural Park", "Natural park", "Nature", 13.25, 123.68),
        seed("Legazpi Boulevard", "Coastal road", "Tourist", 13.15, 123.75),
        seed("Daraga Church", "Historic church", "Religious", 13.15, 123.71),
        seed("Ligñon Hill", "Nature park", "Nature", 13.15, 123.72),
        seed("Quitinday Hills", "Hills", "Nature", 13.18, 123.65),
        seed("Albay Park and Wildlife", "Wildlife park", "Nature", 13.16, 123.73),
    ]
}

fn entry(
    source_file: &str,
    route_id: i64,
    category: &str,
    fare_min: f64,
    fare_max: f64,
    title_override: Option<&str>,
    summary_override: Option<&str>,
) -> RouteConfigEntry {
    RouteConfigEntry {
        source_file: source_file.to_string(),
        route_id,
        category: category.to_string(),
        fare_min,
        fare_max,
        title_override: title_override.map(str::to_string),
        summary_override: summary_override.map(str::to_string),
    }
}

fn seed(name: &str, description: &str, category: &str, lat: f64, lng: f64) -> DestinationSeed {
    DestinationSeed {
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        location: GeoPoint::new(lat, lng),
        is_popular: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn manifest_route_ids_are_unique() {
        let manifest = route_manifest();
        let ids: HashSet<i64> = manifest.iter().map(|entry| entry.route_id).collect();
        assert_eq!(ids.len(), manifest.len());
    }

    #[test]
    fn fare_ranges_are_well_formed() {
        for entry in route_manifest() {
            assert!(entry.fare_min <= entry.fare_max, "route {}", entry.route_id);
        }
    }
}
