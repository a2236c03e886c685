use std::{io::Write, path::Path};

use anyhow::Result;

use crate::model::{DestinationRecord, GeoPoint, RouteStop};
use crate::store::CatalogStore;

#[derive(Debug, Clone, serde::Serialize)]
struct CatalogExport {
    routes: Vec<RouteExport>,
    destinations: Vec<DestinationRecord>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct RouteExport {
    id: i64,
    title: String,
    summary: String,
    category: String,
    fare_min: f64,
    fare_max: f64,
    coordinates: Vec<GeoPoint>,
    stops: Vec<RouteStop>,
}

/// Writes the whole catalog as one pretty-printed JSON document for the map
/// and list collaborators.
pub async fn export_catalog(store: &CatalogStore, output_path: &Path) -> Result<()> {
    let mut result = CatalogExport {
        routes: vec![],
        destinations: store.destinations().await?,
    };

    for route in store.routes().await? {
        let stops = store.stops_for_route(route.id).await?;
        result.routes.push(RouteExport {
            id: route.id,
            title: route.title,
            summary: route.summary,
            category: route.category,
            fare_min: route.fare_min,
            fare_max: route.fare_max,
            coordinates: route.coordinates,
            stops,
        });
    }

    log::info!(
        "Exporting {} routes and {} destinations to {:?}",
        result.routes.len(),
        result.destinations.len(),
        output_path
    );
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(serde_json::to_string_pretty(&result)?.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DestinationSeed, RouteRecord};
    use tempfile::TempDir;

    #[tokio::test]
    async fn export_contains_routes_with_their_stops() {
        let store = CatalogStore::open_in_memory().await.unwrap();
        store
            .upsert_route(&RouteRecord {
                id: 1,
                title: "Daraga - Legazpi".to_string(),
                fare_min: 13.0,
                fare_max: 15.0,
                summary: "A jeepney route.".to_string(),
                category: "Jeepney".to_string(),
                coordinates: vec![GeoPoint::new(13.10, 123.70), GeoPoint::new(13.11, 123.71)],
                is_active: true,
            })
            .await
            .unwrap();
        store
            .replace_stops(
                1,
                &[RouteStop {
                    route_id: 1,
                    stop_order: 0,
                    name: "Terminal".to_string(),
                    description: String::new(),
                    location: GeoPoint::new(13.10, 123.70),
                    is_start: true,
                    is_end: true,
                }],
            )
            .await
            .unwrap();
        store
            .insert_destination(&DestinationSeed {
                name: "Cagsawa Ruins".to_string(),
                description: "Historic ruins".to_string(),
                category: "Tourist".to_string(),
                location: GeoPoint::new(13.14, 123.71),
                is_popular: true,
            })
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("catalog.json");
        export_catalog(&store, &output).await.unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["routes"][0]["id"], 1);
        assert_eq!(value["routes"][0]["stops"][0]["name"], "Terminal");
        assert_eq!(value["routes"][0]["coordinates"][0]["lat"], 13.10);
        assert_eq!(value["destinations"][0]["name"], "Cagsawa Ruins");
    }
}
