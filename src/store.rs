use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::sync::OnceCell;

use crate::model::{DestinationRecord, DestinationSeed, GeoPoint, RouteRecord, RouteStop};

const VERSION_KEY: &str = "catalog_version";

static SHARED: OnceCell<CatalogStore> = OnceCell::const_new();

/// The persistent route/destination catalog, backed by SQLite.
///
/// Coordinate sequences are stored as JSON text in a single column; the
/// catalog is small and the UI consumes whole geometries at once.
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Process-wide shared instance, created once on first use. Concurrent
    /// callers observe the same store rather than racing to build it.
    pub async fn shared(path: &Path) -> Result<&'static CatalogStore> {
        SHARED.get_or_try_init(|| CatalogStore::open(path)).await
    }

    pub async fn open(path: &Path) -> Result<CatalogStore> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = CatalogStore { pool };
        store.create_schema().await?;
        Ok(store)
    }

    /// In-memory catalog for tests. Limited to a single connection so every
    /// query sees the same database.
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<CatalogStore> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = CatalogStore { pool };
        store.create_schema().await?;
        Ok(store)
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                fare_min REAL NOT NULL,
                fare_max REAL NOT NULL,
                summary TEXT NOT NULL,
                category TEXT NOT NULL,
                coordinates TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS route_stops (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                route_id INTEGER NOT NULL REFERENCES routes(id) ON DELETE CASCADE,
                stop_order INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                is_start INTEGER NOT NULL DEFAULT 0,
                is_end INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS destinations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                is_popular INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS catalog_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The persisted catalog version; 0 when the catalog has never been built.
    pub async fn version(&self) -> Result<i64> {
        let row = sqlx::query("SELECT value FROM catalog_meta WHERE key = ?")
            .bind(VERSION_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<i64, _>("value")).unwrap_or(0))
    }

    pub async fn set_version(&self, version: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO catalog_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(VERSION_KEY)
        .bind(version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_catalog(&self) -> Result<()> {
        sqlx::query("DELETE FROM route_stops").execute(&self.pool).await?;
        sqlx::query("DELETE FROM routes").execute(&self.pool).await?;
        sqlx::query("DELETE FROM destinations").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert-or-replace by route id. An update keeps the row in place so the
    /// stops referencing it are not cascaded away.
    pub async fn upsert_route(&self, route: &RouteRecord) -> Result<()> {
        let coordinates = serde_json::to_string(&route.coordinates)?;
        sqlx::query(
            "INSERT INTO routes (id, title, fare_min, fare_max, summary, category, coordinates, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                fare_min = excluded.fare_min,
                fare_max = excluded.fare_max,
                summary = excluded.summary,
                category = excluded.category,
                coordinates = excluded.coordinates,
                is_active = excluded.is_active",
        )
        .bind(route.id)
        .bind(&route.title)
        .bind(route.fare_min)
        .bind(route.fare_max)
        .bind(&route.summary)
        .bind(&route.category)
        .bind(coordinates)
        .bind(route.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn replace_stops(&self, route_id: i64, stops: &[RouteStop]) -> Result<()> {
        sqlx::query("DELETE FROM route_stops WHERE route_id = ?")
            .bind(route_id)
            .execute(&self.pool)
            .await?;
        for stop in stops {
            sqlx::query(
                "INSERT INTO route_stops
                    (route_id, stop_order, name, description, latitude, longitude, is_start, is_end)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(route_id)
            .bind(stop.stop_order)
            .bind(&stop.name)
            .bind(&stop.description)
            .bind(stop.location.lat)
            .bind(stop.location.lng)
            .bind(stop.is_start)
            .bind(stop.is_end)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn insert_destination(&self, seed: &DestinationSeed) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO destinations (name, description, category, latitude, longitude, is_popular)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&seed.name)
        .bind(&seed.description)
        .bind(&seed.category)
        .bind(seed.location.lat)
        .bind(seed.location.lng)
        .bind(seed.is_popular)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn routes(&self) -> Result<Vec<RouteRecord>> {
        let rows = sqlx::query("SELECT * FROM routes ORDER BY title ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(route_from_row).collect()
    }

    pub async fn route_by_id(&self, id: i64) -> Result<Option<RouteRecord>> {
        let row = sqlx::query("SELECT * FROM routes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(route_from_row).transpose()
    }

    pub async fn routes_by_category(&self, category: &str) -> Result<Vec<RouteRecord>> {
        let rows = sqlx::query("SELECT * FROM routes WHERE category = ? ORDER BY title ASC")
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(route_from_row).collect()
    }

    pub async fn search_routes(&self, query: &str) -> Result<Vec<RouteRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM routes
             WHERE title LIKE '%' || ? || '%' OR summary LIKE '%' || ? || '%'
             ORDER BY title ASC",
        )
        .bind(query)
        .bind(query)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(route_from_row).collect()
    }

    pub async fn stops_for_route(&self, route_id: i64) -> Result<Vec<RouteStop>> {
        let rows = sqlx::query("SELECT * FROM route_stops WHERE route_id = ? ORDER BY stop_order ASC")
            .bind(route_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(stop_from_row).collect())
    }

    pub async fn destinations(&self) -> Result<Vec<DestinationRecord>> {
        let rows = sqlx::query("SELECT * FROM destinations ORDER BY is_popular DESC, name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(destination_from_row).collect())
    }

    pub async fn popular_destinations(&self) -> Result<Vec<DestinationRecord>> {
        let rows = sqlx::query("SELECT * FROM destinations WHERE is_popular = 1 ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(destination_from_row).collect())
    }
}

fn route_from_row(row: &SqliteRow) -> Result<RouteRecord> {
    let coordinates: Vec<GeoPoint> = serde_json::from_str(&row.get::<String, _>("coordinates"))?;
    Ok(RouteRecord {
        id: row.get("id"),
        title: row.get("title"),
        fare_min: row.get("fare_min"),
        fare_max: row.get("fare_max"),
        summary: row.get("summary"),
        category: row.get("category"),
        coordinates,
        is_active: row.get("is_active"),
    })
}

fn stop_from_row(row: &SqliteRow) -> RouteStop {
    RouteStop {
        route_id: row.get("route_id"),
        stop_order: row.get("stop_order"),
        name: row.get("name"),
        description: row.get("description"),
        location: GeoPoint::new(row.get("latitude"), row.get("longitude")),
        is_start: row.get("is_start"),
        is_end: row.get("is_end"),
    }
}

fn destination_from_row(row: &SqliteRow) -> DestinationRecord {
    DestinationRecord {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        location: GeoPoint::new(row.get("latitude"), row.get("longitude")),
        is_popular: row.get("is_popular"),
    }
}
