use std::path::Path;

use anyhow::Result;
use indicatif::ProgressIterator;

use crate::config::CatalogConfig;
use crate::kml::{self, ParseError};
use crate::model::{ParsedRoute, PlacemarkAnnotation, RouteConfigEntry, RouteRecord, RouteStop};
use crate::simplify;
use crate::store::CatalogStore;

/// What to do when some manifest entries could not be imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Mark the catalog current even when entries were skipped. A skipped
    /// source file stays absent until the target version changes again.
    AdvanceOnPartial,
    /// Leave the version counter unadvanced when any entry was skipped, so
    /// the next synchronization retries the full rebuild.
    RetryOnPartial,
}

#[derive(Debug)]
pub struct SyncReport {
    pub previous_version: i64,
    pub target_version: i64,
    pub rebuilt: bool,
    pub version_advanced: bool,
    pub outcomes: Vec<EntryOutcome>,
}

impl SyncReport {
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, EntryStatus::Skipped(_)))
            .count()
    }
}

#[derive(Debug)]
pub struct EntryOutcome {
    pub route_id: i64,
    pub source_file: String,
    pub status: EntryStatus,
}

#[derive(Debug)]
pub enum EntryStatus {
    Imported { raw_points: usize, kept_points: usize },
    Skipped(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("document unreadable: {0}")]
    Unreadable(String),
    #[error("no path geometry in document")]
    NoPathGeometry,
}

impl From<ParseError> for SkipReason {
    fn from(err: ParseError) -> SkipReason {
        match err {
            ParseError::NoPathGeometry => SkipReason::NoPathGeometry,
            other => SkipReason::Unreadable(other.to_string()),
        }
    }
}

/// Synchronizes the catalog with the compiled-in configuration.
///
/// Two states only: when the persisted version already covers the target the
/// call is a no-op, otherwise the catalog is rebuilt from scratch. A failed
/// entry is skipped, logged and reported; a store write failure aborts the
/// run before the version counter is advanced, so the next open retries.
pub async fn synchronize(
    store: &CatalogStore,
    catalog: &CatalogConfig,
    asset_dir: &Path,
    policy: SyncPolicy,
) -> Result<SyncReport> {
    let previous_version = store.version().await?;
    let target_version = catalog.target_version;

    if previous_version >= target_version {
        log::info!("Catalog is current (version {previous_version}), nothing to import");
        return Ok(SyncReport {
            previous_version,
            target_version,
            rebuilt: false,
            version_advanced: false,
            outcomes: vec![],
        });
    }

    log::info!("Rebuilding catalog: version {previous_version} -> {target_version}");
    store.clear_catalog().await?;

    let style = indicatif::ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {human_pos:>7}/{human_len:7} {msg}",
    )
    .unwrap();

    let mut outcomes = Vec::with_capacity(catalog.routes.len());
    for entry in catalog
        .routes
        .iter()
        .progress_with_style(style)
        .with_message("Importing routes.")
        .with_finish(indicatif::ProgressFinish::AndLeave)
    {
        let status = import_entry(store, entry, asset_dir).await?;
        if let EntryStatus::Skipped(reason) = &status {
            log::warn!(
                "Skipping route {} ({}): {reason}",
                entry.route_id,
                entry.source_file
            );
        }
        outcomes.push(EntryOutcome {
            route_id: entry.route_id,
            source_file: entry.source_file.clone(),
            status,
        });
    }

    for seed in &catalog.destinations {
        store.insert_destination(seed).await?;
    }

    let skipped = outcomes
        .iter()
        .filter(|outcome| matches!(outcome.status, EntryStatus::Skipped(_)))
        .count();
    let version_advanced = match policy {
        SyncPolicy::AdvanceOnPartial => true,
        SyncPolicy::RetryOnPartial => skipped == 0,
    };

    if version_advanced {
        // Only now, after every write for this version has been applied.
        store.set_version(target_version).await?;
    } else {
        log::warn!(
            "{skipped} route(s) skipped, catalog stays at version {previous_version} and will retry"
        );
    }

    Ok(SyncReport {
        previous_version,
        target_version,
        rebuilt: true,
        version_advanced,
        outcomes,
    })
}

async fn import_entry(
    store: &CatalogStore,
    entry: &RouteConfigEntry,
    asset_dir: &Path,
) -> Result<EntryStatus> {
    let path = asset_dir.join(&entry.source_file);
    let parsed = match kml::parse_file(&path) {
        Ok(parsed) => parsed,
        Err(err) => return Ok(EntryStatus::Skipped(err.into())),
    };

    let ParsedRoute {
        name,
        description,
        coordinates,
        annotations,
    } = parsed;

    let raw_points = coordinates.len();
    let coordinates = simplify::simplify(&coordinates, simplify::DEFAULT_TOLERANCE);
    let kept_points = coordinates.len();

    let title = entry.title_override.clone().unwrap_or(name);
    let summary = entry.summary_override.clone().unwrap_or(description);

    let record = RouteRecord {
        id: entry.route_id,
        title,
        fare_min: entry.fare_min,
        fare_max: entry.fare_max,
        summary,
        category: entry.category.clone(),
        coordinates,
        is_active: true,
    };
    store.upsert_route(&record).await?;

    let stops = stops_from_annotations(entry.route_id, &annotations);
    store.replace_stops(entry.route_id, &stops).await?;

    log::info!(
        "Imported route {} \"{}\" ({kept_points}/{raw_points} points kept, {} stops)",
        record.id,
        record.title,
        stops.len()
    );
    Ok(EntryStatus::Imported {
        raw_points,
        kept_points,
    })
}

fn stops_from_annotations(route_id: i64, annotations: &[PlacemarkAnnotation]) -> Vec<RouteStop> {
    let last = annotations.len().saturating_sub(1);
    annotations
        .iter()
        .enumerate()
        .map(|(i, annotation)| RouteStop {
            route_id,
            stop_order: i as i64,
            name: annotation.name.clone(),
            description: annotation.description.clone(),
            location: annotation.location,
            is_start: i == 0,
            is_end: i == last,
        })
        .collect()
}
