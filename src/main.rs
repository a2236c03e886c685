use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod export;
mod import;
mod kml;
mod model;
mod simplify;
mod store;

#[derive(Parser, Debug)]
#[command(name = "route-catalog", version, about = "Versioned route catalog built from geo-markup documents")]
struct Cli {
    /// Path to the catalog database.
    #[arg(long, default_value = "catalog.sqlite")]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synchronize the catalog with the compiled-in route manifest.
    Sync {
        /// Directory holding the geo-markup source documents.
        #[arg(long, default_value = "assets/kml")]
        assets: PathBuf,
        /// Leave the catalog stale when any manifest entry fails to import,
        /// so the next run retries the full rebuild.
        #[arg(long)]
        strict: bool,
    },
    /// Write the catalog as a JSON document for the map collaborators.
    Export {
        #[arg(long, default_value = "catalog.json")]
        output: PathBuf,
    },
    /// List the routes currently in the catalog.
    Routes {
        /// Only routes in this category.
        #[arg(long)]
        category: Option<String>,
        /// Only routes whose title or summary matches.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one route with its stops, as handed to the map renderer.
    Show { route_id: i64 },
    /// List the seeded destinations.
    Destinations {
        /// Only popular destinations.
        #[arg(long)]
        popular: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let cli = Cli::parse();
    let store = store::CatalogStore::shared(&cli.database).await?;

    match cli.command {
        Command::Sync { assets, strict } => {
            let policy = if strict {
                import::SyncPolicy::RetryOnPartial
            } else {
                import::SyncPolicy::AdvanceOnPartial
            };
            let catalog = config::CatalogConfig::compiled();
            let report = import::synchronize(store, &catalog, &assets, policy).await?;
            print_report(&report);
        }
        Command::Export { output } => {
            export::export_catalog(store, &output).await?;
        }
        Command::Routes { category, search } => {
            let routes = match (category, search) {
                (Some(category), _) => store.routes_by_category(&category).await?,
                (None, Some(query)) => store.search_routes(&query).await?,
                (None, None) => store.routes().await?,
            };
            for route in routes {
                println!(
                    "{:>3}  {} [{}] {} points, fare {:.0}-{:.0}",
                    route.id,
                    route.title,
                    route.category,
                    route.coordinates.len(),
                    route.fare_min,
                    route.fare_max
                );
            }
        }
        Command::Show { route_id } => match store.route_by_id(route_id).await? {
            Some(route) => {
                println!("{} [{}]", route.title, route.category);
                println!("{}", route.summary);
                println!(
                    "fare {:.2}-{:.2}, {} path points",
                    route.fare_min,
                    route.fare_max,
                    route.coordinates.len()
                );
                for stop in store.stops_for_route(route.id).await? {
                    let marker = if stop.is_start {
                        "start"
                    } else if stop.is_end {
                        "end"
                    } else {
                        "stop"
                    };
                    println!(
                        "  {marker:>5}  {} ({:.5}, {:.5})",
                        stop.name, stop.location.lat, stop.location.lng
                    );
                }
            }
            // The only per-route condition that surfaces to a person.
            None => println!("No route with id {route_id} in the catalog"),
        },
        Command::Destinations { popular } => {
            let destinations = if popular {
                store.popular_destinations().await?
            } else {
                store.destinations().await?
            };
            for destination in destinations {
                println!(
                    "{:>3}  {} [{}] ({:.5}, {:.5})",
                    destination.id,
                    destination.name,
                    destination.category,
                    destination.location.lat,
                    destination.location.lng
                );
            }
        }
    }

    Ok(())
}

fn print_report(report: &import::SyncReport) {
    if !report.rebuilt {
        println!("Catalog already at version {}", report.previous_version);
        return;
    }

    for outcome in &report.outcomes {
        match &outcome.status {
            import::EntryStatus::Imported {
                raw_points,
                kept_points,
            } => println!(
                "imported route {:>3} from {} ({kept_points}/{raw_points} points)",
                outcome.route_id, outcome.source_file
            ),
            import::EntryStatus::Skipped(reason) => println!(
                "skipped  route {:>3} from {} ({reason})",
                outcome.route_id, outcome.source_file
            ),
        }
    }
    if report.version_advanced {
        println!("Catalog rebuilt at version {}", report.target_version);
    } else {
        println!(
            "Catalog left at version {} ({} entries skipped)",
            report.previous_version,
            report.skipped()
        );
    }
}
