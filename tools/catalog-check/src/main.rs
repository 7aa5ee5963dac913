use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use metro_transit::{FareCategory, PlanOutcome, StaticTransitProvider, TransitProvider, TransitService, TripQuery};
use std::path::PathBuf;
use std::sync::Arc;

mod checks;
mod output;

use checks::{check_catalog, route_length_m};
use output::write_catalog_geojson;

#[derive(Parser, Debug)]
#[command(
    name = "catalog-check",
    author,
    version,
    about = "Validate an Adelaide Metro stop and route catalog",
    long_about = "Loads a catalog the same way the API server does, reports stops and routes \
                  that would produce poor plans, and optionally plans a trip or exports the \
                  network as GeoJSON for inspection on a map."
)]
struct Args {
    /// Catalog JSON file
    #[arg(short, long, default_value = "data/adelaide-metro.json")]
    catalog: PathBuf,

    /// Load stops and routes from a GTFS feed directory instead
    #[cfg(feature = "gtfs")]
    #[arg(long)]
    gtfs: Option<String>,

    /// Origin stop id or name for a sample plan
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Destination stop id or name for a sample plan
    #[arg(long, requires = "from")]
    to: Option<String>,

    /// Departure time for the sample plan, `YYYY-MM-DDTHH:MM`
    #[arg(long, value_parser = parse_departure)]
    at: Option<NaiveDateTime>,

    /// Fare category for the sample plan (regular or concession)
    #[arg(long, default_value = "regular", value_parser = parse_category)]
    category: FareCategory,

    /// Write stops and routes to this GeoJSON file
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Exit with an error when any check reports a warning
    #[arg(long)]
    strict: bool,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_departure(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM: {e}"))
}

fn parse_category(value: &str) -> Result<FareCategory, String> {
    FareCategory::parse(value).ok_or_else(|| format!("unknown fare category {value:?}"))
}

fn load(args: &Args) -> Result<StaticTransitProvider> {
    #[cfg(feature = "gtfs")]
    if let Some(feed) = &args.gtfs {
        log::info!("Input: GTFS feed {feed}");
        return StaticTransitProvider::from_gtfs(feed).context("Failed to load GTFS feed");
    }

    log::info!("Input: {}", args.catalog.display());
    if !args.catalog.exists() {
        bail!("Catalog file does not exist: {}", args.catalog.display());
    }
    StaticTransitProvider::load(&args.catalog).context("Failed to load catalog")
}

fn print_plan(outcome: &PlanOutcome) {
    match outcome {
        PlanOutcome::NoRouteFound => println!("No route found"),
        PlanOutcome::AlreadyThere(_) => println!("Origin and destination are the same stop"),
        PlanOutcome::Itineraries(itineraries) => {
            for (n, itinerary) in itineraries.iter().enumerate() {
                println!(
                    "Option {}: {} min, {} transfer(s), {:.0} m walking, ${:.2} {}",
                    n + 1,
                    itinerary.total_time_minutes,
                    itinerary.transfer_count,
                    itinerary.walking_distance_m,
                    itinerary.fare.dollars(),
                    itinerary.fare.period.as_str()
                );
                for leg in &itinerary.legs {
                    println!(
                        "  {} -> {}  {:<7} {:<16} {} to {}",
                        leg.departure.format("%H:%M"),
                        leg.arrival.format("%H:%M"),
                        leg.kind.as_str(),
                        leg.route_name.as_deref().unwrap_or("-"),
                        leg.from_name,
                        leg.to_name
                    );
                }
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    log::info!("=== Catalog Check ===");

    let provider = Arc::new(load(&args)?);
    log::info!("Loaded {} stops and {} routes", provider.stop_count(), provider.route_count());

    for route in provider.all_routes() {
        log::debug!(
            "  {} {:<20} {:>3} stops {:>6.1} km",
            route.mode().as_str(),
            route.name(),
            route.stop_sequence().len(),
            route_length_m(provider.as_ref(), route.as_ref()) / 1000.0
        );
    }

    let report = check_catalog(provider.as_ref());
    for warning in &report.warnings {
        log::warn!("  {warning}");
    }
    if report.is_clean() {
        log::info!("No problems found");
    } else {
        log::info!("{} warning(s)", report.warnings.len());
    }

    if let Some(path) = &args.geojson {
        write_catalog_geojson(provider.as_ref(), path)?;
    }

    if let (Some(from), Some(to)) = (&args.from, &args.to) {
        let departure = args.at.unwrap_or_else(|| chrono::Local::now().naive_local());
        let service = TransitService::new(provider.clone());
        let query = TripQuery::new(from.as_str(), to.as_str(), departure).with_category(args.category);

        log::info!("Planning {from} -> {to} at {}", departure.format("%Y-%m-%d %H:%M"));
        let outcome = service.plan_trip(&query).context("Failed to plan trip")?;
        print_plan(&outcome);
    }

    if args.strict && !report.is_clean() {
        bail!("{} catalog warning(s)", report.warnings.len());
    }

    Ok(())
}
