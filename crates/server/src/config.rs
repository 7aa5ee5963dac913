use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use metro_transit::planner::PlannerConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "metro-server",
    version,
    about = "Adelaide Metro trip planning and live vehicle API",
    long_about = "Serves stop lookups, route listings, live vehicle positions and trip \
                  plans under /adelaide-metro/api.\n\n\
                  The stop and route catalog is loaded once at startup. Live vehicles \
                  are pushed in by the feed collector through PUT /vehicles/snapshot."
)]
pub struct Config {
    /// Stop and route catalog (JSON)
    #[arg(long, env = "METRO_CATALOG", default_value = "data/adelaide-metro.json")]
    pub catalog: PathBuf,

    /// Load the catalog from a GTFS static feed (zip or directory) instead
    #[cfg(feature = "gtfs")]
    #[arg(long, env = "METRO_GTFS")]
    pub gtfs: Option<String>,

    /// Address to listen on
    #[arg(long, env = "METRO_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "FLASK_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Most itineraries returned per plan
    #[arg(long, env = "METRO_MAX_ITINERARIES", default_value_t = 3)]
    pub max_itineraries: usize,

    /// Wait added at every transfer, in minutes
    #[arg(long, env = "METRO_TRANSFER_WAIT_MINUTES", default_value_t = 5)]
    pub transfer_wait_minutes: u32,

    /// Longest walk allowed between two transfer stops, in meters
    #[arg(long, env = "METRO_MAX_TRANSFER_WALK_METERS", default_value_t = 300.0)]
    pub max_transfer_walk_meters: f64,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_itineraries: self.max_itineraries,
            transfer_wait_minutes: self.transfer_wait_minutes,
            max_transfer_walk_m: self.max_transfer_walk_meters,
            ..PlannerConfig::default()
        }
    }
}
