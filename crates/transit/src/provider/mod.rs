//! Catalog providers.

#[cfg(feature = "gtfs")]
pub mod gtfs;
pub mod loader;
pub mod static_provider;

pub use loader::CatalogFile;
pub use static_provider::{RouteImpl, StaticTransitProvider, StopImpl};
