//! Transit data models, types, and traits.

pub mod fares;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use fares::{Fare, FareCategory, FarePeriod, FareSchedule, WeekdayFlags};
pub use traits::{Route, TransitProvider, TransitStop};
pub use types::{Result, RouteMode, ServiceArea, TransitError};
