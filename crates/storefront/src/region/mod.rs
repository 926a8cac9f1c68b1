//! Region resolution.
//!
//! Keeps a process-wide map from lower-cased ISO-2 country code to region,
//! refreshed from the data store once it is older than
//! [`FRESHNESS_WINDOW`], and picks the effective country for each request:
//!
//! 1. the country segment already in the path, if it keys a known region
//! 2. a geo-IP header (`x-vercel-ip-country`, then `cf-ipcountry`)
//! 3. the configured default region
//! 4. the smallest known country code
//!
//! Callers treat [`ResolutionError`] as "no decision" and continue serving.

mod cache;
mod hints;
mod model;

pub use cache::{
    Clock, FRESHNESS_WINDOW, RegionCache, RegionMap, RegionSource, ResolutionError, SystemClock,
};
pub use hints::{CountryHints, GEO_HEADERS, path_country};
pub use model::{Country, Region};
