//! Application state shared across handlers.

use std::sync::Arc;

use crate::adapter::Adapter;
use crate::backend::Backend;
use crate::config::RegionConfig;
use crate::region::{RegionCache, SystemClock};

/// Routing adapter over the configured backend.
pub type StoreAdapter = Adapter<Backend>;

/// Region cache over the configured backend.
pub type Regions = RegionCache<Backend, SystemClock>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// data store, the routing adapter and the region cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    backend: Backend,
    adapter: StoreAdapter,
    regions: Regions,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `backend` - Data store selected at startup
    /// * `region` - Region resolution settings
    #[must_use]
    pub fn new(backend: Backend, region: &RegionConfig) -> Self {
        let adapter = Adapter::new(backend.clone());
        let regions = RegionCache::new(backend.clone(), SystemClock, region);

        Self {
            inner: Arc::new(AppStateInner {
                backend,
                adapter,
                regions,
            }),
        }
    }

    /// Get a reference to the data store.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    /// Get a reference to the routing adapter.
    #[must_use]
    pub fn adapter(&self) -> &StoreAdapter {
        &self.inner.adapter
    }

    /// Get a reference to the region cache.
    #[must_use]
    pub fn regions(&self) -> &Regions {
        &self.inner.regions
    }
}
