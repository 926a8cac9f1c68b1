//! Time-boxed cache of the country → region map.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use kruuse_core::CountryCode;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::CountryHints;
use super::model::Region;
use crate::backend::{BackendError, DataStore};
use crate::config::RegionConfig;

/// Age after which the region map is refetched before use.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(3600);

/// Fetch attempts per refresh.
const MAX_REFRESH_ATTEMPTS: u32 = 2;

/// Pause between refresh attempts.
const REFRESH_BACKOFF: Duration = Duration::from_millis(100);

/// Why the region map could not be produced.
///
/// Cloneable so callers queued behind a failed refresh receive its outcome.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// The region fetch failed.
    #[error("region fetch failed: {0}")]
    Backend(#[source] Arc<BackendError>),

    /// The region fetch did not finish in time.
    #[error("region fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The store returned no regions with countries.
    #[error("no regions found")]
    NoRegions,
}

impl From<BackendError> for ResolutionError {
    fn from(err: BackendError) -> Self {
        Self::Backend(Arc::new(err))
    }
}

/// Wall-clock time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where regions (with their countries) come from.
pub trait RegionSource: Send + Sync {
    fn fetch_regions(&self) -> impl Future<Output = Result<Vec<Region>, BackendError>> + Send;
}

impl<S: DataStore> RegionSource for S {
    async fn fetch_regions(&self) -> Result<Vec<Region>, BackendError> {
        let result = self.select(&Region::select()).await?;

        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| match Region::from_row(row) {
                Ok(region) => Some(region),
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid region");
                    None
                }
            })
            .collect())
    }
}

/// Snapshot of lower-cased ISO-2 country code → region.
///
/// Keys are ordered, so the "first available" region is the one owning the
/// lexicographically smallest country code.
#[derive(Debug, Clone)]
pub struct RegionMap {
    regions: BTreeMap<CountryCode, Arc<Region>>,
    refreshed_at: DateTime<Utc>,
}

impl RegionMap {
    /// Index regions by each of their countries.
    ///
    /// A country listed under two regions keeps the later region.
    #[must_use]
    pub fn build(regions: Vec<Region>, refreshed_at: DateTime<Utc>) -> Self {
        let mut map = BTreeMap::new();
        for region in regions {
            let region = Arc::new(region);
            for code in region.country_codes() {
                if let Some(previous) = map.insert(code.clone(), Arc::clone(&region)) {
                    warn!(
                        country = %code,
                        previous = %previous.id,
                        region = %region.id,
                        "Country assigned to more than one region"
                    );
                }
            }
        }

        Self {
            regions: map,
            refreshed_at,
        }
    }

    #[must_use]
    pub fn get(&self, code: &CountryCode) -> Option<&Arc<Region>> {
        self.regions.get(code)
    }

    #[must_use]
    pub fn contains(&self, code: &CountryCode) -> bool {
        self.regions.contains_key(code)
    }

    /// The smallest country code in the map.
    #[must_use]
    pub fn first_code(&self) -> Option<&CountryCode> {
        self.regions.keys().next()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[must_use]
    pub const fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    /// Country codes with their regions, in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&CountryCode, &Arc<Region>)> {
        self.regions.iter()
    }

    /// Pick the effective country code.
    ///
    /// Priority: path segment, geo headers (in order), `default`, then the
    /// first key. Hints only count when they key a known region.
    #[must_use]
    pub fn resolve(&self, hints: &CountryHints, default: &CountryCode) -> Option<CountryCode> {
        hints
            .path
            .iter()
            .chain(&hints.geo)
            .chain(std::iter::once(default))
            .find(|code| self.contains(code))
            .or_else(|| self.first_code())
            .cloned()
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        // A refresh stamped in the future (clock stepped back) counts as fresh
        (now - self.refreshed_at)
            .to_std()
            .map_or(true, |age| age < FRESHNESS_WINDOW)
    }
}

/// Process-wide region cache.
///
/// Reads are served from the current snapshot while it is fresh. A stale
/// or missing snapshot is refreshed under a single-flight gate, so
/// concurrent callers share one fetch. Callers that queued behind a failed
/// refresh get that refresh's error instead of starting another one.
#[derive(Debug)]
pub struct RegionCache<S, C = SystemClock> {
    source: S,
    clock: C,
    default_region: CountryCode,
    refresh_timeout: Duration,
    snapshot: RwLock<Option<Arc<RegionMap>>>,
    /// Holds the error of the last refresh if it failed.
    refresh_gate: Mutex<Option<ResolutionError>>,
    /// Completed refreshes, successful or not.
    refreshes: AtomicU64,
}

impl<S: RegionSource, C: Clock> RegionCache<S, C> {
    #[must_use]
    pub fn new(source: S, clock: C, config: &RegionConfig) -> Self {
        Self {
            source,
            clock,
            default_region: config.default_region.clone(),
            refresh_timeout: config.refresh_timeout,
            snapshot: RwLock::new(None),
            refresh_gate: Mutex::new(None),
            refreshes: AtomicU64::new(0),
        }
    }

    /// The configured fallback country.
    #[must_use]
    pub const fn default_region(&self) -> &CountryCode {
        &self.default_region
    }

    /// The current region map, refreshed first if empty or stale.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if a needed refresh fails. A stale snapshot
    /// is never returned in that case.
    pub async fn region_map(&self) -> Result<Arc<RegionMap>, ResolutionError> {
        if let Some(map) = self.fresh_snapshot().await {
            return Ok(map);
        }

        let seen = self.refreshes.load(Ordering::Acquire);
        let mut last_failure = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(map) = self.fresh_snapshot().await {
            debug!("Region map refreshed by concurrent request");
            return Ok(map);
        }
        if self.refreshes.load(Ordering::Acquire) != seen {
            if let Some(err) = last_failure.as_ref() {
                debug!(error = %err, "Region map refresh failed for concurrent request");
                return Err(err.clone());
            }
        }

        let result = self.refresh().await;
        *last_failure = result.as_ref().err().cloned();
        self.refreshes.fetch_add(1, Ordering::Release);
        result
    }

    /// Resolve the effective country code for a request.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if the region map cannot be populated.
    pub async fn resolve(&self, hints: &CountryHints) -> Result<CountryCode, ResolutionError> {
        let map = self.region_map().await?;
        map.resolve(hints, &self.default_region)
            .ok_or(ResolutionError::NoRegions)
    }

    async fn fresh_snapshot(&self) -> Option<Arc<RegionMap>> {
        let now = self.clock.now();
        self.snapshot
            .read()
            .await
            .as_ref()
            .filter(|map| map.is_fresh(now))
            .map(Arc::clone)
    }

    #[instrument(skip(self), fields(timeout = ?self.refresh_timeout))]
    async fn refresh(&self) -> Result<Arc<RegionMap>, ResolutionError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once().await {
                Ok(map) => {
                    let map = Arc::new(map);
                    *self.snapshot.write().await = Some(Arc::clone(&map));
                    info!(countries = map.len(), attempt, "Region map refreshed");
                    return Ok(map);
                }
                Err(ResolutionError::NoRegions) => {
                    warn!("Region refresh returned no regions");
                    return Err(ResolutionError::NoRegions);
                }
                Err(e) if attempt < MAX_REFRESH_ATTEMPTS => {
                    warn!(error = %e, attempt, "Region refresh failed, retrying");
                    tokio::time::sleep(REFRESH_BACKOFF).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "Region refresh failed");
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<RegionMap, ResolutionError> {
        let regions = tokio::time::timeout(self.refresh_timeout, self.source.fetch_regions())
            .await
            .map_err(|_| ResolutionError::Timeout(self.refresh_timeout))??;

        let map = RegionMap::build(regions, self.clock.now());
        if map.is_empty() {
            return Err(ResolutionError::NoRegions);
        }
        Ok(map)
    }
}
