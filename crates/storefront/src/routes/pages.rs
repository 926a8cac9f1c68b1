//! Storefront page context.
//!
//! Pages are rendered by the front-end; these handlers return the region
//! context a page needs as JSON.

use axum::{
    Json,
    extract::{Path, State},
};
use kruuse_core::{CountryCode, CurrencyCode, RegionId};
use serde::Serialize;
use tracing::warn;

use crate::adapter::RegionDocument;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// One entry of the region picker.
#[derive(Debug, Serialize)]
pub struct RegionChoice {
    pub country_code: CountryCode,
    pub region_id: RegionId,
    pub name: String,
    pub currency_code: CurrencyCode,
}

#[derive(Debug, Serialize)]
pub struct RegionPicker {
    pub default_region: CountryCode,
    pub regions: Vec<RegionChoice>,
}

/// Region context for a country-prefixed page.
#[derive(Debug, Serialize)]
pub struct CountryPage {
    pub country_code: CountryCode,
    pub path: String,
    /// `None` when the region map cannot be loaded.
    pub region: Option<RegionDocument>,
}

/// Countries the storefront can serve, sorted by country code.
pub async fn region_picker(State(state): State<AppState>) -> Json<RegionPicker> {
    let regions = match state.regions().region_map().await {
        Ok(map) => map
            .iter()
            .map(|(code, region)| RegionChoice {
                country_code: code.clone(),
                region_id: region.id.clone(),
                name: region.name.clone(),
                currency_code: region.currency_code.clone(),
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "Region picker served without regions");
            Vec::new()
        }
    };

    Json(RegionPicker {
        default_region: state.regions().default_region().clone(),
        regions,
    })
}

/// Country landing page.
pub async fn country_home(
    State(state): State<AppState>,
    Path(country_code): Path<String>,
) -> Result<Json<CountryPage>> {
    country_context(&state, &country_code, "/".to_owned()).await
}

/// Any page below a country prefix.
pub async fn country_page(
    State(state): State<AppState>,
    Path((country_code, rest)): Path<(String, String)>,
) -> Result<Json<CountryPage>> {
    country_context(&state, &country_code, format!("/{rest}")).await
}

async fn country_context(
    state: &AppState,
    country_code: &str,
    path: String,
) -> Result<Json<CountryPage>> {
    let not_found = || AppError::NotFound(format!("country {country_code}"));
    let code = CountryCode::parse(country_code).map_err(|_| not_found())?;

    let region = match state.regions().region_map().await {
        Ok(map) => {
            let region = map.get(&code).ok_or_else(not_found)?;
            Some(RegionDocument::from(region.as_ref().clone()))
        }
        Err(e) => {
            warn!(error = %e, country = %code, "Serving page without region context");
            None
        }
    };

    Ok(Json(CountryPage {
        country_code: code,
        path,
        region,
    }))
}
