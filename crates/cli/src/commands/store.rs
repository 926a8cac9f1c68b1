//! Store diagnostics commands: `smoke`, `regions` and `fetch`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use kruuse_core::{CountryCode, CurrencyCode, RegionId};
use kruuse_storefront::adapter::{Adapter, FetchOptions, StoreMethod};
use kruuse_storefront::region::{CountryHints, RegionCache, SystemClock};
use kruuse_storefront::services::adapter_report;

/// Parse a `key=value` query argument.
///
/// # Errors
///
/// Returns a message if there is no `=` or the key is empty.
pub fn parse_query_pair(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected key=value, got {arg:?}")),
    }
}

#[allow(clippy::print_stdout)]
fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the adapter checks and print the report. Fails if any check failed.
///
/// # Errors
///
/// Returns an error if the store cannot be configured or a check failed.
pub async fn smoke() -> Result<(), Box<dyn std::error::Error>> {
    let (_, backend) = super::connect().await?;
    let report = adapter_report(&Adapter::new(backend)).await;
    print_json(&report)?;

    if report.success {
        Ok(())
    } else {
        Err(format!("{} of {} checks failed", report.summary.failed, report.summary.total).into())
    }
}

#[derive(Serialize)]
struct RegionEntry {
    region_id: RegionId,
    name: String,
    currency_code: CurrencyCode,
}

#[derive(Serialize)]
struct RegionsOutput {
    /// Country a request without hints resolves to.
    resolved_default: CountryCode,
    countries: BTreeMap<CountryCode, RegionEntry>,
}

/// Print the country to region map as the storefront would resolve it.
///
/// # Errors
///
/// Returns an error if the store cannot be configured or the map can't be built.
pub async fn regions() -> Result<(), Box<dyn std::error::Error>> {
    let (config, backend) = super::connect().await?;
    let cache = RegionCache::new(backend, SystemClock, &config.region);

    let map = cache.region_map().await?;
    let resolved_default = cache.resolve(&CountryHints::default()).await?;

    let countries = map
        .iter()
        .map(|(code, region)| {
            let entry = RegionEntry {
                region_id: region.id.clone(),
                name: region.name.clone(),
                currency_code: region.currency_code.clone(),
            };
            (code.clone(), entry)
        })
        .collect();

    print_json(&RegionsOutput {
        resolved_default,
        countries,
    })?;
    Ok(())
}

/// Send one request through the store adapter and print the document.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the adapter fails.
pub async fn fetch(
    method: &str,
    path: &str,
    query: Vec<(String, String)>,
    body: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let method: StoreMethod = method.parse()?;
    let options = FetchOptions {
        query: query.into_iter().collect(),
        body: body.map(serde_json::from_str::<Value>).transpose()?,
    };

    let (_, backend) = super::connect().await?;
    let document = Adapter::new(backend).fetch(method, path, &options).await?;
    print_json(&document)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_pair() {
        assert_eq!(
            parse_query_pair("region_id=reg_cl").unwrap(),
            ("region_id".to_owned(), "reg_cl".to_owned())
        );
        assert_eq!(
            parse_query_pair("q=a=b").unwrap(),
            ("q".to_owned(), "a=b".to_owned())
        );
        assert!(parse_query_pair("limit").is_err());
        assert!(parse_query_pair("=3").is_err());
    }
}
