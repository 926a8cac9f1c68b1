//! Environment check.
//!
//! Reports every missing required variable with a description, then loads
//! the full storefront configuration so malformed or weak values are caught
//! before the service starts.

use thiserror::Error;
use tracing::{error, info};

use kruuse_storefront::config::StorefrontConfig;

/// A required setting and the variable names that can provide it.
struct Requirement {
    keys: &'static [&'static str],
    description: &'static str,
}

const REQUIRED: &[Requirement] = &[
    Requirement {
        keys: &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"],
        description: "Project URL of the hosted data store (Settings > API in the dashboard)",
    },
    Requirement {
        keys: &["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"],
        description: "Anonymous API key of the hosted data store (Settings > API in the dashboard)",
    },
];

#[derive(Debug, Error)]
pub enum CheckEnvError {
    #[error("{0} required environment variable(s) missing")]
    Missing(usize),

    #[error(transparent)]
    Invalid(#[from] kruuse_storefront::config::ConfigError),
}

fn is_set(key: &str) -> bool {
    std::env::var(key).is_ok_and(|value| !value.is_empty())
}

fn missing<'a>(
    is_set: impl Fn(&str) -> bool,
    requirements: &'a [Requirement],
) -> Vec<&'a Requirement> {
    requirements
        .iter()
        .filter(|requirement| !requirement.keys.iter().any(|key| is_set(key)))
        .collect()
}

/// Check the environment.
///
/// # Errors
///
/// Returns `CheckEnvError` if a required variable is missing or invalid.
pub fn run() -> Result<(), CheckEnvError> {
    dotenvy::dotenv().ok();

    let missing = missing(is_set, REQUIRED);
    if !missing.is_empty() {
        error!("Missing required environment variables:");
        for requirement in &missing {
            error!("  {}", requirement.keys.join(" or "));
            error!("    {}", requirement.description);
        }
        error!(
            "Set these variables in your .env file or environment before starting the storefront."
        );
        return Err(CheckEnvError::Missing(missing.len()));
    }

    let config = StorefrontConfig::from_env()?;
    info!(
        url = %config.supabase.url,
        default_region = %config.region.default_region,
        direct_database = config.database_url.is_some(),
        "Environment OK"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_names_satisfy_requirement() {
        let set = |key: &str| key.starts_with("NEXT_PUBLIC_");
        assert!(missing(set, REQUIRED).is_empty());
    }

    #[test]
    fn test_reports_each_missing_requirement() {
        let set = |key: &str| key == "SUPABASE_URL";
        let missing = missing(set, REQUIRED);

        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].keys[0], "SUPABASE_ANON_KEY");
    }
}
