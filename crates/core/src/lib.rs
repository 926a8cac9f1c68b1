//! Kruuse Core - Shared domain types.
//!
//! This crate provides the value types used across the Kruuse components:
//! - `storefront` - Region-aware storefront service and routing adapter
//! - `cli` - Operator tooling (env checks, migrations, seeding, smoke tests)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, country codes, prices and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
