//! Storefront services built on the routing adapter.
//!
//! - `diagnostics` - Adapter smoke checks and a raw data store probe
//!   used by `/api/test-adapter`, `/api/test-supabase` and `kruuse smoke`

pub mod diagnostics;

pub use diagnostics::{AdapterReport, CheckOutcome, StoreProbe, adapter_report, probe_store};
