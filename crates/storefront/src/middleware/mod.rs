//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (correlation id on span, Sentry scope and response)
//! 4. Region redirect (country-prefixed page paths)

pub mod region;
pub mod request_id;

pub use region::{RegionDecision, bypasses_resolution, decide, region_redirect_middleware};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
