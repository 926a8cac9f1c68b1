//! Kruuse storefront library.
//!
//! Region-aware storefront service: a routing adapter that maps the
//! `/store/{resource}[/{id}]` vocabulary onto data store tables, and a
//! region cache that resolves the country context of each request.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod adapter;
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod region;
pub mod routes;
pub mod services;
pub mod state;
