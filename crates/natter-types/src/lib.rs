//! Wire-level data model for the Convore JSON API.
//!
//! Everything here mirrors what the server actually sends. No I/O — the
//! client crate owns transport and caching.

pub mod api;
pub mod models;
