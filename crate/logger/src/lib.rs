//! Logging bootstrap for the `xml_cache` workspace.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to binaries and tests, which call [`log_init`].

pub use log_utils::log_init;

mod log_utils;
