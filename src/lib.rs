//! relaymon - Relay channel health monitor
//!
//! Probes AI-gateway upstream channels end to end: synthesizes minimal
//! provider requests, translates them per provider, prices the answered
//! usage, and disables or re-enables channels based on the outcome.

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod core;
pub mod daemon;
pub mod error;
pub mod relay;
pub mod storage;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{RelayError, Result};
