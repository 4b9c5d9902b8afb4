//! Core domain logic: endpoint resolution, probe synthesis, pricing,
//! channel health, and fleet orchestration.

pub mod api;
pub mod audit;
pub mod channel;
pub mod endpoint;
pub mod fleet;
pub mod logging;
pub mod policy;
pub mod pricing;
pub mod probe;
pub mod request;
pub mod settings;
pub mod usage;
