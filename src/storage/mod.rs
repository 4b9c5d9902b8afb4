//! Configuration files and application paths.

pub mod config;
pub mod paths;

pub use config::DaemonConfig;
pub use paths::AppPaths;
