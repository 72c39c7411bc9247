pub mod artifacts;
pub mod config;

#[cfg(feature = "logging")]
pub mod logging;
