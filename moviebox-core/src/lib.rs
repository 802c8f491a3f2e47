//! Shared foundation for the MovieBox gateway
//!
//! Configuration loading, logging bootstrap and resilience policy used by
//! the client, proxy and API crates.

pub mod config;
pub mod logging;
pub mod resilience;

pub use config::Config;
