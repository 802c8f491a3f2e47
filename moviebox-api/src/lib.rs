//! MovieBox gateway HTTP surface
//!
//! Thin route handlers over `moviebox-client` and `moviebox-proxy`.

pub mod http;
