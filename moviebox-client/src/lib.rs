//! MovieBox upstream API client
//!
//! Wraps the MovieBox catalog/streaming service: session-cookie handling,
//! mirror-host fallback, response classification and one typed method per
//! upstream endpoint.

pub mod classify;
pub mod client;
pub mod error;
pub mod hosts;
pub mod session;

pub use client::{MovieBoxClient, SubjectType};
pub use error::MovieBoxError;
pub use hosts::MirrorHosts;
pub use session::CookieStore;
