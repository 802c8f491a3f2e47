//! CDN geo-bypass proxy
//!
//! Rewrites URL fields in upstream payloads into same-origin proxy links
//! and relays the real media server-side, preserving HTTP range-request
//! semantics so video seeking keeps working behind the proxy.

pub mod relay;
pub mod rewrite;

pub use relay::{relay_fetch, RelayError, Relayed};
pub use rewrite::{percent_encode, proxy_url, rewrite_urls};
