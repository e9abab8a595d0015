//! URL handling module for Site-Pulse
//!
//! Link resolution and the internal/external host policy shared by the
//! page extractor and the crawl engine. Both sides must produce identical
//! URL strings, otherwise cross-page link analysis sees phantom targets.

mod host;
mod resolve;

pub use host::{extract_host, is_internal, origin_of};
pub use resolve::{parse_http_url, resolve_canonical, resolve_href};
