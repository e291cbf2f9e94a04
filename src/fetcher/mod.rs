//! Job posting fetching.
//!
//! - `html`: reduce an HTML page to readable text
//! - `http`: `reqwest`-backed fetcher with a domain allow-list

pub mod html;
pub mod http;

pub use http::HttpPostingFetcher;

use async_trait::async_trait;

/// Job sites supported out of the box.
pub const DEFAULT_DOMAINS: &[&str] = &["hh.ru", "hh.kz", "career.habr.com"];

/// Result of fetching a posting. Each variant maps to a distinct user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Extracted posting text (never empty).
    Text(String),
    /// The URL's host is not on the allow-list.
    UnsupportedDomain,
    /// Network or HTTP failure.
    FetchError(String),
    /// The page loaded but had no extractable description.
    Empty,
}

/// Fetches and scrapes a job posting.
#[async_trait]
pub trait PostingFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Check `host` against an allow-list. Subdomains of an allowed domain match.
pub fn is_allowed_host(host: &str, domains: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    domains.iter().any(|d| {
        let d = d.to_ascii_lowercase();
        host == d || host.ends_with(&format!(".{d}"))
    })
}
