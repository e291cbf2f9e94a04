//! HTTP posting fetcher.
//!
//! hh.ru vacancy links are resolved through the public `api.hh.ru` JSON API;
//! other allowed hosts are fetched as HTML and reduced to text.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::html::html_to_text;
use super::{FetchOutcome, PostingFetcher, is_allowed_host};

static HH_VACANCY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/vacancy/(\d+)").expect("valid regex"));

const USER_AGENT: &str = concat!("resume-pipeline/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct HhVacancy {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    employer: Option<HhEmployer>,
    #[serde(default)]
    key_skills: Vec<HhSkill>,
}

#[derive(Debug, Deserialize)]
struct HhEmployer {
    name: String,
}

#[derive(Debug, Deserialize)]
struct HhSkill {
    name: String,
}

impl HhVacancy {
    fn into_text(self) -> String {
        let description = html_to_text(&self.description);
        if description.is_empty() && self.key_skills.is_empty() {
            return String::new();
        }

        let mut out = self.name;
        if let Some(employer) = self.employer {
            out.push_str(&format!("\n{}", employer.name));
        }
        if !description.is_empty() {
            out.push_str(&format!("\n\n{description}"));
        }
        if !self.key_skills.is_empty() {
            let skills: Vec<String> = self.key_skills.into_iter().map(|s| s.name).collect();
            out.push_str(&format!("\n\nKey skills: {}", skills.join(", ")));
        }
        out
    }
}

/// `reqwest`-backed fetcher with a domain allow-list.
pub struct HttpPostingFetcher {
    client: reqwest::Client,
    domains: Vec<String>,
    hh_api_base: String,
}

impl HttpPostingFetcher {
    pub fn new(domains: Vec<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            domains,
            hh_api_base: "https://api.hh.ru".to_string(),
        }
    }

    /// Override the hh.ru API base URL.
    pub fn with_hh_api_base(mut self, base: impl Into<String>) -> Self {
        self.hh_api_base = base.into();
        self
    }

    async fn fetch_hh_vacancy(&self, vacancy_id: &str) -> FetchOutcome {
        let url = format!("{}/vacancies/{vacancy_id}", self.hh_api_base);
        let resp = match self
            .client
            .get(&url)
            .header("HH-User-Agent", USER_AGENT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return FetchOutcome::FetchError(e.to_string()),
        };

        if !resp.status().is_success() {
            return FetchOutcome::FetchError(format!("hh.ru API returned {}", resp.status()));
        }

        match resp.json::<HhVacancy>().await {
            Ok(vacancy) => non_empty(vacancy.into_text()),
            Err(e) => FetchOutcome::FetchError(format!("invalid hh.ru API response: {e}")),
        }
    }

    async fn fetch_html(&self, url: reqwest::Url) -> FetchOutcome {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return FetchOutcome::FetchError(e.to_string()),
        };

        if !resp.status().is_success() {
            return FetchOutcome::FetchError(format!("page returned {}", resp.status()));
        }

        match resp.text().await {
            Ok(body) => non_empty(html_to_text(&body)),
            Err(e) => FetchOutcome::FetchError(e.to_string()),
        }
    }
}

fn non_empty(text: String) -> FetchOutcome {
    if text.trim().is_empty() {
        FetchOutcome::Empty
    } else {
        FetchOutcome::Text(text)
    }
}

/// Extract the vacancy id from an hh.ru vacancy URL.
fn hh_vacancy_id(url: &reqwest::Url) -> Option<String> {
    let host = url.host_str()?;
    if !is_allowed_host(host, &["hh.ru".to_string(), "hh.kz".to_string()]) {
        return None;
    }
    HH_VACANCY_PATH
        .captures(url.path())
        .map(|c| c[1].to_string())
}

#[async_trait]
impl PostingFetcher for HttpPostingFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let parsed = match reqwest::Url::parse(url.trim()) {
            Ok(u) => u,
            Err(e) => return FetchOutcome::FetchError(format!("invalid URL: {e}")),
        };

        let Some(host) = parsed.host_str() else {
            return FetchOutcome::UnsupportedDomain;
        };
        if !is_allowed_host(host, &self.domains) {
            tracing::debug!(host, "Posting host not on allow-list");
            return FetchOutcome::UnsupportedDomain;
        }

        match hh_vacancy_id(&parsed) {
            Some(id) => self.fetch_hh_vacancy(&id).await,
            None => self.fetch_html(parsed).await,
        }
    }
}
