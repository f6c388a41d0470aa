// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Job listing scraper
//!
//! Fetches listing pages (or takes literal markup), pulls fields out with
//! CSS selectors and tags every record with a job level.

pub mod sources;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::categorize::{categorize, JobLevel};
use crate::config::ScraperConfig;
use crate::{AgentError, Result};

pub use sources::{Aggregator, ApiSource, ListingSource, PagedSource};

/// Placeholder used when a listing has no title element
pub const NO_TITLE: &str = "No title provided.";
/// Placeholder used when a listing has no description element
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Titles carrying these markers are search-page chrome, not listings
const NOISE_MARKERS: [&str; 2] = ["More results", "Try again"];

/// A scraped job listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub level: JobLevel,
    /// Only filled by listing APIs
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
}

impl JobListing {
    /// Build a listing and tag its level from the title
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let title = title.into();
        let level = categorize(&title);
        Self {
            title,
            description: description.into(),
            company: None,
            location: None,
            url: None,
            level,
            requirements: None,
            qualifications: None,
        }
    }

    /// True when the title is search-page noise rather than a posting
    pub fn is_noise(&self) -> bool {
        NOISE_MARKERS.iter().any(|m| self.title.contains(m))
    }
}

/// What to do with a container that lacks a title or description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Emit the record anyway with a placeholder string
    #[default]
    Placeholder,
    /// Drop the record
    Skip,
}

/// CSS selectors describing one listing layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Element wrapping a single listing
    #[serde(default = "default_container")]
    pub container: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Element whose `href` is the listing URL
    #[serde(default)]
    pub link: Option<String>,
}

fn default_container() -> String { "div.job-listing".to_string() }

/// Parsed form of [`ListingSelectors`]
pub struct CompiledSelectors {
    container: Selector,
    title: Selector,
    description: Selector,
    company: Option<Selector>,
    location: Option<Selector>,
    link: Option<Selector>,
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| AgentError::Selector(css.to_string()))
}

impl ListingSelectors {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            container: default_container(),
            title: title.to_string(),
            description: description.to_string(),
            company: None,
            location: None,
            link: None,
        }
    }

    pub fn compile(&self) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            container: parse_selector(&self.container)?,
            title: parse_selector(&self.title)?,
            description: parse_selector(&self.description)?,
            company: self.company.as_deref().map(parse_selector).transpose()?,
            location: self.location.as_deref().map(parse_selector).transpose()?,
            link: self.link.as_deref().map(parse_selector).transpose()?,
        })
    }
}

/// One place to scrape: a URL to fetch, or markup already in hand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSource {
    pub content: String,
    #[serde(default)]
    pub is_url: bool,
    #[serde(flatten)]
    pub selectors: ListingSelectors,
}

impl ScrapeSource {
    pub fn url(url: &str, selectors: ListingSelectors) -> Self {
        Self { content: url.to_string(), is_url: true, selectors }
    }

    pub fn markup(markup: &str, selectors: ListingSelectors) -> Self {
        Self { content: markup.to_string(), is_url: false, selectors }
    }
}

/// Record shape served by JSON listing APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ApiListing {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub qualifications: String,
}

impl From<ApiListing> for JobListing {
    fn from(api: ApiListing) -> Self {
        let non_empty = |s: String| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        let mut listing = JobListing::new(api.title, api.description);
        listing.requirements = non_empty(api.requirements);
        listing.qualifications = non_empty(api.qualifications);
        listing
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn select_text(parent: ElementRef<'_>, selector: &Selector) -> Option<String> {
    parent.select(selector).next().map(element_text)
}

/// Extract listings from markup.
///
/// Every element matching the container selector yields at most one
/// record. Missing titles or descriptions are handled per `policy`.
pub fn parse_listings(
    markup: &str,
    selectors: &ListingSelectors,
    policy: MissingFieldPolicy,
) -> Result<Vec<JobListing>> {
    let compiled = selectors.compile()?;
    let document = Html::parse_document(markup);
    let mut listings = Vec::new();

    for container in document.select(&compiled.container) {
        let title = select_text(container, &compiled.title);
        let description = select_text(container, &compiled.description);

        let (title, description) = match (title, description, policy) {
            (Some(t), Some(d), _) => (t, d),
            (t, d, MissingFieldPolicy::Placeholder) => (
                t.unwrap_or_else(|| NO_TITLE.to_string()),
                d.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            ),
            (t, _, MissingFieldPolicy::Skip) => {
                debug!("Skipping listing with missing field (title: {:?})", t);
                continue;
            }
        };

        let mut listing = JobListing::new(title, description);
        listing.company = compiled.company.as_ref().and_then(|s| select_text(container, s));
        listing.location = compiled.location.as_ref().and_then(|s| select_text(container, s));
        listing.url = compiled.link.as_ref().and_then(|s| {
            container
                .select(s)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        });
        listings.push(listing);
    }

    debug!("Parsed {} listings", listings.len());
    Ok(listings)
}

/// HTTP scraping client
pub struct Scraper {
    client: Client,
    policy: MissingFieldPolicy,
    page_delay: Duration,
}

impl Scraper {
    /// Create a scraper from configuration
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            policy: config.missing_field_policy,
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    pub fn policy(&self) -> MissingFieldPolicy {
        self.policy
    }

    /// Override the missing-field policy
    pub fn with_policy(mut self, policy: MissingFieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch a page body, failing on non-success status
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!("Fetching URL: {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Scrape a single source
    pub async fn scrape(&self, source: &ScrapeSource) -> Result<Vec<JobListing>> {
        let markup = if source.is_url {
            self.fetch_html(&source.content).await?
        } else {
            source.content.clone()
        };
        parse_listings(&markup, &source.selectors, self.policy)
    }

    /// Walk `?page=1..=max_pages`, stopping at the first failed or empty page
    pub async fn scrape_pages(
        &self,
        url: &str,
        selectors: &ListingSelectors,
        max_pages: u32,
    ) -> Result<Vec<JobListing>> {
        // Validate selectors before touching the network
        selectors.compile()?;
        let mut listings = Vec::new();

        for page in 1..=max_pages {
            if page > 1 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let response = match self.client.get(url).query(&[("page", page)]).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("Failed to retrieve page {}: {}", page, e);
                    break;
                }
            };
            if !response.status().is_success() {
                warn!("Failed to retrieve page {}. Status code: {}", page, response.status());
                break;
            }

            let markup = response.text().await?;
            let found = parse_listings(&markup, selectors, self.policy)?;
            if found.is_empty() {
                info!("No more job listings found on page {}", page);
                break;
            }

            info!("Scraped {} job listings from page {}", found.len(), page);
            listings.extend(found);
        }

        Ok(listings)
    }

    /// Fetch a JSON array of listing objects
    pub async fn fetch_api_listings(&self, url: &str) -> Result<Vec<ApiListing>> {
        debug!("Fetching listing API: {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let listings: Vec<ApiListing> = response.json().await?;
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LISTINGS: &str = r#"
        <html><body>
            <div class="job-listing">
                <h2 class="job-title">Software Engineer</h2>
                <div class="job-description">Develop and maintain software applications.</div>
            </div>
            <div class="job-listing">
                <h2 class="job-title">Data Scientist</h2>
                <div class="job-description">Analyze and interpret complex data sets.</div>
            </div>
        </body></html>
    "#;

    const MISSING_DESCRIPTION: &str = r#"
        <html><body>
            <div class="job-listing">
                <h2 class="job-title">Software Engineer</h2>
                <div class="job-description">Develop and maintain software applications.</div>
            </div>
            <div class="job-listing">
                <h2 class="job-title">Data Scientist</h2>
            </div>
        </body></html>
    "#;

    fn selectors() -> ListingSelectors {
        ListingSelectors::new("h2.job-title", "div.job-description")
    }

    fn test_scraper() -> Scraper {
        let config = ScraperConfig { page_delay_ms: 0, ..ScraperConfig::default() };
        Scraper::new(&config).unwrap()
    }

    #[test]
    fn test_parse_two_listings() {
        let listings = parse_listings(TWO_LISTINGS, &selectors(), MissingFieldPolicy::Placeholder).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].title, "Software Engineer");
        assert_eq!(listings[0].description, "Develop and maintain software applications.");
        assert_eq!(listings[1].title, "Data Scientist");
        assert_eq!(listings[1].description, "Analyze and interpret complex data sets.");
    }

    #[test]
    fn test_missing_description_placeholder() {
        let listings =
            parse_listings(MISSING_DESCRIPTION, &selectors(), MissingFieldPolicy::Placeholder).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].title, "Data Scientist");
        assert_eq!(listings[1].description, NO_DESCRIPTION);
    }

    #[test]
    fn test_missing_description_skip() {
        let listings = parse_listings(MISSING_DESCRIPTION, &selectors(), MissingFieldPolicy::Skip).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Software Engineer");
    }

    #[test]
    fn test_optional_fields_and_level() {
        let markup = r#"
            <div class="job-listing">
                <h2 class="job-title">Senior Data Engineer</h2>
                <div class="job-description">Pipelines.</div>
                <div class="company">Acme</div>
                <div class="location">Remote</div>
                <a href="https://acme.example/jobs/1">Apply</a>
            </div>
        "#;
        let mut sel = selectors();
        sel.company = Some("div.company".to_string());
        sel.location = Some("div.location".to_string());
        sel.link = Some("a".to_string());

        let listings = parse_listings(markup, &sel, MissingFieldPolicy::Placeholder).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].company.as_deref(), Some("Acme"));
        assert_eq!(listings[0].location.as_deref(), Some("Remote"));
        assert_eq!(listings[0].url.as_deref(), Some("https://acme.example/jobs/1"));
        assert_eq!(listings[0].level, JobLevel::Mid);
    }

    #[test]
    fn test_invalid_selector() {
        let sel = ListingSelectors::new("h2[", "div");
        let err = parse_listings(TWO_LISTINGS, &sel, MissingFieldPolicy::Placeholder).unwrap_err();
        assert!(matches!(err, AgentError::Selector(_)));
    }

    #[test]
    fn test_scrape_literal_markup() {
        let scraper = test_scraper();
        let source = ScrapeSource::markup(MISSING_DESCRIPTION, selectors());
        let listings = tokio_test::block_on(scraper.scrape(&source)).unwrap();
        assert_eq!(listings.len(), 2);

        let scraper = scraper.with_policy(MissingFieldPolicy::Skip);
        let listings = tokio_test::block_on(scraper.scrape(&source)).unwrap();
        assert_eq!(listings.len(), 1);
    }

    #[test]
    fn test_noise_titles() {
        assert!(JobListing::new("More results for engineer", "").is_noise());
        assert!(JobListing::new("Try again later", "").is_noise());
        assert!(!JobListing::new("Engineer", "").is_noise());
    }

    #[test]
    fn test_source_config_shape() {
        let json = r#"{
            "content": "https://example.com/jobs",
            "is_url": true,
            "title": "h2.job-title",
            "description": "div.job-description"
        }"#;
        let source: ScrapeSource = serde_json::from_str(json).unwrap();
        assert!(source.is_url);
        assert_eq!(source.selectors.container, "div.job-listing");
        assert!(source.selectors.company.is_none());
    }

    #[test]
    fn test_api_listing_defaults() {
        let records: Vec<ApiListing> =
            serde_json::from_str(r#"[{"title": "Junior Analyst"}]"#).unwrap();
        assert_eq!(records[0].description, "");
        let listing: JobListing = records[0].clone().into();
        assert_eq!(listing.level, JobLevel::Entry);
        assert_eq!(listing.requirements, None);
    }

    #[test]
    fn test_api_listing_keeps_requirements() {
        let api = ApiListing {
            title: "Data Engineer".into(),
            description: "Pipelines".into(),
            requirements: " SQL, Rust ".into(),
            qualifications: "BSc".into(),
        };
        let listing = JobListing::from(api);
        assert_eq!(listing.requirements.as_deref(), Some("SQL, Rust"));
        assert_eq!(listing.qualifications.as_deref(), Some("BSc"));
    }
}
