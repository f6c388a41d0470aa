// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Listing sources and the aggregator that drains them in order

use async_trait::async_trait;
use tracing::{info, warn};

use super::{JobListing, ListingSelectors, ScrapeSource, Scraper};
use crate::Result;

/// Anything that can produce job listings through a [`Scraper`]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Human-readable label for logs
    fn name(&self) -> String;

    /// Fetch and parse this source's listings
    async fn collect(&self, scraper: &Scraper) -> Result<Vec<JobListing>>;
}

#[async_trait]
impl ListingSource for ScrapeSource {
    fn name(&self) -> String {
        if self.is_url {
            self.content.clone()
        } else {
            "<inline markup>".to_string()
        }
    }

    async fn collect(&self, scraper: &Scraper) -> Result<Vec<JobListing>> {
        scraper.scrape(self).await
    }
}

/// A paginated listing board
pub struct PagedSource {
    pub url: String,
    pub selectors: ListingSelectors,
    pub max_pages: u32,
}

#[async_trait]
impl ListingSource for PagedSource {
    fn name(&self) -> String {
        format!("{} (up to {} pages)", self.url, self.max_pages)
    }

    async fn collect(&self, scraper: &Scraper) -> Result<Vec<JobListing>> {
        scraper.scrape_pages(&self.url, &self.selectors, self.max_pages).await
    }
}

/// A JSON listing API
pub struct ApiSource {
    pub url: String,
}

#[async_trait]
impl ListingSource for ApiSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    async fn collect(&self, scraper: &Scraper) -> Result<Vec<JobListing>> {
        let records = scraper.fetch_api_listings(&self.url).await?;
        Ok(records.into_iter().map(JobListing::from).collect())
    }
}

/// Ordered set of sources scraped one after another
#[derive(Default)]
pub struct Aggregator {
    sources: Vec<Box<dyn ListingSource>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an aggregator over configured sources
    pub fn from_sources(sources: &[ScrapeSource]) -> Self {
        let mut aggregator = Self::new();
        for source in sources {
            aggregator.register(Box::new(source.clone()));
        }
        aggregator
    }

    pub fn register(&mut self, source: Box<dyn ListingSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Drain every source in registration order. A failing source is
    /// logged and skipped; the others still contribute.
    pub async fn collect_all(&self, scraper: &Scraper) -> Vec<JobListing> {
        let mut all = Vec::new();

        for source in &self.sources {
            match source.collect(scraper).await {
                Ok(listings) => {
                    info!("{}: {} listings", source.name(), listings.len());
                    all.extend(listings);
                }
                Err(e) => {
                    warn!("Skipping source {}: {}", source.name(), e);
                }
            }
        }

        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;

    const MARKUP: &str = r#"
        <div class="job-listing">
            <h2 class="job-title">Junior Developer</h2>
            <div class="job-description">Write code.</div>
        </div>
    "#;

    #[test]
    fn test_aggregate_skips_failing_source() {
        let scraper = Scraper::new(&ScraperConfig::default()).unwrap();
        let good = ScrapeSource::markup(MARKUP, ListingSelectors::new("h2.job-title", "div.job-description"));
        let bad = ScrapeSource::markup(MARKUP, ListingSelectors::new("h2[", "div"));

        let aggregator = Aggregator::from_sources(&[good.clone(), bad, good]);
        assert_eq!(aggregator.len(), 3);

        let listings = tokio_test::block_on(aggregator.collect_all(&scraper));
        assert_eq!(listings.len(), 2);
        assert!(listings.iter().all(|l| l.title == "Junior Developer"));
    }

    #[test]
    fn test_source_names() {
        let sel = ListingSelectors::new("h2", "p");
        assert_eq!(ScrapeSource::markup("<p></p>", sel.clone()).name(), "<inline markup>");
        assert_eq!(ScrapeSource::url("https://example.com", sel).name(), "https://example.com");
    }
}
