// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for the job-search agent

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scrape::{MissingFieldPolicy, ScrapeSource};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Scraper settings and configured listing sources
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Data file locations for the cleaning pipeline
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Classifier training parameters
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScraperConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Pause between consecutive page requests
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    #[serde(default)]
    pub missing_field_policy: MissingFieldPolicy,
    #[serde(default)]
    pub sources: Vec<ScrapeSource>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_listings_json")]
    pub listings_json: String,
    #[serde(default = "default_listings_csv")]
    pub listings_csv: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: String,
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

// Default value functions
fn default_db_path() -> String { "data/jobsearch_agent.db".to_string() }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
fn default_timeout() -> u64 { 30 }
fn default_max_pages() -> u32 { 5 }
fn default_page_delay() -> u64 { 1000 }
fn default_data_dir() -> String { "data".to_string() }
fn default_listings_json() -> String { "job_listings.json".to_string() }
fn default_listings_csv() -> String { "job_listings.csv".to_string() }
fn default_model_path() -> String { "models/job_level_model.json".to_string() }
fn default_max_features() -> usize { 1000 }
fn default_n_trees() -> usize { 100 }
fn default_max_depth() -> usize { 16 }
fn default_min_samples_split() -> usize { 2 }
fn default_test_fraction() -> f64 { 0.2 }
fn default_seed() -> u64 { 42 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay(),
            missing_field_policy: MissingFieldPolicy::default(),
            sources: Vec::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            listings_json: default_listings_json(),
            listings_csv: default_listings_csv(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            max_features: default_max_features(),
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
        }
    }
}

impl PipelineConfig {
    /// Full path of the raw listings JSON file
    pub fn listings_json_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.listings_json)
    }

    /// Full path of the listings CSV file
    pub fn listings_csv_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.listings_csv)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::AgentError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> crate::Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(crate::AgentError::Config("database.path must not be empty".to_string()));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(crate::AgentError::Config("scraper.timeout_secs must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.model.test_fraction) {
            return Err(crate::AgentError::Config(format!(
                "model.test_fraction must be in [0, 1), got {}",
                self.model.test_fraction
            )));
        }
        if self.model.n_trees == 0 || self.model.max_features == 0 {
            return Err(crate::AgentError::Config(
                "model.n_trees and model.max_features must be positive".to_string(),
            ));
        }
        for source in &self.scraper.sources {
            source.selectors.compile()?;
        }
        Ok(())
    }
}
