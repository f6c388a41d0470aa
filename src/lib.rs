// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Job search agent
//!
//! Candidate and job records in SQLite with watchlist, interview, screening
//! and auto-apply workflows, a CSS-selector scraper for listing boards, and
//! an offline pipeline that trains a job-level classifier.

pub mod categorize;
pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod scrape;

pub use config::AppConfig;
pub use error::{AgentError, Result};
