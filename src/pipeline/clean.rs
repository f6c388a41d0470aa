// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Record filtering, deduplication and numeric coercion

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::store::{read_json, write_json, WriteMode};
use crate::scrape::JobListing;
use crate::{AgentError, Result};

/// Counts from a listing clean-up pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStats {
    pub input: usize,
    pub noise_removed: usize,
    pub duplicates_removed: usize,
    pub kept: usize,
}

/// Content fingerprint of a listing, insensitive to case and surrounding
/// whitespace
pub fn fingerprint(listing: &JobListing) -> String {
    let mut hasher = blake3::Hasher::new();
    let fields = [
        Some(listing.title.as_str()),
        listing.company.as_deref(),
        listing.location.as_deref(),
        listing.url.as_deref(),
    ];
    for field in fields {
        hasher.update(field.unwrap_or("").trim().to_lowercase().as_bytes());
        hasher.update(&[0x1f]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Links that are not absolute web URLs (`/search?page=2`, `mailto:`)
/// come from page chrome rather than postings
fn has_non_web_link(listing: &JobListing) -> bool {
    listing
        .url
        .as_deref()
        .is_some_and(|url| !url.trim_start().starts_with("http"))
}

/// Drop search-page noise and repeated listings, keeping first occurrences
/// in their original order
pub fn clean_listings(listings: Vec<JobListing>) -> (Vec<JobListing>, CleanStats) {
    let mut stats = CleanStats {
        input: listings.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(listings.len());

    for listing in listings {
        if listing.is_noise() || has_non_web_link(&listing) {
            debug!("Dropping noise listing: {} ({:?})", listing.title, listing.url);
            stats.noise_removed += 1;
            continue;
        }
        if !seen.insert(fingerprint(&listing)) {
            stats.duplicates_removed += 1;
            continue;
        }
        kept.push(listing);
    }

    stats.kept = kept.len();
    (kept, stats)
}

/// Clean a JSON listing file in place
pub fn clean_json_file(path: &Path) -> Result<CleanStats> {
    let listings: Vec<JobListing> = read_json(path)?;
    let (kept, stats) = clean_listings(listings);
    write_json(path, &kept, WriteMode::Overwrite)?;
    info!(
        "Cleaned {:?}: kept {} of {} ({} noise, {} duplicates)",
        path, stats.kept, stats.input, stats.noise_removed, stats.duplicates_removed
    );
    Ok(stats)
}

/// Outcome of [`clean_numeric_csv`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericCleanStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub numeric_columns: Vec<String>,
    pub dropped_columns: Vec<String>,
}

fn is_number(value: &str) -> bool {
    value.trim().parse::<f64>().map(|v| v.is_finite()).unwrap_or(false)
}

/// Keep only the numeric part of a feature table.
///
/// A column is numeric when every non-empty value in it parses as a finite
/// number. Rows with a blank or unparsable value in any numeric column are
/// dropped, and non-numeric columns are left out of the output.
pub fn clean_numeric_csv(input: &Path, output: &Path) -> Result<NumericCleanStats> {
    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let numeric: Vec<usize> = (0..headers.len())
        .filter(|&col| {
            let mut values = rows.iter().filter_map(|r| r.get(col)).filter(|v| !v.trim().is_empty());
            let mut any = false;
            let all_numeric = values.all(|v| {
                any = true;
                is_number(v)
            });
            any && all_numeric
        })
        .collect();

    if numeric.is_empty() {
        return Err(AgentError::Validation(format!("No numeric columns in {:?}", input)));
    }

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(numeric.iter().map(|&c| &headers[c]))?;

    let mut rows_out = 0;
    for row in &rows {
        let complete = numeric.iter().all(|&c| row.get(c).map(is_number).unwrap_or(false));
        if complete {
            writer.write_record(numeric.iter().map(|&c| row[c].trim()))?;
            rows_out += 1;
        }
    }
    writer.flush()?;

    let stats = NumericCleanStats {
        rows_in: rows.len(),
        rows_out,
        numeric_columns: numeric.iter().map(|&c| headers[c].to_string()).collect(),
        dropped_columns: (0..headers.len())
            .filter(|c| !numeric.contains(c))
            .map(|c| headers[c].to_string())
            .collect(),
    };
    info!("Cleaned data saved to {:?} ({} of {} rows)", output, stats.rows_out, stats.rows_in);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(title: &str, company: &str) -> JobListing {
        let mut l = JobListing::new(title, "desc");
        l.company = Some(company.to_string());
        l
    }

    #[test]
    fn test_clean_listings() {
        let listings = vec![
            listing("Software Engineer", "Acme"),
            listing("More results", "Search"),
            listing("software engineer ", "ACME"),
            listing("Software Engineer", "Globex"),
            listing("Try again", ""),
        ];
        let (kept, stats) = clean_listings(listings);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].company.as_deref(), Some("Acme"));
        assert_eq!(kept[1].company.as_deref(), Some("Globex"));
        assert_eq!(
            stats,
            CleanStats { input: 5, noise_removed: 2, duplicates_removed: 1, kept: 2 }
        );
    }

    #[test]
    fn test_clean_drops_non_web_links() {
        let with_url = |title: &str, url: Option<&str>| {
            let mut l = JobListing::new(title, "desc");
            l.url = url.map(str::to_string);
            l
        };
        let listings = vec![
            with_url("Analyst", Some("https://jobs.example.com/1")),
            with_url("Page 2", Some("/search?page=2")),
            with_url("Recruiter", Some("mailto:hr@example.com")),
            with_url("Clerk", None),
        ];
        let (kept, stats) = clean_listings(listings);
        let titles: Vec<&str> = kept.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Analyst", "Clerk"]);
        assert_eq!(stats.noise_removed, 2);
    }

    #[test]
    fn test_clean_json_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.json");
        let listings = vec![listing("Analyst", "A"), listing("Analyst", "A"), listing("More results", "")];
        write_json(&path, &listings, WriteMode::Overwrite).unwrap();

        let stats = clean_json_file(&path).unwrap();
        assert_eq!(stats.kept, 1);
        let back: Vec<JobListing> = read_json(&path).unwrap();
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn test_clean_numeric_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("features.csv");
        let output = dir.path().join("clean.csv");
        std::fs::write(
            &input,
            "engineer,grade,job_level\n0.5,12,Mid-level\n0.1,,Entry-level\n0.0,3,Entry-level\n",
        )
        .unwrap();

        let stats = clean_numeric_csv(&input, &output).unwrap();
        assert_eq!(stats.rows_in, 3);
        assert_eq!(stats.rows_out, 2);
        assert_eq!(stats.numeric_columns, vec!["engineer", "grade"]);
        assert_eq!(stats.dropped_columns, vec!["job_level"]);

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text, "engineer,grade\n0.5,12\n0.0,3\n");
    }

    #[test]
    fn test_clean_numeric_csv_without_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("text.csv");
        std::fs::write(&input, "title\nEngineer\n").unwrap();
        assert!(clean_numeric_csv(&input, &dir.path().join("out.csv")).is_err());
    }
}
