// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Civil-service title listings: column selection and level relabelling

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::store::{read_csv, write_csv, WriteMode};
use crate::categorize::level_for_grade;
use crate::{AgentError, Result};

/// Source header → output field, in output order
pub const COLUMN_MAP: [(&str, &str); 6] = [
    ("Title Name", "job_title"),
    ("Grade", "grade"),
    ("Jurisdictional Classification", "jurisdictional_classification"),
    ("Negotiating Unit", "negotiating_unit"),
    ("Job Level", "job_level"),
    ("Agency Description", "agency_description"),
];

/// One preprocessed title listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub job_title: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub jurisdictional_classification: String,
    #[serde(default)]
    pub negotiating_unit: String,
    #[serde(default)]
    pub job_level: String,
    #[serde(default)]
    pub agency_description: String,
}

impl TitleRecord {
    /// The text the level classifier reads
    pub fn combined_text(&self) -> String {
        [
            self.job_title.as_str(),
            self.jurisdictional_classification.as_str(),
            self.negotiating_unit.as_str(),
            self.agency_description.as_str(),
        ]
        .join(" ")
    }
}

/// Select and rename the useful columns of a raw title listing export.
/// Rows with a blank value in any selected column are dropped. Returns the
/// number of rows written.
pub fn preprocess_title_listing(input: &Path, output: &Path) -> Result<usize> {
    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();

    let indices = COLUMN_MAP
        .iter()
        .map(|(source, _)| {
            headers
                .iter()
                .position(|h| h.trim() == *source)
                .ok_or_else(|| AgentError::Validation(format!("Missing column '{}' in {:?}", source, input)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::new();
    let mut dropped = 0;
    for row in reader.records() {
        let row = row?;
        let fields: Vec<&str> = indices.iter().map(|&i| row.get(i).unwrap_or("").trim()).collect();
        if fields.iter().any(|f| f.is_empty()) {
            dropped += 1;
            continue;
        }
        records.push(TitleRecord {
            job_title: fields[0].to_string(),
            grade: fields[1].to_string(),
            jurisdictional_classification: fields[2].to_string(),
            negotiating_unit: fields[3].to_string(),
            job_level: fields[4].to_string(),
            agency_description: fields[5].to_string(),
        });
    }

    write_csv(output, &records, WriteMode::Overwrite)?;
    info!("Preprocessed data saved to {:?} ({} rows, {} dropped)", output, records.len(), dropped);
    Ok(records.len())
}

/// Recompute `job_level` from `grade`. Grades outside G-1..G-15 end up
/// with a blank level. Returns (relabelled, unmapped).
pub fn relabel_levels(input: &Path, output: &Path) -> Result<(usize, usize)> {
    let mut records: Vec<TitleRecord> = read_csv(input)?;
    let mut unmapped = 0;

    for record in &mut records {
        match level_for_grade(&record.grade) {
            Some(level) => record.job_level = level.to_string(),
            None => {
                unmapped += 1;
                record.job_level.clear();
            }
        }
    }
    if unmapped > 0 {
        warn!("{} rows have a grade outside G-1..G-15", unmapped);
    }

    write_csv(output, &records, WriteMode::Overwrite)?;
    info!("Updated job levels saved to {:?}", output);
    Ok((records.len() - unmapped, unmapped))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "\
Title Name,Grade,Jurisdictional Classification,Negotiating Unit,Job Level,Agency Description,Salary
Clerk,G-3,Competitive,CSEA,1,Department of Labor,40000
Systems Analyst,G-12,Competitive,PS&T,2,Office of IT Services,80000
Auditor,,Competitive,PS&T,3,Comptroller,70000
";

    #[test]
    fn test_preprocess_selects_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("pre.csv");
        std::fs::write(&input, RAW).unwrap();

        assert_eq!(preprocess_title_listing(&input, &output).unwrap(), 2);
        let records: Vec<TitleRecord> = read_csv(&output).unwrap();
        assert_eq!(records[1].job_title, "Systems Analyst");
        assert_eq!(records[1].negotiating_unit, "PS&T");

        let header = std::fs::read_to_string(&output).unwrap();
        assert!(header.starts_with(
            "job_title,grade,jurisdictional_classification,negotiating_unit,job_level,agency_description\n"
        ));
    }

    #[test]
    fn test_preprocess_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        std::fs::write(&input, "Title Name,Grade\nClerk,G-1\n").unwrap();
        let err = preprocess_title_listing(&input, &dir.path().join("o.csv")).unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[test]
    fn test_relabel_levels() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        let pre = dir.path().join("pre.csv");
        let out = dir.path().join("out.csv");
        std::fs::write(&raw, RAW.replace("Auditor,,", "Auditor,G-99,")).unwrap();
        preprocess_title_listing(&raw, &pre).unwrap();

        assert_eq!(relabel_levels(&pre, &out).unwrap(), (2, 1));
        let records: Vec<TitleRecord> = read_csv(&out).unwrap();
        assert_eq!(records[0].job_level, "Entry-level");
        assert_eq!(records[1].job_level, "Advanced-level");
        assert_eq!(records[2].job_level, "");
    }

    #[test]
    fn test_combined_text() {
        let record = TitleRecord {
            job_title: "Clerk".into(),
            jurisdictional_classification: "Competitive".into(),
            negotiating_unit: "CSEA".into(),
            agency_description: "Labor".into(),
            ..Default::default()
        };
        assert_eq!(record.combined_text(), "Clerk Competitive CSEA Labor");
    }
}
