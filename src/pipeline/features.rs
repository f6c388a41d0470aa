// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! TF-IDF feature table export

use std::path::Path;
use tracing::info;

use super::store::read_csv;
use super::tabular::TitleRecord;
use super::tfidf::TfidfVectorizer;
use crate::Result;

/// Write one column per vocabulary term (alphabetical), then `grade` and
/// `job_level`, for every preprocessed title record. Returns
/// (rows, term columns).
pub fn extract_features(input: &Path, output: &Path, max_features: usize) -> Result<(usize, usize)> {
    let records: Vec<TitleRecord> = read_csv(input)?;
    let texts: Vec<String> = records.iter().map(TitleRecord::combined_text).collect();

    let mut vectorizer = TfidfVectorizer::new(max_features);
    let rows = vectorizer.fit_transform(&texts);

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(output)?;
    let mut header: Vec<&str> = vectorizer.feature_names();
    header.extend(["grade", "job_level"]);
    writer.write_record(&header)?;

    for (record, row) in records.iter().zip(&rows) {
        let mut fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        fields.push(record.grade.clone());
        fields.push(record.job_level.clone());
        writer.write_record(&fields)?;
    }
    writer.flush()?;

    info!(
        "Features extracted and saved to {:?} ({} rows, {} terms)",
        output,
        records.len(),
        vectorizer.len()
    );
    Ok((records.len(), vectorizer.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::clean::clean_numeric_csv;
    use crate::pipeline::store::{write_csv, WriteMode};

    fn record(title: &str, unit: &str, grade: &str, level: &str) -> TitleRecord {
        TitleRecord {
            job_title: title.into(),
            grade: grade.into(),
            jurisdictional_classification: "Competitive".into(),
            negotiating_unit: unit.into(),
            job_level: level.into(),
            agency_description: "Labor".into(),
        }
    }

    #[test]
    fn test_feature_table_shape() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pre.csv");
        let output = dir.path().join("out").join("features.csv");
        let records = vec![
            record("Clerk", "CSEA", "G-3", "Entry-level"),
            record("Senior Analyst", "PS&T", "G-12", "Advanced-level"),
        ];
        write_csv(&input, &records, WriteMode::Overwrite).unwrap();

        let (rows, terms) = extract_features(&input, &output, 1000).unwrap();
        assert_eq!(rows, 2);
        // analyst clerk competitive csea labor ps senior
        assert_eq!(terms, 7);

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "analyst,clerk,competitive,csea,labor,ps,senior,grade,job_level");
        assert!(lines[1].ends_with(",G-3,Entry-level"));
        assert!(lines[1].starts_with("0,"));
    }

    #[test]
    fn test_feature_table_feeds_numeric_clean() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pre.csv");
        let features = dir.path().join("features.csv");
        let cleaned = dir.path().join("cleaned.csv");
        let records = vec![
            record("Clerk", "CSEA", "G-3", "Entry-level"),
            record("Director", "Management", "G-15", "Advanced-level"),
            record("Clerk Trainee", "CSEA", "G-1", "Entry-level"),
        ];
        write_csv(&input, &records, WriteMode::Overwrite).unwrap();

        let (_, terms) = extract_features(&input, &features, 3).unwrap();
        assert_eq!(terms, 3);

        let stats = clean_numeric_csv(&features, &cleaned).unwrap();
        assert_eq!(stats.rows_out, 3);
        assert_eq!(stats.numeric_columns.len(), 3);
        assert_eq!(stats.dropped_columns, vec!["grade", "job_level"]);
    }
}
