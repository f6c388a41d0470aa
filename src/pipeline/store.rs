// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON and CSV interchange files

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::Result;

/// How to treat an existing output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    /// Keep existing records and add the new ones after them
    Append,
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Read a JSON array of records
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write records as a pretty JSON array. Returns the number of records now
/// in the file.
pub fn write_json<T: Serialize>(path: &Path, records: &[T], mode: WriteMode) -> Result<usize> {
    ensure_parent(path)?;

    let mut all: Vec<serde_json::Value> = if mode == WriteMode::Append && path.exists() {
        read_json(path)?
    } else {
        Vec::new()
    };
    for record in records {
        all.push(serde_json::to_value(record)?);
    }

    fs::write(path, serde_json::to_string_pretty(&all)?)?;
    info!("Job listings saved to {:?} ({} records)", path, all.len());
    Ok(all.len())
}

/// Read CSV rows into records using the header row for field names
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(records)
}

/// Write records as CSV. In append mode the header is only written when
/// the file is new or empty.
pub fn write_csv<T: Serialize>(path: &Path, records: &[T], mode: WriteMode) -> Result<()> {
    ensure_parent(path)?;

    let has_content = path.exists() && fs::metadata(path)?.len() > 0;
    let append = mode == WriteMode::Append && has_content;

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;

    let mut writer = csv::WriterBuilder::new().has_headers(!append).from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

/// Convert a JSON listing file into CSV rows
pub fn json_to_csv<T>(json_path: &Path, csv_path: &Path, mode: WriteMode) -> Result<usize>
where
    T: Serialize + DeserializeOwned,
{
    let records: Vec<T> = read_json(json_path)?;
    write_csv(csv_path, &records, mode)?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::JobListing;

    #[test]
    fn test_json_append_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("listings.json");

        let first = vec![JobListing::new("Junior Analyst", "a")];
        let second = vec![JobListing::new("Director of Data", "b")];
        assert_eq!(write_json(&path, &first, WriteMode::Append).unwrap(), 1);
        assert_eq!(write_json(&path, &second, WriteMode::Append).unwrap(), 2);

        let back: Vec<JobListing> = read_json(&path).unwrap();
        assert_eq!(back, vec![first[0].clone(), second[0].clone()]);

        assert_eq!(write_json(&path, &second, WriteMode::Overwrite).unwrap(), 1);
    }

    #[test]
    fn test_csv_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");

        let listing = JobListing::new("Senior Engineer", "Build, test");
        write_csv(&path, &[listing.clone()], WriteMode::Append).unwrap();
        write_csv(&path, &[listing], WriteMode::Append).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "title,description,company,location,url,level,requirements,qualifications"
        );
        assert_eq!(lines[1], "Senior Engineer,\"Build, test\",,,,Mid-level,,");
    }

    #[test]
    fn test_api_fields_reach_csv() {
        use crate::scrape::ApiListing;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.csv");
        let listing = JobListing::from(ApiListing {
            title: "Junior Analyst".into(),
            description: "Reports".into(),
            requirements: "Excel".into(),
            qualifications: "Degree".into(),
        });
        write_csv(&path, &[listing], WriteMode::Overwrite).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with("Entry-level,Excel,Degree"));
        let rows: Vec<JobListing> = read_csv(&path).unwrap();
        assert_eq!(rows[0].requirements.as_deref(), Some("Excel"));
        assert_eq!(rows[0].qualifications.as_deref(), Some("Degree"));
    }

    #[test]
    fn test_json_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("l.json");
        let csv_path = dir.path().join("l.csv");
        write_json(&json, &[JobListing::new("Intern", "x"), JobListing::new("VP", "y")], WriteMode::Overwrite)
            .unwrap();

        let n = json_to_csv::<JobListing>(&json, &csv_path, WriteMode::Overwrite).unwrap();
        assert_eq!(n, 2);
        let rows: Vec<JobListing> = read_csv(&csv_path).unwrap();
        assert_eq!(rows[1].title, "VP");
    }
}
