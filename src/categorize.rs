// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Job level tagging from titles and pay grades

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::AgentError;

/// Seniority bucket of a job posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum JobLevel {
    #[serde(rename = "Entry-level")]
    Entry,
    #[serde(rename = "Mid-level")]
    Mid,
    #[serde(rename = "Advanced-level")]
    Advanced,
    #[default]
    Unknown,
}

impl JobLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobLevel::Entry => "Entry-level",
            JobLevel::Mid => "Mid-level",
            JobLevel::Advanced => "Advanced-level",
            JobLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for JobLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobLevel {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Entry-level" => Ok(JobLevel::Entry),
            "Mid-level" => Ok(JobLevel::Mid),
            "Advanced-level" => Ok(JobLevel::Advanced),
            "Unknown" | "" => Ok(JobLevel::Unknown),
            other => Err(AgentError::Validation(format!("Unknown job level '{}'", other))),
        }
    }
}

static ENTRY_RE: OnceLock<Regex> = OnceLock::new();
static MID_RE: OnceLock<Regex> = OnceLock::new();
static ADVANCED_RE: OnceLock<Regex> = OnceLock::new();
static GRADE_RE: OnceLock<Regex> = OnceLock::new();

/// Tag a job title with a level. Keyword sets are checked entry, mid,
/// advanced; the first set with a whole-word hit wins.
pub fn categorize(title: &str) -> JobLevel {
    let title = title.to_lowercase();

    let entry = ENTRY_RE.get_or_init(|| {
        Regex::new(r"\b(intern|junior|entry|assistant|trainee)\b").unwrap()
    });
    let mid = MID_RE.get_or_init(|| {
        Regex::new(r"\b(mid|senior|lead|manager|specialist)\b").unwrap()
    });
    let advanced = ADVANCED_RE.get_or_init(|| {
        Regex::new(r"\b(director|vp|vice president|chief|head|principal)\b").unwrap()
    });

    if entry.is_match(&title) {
        JobLevel::Entry
    } else if mid.is_match(&title) {
        JobLevel::Mid
    } else if advanced.is_match(&title) {
        JobLevel::Advanced
    } else {
        JobLevel::Unknown
    }
}

/// Map a civil-service pay grade such as `G-12` onto a level.
/// G-1..G-5 are entry, G-6..G-10 mid, G-11..G-15 advanced.
pub fn level_for_grade(grade: &str) -> Option<JobLevel> {
    let re = GRADE_RE.get_or_init(|| Regex::new(r"^[Gg]-(\d{1,2})$").unwrap());
    let n: u32 = re.captures(grade.trim())?.get(1)?.as_str().parse().ok()?;
    match n {
        1..=5 => Some(JobLevel::Entry),
        6..=10 => Some(JobLevel::Mid),
        11..=15 => Some(JobLevel::Advanced),
        _ => None,
    }
}
