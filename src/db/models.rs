// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Row types and workflow statuses

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::categorize::JobLevel;
use crate::AgentError;

/// A job seeker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume: Option<String>,
}

/// Fields for inserting a candidate
#[derive(Debug, Clone, Default)]
pub struct NewCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume: Option<String>,
}

/// Partial update of a candidate. `None` leaves a field alone; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct CandidateUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub resume: Option<Option<String>>,
}

impl CandidateUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.resume.is_none()
    }

    pub(crate) fn apply(self, candidate: &mut Candidate) {
        if let Some(v) = self.first_name {
            candidate.first_name = v;
        }
        if let Some(v) = self.last_name {
            candidate.last_name = v;
        }
        if let Some(v) = self.email {
            candidate.email = v;
        }
        if let Some(v) = self.phone {
            candidate.phone = v;
        }
        if let Some(v) = self.resume {
            candidate.resume = v;
        }
    }
}

/// A job posting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub url: Option<String>,
    pub level: Option<JobLevel>,
}

/// Fields for inserting a job
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub url: Option<String>,
    pub level: Option<JobLevel>,
}

/// Where an application stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Submitted,
    Rejected,
    Accepted,
    Withdrawn,
}

/// Where an interview stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

/// Display, parsing and SQL text mapping for a closed status enum
macro_rules! status_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = AgentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| AgentError::Validation(format!("Unknown {} '{}'", $label, s)))
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: AgentError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

status_enum!(ApplicationStatus, "application status", {
    Pending => "Pending",
    Submitted => "Submitted",
    Rejected => "Rejected",
    Accepted => "Accepted",
    Withdrawn => "Withdrawn",
});

status_enum!(InterviewStatus, "interview status", {
    Scheduled => "Scheduled",
    Completed => "Completed",
    Cancelled => "Cancelled",
    Rescheduled => "Rescheduled",
});

/// A candidate's submission to a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub candidate_id: i64,
    pub job_id: i64,
    pub application_date: DateTime<Utc>,
    pub status: ApplicationStatus,
}

/// A job a candidate is tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub id: i64,
    pub candidate_id: i64,
    pub job_id: i64,
    pub added_date: DateTime<Utc>,
}

/// A scheduled interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSchedule {
    pub id: i64,
    pub candidate_id: i64,
    pub job_id: i64,
    pub interview_date: DateTime<Utc>,
    pub status: InterviewStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningQuestion {
    pub id: i64,
    pub job_id: i64,
    pub question_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub id: i64,
    pub candidate_id: i64,
    pub question_id: i64,
    pub response_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub id: i64,
    pub candidate_id: i64,
    pub evaluator_name: String,
    pub score: i64,
    pub feedback: Option<String>,
}

/// A job reference handed to auto-apply; records without an id are skipped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl JobRef {
    pub fn id(id: i64) -> Self {
        Self { id: Some(id), title: None }
    }
}

/// A job auto-apply passed over, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedJob {
    pub index: usize,
    pub job_id: Option<i64>,
    pub reason: String,
}

/// Outcome of one auto-apply batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoApplyReport {
    pub applications: Vec<Application>,
    pub skipped: Vec<SkippedJob>,
}

pub(crate) const CANDIDATE_COLUMNS: &str = "id, first_name, last_name, email, phone, resume";
pub(crate) const JOB_COLUMNS: &str = "id, title, description, location, company, url, level";
pub(crate) const APPLICATION_COLUMNS: &str = "id, candidate_id, job_id, application_date, status";
pub(crate) const WATCHLIST_COLUMNS: &str = "id, candidate_id, job_id, added_date";
pub(crate) const INTERVIEW_COLUMNS: &str = "id, candidate_id, job_id, interview_date, status";

impl Candidate {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            resume: row.get(5)?,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Job {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let level: Option<String> = row.get(6)?;
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            location: row.get(3)?,
            company: row.get(4)?,
            url: row.get(5)?,
            level: level.and_then(|l| l.parse().ok()),
        })
    }
}

impl Application {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            job_id: row.get(2)?,
            application_date: row.get(3)?,
            status: row.get(4)?,
        })
    }
}

impl WatchlistEntry {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            job_id: row.get(2)?,
            added_date: row.get(3)?,
        })
    }
}

impl InterviewSchedule {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            candidate_id: row.get(1)?,
            job_id: row.get(2)?,
            interview_date: row.get(3)?,
            status: row.get(4)?,
        })
    }
}
