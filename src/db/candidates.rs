// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Candidate repository

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use super::models::{Candidate, CandidateUpdate, NewCandidate, CANDIDATE_COLUMNS};
use super::Database;
use crate::{AgentError, Result};

/// Turn a UNIQUE violation on email or phone into its domain error
fn map_unique_violation(err: rusqlite::Error, email: &str, phone: Option<&str>) -> AgentError {
    if let rusqlite::Error::SqliteFailure(ref failure, Some(ref msg)) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            if msg.contains("candidates.email") {
                return AgentError::DuplicateEmail(email.to_string());
            }
            if msg.contains("candidates.phone") {
                return AgentError::DuplicatePhone(phone.unwrap_or_default().to_string());
            }
        }
    }
    err.into()
}

pub(crate) fn find_candidate(conn: &Connection, id: i64) -> Result<Option<Candidate>> {
    let sql = format!("SELECT {} FROM candidates WHERE id = ?1", CANDIDATE_COLUMNS);
    Ok(conn.query_row(&sql, params![id], Candidate::from_row).optional()?)
}

impl Database {
    /// Insert a candidate. Fails with `DuplicateEmail`/`DuplicatePhone`
    /// when another candidate already holds the address or number.
    pub fn create_candidate(&self, new: NewCandidate) -> Result<Candidate> {
        if new.email.trim().is_empty() {
            return Err(AgentError::Validation("Candidate email must not be empty".to_string()));
        }

        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO candidates (first_name, last_name, email, phone, resume)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![new.first_name, new.last_name, new.email, new.phone, new.resume],
            )
            .map_err(|e| map_unique_violation(e, &new.email, new.phone.as_deref()))?;

            let candidate = Candidate {
                id: tx.last_insert_rowid(),
                first_name: new.first_name.clone(),
                last_name: new.last_name.clone(),
                email: new.email.clone(),
                phone: new.phone.clone(),
                resume: new.resume.clone(),
            };
            info!("Added candidate {} ({})", candidate.id, candidate.email);
            Ok(candidate)
        })
    }

    pub fn get_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        self.read(|conn| find_candidate(conn, id))
    }

    pub fn get_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        self.read(|conn| {
            let sql = format!("SELECT {} FROM candidates WHERE email = ?1", CANDIDATE_COLUMNS);
            Ok(conn.query_row(&sql, params![email], Candidate::from_row).optional()?)
        })
    }

    pub fn list_candidates(&self) -> Result<Vec<Candidate>> {
        self.read(|conn| {
            let sql = format!("SELECT {} FROM candidates ORDER BY id", CANDIDATE_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let candidates = stmt
                .query_map([], Candidate::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(candidates)
        })
    }

    /// Apply a partial update. Returns `None` when no candidate has `id`.
    pub fn update_candidate(&self, id: i64, update: CandidateUpdate) -> Result<Option<Candidate>> {
        if update.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(AgentError::Validation("Candidate email must not be empty".to_string()));
        }

        self.transaction(|tx| {
            let Some(mut candidate) = find_candidate(tx, id)? else {
                debug!("Candidate {} not found for update", id);
                return Ok(None);
            };
            update.apply(&mut candidate);

            tx.execute(
                "UPDATE candidates
                 SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4, resume = ?5
                 WHERE id = ?6",
                params![
                    candidate.first_name,
                    candidate.last_name,
                    candidate.email,
                    candidate.phone,
                    candidate.resume,
                    candidate.id
                ],
            )
            .map_err(|e| map_unique_violation(e, &candidate.email, candidate.phone.as_deref()))?;

            debug!("Updated candidate {}", id);
            Ok(Some(candidate))
        })
    }

    /// Delete a candidate and, through cascading keys, everything that
    /// references it. Returns the deleted record.
    pub fn delete_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        self.transaction(|tx| {
            let Some(candidate) = find_candidate(tx, id)? else {
                debug!("Candidate {} not found for delete", id);
                return Ok(None);
            };
            tx.execute("DELETE FROM candidates WHERE id = ?1", params![id])?;
            info!("Deleted candidate {} ({})", id, candidate.email);
            Ok(Some(candidate))
        })
    }
}
