// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Database module for candidates, jobs and the application workflow
//!
//! Every public operation runs inside its own transaction: it commits when
//! the operation returns `Ok` and rolls back on every other exit.

mod candidates;
mod jobs;
pub mod models;
mod screening;
mod workflow;

use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::{AgentError, Result};

pub use models::*;

/// Database manager (thread-safe wrapper)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Row counts per table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbStats {
    pub candidates: i64,
    pub jobs: i64,
    pub applications: i64,
    pub watchlist: i64,
    pub interviews: i64,
    pub screening_questions: i64,
    pub responses: i64,
    pub evaluations: i64,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS candidates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT UNIQUE,
        resume TEXT
    );

    CREATE TABLE IF NOT EXISTS jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        location TEXT,
        company TEXT,
        url TEXT,
        level TEXT
    );

    CREATE TABLE IF NOT EXISTS applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        application_date TEXT NOT NULL,
        status TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS watchlist (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        added_date TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS interview_schedule (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        interview_date TEXT NOT NULL,
        status TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS screening_questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        question_text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS candidate_responses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        question_id INTEGER NOT NULL REFERENCES screening_questions(id) ON DELETE CASCADE,
        response_text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS candidate_evaluations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        evaluator_name TEXT NOT NULL,
        score INTEGER NOT NULL,
        feedback TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_applications_candidate ON applications(candidate_id);
    CREATE INDEX IF NOT EXISTS idx_watchlist_candidate ON watchlist(candidate_id, job_id);
    CREATE INDEX IF NOT EXISTS idx_interviews_candidate ON interview_schedule(candidate_id);
"#;

impl Database {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AgentError::Config("Database lock poisoned".to_string()))
    }

    /// Create every table that does not exist yet
    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `op` as one logical operation.
    ///
    /// The connection stays locked for the whole call, so uncommitted work
    /// from two operations never interleaves. Dropping the transaction on an
    /// error path rolls it back.
    pub fn transaction<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run a read-only query against the connection
    pub fn read<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock_conn()?;
        op(&conn)
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DbStats> {
        self.read(|conn| {
            let count = |table: &str| -> Result<i64> {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                Ok(conn.query_row(&sql, [], |row| row.get(0))?)
            };
            Ok(DbStats {
                candidates: count("candidates")?,
                jobs: count("jobs")?,
                applications: count("applications")?,
                watchlist: count("watchlist")?,
                interviews: count("interview_schedule")?,
                screening_questions: count("screening_questions")?,
                responses: count("candidate_responses")?,
                evaluations: count("candidate_evaluations")?,
            })
        })
    }

    /// Vacuum database
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("VACUUM", [])?;
        debug!("Database vacuumed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.candidates, 0);
        assert_eq!(stats.evaluations, 0);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = Database::in_memory().unwrap();
        let result: Result<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO jobs (title) VALUES (?1)",
                ["Data Scientist"],
            )?;
            Err(AgentError::Validation("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(db.get_stats().unwrap().jobs, 0);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agent.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        db.vacuum().unwrap();
    }
}
