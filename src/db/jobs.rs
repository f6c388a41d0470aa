// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Job repository

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::models::{Job, NewJob, JOB_COLUMNS};
use super::Database;
use crate::scrape::JobListing;
use crate::{AgentError, Result};

pub(crate) fn find_job(conn: &Connection, id: i64) -> Result<Option<Job>> {
    let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);
    Ok(conn.query_row(&sql, params![id], Job::from_row).optional()?)
}

pub(crate) fn job_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM jobs WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn insert_job(conn: &Connection, new: NewJob) -> Result<Job> {
    if new.title.trim().is_empty() {
        return Err(AgentError::Validation("Job title must not be empty".to_string()));
    }
    conn.execute(
        "INSERT INTO jobs (title, description, location, company, url, level)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.title,
            new.description,
            new.location,
            new.company,
            new.url,
            new.level.map(|l| l.as_str())
        ],
    )?;
    Ok(Job {
        id: conn.last_insert_rowid(),
        title: new.title,
        description: new.description,
        location: new.location,
        company: new.company,
        url: new.url,
        level: new.level,
    })
}

impl From<&JobListing> for NewJob {
    fn from(listing: &JobListing) -> Self {
        NewJob {
            title: listing.title.clone(),
            description: Some(listing.description.clone()),
            location: listing.location.clone(),
            company: listing.company.clone(),
            url: listing.url.clone(),
            level: Some(listing.level),
        }
    }
}

impl Database {
    pub fn create_job(&self, new: NewJob) -> Result<Job> {
        self.transaction(|tx| {
            let job = insert_job(tx, new)?;
            debug!("Added job {} ({})", job.id, job.title);
            Ok(job)
        })
    }

    pub fn get_job(&self, id: i64) -> Result<Option<Job>> {
        self.read(|conn| find_job(conn, id))
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        self.read(|conn| {
            let sql = format!("SELECT {} FROM jobs ORDER BY id", JOB_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let jobs = stmt
                .query_map([], Job::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(jobs)
        })
    }

    /// Delete a job and everything that references it
    pub fn delete_job(&self, id: i64) -> Result<Option<Job>> {
        self.transaction(|tx| {
            let Some(job) = find_job(tx, id)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
            info!("Deleted job {} ({})", id, job.title);
            Ok(Some(job))
        })
    }

    /// Store scraped listings as jobs in a single transaction
    pub fn import_listings(&self, listings: &[JobListing]) -> Result<Vec<Job>> {
        self.transaction(|tx| {
            let jobs = listings
                .iter()
                .map(|l| insert_job(tx, NewJob::from(l)))
                .collect::<Result<Vec<_>>>()?;
            info!("Imported {} listings as jobs", jobs.len());
            Ok(jobs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::JobLevel;

    #[test]
    fn test_create_get_list_delete() {
        let db = Database::in_memory().unwrap();
        let job = db
            .create_job(NewJob {
                title: "Software Engineer".into(),
                description: Some("Build things".into()),
                location: Some("Berlin".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(db.get_job(job.id).unwrap(), Some(job.clone()));
        assert_eq!(db.list_jobs().unwrap(), vec![job.clone()]);
        assert_eq!(db.delete_job(job.id).unwrap(), Some(job));
        assert!(db.list_jobs().unwrap().is_empty());
    }

    #[test]
    fn test_empty_title_rejected() {
        let db = Database::in_memory().unwrap();
        let err = db.create_job(NewJob { title: "  ".into(), ..Default::default() }).unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[test]
    fn test_import_listings_keeps_level() {
        let db = Database::in_memory().unwrap();
        let listings = vec![
            JobListing::new("Intern, Data", "Learn"),
            JobListing::new("Chief Architect", "Lead"),
        ];
        let jobs = db.import_listings(&listings).unwrap();
        assert_eq!(jobs.len(), 2);
        let stored = db.get_job(jobs[1].id).unwrap().unwrap();
        assert_eq!(stored.level, Some(JobLevel::Advanced));
        assert_eq!(stored.description.as_deref(), Some("Lead"));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let db = Database::in_memory().unwrap();
        let listings = vec![JobListing::new("Analyst", "ok"), JobListing::new("", "bad")];
        assert!(db.import_listings(&listings).is_err());
        assert_eq!(db.get_stats().unwrap().jobs, 0);
    }
}
