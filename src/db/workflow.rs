// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Watchlist, interview and application workflow

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::candidates::find_candidate;
use super::jobs::job_exists;
use super::models::{
    Application, ApplicationStatus, AutoApplyReport, InterviewSchedule, InterviewStatus, JobRef,
    SkippedJob, WatchlistEntry, APPLICATION_COLUMNS, INTERVIEW_COLUMNS, WATCHLIST_COLUMNS,
};
use super::Database;
use crate::Result;

fn find_application(conn: &Connection, id: i64) -> Result<Option<Application>> {
    let sql = format!("SELECT {} FROM applications WHERE id = ?1", APPLICATION_COLUMNS);
    Ok(conn.query_row(&sql, params![id], Application::from_row).optional()?)
}

fn find_interview(conn: &Connection, id: i64) -> Result<Option<InterviewSchedule>> {
    let sql = format!("SELECT {} FROM interview_schedule WHERE id = ?1", INTERVIEW_COLUMNS);
    Ok(conn.query_row(&sql, params![id], InterviewSchedule::from_row).optional()?)
}

fn insert_application(
    conn: &Connection,
    candidate_id: i64,
    job_id: i64,
    at: DateTime<Utc>,
    status: ApplicationStatus,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO applications (candidate_id, job_id, application_date, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![candidate_id, job_id, at, status],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Start tracking a job for a candidate
    pub fn add_to_watchlist(&self, candidate_id: i64, job_id: i64) -> Result<WatchlistEntry> {
        self.transaction(|tx| {
            let added_date = Utc::now();
            tx.execute(
                "INSERT INTO watchlist (candidate_id, job_id, added_date) VALUES (?1, ?2, ?3)",
                params![candidate_id, job_id, added_date],
            )?;
            debug!("Candidate {} now watching job {}", candidate_id, job_id);
            Ok(WatchlistEntry {
                id: tx.last_insert_rowid(),
                candidate_id,
                job_id,
                added_date,
            })
        })
    }

    /// Stop tracking a job. Returns the removed entry, or `None` when the
    /// candidate was not watching it.
    pub fn remove_from_watchlist(&self, candidate_id: i64, job_id: i64) -> Result<Option<WatchlistEntry>> {
        self.transaction(|tx| {
            let sql = format!(
                "SELECT {} FROM watchlist WHERE candidate_id = ?1 AND job_id = ?2 ORDER BY id LIMIT 1",
                WATCHLIST_COLUMNS
            );
            let entry = tx
                .query_row(&sql, params![candidate_id, job_id], WatchlistEntry::from_row)
                .optional()?;

            if let Some(ref e) = entry {
                tx.execute("DELETE FROM watchlist WHERE id = ?1", params![e.id])?;
                debug!("Removed watchlist entry {}", e.id);
            }
            Ok(entry)
        })
    }

    pub fn watchlist_for(&self, candidate_id: i64) -> Result<Vec<WatchlistEntry>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM watchlist WHERE candidate_id = ?1 ORDER BY id",
                WATCHLIST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(params![candidate_id], WatchlistEntry::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    pub fn schedule_interview(
        &self,
        candidate_id: i64,
        job_id: i64,
        when: DateTime<Utc>,
        status: InterviewStatus,
    ) -> Result<InterviewSchedule> {
        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO interview_schedule (candidate_id, job_id, interview_date, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![candidate_id, job_id, when, status],
            )?;
            let interview = InterviewSchedule {
                id: tx.last_insert_rowid(),
                candidate_id,
                job_id,
                interview_date: when,
                status,
            };
            info!("Scheduled interview {} for candidate {}", interview.id, candidate_id);
            Ok(interview)
        })
    }

    pub fn update_interview_status(
        &self,
        interview_id: i64,
        status: InterviewStatus,
    ) -> Result<Option<InterviewSchedule>> {
        self.transaction(|tx| {
            let Some(mut interview) = find_interview(tx, interview_id)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE interview_schedule SET status = ?1 WHERE id = ?2",
                params![status, interview_id],
            )?;
            interview.status = status;
            Ok(Some(interview))
        })
    }

    pub fn interviews_for(&self, candidate_id: i64) -> Result<Vec<InterviewSchedule>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM interview_schedule WHERE candidate_id = ?1 ORDER BY interview_date",
                INTERVIEW_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let interviews = stmt
                .query_map(params![candidate_id], InterviewSchedule::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(interviews)
        })
    }

    /// Record a single pending application
    pub fn apply(&self, candidate_id: i64, job_id: i64) -> Result<Application> {
        self.transaction(|tx| {
            let application_date = Utc::now();
            let id = insert_application(tx, candidate_id, job_id, application_date, ApplicationStatus::Pending)?;
            Ok(Application {
                id,
                candidate_id,
                job_id,
                application_date,
                status: ApplicationStatus::Pending,
            })
        })
    }

    pub fn update_application_status(
        &self,
        application_id: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        self.transaction(|tx| {
            let Some(mut application) = find_application(tx, application_id)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE applications SET status = ?1 WHERE id = ?2",
                params![status, application_id],
            )?;
            application.status = status;
            Ok(Some(application))
        })
    }

    pub fn applications_for(&self, candidate_id: i64) -> Result<Vec<Application>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {} FROM applications WHERE candidate_id = ?1 ORDER BY id",
                APPLICATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let applications = stmt
                .query_map(params![candidate_id], Application::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(applications)
        })
    }

    /// Apply a candidate to a batch of jobs in one transaction.
    ///
    /// Each usable job gets an application created as `Pending` and then
    /// moved to `Submitted` before the single commit. Jobs without an id,
    /// or whose id is not in the database, are skipped with a warning.
    /// Any database failure rolls back the whole batch. Returns `None`
    /// when the candidate does not exist.
    pub fn auto_apply(&self, candidate_id: i64, jobs: &[JobRef]) -> Result<Option<AutoApplyReport>> {
        self.transaction(|tx| {
            if find_candidate(tx, candidate_id)?.is_none() {
                warn!("Candidate with ID {} not found", candidate_id);
                return Ok(None);
            }

            let now = Utc::now();
            let mut created = Vec::new();
            let mut skipped = Vec::new();

            for (index, job) in jobs.iter().enumerate() {
                let Some(job_id) = job.id else {
                    warn!("Job ID not found for job #{} ({:?})", index, job.title);
                    skipped.push(SkippedJob {
                        index,
                        job_id: None,
                        reason: "missing job id".to_string(),
                    });
                    continue;
                };

                if !job_exists(tx, job_id)? {
                    warn!("Job {} does not exist, not applying", job_id);
                    skipped.push(SkippedJob {
                        index,
                        job_id: Some(job_id),
                        reason: "unknown job".to_string(),
                    });
                    continue;
                }

                let id = insert_application(tx, candidate_id, job_id, now, ApplicationStatus::Pending)?;
                debug!("Application {} created for job {} as Pending", id, job_id);
                created.push(id);
            }

            for id in &created {
                tx.execute(
                    "UPDATE applications SET status = ?1 WHERE id = ?2",
                    params![ApplicationStatus::Submitted, id],
                )?;
            }

            let mut applications = Vec::with_capacity(created.len());
            for id in created {
                if let Some(application) = find_application(tx, id)? {
                    applications.push(application);
                }
            }

            info!(
                "Auto-applied candidate {} to {} jobs ({} skipped)",
                candidate_id,
                applications.len(),
                skipped.len()
            );
            Ok(Some(AutoApplyReport { applications, skipped }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewCandidate, NewJob};
    use crate::AgentError;
    use chrono::Duration;

    fn seed() -> (Database, i64, i64, i64) {
        let db = Database::in_memory().unwrap();
        let candidate = db
            .create_candidate(NewCandidate {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                ..Default::default()
            })
            .unwrap();
        let a = db.create_job(NewJob { title: "Software Engineer".into(), ..Default::default() }).unwrap();
        let b = db.create_job(NewJob { title: "Data Scientist".into(), ..Default::default() }).unwrap();
        (db, candidate.id, a.id, b.id)
    }

    #[test]
    fn test_watchlist_add_remove() {
        let (db, cid, job_a, _) = seed();
        let entry = db.add_to_watchlist(cid, job_a).unwrap();
        assert_eq!(db.watchlist_for(cid).unwrap(), vec![entry.clone()]);

        let removed = db.remove_from_watchlist(cid, job_a).unwrap();
        assert_eq!(removed.map(|e| e.id), Some(entry.id));
        assert!(db.watchlist_for(cid).unwrap().is_empty());

        // Nothing left to remove is not an error
        assert_eq!(db.remove_from_watchlist(cid, job_a).unwrap(), None);
    }

    #[test]
    fn test_watchlist_allows_duplicates() {
        let (db, cid, job_a, _) = seed();
        db.add_to_watchlist(cid, job_a).unwrap();
        db.add_to_watchlist(cid, job_a).unwrap();
        assert_eq!(db.watchlist_for(cid).unwrap().len(), 2);
        db.remove_from_watchlist(cid, job_a).unwrap();
        assert_eq!(db.watchlist_for(cid).unwrap().len(), 1);
    }

    #[test]
    fn test_watchlist_rejects_unknown_job() {
        let (db, cid, _, _) = seed();
        let err = db.add_to_watchlist(cid, 4242).unwrap_err();
        assert!(matches!(err, AgentError::Database(_)));
        assert!(db.watchlist_for(cid).unwrap().is_empty());
    }

    #[test]
    fn test_schedule_and_update_interview() {
        let (db, cid, job_a, _) = seed();
        let when = Utc::now() + Duration::days(3);
        let interview = db.schedule_interview(cid, job_a, when, InterviewStatus::Scheduled).unwrap();
        assert_eq!(interview.status, InterviewStatus::Scheduled);

        let updated = db
            .update_interview_status(interview.id, InterviewStatus::Completed)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, InterviewStatus::Completed);

        let stored = db.interviews_for(cid).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, InterviewStatus::Completed);
        assert_eq!(stored[0].interview_date, when);

        assert_eq!(db.update_interview_status(999, InterviewStatus::Cancelled).unwrap(), None);
    }

    #[test]
    fn test_auto_apply_submits_every_job() {
        let (db, cid, job_a, job_b) = seed();
        let report = db
            .auto_apply(cid, &[JobRef::id(job_a), JobRef::id(job_b)])
            .unwrap()
            .unwrap();

        assert_eq!(report.applications.len(), 2);
        assert!(report.skipped.is_empty());
        let stored = db.applications_for(cid).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|a| a.status == ApplicationStatus::Submitted));
        assert_eq!(stored.iter().map(|a| a.job_id).collect::<Vec<_>>(), vec![job_a, job_b]);
    }

    #[test]
    fn test_auto_apply_skips_missing_and_unknown_jobs() {
        let (db, cid, job_a, _) = seed();
        let jobs = vec![
            JobRef { id: None, title: Some("No id".into()) },
            JobRef::id(job_a),
            JobRef::id(9999),
        ];
        let report = db.auto_apply(cid, &jobs).unwrap().unwrap();

        assert_eq!(report.applications.len(), 1);
        assert_eq!(report.applications[0].job_id, job_a);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].index, 0);
        assert_eq!(report.skipped[1].job_id, Some(9999));
        assert_eq!(db.applications_for(cid).unwrap().len(), 1);
    }

    #[test]
    fn test_auto_apply_unknown_candidate() {
        let (db, _, job_a, _) = seed();
        assert_eq!(db.auto_apply(777, &[JobRef::id(job_a)]).unwrap(), None);
        assert_eq!(db.get_stats().unwrap().applications, 0);
    }

    #[test]
    fn test_auto_apply_failure_rolls_back_batch() {
        let (db, cid, job_a, job_b) = seed();
        db.transaction(|tx| {
            tx.execute_batch(&format!(
                "CREATE TRIGGER reject_job_b BEFORE INSERT ON applications
                 WHEN NEW.job_id = {}
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
                job_b
            ))?;
            Ok(())
        })
        .unwrap();

        let err = db.auto_apply(cid, &[JobRef::id(job_a), JobRef::id(job_b)]).unwrap_err();
        assert!(matches!(err, AgentError::Database(_)));
        assert!(db.applications_for(cid).unwrap().is_empty());
        assert_eq!(db.get_stats().unwrap().applications, 0);
    }

    #[test]
    fn test_application_status_update() {
        let (db, cid, job_a, _) = seed();
        let application = db.apply(cid, job_a).unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);

        let updated = db
            .update_application_status(application.id, ApplicationStatus::Rejected)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Rejected);
        assert_eq!(db.applications_for(cid).unwrap()[0].status, ApplicationStatus::Rejected);
    }
}
