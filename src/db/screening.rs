// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Screening questionnaires and candidate evaluations

use rusqlite::params;
use tracing::debug;

use super::models::{CandidateEvaluation, CandidateResponse, ScreeningQuestion};
use super::Database;
use crate::{AgentError, Result};

/// Inclusive range accepted for evaluation scores
pub const SCORE_RANGE: std::ops::RangeInclusive<i64> = 0..=100;

impl Database {
    pub fn add_screening_question(&self, job_id: i64, question_text: &str) -> Result<ScreeningQuestion> {
        if question_text.trim().is_empty() {
            return Err(AgentError::Validation("Question text must not be empty".to_string()));
        }
        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO screening_questions (job_id, question_text) VALUES (?1, ?2)",
                params![job_id, question_text],
            )?;
            Ok(ScreeningQuestion {
                id: tx.last_insert_rowid(),
                job_id,
                question_text: question_text.to_string(),
            })
        })
    }

    pub fn questions_for_job(&self, job_id: i64) -> Result<Vec<ScreeningQuestion>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, job_id, question_text FROM screening_questions WHERE job_id = ?1 ORDER BY id",
            )?;
            let questions = stmt
                .query_map(params![job_id], |row| {
                    Ok(ScreeningQuestion {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        question_text: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(questions)
        })
    }

    pub fn record_response(
        &self,
        candidate_id: i64,
        question_id: i64,
        response_text: &str,
    ) -> Result<CandidateResponse> {
        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO candidate_responses (candidate_id, question_id, response_text)
                 VALUES (?1, ?2, ?3)",
                params![candidate_id, question_id, response_text],
            )?;
            debug!("Candidate {} answered question {}", candidate_id, question_id);
            Ok(CandidateResponse {
                id: tx.last_insert_rowid(),
                candidate_id,
                question_id,
                response_text: response_text.to_string(),
            })
        })
    }

    pub fn responses_for(&self, candidate_id: i64) -> Result<Vec<CandidateResponse>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, candidate_id, question_id, response_text
                 FROM candidate_responses WHERE candidate_id = ?1 ORDER BY id",
            )?;
            let responses = stmt
                .query_map(params![candidate_id], |row| {
                    Ok(CandidateResponse {
                        id: row.get(0)?,
                        candidate_id: row.get(1)?,
                        question_id: row.get(2)?,
                        response_text: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(responses)
        })
    }

    pub fn add_evaluation(
        &self,
        candidate_id: i64,
        evaluator_name: &str,
        score: i64,
        feedback: Option<&str>,
    ) -> Result<CandidateEvaluation> {
        if !SCORE_RANGE.contains(&score) {
            return Err(AgentError::Validation(format!(
                "Score {} outside {}..={}",
                score,
                SCORE_RANGE.start(),
                SCORE_RANGE.end()
            )));
        }
        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO candidate_evaluations (candidate_id, evaluator_name, score, feedback)
                 VALUES (?1, ?2, ?3, ?4)",
                params![candidate_id, evaluator_name, score, feedback],
            )?;
            Ok(CandidateEvaluation {
                id: tx.last_insert_rowid(),
                candidate_id,
                evaluator_name: evaluator_name.to_string(),
                score,
                feedback: feedback.map(str::to_string),
            })
        })
    }

    pub fn evaluations_for(&self, candidate_id: i64) -> Result<Vec<CandidateEvaluation>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, candidate_id, evaluator_name, score, feedback
                 FROM candidate_evaluations WHERE candidate_id = ?1 ORDER BY id",
            )?;
            let evaluations = stmt
                .query_map(params![candidate_id], |row| {
                    Ok(CandidateEvaluation {
                        id: row.get(0)?,
                        candidate_id: row.get(1)?,
                        evaluator_name: row.get(2)?,
                        score: row.get(3)?,
                        feedback: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(evaluations)
        })
    }

    /// Mean evaluation score, `None` when nobody has scored the candidate
    pub fn average_score(&self, candidate_id: i64) -> Result<Option<f64>> {
        self.read(|conn| {
            let avg: Option<f64> = conn.query_row(
                "SELECT AVG(score) FROM candidate_evaluations WHERE candidate_id = ?1",
                params![candidate_id],
                |row| row.get(0),
            )?;
            Ok(avg)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewCandidate, NewJob};

    fn seed() -> (Database, i64, i64) {
        let db = Database::in_memory().unwrap();
        let candidate = db
            .create_candidate(NewCandidate {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
                ..Default::default()
            })
            .unwrap();
        let job = db.create_job(NewJob { title: "Compiler Engineer".into(), ..Default::default() }).unwrap();
        (db, candidate.id, job.id)
    }

    #[test]
    fn test_questions_and_responses() {
        let (db, cid, job_id) = seed();
        let q = db.add_screening_question(job_id, "Years of Rust experience?").unwrap();
        assert_eq!(db.questions_for_job(job_id).unwrap(), vec![q.clone()]);

        let r = db.record_response(cid, q.id, "Four").unwrap();
        assert_eq!(db.responses_for(cid).unwrap(), vec![r]);
    }

    #[test]
    fn test_response_to_unknown_question_fails() {
        let (db, cid, _) = seed();
        assert!(db.record_response(cid, 31337, "?").is_err());
        assert!(db.responses_for(cid).unwrap().is_empty());
    }

    #[test]
    fn test_evaluations_and_average() {
        let (db, cid, _) = seed();
        assert_eq!(db.average_score(cid).unwrap(), None);

        db.add_evaluation(cid, "Alice", 80, Some("Strong systems background")).unwrap();
        db.add_evaluation(cid, "Bob", 60, None).unwrap();
        assert_eq!(db.evaluations_for(cid).unwrap().len(), 2);
        assert_eq!(db.average_score(cid).unwrap(), Some(70.0));
    }

    #[test]
    fn test_score_out_of_range() {
        let (db, cid, _) = seed();
        let err = db.add_evaluation(cid, "Alice", 101, None).unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }
}
