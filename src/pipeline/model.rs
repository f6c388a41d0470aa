// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Job-level classifier: training, evaluation, prediction and persistence

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

use super::forest::{ForestParams, RandomForest};
use super::tabular::TitleRecord;
use super::tfidf::TfidfVectorizer;
use crate::config::ModelConfig;
use crate::{AgentError, Result};

/// Training hyperparameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    pub max_features: usize,
    pub test_fraction: f64,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            test_fraction: 0.2,
            forest: ForestParams::default(),
        }
    }
}

impl From<&ModelConfig> for TrainingConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_features: config.max_features,
            test_fraction: config.test_fraction,
            forest: ForestParams {
                n_trees: config.n_trees,
                max_depth: config.max_depth,
                min_samples_split: config.min_samples_split,
                seed: config.seed,
            },
        }
    }
}

/// Everything needed to predict a level from a title record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifacts {
    pub vectorizer: TfidfVectorizer,
    /// Sorted label list; forest outputs index into it
    pub classes: Vec<String>,
    pub forest: RandomForest,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifacts {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        serde_json::to_writer(BufWriter::new(File::create(path)?), self)?;
        info!("Model saved to {:?}", path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            AgentError::Model(format!("Cannot open model {:?}: {}", path, e))
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Classification scores; precision, recall and F1 are support-weighted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

pub fn classification_metrics(truth: &[String], predicted: &[String]) -> Metrics {
    let support = truth.len().min(predicted.len());
    if support == 0 {
        return Metrics::default();
    }

    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    let labels: BTreeSet<&String> = truth.iter().take(support).collect();

    let mut metrics = Metrics {
        accuracy: correct as f64 / support as f64,
        support,
        ..Default::default()
    };

    for label in labels {
        let pairs = || truth.iter().zip(predicted);
        let tp = pairs().filter(|(t, p)| *t == label && *p == label).count() as f64;
        let predicted_pos = pairs().filter(|(_, p)| *p == label).count() as f64;
        let actual = pairs().filter(|(t, _)| *t == label).count() as f64;

        let precision = if predicted_pos > 0.0 { tp / predicted_pos } else { 0.0 };
        let recall = tp / actual;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let weight = actual / support as f64;
        metrics.precision += weight * precision;
        metrics.recall += weight * recall;
        metrics.f1 += weight * f1;
    }

    metrics
}

fn labelled(records: &[TitleRecord]) -> Vec<&TitleRecord> {
    records.iter().filter(|r| !r.job_level.trim().is_empty()).collect()
}

/// Fit the vectorizer and forest on a seeded split of the labelled records.
/// Metrics cover the held-out part and are `None` when it is empty.
pub fn train(records: &[TitleRecord], config: &TrainingConfig) -> Result<(ModelArtifacts, Option<Metrics>)> {
    if !(0.0..1.0).contains(&config.test_fraction) {
        return Err(AgentError::Model(format!(
            "test_fraction must be in [0, 1), got {}",
            config.test_fraction
        )));
    }

    let mut rows = labelled(records);
    if rows.is_empty() {
        return Err(AgentError::Model("No labelled records to train on".to_string()));
    }

    let classes: Vec<String> = rows
        .iter()
        .map(|r| r.job_level.trim().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut rng = StdRng::seed_from_u64(config.forest.seed);
    rows.shuffle(&mut rng);

    let n_test = ((rows.len() as f64 * config.test_fraction).round() as usize).min(rows.len() - 1);
    let (test, train_rows) = rows.split_at(n_test);
    debug!("Training on {} rows, holding out {}", train_rows.len(), test.len());

    let texts: Vec<String> = train_rows.iter().map(|r| r.combined_text()).collect();
    let mut vectorizer = TfidfVectorizer::new(config.max_features);
    let x = vectorizer.fit_transform(&texts);
    let y: Vec<usize> = train_rows
        .iter()
        .map(|r| class_index(&classes, r.job_level.trim()))
        .collect::<Result<_>>()?;

    let forest = RandomForest::fit(&x, &y, classes.len(), config.forest)?;
    let artifacts = ModelArtifacts {
        vectorizer,
        classes,
        forest,
        trained_at: Utc::now(),
    };

    let metrics = if test.is_empty() {
        None
    } else {
        let owned: Vec<TitleRecord> = test.iter().map(|r| (*r).clone()).collect();
        Some(evaluate(&artifacts, &owned)?)
    };

    info!(
        "Trained {} trees over {} features and {} classes",
        artifacts.forest.n_trees(),
        artifacts.vectorizer.len(),
        artifacts.classes.len()
    );
    Ok((artifacts, metrics))
}

fn class_index(classes: &[String], label: &str) -> Result<usize> {
    classes
        .iter()
        .position(|c| c == label)
        .ok_or_else(|| AgentError::Model(format!("Unknown label '{}'", label)))
}

/// Score the model against labelled records
pub fn evaluate(artifacts: &ModelArtifacts, records: &[TitleRecord]) -> Result<Metrics> {
    let rows = labelled(records);
    if rows.is_empty() {
        return Err(AgentError::Model("No labelled records to evaluate".to_string()));
    }

    let truth: Vec<String> = rows.iter().map(|r| r.job_level.trim().to_string()).collect();
    let predicted: Vec<String> = rows.iter().map(|r| predict(artifacts, r)).collect();
    Ok(classification_metrics(&truth, &predicted))
}

/// Predicted level label for one record
pub fn predict(artifacts: &ModelArtifacts, record: &TitleRecord) -> String {
    let row = artifacts.vectorizer.transform(&record.combined_text());
    let class = artifacts.forest.predict_one(&row);
    artifacts.classes.get(class).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, unit: &str, level: &str) -> TitleRecord {
        TitleRecord {
            job_title: title.to_string(),
            negotiating_unit: unit.to_string(),
            job_level: level.to_string(),
            ..Default::default()
        }
    }

    fn corpus() -> Vec<TitleRecord> {
        let mut records = Vec::new();
        for i in 0..10 {
            records.push(record(&format!("Clerk Trainee {}", i), "CSEA", "Entry-level"));
            records.push(record(&format!("Senior Analyst {}", i), "PS&T", "Mid-level"));
            records.push(record(&format!("Deputy Director {}", i), "Management", "Advanced-level"));
        }
        records
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            max_features: 50,
            test_fraction: 0.2,
            forest: ForestParams { n_trees: 15, max_depth: 10, min_samples_split: 2, seed: 3 },
        }
    }

    #[test]
    fn test_train_and_predict() {
        let (artifacts, metrics) = train(&corpus(), &config()).unwrap();
        assert_eq!(artifacts.classes, vec!["Advanced-level", "Entry-level", "Mid-level"]);

        let metrics = metrics.unwrap();
        assert_eq!(metrics.support, 6);
        assert!(metrics.accuracy > 0.8);

        assert_eq!(predict(&artifacts, &record("Clerk Trainee", "CSEA", "")), "Entry-level");
        assert_eq!(predict(&artifacts, &record("Deputy Director", "Management", "")), "Advanced-level");
    }

    #[test]
    fn test_train_without_labels_fails() {
        let records = vec![record("Clerk", "CSEA", ""), record("Analyst", "PS&T", " ")];
        assert!(matches!(train(&records, &config()), Err(AgentError::Model(_))));
    }

    #[test]
    fn test_single_record_has_no_holdout() {
        let (artifacts, metrics) = train(&[record("Clerk", "CSEA", "Entry-level")], &config()).unwrap();
        assert!(metrics.is_none());
        assert_eq!(artifacts.classes, vec!["Entry-level"]);
    }

    #[test]
    fn test_artifacts_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");
        let (artifacts, _) = train(&corpus(), &config()).unwrap();

        artifacts.save(&path).unwrap();
        let loaded = ModelArtifacts::load(&path).unwrap();
        assert_eq!(loaded.classes, artifacts.classes);
        assert_eq!(loaded.forest.n_trees(), 15);
        for r in corpus() {
            assert_eq!(predict(&loaded, &r), predict(&artifacts, &r));
        }

        assert!(ModelArtifacts::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_classification_metrics() {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        let truth = s(&["a", "a", "b", "b"]);
        let predicted = s(&["a", "b", "b", "b"]);
        let m = classification_metrics(&truth, &predicted);

        assert_eq!(m.accuracy, 0.75);
        // a: p=1, r=0.5; b: p=2/3, r=1
        assert!((m.precision - (0.5 * 1.0 + 0.5 * (2.0 / 3.0))).abs() < 1e-9);
        assert!((m.recall - 0.75).abs() < 1e-9);
        assert_eq!(m.support, 4);
    }
}
