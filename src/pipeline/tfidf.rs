// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! TF-IDF text vectorizer
//!
//! Tokens are lowercase runs of two or more word characters. The vocabulary
//! keeps the `max_features` terms with the highest corpus frequency and
//! indexes them alphabetically. Weights use smoothed idf,
//! `ln((1 + n) / (1 + df)) + 1`, and every row is L2-normalized.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

pub fn tokenize(text: &str) -> Vec<String> {
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"\b\w\w+\b").unwrap());
    let lower = text.to_lowercase();
    re.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// Terms in column order
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names = vec![""; self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            names[idx] = term.as_str();
        }
        names
    }

    pub fn fit<S: AsRef<str>>(&mut self, docs: &[S]) {
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in docs {
            let tokens = tokenize(doc.as_ref());
            let unique: HashSet<&String> = tokens.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            for term in tokens {
                *term_counts.entry(term).or_default() += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let n = docs.len() as f64;
        self.idf = terms
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();
    }

    /// Dense, L2-normalized TF-IDF row for one document
    pub fn transform(&self, doc: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.idf.len()];
        for token in tokenize(doc) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                row[idx] += 1.0;
            }
        }
        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
        row
    }

    pub fn transform_all<S: AsRef<str>>(&self, docs: &[S]) -> Vec<Vec<f64>> {
        docs.iter().map(|d| self.transform(d.as_ref())).collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, docs: &[S]) -> Vec<Vec<f64>> {
        self.fit(docs);
        self.transform_all(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Senior C# Engineer, PS&T a"),
            vec!["senior", "engineer", "ps"]
        );
    }

    #[test]
    fn test_vocabulary_is_alphabetical_and_capped() {
        let mut v = TfidfVectorizer::new(2);
        v.fit(&["data data data analyst", "data engineer engineer", "clerk"]);
        // "data" (4) and "engineer" (2) survive; "analyst" and "clerk" do not
        assert_eq!(v.feature_names(), vec!["data", "engineer"]);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_rows_are_normalized() {
        let mut v = TfidfVectorizer::new(100);
        let rows = v.fit_transform(&["software engineer", "data engineer", "data scientist"]);
        for row in &rows {
            let norm: f64 = row.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
        // Unseen words only: all zero, not NaN
        assert!(v.transform("plumber").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let mut v = TfidfVectorizer::new(100);
        v.fit(&["data engineer", "data scientist", "data analyst"]);
        let row = v.transform("data engineer");
        let names = v.feature_names();
        let data = row[names.iter().position(|&n| n == "data").unwrap()];
        let engineer = row[names.iter().position(|&n| n == "engineer").unwrap()];
        assert!(engineer > data);
    }
}
