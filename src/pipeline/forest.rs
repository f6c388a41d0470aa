// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Random forest classifier over dense feature rows

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{AgentError, Result};

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 16,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> usize {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { class } => return *class,
                Node::Split { feature, threshold, left, right } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    node = if value <= *threshold { left } else { right };
                }
            }
        }
    }
}

fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &i in indices {
        counts[y[i]] += 1;
    }
    counts
}

/// Most frequent class; ties go to the lower class index
fn majority(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(class, _)| class)
        .unwrap_or(0)
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / total).powi(2)).sum::<f64>()
}

/// Candidate features tried at each split: floor(sqrt(d)), at least one
fn features_per_split(n_features: usize) -> usize {
    ((n_features as f64).sqrt().floor() as usize).clamp(1, n_features.max(1))
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    features_per_split: usize,
    params: ForestParams,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: &[usize], depth: usize, rng: &mut StdRng) -> Node {
        let counts = class_counts(self.y, indices, self.n_classes);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure || depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return Node::Leaf { class: majority(&counts) };
        }

        match self.best_split(indices, &counts, rng) {
            Some((feature, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| self.x[i][feature] <= threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(&left, depth + 1, rng)),
                    right: Box::new(self.build(&right, depth + 1, rng)),
                }
            }
            None => Node::Leaf { class: majority(&counts) },
        }
    }

    /// Lowest weighted Gini impurity over a random feature subset
    fn best_split(&self, indices: &[usize], counts: &[usize], rng: &mut StdRng) -> Option<(usize, f64)> {
        let parent = gini(counts, indices.len());
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in sample(rng, self.n_features, self.features_per_split).into_iter() {
            let mut values: Vec<(f64, usize)> =
                indices.iter().map(|&i| (self.x[i][feature], self.y[i])).collect();
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0; self.n_classes];
            let mut right = counts.to_vec();
            let total = values.len();

            for split in 1..total {
                let (value, class) = values[split - 1];
                left[class] += 1;
                right[class] -= 1;

                let next = values[split].0;
                if next <= value {
                    continue;
                }

                let weighted = (split as f64 * gini(&left, split)
                    + (total - split) as f64 * gini(&right, total - split))
                    / total as f64;

                if weighted < parent && best.map_or(true, |(_, _, b)| weighted < b) {
                    best = Some((feature, (value + next) / 2.0, weighted));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

/// Bagged ensemble of Gini decision trees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<Node>,
}

impl RandomForest {
    /// Train on rows `x` with class indices `y` (each below `n_classes`)
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: ForestParams) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(AgentError::Model(format!(
                "Need matching non-empty features and labels, got {} rows and {} labels",
                x.len(),
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(AgentError::Model("Forest needs at least one tree".to_string()));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(AgentError::Model(format!("Label {} out of range for {} classes", bad, n_classes)));
        }

        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(AgentError::Model("Feature rows have different lengths".to_string()));
        }

        let builder = TreeBuilder {
            x,
            y,
            n_classes,
            n_features,
            features_per_split: features_per_split(n_features),
            params,
        };

        let n = x.len();
        let trees = (0..params.n_trees)
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                if n_features == 0 {
                    Node::Leaf { class: majority(&class_counts(y, &bootstrap, n_classes)) }
                } else {
                    builder.build(&bootstrap, 0, &mut rng)
                }
            })
            .collect();

        Ok(Self { n_classes, n_features, trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Majority vote across trees
    pub fn predict_one(&self, row: &[f64]) -> usize {
        let mut votes = vec![0; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(row)] += 1;
        }
        majority(&votes)
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<usize> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(n_trees: usize) -> ForestParams {
        ForestParams { n_trees, max_depth: 8, min_samples_split: 2, seed: 7 }
    }

    #[test]
    fn test_separable_data() {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, if i % 2 == 0 { 1.0 } else { 0.0 }])
            .collect();
        let y: Vec<usize> = (0..40).map(|i| if i < 20 { 0 } else { 1 }).collect();

        let forest = RandomForest::fit(&x, &y, 2, params(25)).unwrap();
        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict_one(&[2.0, 1.0]), 0);
        assert_eq!(forest.predict_one(&[37.0, 0.0]), 1);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![(i % 7) as f64, (i % 3) as f64]).collect();
        let y: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let a = RandomForest::fit(&x, &y, 3, params(5)).unwrap();
        let b = RandomForest::fit(&x, &y, 3, params(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_class() {
        let x = vec![vec![1.0], vec![2.0]];
        let forest = RandomForest::fit(&x, &[1, 1], 2, params(3)).unwrap();
        assert_eq!(forest.predict(&x), vec![1, 1]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(RandomForest::fit(&[], &[], 2, params(3)).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[5], 2, params(3)).is_err());
        assert!(RandomForest::fit(&[vec![1.0], vec![1.0, 2.0]], &[0, 1], 2, params(3)).is_err());
    }

    #[test]
    fn test_features_per_split_floors() {
        assert_eq!(features_per_split(1), 1);
        assert_eq!(features_per_split(2), 1);
        assert_eq!(features_per_split(8), 2);
        assert_eq!(features_per_split(10), 3);
        assert_eq!(features_per_split(1000), 31);
    }

    #[test]
    fn test_majority_tie_breaks_low() {
        assert_eq!(majority(&[2, 2, 1]), 0);
        assert_eq!(majority(&[0, 3, 3]), 1);
    }
}
