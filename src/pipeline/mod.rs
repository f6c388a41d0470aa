// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Offline data pipeline: interchange files, cleaning, and the job-level
//! classifier

pub mod clean;
pub mod features;
pub mod forest;
pub mod model;
pub mod store;
pub mod tabular;
pub mod tfidf;

pub use clean::{clean_json_file, clean_listings, clean_numeric_csv, CleanStats, NumericCleanStats};
pub use features::extract_features;
pub use forest::{ForestParams, RandomForest};
pub use model::{evaluate, predict, train, Metrics, ModelArtifacts, TrainingConfig};
pub use store::{json_to_csv, read_csv, read_json, write_csv, write_json, WriteMode};
pub use tabular::{preprocess_title_listing, relabel_levels, TitleRecord};
pub use tfidf::TfidfVectorizer;
