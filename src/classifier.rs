//! Category prediction from a pre-trained text model.
//!
//! The model is a multinomial naive Bayes classifier exported to JSON:
//!
//! ```json
//! {
//!   "labels": ["sports", "tech"],
//!   "class_log_prior": [-0.69, -0.69],
//!   "vocabulary": {"goal": 0, "rust": 1},
//!   "feature_log_prob": [[-0.2, -1.8], [-1.8, -0.2]]
//! }
//! ```
//!
//! It is loaded once at startup and shared read-only between requests.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model file {0} not found")]
    NotFound(PathBuf),

    #[error("failed to read model file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid model: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    labels: Vec<String>,
    class_log_prior: Vec<f64>,
    vocabulary: HashMap<String, usize>,
    feature_log_prob: Vec<Vec<f64>>,
}

#[derive(Debug)]
pub struct Classifier {
    labels: Vec<String>,
    class_log_prior: Vec<f64>,
    vocabulary: HashMap<String, usize>,
    feature_log_prob: Vec<Vec<f64>>,
    token: Regex,
}

impl Classifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::NotFound(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&raw).map_err(|e| match e {
            ClassifierError::Parse { source, .. } => ClassifierError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let model: ModelFile = serde_json::from_str(raw).map_err(|source| ClassifierError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        Self::from_model(model)
    }

    fn from_model(model: ModelFile) -> Result<Self, ClassifierError> {
        let n_labels = model.labels.len();
        if n_labels == 0 {
            return Err(ClassifierError::Invalid("no labels".to_string()));
        }
        if model.class_log_prior.len() != n_labels || model.feature_log_prob.len() != n_labels {
            return Err(ClassifierError::Invalid(format!(
                "expected {n_labels} priors and feature rows, got {} and {}",
                model.class_log_prior.len(),
                model.feature_log_prob.len()
            )));
        }

        let n_features = model.vocabulary.len();
        if let Some(row) = model.feature_log_prob.iter().find(|row| row.len() != n_features) {
            return Err(ClassifierError::Invalid(format!(
                "feature row has {} entries, vocabulary has {n_features}",
                row.len()
            )));
        }
        if let Some((token, idx)) = model.vocabulary.iter().find(|(_, idx)| **idx >= n_features) {
            return Err(ClassifierError::Invalid(format!(
                "token {token:?} maps to out-of-range feature {idx}"
            )));
        }

        let token = Regex::new(r"\b\w\w+\b").map_err(|e| ClassifierError::Invalid(e.to_string()))?;

        Ok(Self {
            labels: model.labels,
            class_log_prior: model.class_log_prior,
            vocabulary: model.vocabulary,
            feature_log_prob: model.feature_log_prob,
            token,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Most likely category for `text`. Ties go to the earlier label.
    pub fn predict(&self, text: &str) -> &str {
        let counts = self.feature_counts(text);

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (label, prior) in self.class_log_prior.iter().enumerate() {
            let row = &self.feature_log_prob[label];
            let score = prior
                + counts
                    .iter()
                    .map(|(feature, count)| *count as f64 * row[*feature])
                    .sum::<f64>();

            if score > best_score {
                best = label;
                best_score = score;
            }
        }

        &self.labels[best]
    }

    fn feature_counts(&self, text: &str) -> HashMap<usize, usize> {
        let lowered = text.to_lowercase();
        let mut counts = HashMap::new();

        for token in self.token.find_iter(&lowered) {
            if let Some(feature) = self.vocabulary.get(token.as_str()) {
                *counts.entry(*feature).or_insert(0) += 1;
            }
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MODEL: &str = r#"{
        "labels": ["sports", "tech"],
        "class_log_prior": [-0.6931, -0.6931],
        "vocabulary": {"goal": 0, "match": 1, "rust": 2, "compiler": 3},
        "feature_log_prob": [
            [-0.5, -0.7, -3.0, -3.0],
            [-3.0, -3.0, -0.5, -0.7]
        ]
    }"#;

    #[test]
    fn predicts_the_highest_scoring_label() {
        let model = Classifier::from_json(MODEL).unwrap();
        assert_eq!(model.predict("The Rust compiler is fast"), "tech");
        assert_eq!(model.predict("Late goal wins the MATCH"), "sports");
    }

    #[test]
    fn unknown_words_fall_back_to_prior() {
        let model = Classifier::from_json(MODEL).unwrap();
        assert_eq!(model.predict(""), "sports");
        assert_eq!(model.predict("zzz qqq"), "sports");
    }

    #[test]
    fn single_character_tokens_are_ignored() {
        let model = Classifier::from_json(
            r#"{"labels": ["a", "b"], "class_log_prior": [-1.0, -0.5],
                "vocabulary": {"x": 0}, "feature_log_prob": [[-0.1], [-9.0]]}"#,
        )
        .unwrap();
        assert_eq!(model.predict("x x x x"), "b");
    }

    #[test]
    fn exposes_labels() {
        let model = Classifier::from_json(MODEL).unwrap();
        assert_eq!(model.labels(), ["sports", "tech"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Classifier::load("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, ClassifierError::NotFound(_)));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MODEL.as_bytes()).unwrap();

        let model = Classifier::load(file.path()).unwrap();
        assert_eq!(model.predict("rust"), "tech");
    }

    #[test]
    fn garbage_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();

        let err = Classifier::load(file.path()).unwrap_err();
        match err {
            ClassifierError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let err = Classifier::from_json(
            r#"{"labels": ["a", "b"], "class_log_prior": [-1.0],
                "vocabulary": {}, "feature_log_prob": [[], []]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::Invalid(_)));

        let err = Classifier::from_json(
            r#"{"labels": ["a"], "class_log_prior": [-1.0],
                "vocabulary": {"word": 3}, "feature_log_prob": [[-0.1]]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::Invalid(_)));
    }
}
