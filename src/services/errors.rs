// Error Types
// Classifier, scoring and capability failures

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Inference failed for {model}: {message}")]
    Inference { model: String, message: String },
    #[error("Invalid model artifact {path}: {message}")]
    Artifact { path: PathBuf, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Training failed: {0}")]
    Training(String),
    #[error("Model is not fitted")]
    NotFitted,
}

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Model '{requested}' not found. Available models: [{}]", available.join(", "))]
    ModelNotFound {
        requested: String,
        available: Vec<String>,
    },
    #[error("Primary model {model} failed: {message}")]
    Inference { model: String, message: String },
    #[error("No 'text' field found")]
    MissingText,
    #[error("History store error: {0}")]
    History(String),
    #[error(transparent)]
    FeatureWeights(#[from] FeatureWeightsUnsupported),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Model {model} does not expose feature weights")]
pub struct FeatureWeightsUnsupported {
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_lists_available() {
        let err = ScoringError::ModelNotFound {
            requested: "KNN".to_string(),
            available: vec!["NaiveBayes".to_string(), "SVM".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Model 'KNN' not found. Available models: [NaiveBayes, SVM]"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ClassifierError = io.into();
        assert!(matches!(err, ClassifierError::Io(_)));
    }
}
