// Text Pipeline
// Fitted TF-IDF stage + estimator + ordered classes, persisted as one JSON artifact

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::linear::{CalibratedSvm, LogisticRegression};
use super::naive_bayes::MultinomialNb;
use super::tfidf::TfidfVectorizer;
use super::{SupportsFeatureWeights, TextClassifier};
use crate::services::errors::ClassifierError;

/// The three trained model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKind {
    Svm,
    NaiveBayes,
    LogisticRegression,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Svm, ModelKind::NaiveBayes, ModelKind::LogisticRegression];

    /// Registry key
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Svm => "SVM",
            ModelKind::NaiveBayes => "NaiveBayes",
            ModelKind::LogisticRegression => "LogisticRegression",
        }
    }

    pub fn artifact_file(&self) -> &'static str {
        match self {
            ModelKind::Svm => "svm_pipeline.json",
            ModelKind::NaiveBayes => "nb_pipeline.json",
            ModelKind::LogisticRegression => "lr_pipeline.json",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Estimator {
    NaiveBayes(MultinomialNb),
    LogisticRegression(LogisticRegression),
    LinearSvm(CalibratedSvm),
}

impl Estimator {
    fn predict_proba(&self, row: &super::tfidf::SparseVector) -> Vec<f64> {
        match self {
            Estimator::NaiveBayes(nb) => nb.predict_proba(row),
            Estimator::LogisticRegression(lr) => lr.predict_proba(row),
            Estimator::LinearSvm(svm) => svm.predict_proba(row),
        }
    }

    fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        match self {
            Estimator::NaiveBayes(nb) => nb.validate(n_classes, n_features),
            Estimator::LogisticRegression(lr) => lr.validate(n_classes, n_features),
            Estimator::LinearSvm(svm) => svm.validate(n_classes, n_features),
        }
    }

    fn linear_weights(&self) -> Option<&[f64]> {
        match self {
            Estimator::NaiveBayes(_) => None,
            Estimator::LogisticRegression(lr) => Some(lr.model().positive_class_weights()),
            Estimator::LinearSvm(svm) => Some(svm.model().positive_class_weights()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPipeline {
    name: String,
    classes: Vec<String>,
    vectorizer: TfidfVectorizer,
    estimator: Estimator,
    #[serde(default)]
    trained_at: Option<String>,
}

impl TextPipeline {
    pub fn new(
        name: impl Into<String>,
        classes: Vec<String>,
        vectorizer: TfidfVectorizer,
        estimator: Estimator,
    ) -> Self {
        Self {
            name: name.into(),
            classes,
            vectorizer,
            estimator,
            trained_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Load and validate an artifact
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let content = fs::read_to_string(path)?;
        let pipeline: TextPipeline =
            serde_json::from_str(&content).map_err(|e| ClassifierError::Artifact {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        pipeline.validate().map_err(|message| ClassifierError::Artifact {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(pipeline)
    }

    /// Shapes must agree across classes, vectorizer columns and estimator weights
    fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err(format!("expected at least 2 classes, found {}", self.classes.len()));
        }
        self.vectorizer.validate()?;
        self.estimator
            .validate(self.classes.len(), self.vectorizer.vocabulary_size())
    }

    /// Write to a sibling temp file, then rename over the target
    pub fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn trained_at(&self) -> Option<&str> {
        self.trained_at.as_deref()
    }
}

impl TextClassifier for TextPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, ClassifierError> {
        let row = self.vectorizer.transform(text).map_err(|e| ClassifierError::Inference {
            model: self.name.clone(),
            message: e.to_string(),
        })?;
        Ok(self.estimator.predict_proba(&row))
    }

    fn as_feature_weights(&self) -> Option<&dyn SupportsFeatureWeights> {
        match self.estimator {
            Estimator::NaiveBayes(_) => None,
            _ => Some(self),
        }
    }
}

impl SupportsFeatureWeights for TextPipeline {
    fn feature_weights(&self) -> Vec<(String, f64)> {
        let Some(weights) = self.estimator.linear_weights() else {
            return Vec::new();
        };
        self.vectorizer
            .feature_names()
            .into_iter()
            .zip(weights.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::linear::LinearOptions;
    use crate::services::classifier::top_features;

    fn docs() -> (Vec<String>, Vec<usize>) {
        let docs = vec![
            "best product ever buy now amazing",
            "amazing amazing best deal buy now",
            "battery died after two weeks",
            "works fine but the strap broke",
        ];
        (docs.into_iter().map(String::from).collect(), vec![0, 0, 1, 1])
    }

    fn fitted(kind: ModelKind) -> TextPipeline {
        let (texts, labels) = docs();
        let mut vectorizer = TfidfVectorizer::default();
        let rows = vectorizer.fit_transform(&texts).unwrap();
        let n = vectorizer.vocabulary_size();
        let opts = LinearOptions::default();
        let estimator = match kind {
            ModelKind::NaiveBayes => Estimator::NaiveBayes(MultinomialNb::fit(&rows, &labels, 2, n, 1.0).unwrap()),
            ModelKind::LogisticRegression => {
                Estimator::LogisticRegression(LogisticRegression::fit(&rows, &labels, 2, n, opts).unwrap())
            }
            ModelKind::Svm => Estimator::LinearSvm(CalibratedSvm::fit(&rows, &labels, 2, n, opts).unwrap()),
        };
        TextPipeline::new(kind.name(), vec!["CG".to_string(), "OR".to_string()], vectorizer, estimator)
    }

    #[test]
    fn test_model_kind_names() {
        assert_eq!(ModelKind::from_name("SVM"), Some(ModelKind::Svm));
        assert_eq!(ModelKind::NaiveBayes.artifact_file(), "nb_pipeline.json");
        assert_eq!(ModelKind::from_name("svm"), None);
    }

    #[test]
    fn test_pipeline_predicts_training_direction() {
        for kind in ModelKind::ALL {
            let p = fitted(kind);
            let pred = p.predict("buy now, amazing deal").unwrap();
            assert_eq!(pred.label, "CG", "{}", kind.name());
            assert!((pred.probs.values().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_artifact_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ModelKind::LogisticRegression.artifact_file());
        let original = fitted(ModelKind::LogisticRegression);
        original.save(&path).unwrap();

        let loaded = TextPipeline::load(&path).unwrap();
        assert_eq!(loaded.name(), "LogisticRegression");
        let a = original.predict_proba("battery broke").unwrap();
        let b = loaded.predict_proba("battery broke").unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_corrupt_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svm_pipeline.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(TextPipeline::load(&path), Err(ClassifierError::Artifact { .. })));
    }

    fn tampered(kind: ModelKind, edit: impl FnOnce(&mut serde_json::Value)) -> Result<TextPipeline, ClassifierError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(kind.artifact_file());
        fitted(kind).save(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        edit(&mut value);
        fs::write(&path, value.to_string()).unwrap();
        TextPipeline::load(&path)
    }

    #[test]
    fn test_out_of_range_vocabulary_index_rejected_at_load() {
        let result = tampered(ModelKind::NaiveBayes, |v| {
            v["vectorizer"]["vocabulary"]["amazing"] = serde_json::json!(99_999);
        });
        assert!(matches!(result, Err(ClassifierError::Artifact { .. })));
    }

    #[test]
    fn test_estimator_width_mismatch_rejected_at_load() {
        for kind in ModelKind::ALL {
            let result = tampered(kind, |v| {
                let n = v["vectorizer"]["idf"].as_array().unwrap().len();
                v["vectorizer"]["vocabulary"]["zzzz"] = serde_json::json!(n);
                v["vectorizer"]["idf"].as_array_mut().unwrap().push(serde_json::json!(1.0));
            });
            assert!(
                matches!(result, Err(ClassifierError::Artifact { .. })),
                "{}",
                kind.name()
            );
        }
    }

    #[test]
    fn test_class_count_mismatch_rejected_at_load() {
        let result = tampered(ModelKind::LogisticRegression, |v| {
            v["classes"].as_array_mut().unwrap().push(serde_json::json!("XX"));
        });
        assert!(matches!(result, Err(ClassifierError::Artifact { .. })));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svm_pipeline.json");
        fs::create_dir(&path).unwrap();

        assert!(fitted(ModelKind::Svm).save(&path).is_err());
        assert!(!dir.path().join("svm_pipeline.json.tmp").exists());
    }

    #[test]
    fn test_feature_weight_capability() {
        assert!(fitted(ModelKind::NaiveBayes).as_feature_weights().is_none());
        let lr = fitted(ModelKind::LogisticRegression);
        let impacts = top_features(&lr, 3).unwrap();
        assert!(impacts.iter().any(|f| f.class_label == "OR"));
        assert!(impacts.iter().any(|f| f.class_label == "CG"));
    }
}
