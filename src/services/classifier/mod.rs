// Classifier Module
// Trained text classifiers and the registry that serves them:
// - tfidf: vectorization stage
// - naive_bayes / linear: classification stages
// - pipeline: fitted vectorizer + estimator persisted as a JSON artifact
// - registry: immutable model snapshots behind an atomically swapped handle
// - train / dataset: retraining from a labelled CSV

pub mod dataset;
pub mod linear;
pub mod naive_bayes;
pub mod pipeline;
pub mod registry;
pub mod tfidf;
pub mod train;

use std::collections::BTreeMap;

use crate::models::FeatureImpact;
use crate::services::errors::{ClassifierError, FeatureWeightsUnsupported};

pub use pipeline::{ModelKind, TextPipeline};
pub use registry::{ClassifierRegistry, SharedRegistry};
pub use train::{train_all, TrainOutcome};

/// One model's output for one text
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Class label -> probability
    pub probs: BTreeMap<String, f64>,
    /// Max class probability
    pub confidence: f64,
}

impl Prediction {
    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.probs.get(label).copied()
    }
}

/// A trained text classifier with a fixed, ordered class set
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classes(&self) -> &[String];

    /// Probabilities aligned with `classes()`
    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, ClassifierError>;

    /// Argmax label plus the full distribution; the first class wins ties
    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let probs = self.predict_proba(text)?;
        let classes = self.classes();
        if probs.len() != classes.len() || classes.is_empty() {
            return Err(ClassifierError::Inference {
                model: self.name().to_string(),
                message: format!(
                    "expected {} probabilities, got {}",
                    classes.len(),
                    probs.len()
                ),
            });
        }
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::Inference {
                model: self.name().to_string(),
                message: "non-finite probability".to_string(),
            });
        }

        let mut best = 0usize;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }

        Ok(Prediction {
            label: classes[best].clone(),
            confidence: probs[best],
            probs: classes.iter().cloned().zip(probs.iter().copied()).collect(),
        })
    }

    /// Present when the model can expose per-feature linear weights
    fn as_feature_weights(&self) -> Option<&dyn SupportsFeatureWeights> {
        None
    }
}

/// Linear models whose weights are meaningful per input feature
pub trait SupportsFeatureWeights {
    /// (feature, weight); positive weights favour the second class
    fn feature_weights(&self) -> Vec<(String, f64)>;
}

/// Top `top` features pushing towards the second class, then the top `top`
/// pushing towards the first
pub fn top_features(
    classifier: &dyn TextClassifier,
    top: usize,
) -> Result<Vec<FeatureImpact>, FeatureWeightsUnsupported> {
    let weights = classifier
        .as_feature_weights()
        .ok_or_else(|| FeatureWeightsUnsupported {
            model: classifier.name().to_string(),
        })?
        .feature_weights();

    let classes = classifier.classes();
    let first = classes.first().cloned().unwrap_or_default();
    let second = classes.get(1).cloned().unwrap_or_default();

    let mut ranked = weights;
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut impacts: Vec<FeatureImpact> = ranked
        .iter()
        .filter(|(_, w)| *w > 0.0)
        .take(top)
        .map(|(name, w)| FeatureImpact {
            name: name.clone(),
            impact: *w,
            class_label: second.clone(),
        })
        .collect();

    impacts.extend(
        ranked
            .iter()
            .rev()
            .filter(|(_, w)| *w < 0.0)
            .take(top)
            .map(|(name, w)| FeatureImpact {
                name: name.clone(),
                impact: *w,
                class_label: first.clone(),
            }),
    );

    Ok(impacts)
}
