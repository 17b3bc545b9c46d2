// Consensus Engine
// Runs every registered classifier over one text, keeps each model's outcome,
// then averages the authentic-class probability into a trust score

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

use super::round2;
use crate::models::ConsensusResult;
use crate::services::classifier::{ClassifierRegistry, Prediction, SharedRegistry};
use crate::services::errors::{ClassifierError, ScoringError};

/// Probability used when a model has no authentic class
const MISSING_CLASS_PROBABILITY: f64 = 0.5;

pub type ModelOutcome = (String, Result<Prediction, ClassifierError>);

/// Authentic-class probability from one prediction
fn authentic_probability(prediction: &Prediction, authentic_label: &str) -> f64 {
    prediction
        .probability_of(authentic_label)
        .unwrap_or(MISSING_CLASS_PROBABILITY)
}

/// Mean authentic-class probability over successful outcomes, in [0, 100].
/// No successful outcome gives 0.
pub fn trust_score(outcomes: &[ModelOutcome], authentic_label: &str) -> f64 {
    let probs: Vec<f64> = outcomes
        .iter()
        .filter_map(|(_, r)| r.as_ref().ok())
        .map(|p| authentic_probability(p, authentic_label))
        .collect();
    if probs.is_empty() {
        return 0.0;
    }
    let mean = probs.iter().sum::<f64>() / probs.len() as f64;
    round2((mean * 100.0).clamp(0.0, 100.0))
}

/// Model name -> predicted label for every successful outcome
pub fn vote_map(outcomes: &[ModelOutcome]) -> BTreeMap<String, String> {
    outcomes
        .iter()
        .filter_map(|(name, r)| r.as_ref().ok().map(|p| (name.clone(), p.label.clone())))
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Query every model in the snapshot; failures and panics are kept, not raised
pub fn run_all(registry: &ClassifierRegistry, text: &str) -> Vec<ModelOutcome> {
    registry
        .iter()
        .map(|(name, model)| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| model.predict(text)))
                .unwrap_or_else(|payload| {
                    Err(ClassifierError::Inference {
                        model: name.clone(),
                        message: format!("model panicked: {}", panic_message(payload.as_ref())),
                    })
                });
            if let Err(e) = &outcome {
                warn!("[CONSENSUS] Model {} excluded from vote: {}", name, e);
            }
            (name.clone(), outcome)
        })
        .collect()
}

pub struct ConsensusEngine {
    registry: Arc<SharedRegistry>,
}

impl ConsensusEngine {
    pub fn new(registry: Arc<SharedRegistry>) -> Self {
        Self { registry }
    }

    /// Snapshot that contains `primary`, reloading once if the registry is empty
    pub fn resolve(&self, primary: &str) -> Result<Arc<ClassifierRegistry>, ScoringError> {
        let snapshot = self.registry.ensure_loaded();
        if snapshot.get(primary).is_none() {
            return Err(ScoringError::ModelNotFound {
                requested: primary.to_string(),
                available: snapshot.names(),
            });
        }
        Ok(snapshot)
    }

    pub fn predict(&self, text: &str, primary: &str) -> Result<ConsensusResult, ScoringError> {
        let snapshot = self.resolve(primary)?;
        Self::predict_with(&snapshot, text, primary)
    }

    /// Consensus against one fixed snapshot
    pub fn predict_with(
        registry: &ClassifierRegistry,
        text: &str,
        primary: &str,
    ) -> Result<ConsensusResult, ScoringError> {
        if registry.get(primary).is_none() {
            return Err(ScoringError::ModelNotFound {
                requested: primary.to_string(),
                available: registry.names(),
            });
        }

        let outcomes = run_all(registry, text);
        let primary_prediction = match outcomes.iter().find(|(name, _)| name == primary) {
            Some((_, Ok(p))) => p.clone(),
            Some((_, Err(e))) => {
                return Err(ScoringError::Inference {
                    model: primary.to_string(),
                    message: e.to_string(),
                })
            }
            None => {
                return Err(ScoringError::ModelNotFound {
                    requested: primary.to_string(),
                    available: registry.names(),
                })
            }
        };

        Ok(ConsensusResult {
            label: primary_prediction.label,
            confidence: primary_prediction.confidence,
            probs: primary_prediction.probs,
            model_used: primary.to_string(),
            consensus: vote_map(&outcomes),
            trust_score: trust_score(&outcomes, registry.authentic_label()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::testing::{BrokenModel, FixedModel, PanickyModel};
    use crate::services::classifier::TextClassifier;

    fn engine(models: Vec<Arc<dyn TextClassifier>>) -> ConsensusEngine {
        let mut registry = ClassifierRegistry::new("OR");
        for m in models {
            registry.insert(m);
        }
        ConsensusEngine::new(Arc::new(SharedRegistry::new(registry)))
    }

    fn fixed(name: &str, p_or: f64) -> Arc<dyn TextClassifier> {
        Arc::new(FixedModel::new(name, &["CG", "OR"], &[1.0 - p_or, p_or]))
    }

    #[test]
    fn test_trust_score_zero_without_outcomes() {
        assert_eq!(trust_score(&[], "OR"), 0.0);
    }

    #[test]
    fn test_single_model_trust_is_scaled_probability() {
        let e = engine(vec![fixed("SVM", 0.73)]);
        let result = e.predict("text", "SVM").unwrap();
        assert_eq!(result.trust_score, 73.0);
        assert_eq!(result.label, "OR");
        assert_eq!(result.confidence, 0.73);
        assert_eq!(result.model_used, "SVM");
    }

    #[test]
    fn test_trust_averages_all_models() {
        let e = engine(vec![fixed("SVM", 0.8), fixed("NaiveBayes", 0.2), fixed("LogisticRegression", 0.5)]);
        let result = e.predict("text", "NaiveBayes").unwrap();
        assert_eq!(result.trust_score, 50.0);
        assert_eq!(result.label, "CG");
        assert_eq!(result.consensus.len(), 3);
        assert_eq!(result.consensus["SVM"], "OR");
        assert_eq!(result.consensus["NaiveBayes"], "CG");
    }

    #[test]
    fn test_failing_model_is_excluded() {
        let e = engine(vec![fixed("SVM", 0.6), Arc::new(BrokenModel("NaiveBayes".to_string()))]);
        let result = e.predict("text", "SVM").unwrap();
        assert_eq!(result.trust_score, 60.0);
        assert!(!result.consensus.contains_key("NaiveBayes"));
    }

    #[test]
    fn test_panicking_model_is_excluded() {
        let e = engine(vec![fixed("SVM", 0.6), Arc::new(PanickyModel::new("NaiveBayes"))]);
        let result = e.predict("boom", "SVM").unwrap();
        assert_eq!(result.trust_score, 60.0);
        assert_eq!(result.consensus.len(), 1);

        assert!(matches!(
            e.predict("boom", "NaiveBayes"),
            Err(ScoringError::Inference { .. })
        ));
    }

    #[test]
    fn test_missing_authentic_class_uses_fallback() {
        let e = engine(vec![
            fixed("SVM", 0.9),
            Arc::new(FixedModel::new("Legacy", &["fake", "real"], &[0.0, 1.0])),
        ]);
        let result = e.predict("text", "SVM").unwrap();
        // (0.9 + 0.5) / 2
        assert_eq!(result.trust_score, 70.0);
        assert_eq!(result.consensus["Legacy"], "real");
    }

    #[test]
    fn test_unknown_primary_lists_available() {
        let e = engine(vec![fixed("SVM", 0.6)]);
        match e.predict("text", "KNN") {
            Err(ScoringError::ModelNotFound { requested, available }) => {
                assert_eq!(requested, "KNN");
                assert_eq!(available, vec!["SVM"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_registry_is_model_not_found() {
        let e = engine(vec![]);
        assert!(matches!(e.predict("text", "SVM"), Err(ScoringError::ModelNotFound { .. })));
    }

    #[test]
    fn test_failing_primary_surfaces() {
        let e = engine(vec![fixed("SVM", 0.6), Arc::new(BrokenModel("NaiveBayes".to_string()))]);
        assert!(matches!(
            e.predict("text", "NaiveBayes"),
            Err(ScoringError::Inference { .. })
        ));
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let e = engine(vec![fixed("SVM", 0.61), fixed("NaiveBayes", 0.33)]);
        let a = e.predict("same text", "SVM").unwrap();
        let b = e.predict("same text", "SVM").unwrap();
        assert_eq!(a, b);
    }
}
