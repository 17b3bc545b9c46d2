// Scoring Orchestrator
// Single and batch entry points combining deception, style and consensus scoring

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::author_style::StyleProfiler;
use super::consensus::ConsensusEngine;
use super::deception::DeceptionScorer;
use crate::models::{AnalysisRecord, BatchOutcome, BatchReport, ErrorRecord};
use crate::services::classifier::{ClassifierRegistry, SharedRegistry};
use crate::services::errors::ScoringError;
use crate::services::history_store::{HistoryEntry, HistoryStore};
use crate::services::sentiment::{LexiconSentiment, SentimentAnalyzer};

/// Text and pass-through metadata from one batch item
pub fn extract_item(item: &Value) -> Result<(String, Map<String, Value>), ScoringError> {
    match item {
        Value::String(s) => Ok((s.clone(), Map::new())),
        Value::Number(n) => Ok((n.to_string(), Map::new())),
        Value::Bool(b) => Ok((b.to_string(), Map::new())),
        Value::Object(obj) => {
            let text = match obj.get("text") {
                Some(Value::String(s)) => s.clone(),
                _ => return Err(ScoringError::MissingText),
            };
            let metadata = obj
                .iter()
                .filter(|(k, _)| k.as_str() != "text")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Ok((text, metadata))
        }
        Value::Null | Value::Array(_) => Err(ScoringError::MissingText),
    }
}

pub struct ScoringOrchestrator {
    deception: DeceptionScorer,
    style: StyleProfiler,
    consensus: ConsensusEngine,
    sentiment: Arc<dyn SentimentAnalyzer>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl ScoringOrchestrator {
    pub fn new(registry: Arc<SharedRegistry>) -> Self {
        let sentiment: Arc<dyn SentimentAnalyzer> = Arc::new(LexiconSentiment::new());
        Self {
            deception: DeceptionScorer::new(sentiment.clone()),
            style: StyleProfiler::new(),
            consensus: ConsensusEngine::new(registry),
            sentiment,
            history: None,
        }
    }

    pub fn with_sentiment(mut self, sentiment: Arc<dyn SentimentAnalyzer>) -> Self {
        self.deception = DeceptionScorer::new(sentiment.clone());
        self.sentiment = sentiment;
        self
    }

    pub fn with_deception(mut self, deception: DeceptionScorer) -> Self {
        self.deception = deception;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    fn assemble(&self, snapshot: &ClassifierRegistry, text: &str, model: &str) -> Result<AnalysisRecord, ScoringError> {
        let consensus = ConsensusEngine::predict_with(snapshot, text, model)?;
        let lie_detection = self.deception.score(text);
        let author_dna = self.style.analyze(text);
        let sentiment = self.sentiment.analyze(text).polarity;
        Ok(AnalysisRecord::assemble(text, consensus, sentiment, lie_detection, author_dna))
    }

    /// Score one review and append it to history
    pub fn score_one(&self, text: &str, model: &str) -> Result<AnalysisRecord, ScoringError> {
        let snapshot = self.consensus.resolve(model)?;
        let record = self.assemble(&snapshot, text, model)?;

        if let Some(history) = &self.history {
            if let Err(e) = history.append(HistoryEntry::from_record(&record)) {
                warn!("[ORCHESTRATOR] Failed to save history: {}", e);
            }
        }
        Ok(record)
    }

    fn score_item(&self, snapshot: &ClassifierRegistry, item: &Value, model: &str) -> BatchOutcome {
        let scored = extract_item(item)
            .and_then(|(text, metadata)| self.assemble(snapshot, &text, model).map(|r| (r, metadata)));
        match scored {
            Ok((record, metadata)) => BatchOutcome::Scored { record, metadata },
            Err(e) => {
                warn!("[ORCHESTRATOR] Batch item failed: {}", e);
                BatchOutcome::Failed(ErrorRecord {
                    text: item.clone(),
                    error: e.to_string(),
                })
            }
        }
    }

    /// Score every item independently against one registry snapshot. Only an
    /// unknown model fails the whole call; item failures become error records.
    pub fn score_many(&self, items: &[Value], model: &str) -> Result<BatchReport, ScoringError> {
        if items.is_empty() {
            return Ok(BatchReport::default());
        }
        let started = Instant::now();
        let snapshot = self.consensus.resolve(model)?;
        let results: Vec<BatchOutcome> = items
            .iter()
            .map(|item| self.score_item(&snapshot, item, model))
            .collect();

        let report = BatchReport { results };
        info!(
            "[ORCHESTRATOR] Batch done: items={}, failed={}, elapsed_ms={}",
            report.results.len(),
            report.failed_count(),
            started.elapsed().as_millis()
        );
        Ok(report)
    }

    /// `score_many` on blocking worker tasks, at most `concurrency` at a time,
    /// results in input order
    pub async fn score_many_concurrent(
        self: Arc<Self>,
        items: Vec<Value>,
        model: &str,
        concurrency: usize,
    ) -> Result<BatchReport, ScoringError> {
        if items.is_empty() {
            return Ok(BatchReport::default());
        }
        let started = Instant::now();
        let snapshot = self.consensus.resolve(model)?;
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set: JoinSet<(usize, BatchOutcome)> = JoinSet::new();
        let total = items.len();

        for (idx, item) in items.iter().cloned().enumerate() {
            let this = self.clone();
            let snapshot = snapshot.clone();
            let semaphore = semaphore.clone();
            let model = model.to_string();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let worker_item = item.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    this.score_item(&snapshot, &worker_item, &model)
                })
                .await
                .unwrap_or_else(|e| {
                    warn!("[ORCHESTRATOR] Batch item {} worker failed: {}", idx, e);
                    BatchOutcome::Failed(ErrorRecord {
                        text: item,
                        error: format!("worker failed: {}", e),
                    })
                });
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<BatchOutcome>> = vec![None; total];
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => warn!("[ORCHESTRATOR] Batch task failed: {}", e),
            }
        }

        let results: Vec<BatchOutcome> = slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| {
                slot.unwrap_or_else(|| {
                    BatchOutcome::Failed(ErrorRecord {
                        text: item,
                        error: "task aborted".to_string(),
                    })
                })
            })
            .collect();

        let report = BatchReport { results };
        info!(
            "[ORCHESTRATOR] Concurrent batch done: items={}, failed={}, concurrency={}, elapsed_ms={}",
            total,
            report.failed_count(),
            concurrency.max(1),
            started.elapsed().as_millis()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StyleLabel;
    use crate::services::classifier::testing::{BrokenModel, FixedModel, PanickyModel};
    use crate::services::classifier::TextClassifier;
    use crate::services::sentiment::SentimentScore;
    use crate::services::history_store::InMemoryHistoryStore;
    use serde_json::json;

    /// Constant sentiment regardless of text
    struct FixedSentiment(f64);

    impl SentimentAnalyzer for FixedSentiment {
        fn analyze(&self, _text: &str) -> SentimentScore {
            SentimentScore {
                polarity: self.0,
                subjectivity: 1.0,
                sentence_count: 1,
            }
        }
    }

    fn orchestrator(models: Vec<Arc<dyn TextClassifier>>) -> ScoringOrchestrator {
        let mut registry = ClassifierRegistry::new("OR");
        for m in models {
            registry.insert(m);
        }
        ScoringOrchestrator::new(Arc::new(SharedRegistry::new(registry)))
    }

    fn fixed(name: &str, p_or: f64) -> Arc<dyn TextClassifier> {
        Arc::new(FixedModel::new(name, &["CG", "OR"], &[1.0 - p_or, p_or]))
    }

    #[test]
    fn test_extract_item_variants() {
        assert_eq!(extract_item(&json!("hi")).unwrap().0, "hi");
        assert_eq!(extract_item(&json!(5)).unwrap().0, "5");
        let (text, meta) = extract_item(&json!({"text": "ok", "rating": 4})).unwrap();
        assert_eq!(text, "ok");
        assert_eq!(meta["rating"], json!(4));
        assert!(!meta.contains_key("text"));
        assert!(extract_item(&json!({"bad": "item"})).is_err());
        assert!(extract_item(&json!({"text": 12})).is_err());
        assert!(extract_item(&json!(null)).is_err());
    }

    #[test]
    fn test_score_one_end_to_end() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let orch = orchestrator(vec![fixed("SVM", 0.3), fixed("NaiveBayes", 0.5)]).with_history(history.clone());
        let text = "This is the absolute best amazing product ever!!! Trust me, it is incredible.";
        let record = orch.score_one(text, "SVM").unwrap();

        assert_eq!(record.label, "CG");
        assert_eq!(record.model_used, "SVM");
        assert_eq!(record.trust_score, 40.0);
        assert!(record.lie_detection.deception_score >= 20.0);
        assert!(record.lie_detection.exaggeration_score > 0.0);
        assert!(record.author_dna.punctuation.exclamation_density > 0.0);
        assert!(record.sentiment > 0.0);

        let saved = history.recent(10).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].label, "CG");
        assert_eq!(saved[0].text, text);
    }

    #[test]
    fn test_score_one_empty_text() {
        let orch = orchestrator(vec![fixed("SVM", 0.5)]);
        let record = orch.score_one("", "SVM").unwrap();
        assert!(record.lie_detection.sub_scores().iter().all(|s| *s == 0.0));
        assert_eq!(record.author_dna.style_label, StyleLabel::Unknown);
    }

    #[test]
    fn test_score_one_unknown_model() {
        let orch = orchestrator(vec![fixed("SVM", 0.5)]);
        let err = orch.score_one("text", "KNN").unwrap_err();
        assert!(err.to_string().contains("SVM"));
    }

    #[test]
    fn test_score_one_is_deterministic() {
        let orch = orchestrator(vec![fixed("SVM", 0.35), fixed("LogisticRegression", 0.9)]);
        let text = "Honestly the strap broke, but support replaced it quickly.";
        assert_eq!(orch.score_one(text, "SVM").unwrap(), orch.score_one(text, "SVM").unwrap());
    }

    #[test]
    fn test_score_many_isolates_items() {
        let orch = orchestrator(vec![fixed("SVM", 0.8)]);
        let items = vec![json!({"text": "Great!", "rating": 5}), json!({"bad": "item"})];
        let report = orch.score_many(&items, "SVM").unwrap();
        let out = serde_json::to_value(&report).unwrap();

        assert_eq!(out["results"][0]["rating"], json!(5));
        assert_eq!(out["results"][0]["text"], json!("Great!"));
        assert!(out["results"][1].get("error").is_some());
        assert!(out["results"][1].get("rating").is_none());
        assert_eq!(out["results"][1]["text"], json!({"bad": "item"}));
    }

    #[test]
    fn test_score_many_mixed_inputs_never_fail() {
        let orch = orchestrator(vec![fixed("SVM", 0.8), Arc::new(BrokenModel("NaiveBayes".to_string()))]);
        let items = vec![json!("fine review"), json!(""), json!({"rating": 1}), json!([1, 2])];
        let report = orch.score_many(&items, "SVM").unwrap();
        assert_eq!(report.scored_count(), 2);
        assert_eq!(report.failed_count(), 2);
        assert!(!report.results[0].is_error());
        assert!(!report.results[1].is_error());
    }

    #[test]
    fn test_score_many_unknown_model_fails_whole_batch() {
        let orch = orchestrator(vec![fixed("SVM", 0.8)]);
        assert!(matches!(
            orch.score_many(&[json!("x")], "KNN"),
            Err(ScoringError::ModelNotFound { .. })
        ));
        assert!(orch.score_many(&[], "KNN").unwrap().results.is_empty());
    }

    #[test]
    fn test_score_many_does_not_write_history() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let orch = orchestrator(vec![fixed("SVM", 0.8)]).with_history(history.clone());
        orch.score_many(&[json!("a"), json!("b")], "SVM").unwrap();
        assert!(history.recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_injected_sentiment_feeds_record_and_intensity() {
        let orch = orchestrator(vec![fixed("SVM", 0.5)]).with_sentiment(Arc::new(FixedSentiment(-0.5)));
        let record = orch.score_one("plain words here", "SVM").unwrap();
        assert_eq!(record.sentiment, -0.5);
        // (|-0.5| + 1.0) / 2 * 100
        assert_eq!(record.lie_detection.emotional_intensity, 75.0);
    }

    #[test]
    fn test_non_primary_panic_does_not_block_scoring() {
        let orch = orchestrator(vec![fixed("SVM", 0.7), Arc::new(PanickyModel::new("NaiveBayes"))]);
        let record = orch.score_one("boom", "SVM").unwrap();
        assert_eq!(record.trust_score, 70.0);
        assert!(!record.consensus.contains_key("NaiveBayes"));
    }

    #[test]
    fn test_score_many_isolates_panicking_primary() {
        let orch = orchestrator(vec![Arc::new(PanickyModel::new("SVM"))]);
        let items = vec![json!("calm"), json!("boom goes the model"), json!("calm again")];
        let report = orch.score_many(&items, "SVM").unwrap();
        assert!(!report.results[0].is_error());
        assert!(report.results[1].is_error());
        assert!(!report.results[2].is_error());
    }

    #[tokio::test]
    async fn test_concurrent_batch_preserves_order() {
        let orch = Arc::new(orchestrator(vec![fixed("SVM", 0.8)]));
        let items: Vec<Value> = (0..20).map(|i| json!({"text": format!("review {}", i), "idx": i})).collect();
        let report = orch.score_many_concurrent(items, "SVM", 3).await.unwrap();
        assert_eq!(report.results.len(), 20);
        for (i, outcome) in report.results.iter().enumerate() {
            assert_eq!(outcome.to_json()["idx"], json!(i));
        }
    }

    #[tokio::test]
    async fn test_concurrent_batch_isolates_panics() {
        let orch = Arc::new(orchestrator(vec![Arc::new(PanickyModel::new("SVM"))]));
        let items = vec![json!("calm"), json!("boom goes the model"), json!("calm again")];
        let report = orch.score_many_concurrent(items, "SVM", 2).await.unwrap();
        assert!(!report.results[0].is_error());
        assert!(report.results[1].is_error());
        assert!(!report.results[2].is_error());
    }
}
