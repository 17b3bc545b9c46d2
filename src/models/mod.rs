// TrustLens Data Models
// Wire-level records produced by the scoring engines

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============ Deception Signal ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeceptionDetails {
    pub subjectivity: f64,
    pub word_count: usize,
}

/// Five independent sub-scores, each in [0, 100]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeceptionSignal {
    pub deception_score: f64,
    pub exaggeration_score: f64,
    pub emotional_intensity: f64,
    pub repetition_score: f64,
    pub promotional_score: f64,
    pub details: DeceptionDetails,
}

impl DeceptionSignal {
    pub fn sub_scores(&self) -> [f64; 5] {
        [
            self.deception_score,
            self.exaggeration_score,
            self.emotional_intensity,
            self.repetition_score,
            self.promotional_score,
        ]
    }
}

// ============ Style Signal ============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleLabel {
    #[serde(rename = "Expressive / Emotional")]
    Expressive,
    #[serde(rename = "Formal / Complex")]
    Formal,
    #[serde(rename = "Short / Terse")]
    Terse,
    #[serde(rename = "Repetitive / Simple")]
    Repetitive,
    #[serde(rename = "Standard")]
    Standard,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosRatios {
    pub noun: f64,
    pub verb: f64,
    pub adj: f64,
}

/// Percentages of total characters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PunctuationStyle {
    pub exclamation_density: f64,
    pub question_density: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSignal {
    pub avg_sentence_len: f64,
    pub vocab_diversity: f64,
    pub stopword_ratio: f64,
    pub pos_ratios: PosRatios,
    pub punctuation: PunctuationStyle,
    pub style_label: StyleLabel,
}

// ============ Consensus ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Primary model's predicted label
    pub label: String,
    /// Max class probability of the primary model
    pub confidence: f64,
    pub probs: BTreeMap<String, f64>,
    pub model_used: String,
    /// Model name -> predicted label, for every model that produced a prediction
    pub consensus: BTreeMap<String, String>,
    /// Mean authentic-class probability across scored models, in [0, 100]
    pub trust_score: f64,
}

// ============ Analysis Record ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub text: String,
    pub label: String,
    pub confidence: f64,
    pub probs: BTreeMap<String, f64>,
    /// Sentiment polarity pass-through for history persistence
    pub sentiment: f64,
    pub model_used: String,
    pub trust_score: f64,
    pub consensus: BTreeMap<String, String>,
    pub lie_detection: DeceptionSignal,
    pub author_dna: StyleSignal,
}

impl AnalysisRecord {
    pub fn assemble(
        text: &str,
        consensus: ConsensusResult,
        sentiment: f64,
        lie_detection: DeceptionSignal,
        author_dna: StyleSignal,
    ) -> Self {
        Self {
            text: text.to_string(),
            label: consensus.label,
            confidence: consensus.confidence,
            probs: consensus.probs,
            sentiment,
            model_used: consensus.model_used,
            trust_score: consensus.trust_score,
            consensus: consensus.consensus,
            lie_detection,
            author_dna,
        }
    }
}

// ============ Batch ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The batch item exactly as received
    pub text: Value,
    pub error: String,
}

/// One batch item's outcome
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Scored {
        record: AnalysisRecord,
        /// Extra fields carried by the input item (date, rating, author, ...)
        metadata: Map<String, Value>,
    },
    Failed(ErrorRecord),
}

impl BatchOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, BatchOutcome::Failed(_))
    }

    /// Scoring fields win over metadata on key collisions
    pub fn to_json(&self) -> Value {
        match self {
            BatchOutcome::Scored { record, metadata } => {
                let mut out = match serde_json::to_value(record) {
                    Ok(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                for (key, value) in metadata {
                    out.entry(key.clone()).or_insert_with(|| value.clone());
                }
                Value::Object(out)
            }
            BatchOutcome::Failed(err) => {
                serde_json::to_value(err).unwrap_or(Value::Null)
            }
        }
    }
}

impl Serialize for BatchOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }

    pub fn scored_count(&self) -> usize {
        self.results.len() - self.failed_count()
    }
}

// ============ Model Introspection ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImpact {
    pub name: String,
    pub impact: f64,
    /// Class the feature pushes towards
    #[serde(rename = "type")]
    pub class_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub accuracy: f64,
    /// Macro-averaged over classes
    pub precision: f64,
    pub recall: f64,
    pub positive_label: String,
    pub positive_precision: f64,
    pub positive_recall: f64,
    pub classes: Vec<String>,
    /// Rows are true classes, columns predicted, both in `classes` order
    pub cm: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainReport {
    pub message: String,
    pub train_size: usize,
    pub test_size: usize,
    pub metrics: BTreeMap<String, ModelMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    pub model_folder: Option<String>,
    pub exists: bool,
    pub files: Vec<String>,
    pub trained_keys: Vec<String>,
    pub authentic_label: String,
}
