// TrustLens Core Services

pub mod classifier;
pub mod config_store;
pub mod detection;
pub mod errors;
pub mod history_store;
pub mod lexicons;
pub mod pos_tagger;
pub mod sentiment;
pub mod text_processor;

pub use config_store::*;
pub use errors::*;
pub use text_processor::*;

pub use classifier::{
    top_features,
    ClassifierRegistry,
    ModelKind,
    Prediction,
    SharedRegistry,
    SupportsFeatureWeights,
    TextClassifier,
    TextPipeline,
};
pub use detection::{
    ConsensusEngine,
    DeceptionScorer,
    ScoringOrchestrator,
    StyleProfiler,
};
pub use history_store::{HistoryEntry, HistoryStore, InMemoryHistoryStore, JsonlHistoryStore};
pub use sentiment::{LexiconSentiment, SentimentAnalyzer, SentimentScore};
