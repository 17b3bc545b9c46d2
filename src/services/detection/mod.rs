// Detection Module
// Review scoring core organized into specialized submodules:
// - deception: phrase/lexicon/sentiment sub-scores
// - author_style: stylometric fingerprint and style label
// - consensus: multi-model vote and trust score
// - orchestrator: single and batch entry points

pub mod author_style;
pub mod consensus;
pub mod deception;
pub mod orchestrator;

pub use author_style::{determine_style, StyleProfiler};
pub use consensus::{run_all, trust_score, vote_map, ConsensusEngine, ModelOutcome};
pub use deception::DeceptionScorer;
pub use orchestrator::{extract_item, ScoringOrchestrator};

/// Round to 2 decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345678), 12.35);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(59.999999), 60.0);
    }
}
