// Multinomial Naive Bayes
// Additive-smoothed class-conditional term weights over TF-IDF rows

use serde::{Deserialize, Serialize};

use super::tfidf::SparseVector;
use crate::services::errors::ClassifierError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultinomialNb {
    alpha: f64,
    class_log_prior: Vec<f64>,
    /// [class][feature]
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNb {
    pub fn fit(
        rows: &[SparseVector],
        labels: &[usize],
        n_classes: usize,
        n_features: usize,
        alpha: f64,
    ) -> Result<Self, ClassifierError> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(ClassifierError::Training(format!(
                "naive bayes needs one label per row (rows={}, labels={})",
                rows.len(),
                labels.len()
            )));
        }

        let mut class_count = vec![0usize; n_classes];
        let mut feature_count = vec![vec![0.0f64; n_features]; n_classes];
        for (row, &label) in rows.iter().zip(labels) {
            class_count[label] += 1;
            for &(idx, v) in row {
                feature_count[label][idx] += v;
            }
        }

        let total = rows.len() as f64;
        let class_log_prior = class_count
            .iter()
            .map(|&c| if c == 0 { f64::MIN } else { (c as f64 / total).ln() })
            .collect();

        let feature_log_prob = feature_count
            .iter()
            .map(|counts| {
                let denom = counts.iter().sum::<f64>() + alpha * n_features as f64;
                counts.iter().map(|c| ((c + alpha) / denom).ln()).collect()
            })
            .collect();

        Ok(Self {
            alpha,
            class_log_prior,
            feature_log_prob,
        })
    }

    fn joint_log_likelihood(&self, row: &SparseVector) -> Vec<f64> {
        self.class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, flp)| {
                prior
                    + row
                        .iter()
                        .map(|(idx, v)| flp.get(*idx).copied().unwrap_or(0.0) * v)
                        .sum::<f64>()
            })
            .collect()
    }

    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        let jll = self.joint_log_likelihood(row);
        let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return vec![1.0 / jll.len().max(1) as f64; jll.len()];
        }
        let exp: Vec<f64> = jll.iter().map(|v| (v - max).exp()).collect();
        let sum: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / sum).collect()
    }

    pub fn n_classes(&self) -> usize {
        self.class_log_prior.len()
    }

    /// One prior and one `n_features`-wide log-probability row per class
    pub fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        if self.n_classes() != n_classes || self.feature_log_prob.len() != n_classes {
            return Err(format!(
                "expected {} classes, found {} priors and {} feature rows",
                n_classes,
                self.n_classes(),
                self.feature_log_prob.len()
            ));
        }
        if let Some(row) = self.feature_log_prob.iter().find(|r| r.len() != n_features) {
            return Err(format!(
                "feature row has {} columns, vocabulary has {}",
                row.len(),
                n_features
            ));
        }
        if self.alpha.is_nan() || self.alpha <= 0.0 {
            return Err(format!("smoothing alpha must be positive, got {}", self.alpha));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learns_class_conditional_terms() {
        // feature 0 marks class 0, feature 1 marks class 1
        let rows = vec![vec![(0, 1.0)], vec![(0, 0.8)], vec![(1, 1.0)], vec![(1, 0.9)]];
        let labels = vec![0, 0, 1, 1];
        let nb = MultinomialNb::fit(&rows, &labels, 2, 2, 1.0).unwrap();

        let p0 = nb.predict_proba(&vec![(0, 1.0)]);
        let p1 = nb.predict_proba(&vec![(1, 1.0)]);
        assert!(p0[0] > 0.5);
        assert!(p1[1] > 0.5);
        assert!((p0.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_row_falls_back_to_prior() {
        let rows = vec![vec![(0, 1.0)], vec![(0, 1.0)], vec![(0, 1.0)], vec![(1, 1.0)]];
        let nb = MultinomialNb::fit(&rows, &[0, 0, 0, 1], 2, 2, 1.0).unwrap();
        let p = nb.predict_proba(&vec![]);
        assert!((p[0] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_labels_rejected() {
        assert!(MultinomialNb::fit(&[vec![]], &[], 2, 1, 1.0).is_err());
    }
}
