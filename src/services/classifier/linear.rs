// Linear Estimators
// L2 logistic regression and a linear SVM with sigmoid (Platt) calibration,
// both fitted by deterministic full-batch gradient descent

use serde::{Deserialize, Serialize};

use super::tfidf::{dot, SparseVector};
use crate::services::errors::ClassifierError;

#[derive(Debug, Clone, Copy)]
pub struct LinearOptions {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
}

impl Default for LinearOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 300,
            learning_rate: 0.5,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// One weight row per class, or a single row for the second class when binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearModel {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl LinearModel {
    pub fn decision_function(&self, row: &SparseVector) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| dot(row, w) + b)
            .collect()
    }

    pub fn is_binary(&self) -> bool {
        self.coef.len() == 1
    }

    /// One row for two classes, else one row per class; every row `n_features` wide
    pub fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        let expected_rows = if n_classes == 2 { 1 } else { n_classes };
        if self.coef.len() != expected_rows || self.intercept.len() != expected_rows {
            return Err(format!(
                "expected {} weight rows for {} classes, found {} rows and {} intercepts",
                expected_rows,
                n_classes,
                self.coef.len(),
                self.intercept.len()
            ));
        }
        if let Some(row) = self.coef.iter().find(|w| w.len() != n_features) {
            return Err(format!(
                "weight row has {} columns, vocabulary has {}",
                row.len(),
                n_features
            ));
        }
        Ok(())
    }

    /// Weights whose positive direction points at the second class
    pub fn positive_class_weights(&self) -> &[f64] {
        let row = if self.is_binary() { 0 } else { 1 };
        self.coef.get(row).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Derivative of a loss w.r.t. the decision value; target in {0, 1}
type LossGrad = fn(decision: f64, target: f64) -> f64;

fn logistic_grad(decision: f64, target: f64) -> f64 {
    sigmoid(decision) - target
}

fn squared_hinge_grad(decision: f64, target: f64) -> f64 {
    let y = if target > 0.5 { 1.0 } else { -1.0 };
    let margin = y * decision;
    if margin < 1.0 {
        -2.0 * (1.0 - margin) * y
    } else {
        0.0
    }
}

fn fit_binary(
    rows: &[SparseVector],
    targets: &[f64],
    n_features: usize,
    opts: LinearOptions,
    loss: LossGrad,
) -> (Vec<f64>, f64) {
    let n = rows.len() as f64;
    let reg = 1.0 / (opts.c * n);
    let mut w = vec![0.0f64; n_features];
    let mut b = 0.0f64;

    for _ in 0..opts.max_iter {
        let mut grad_w: Vec<f64> = w.iter().map(|wi| wi * reg).collect();
        let mut grad_b = 0.0;
        for (row, &t) in rows.iter().zip(targets) {
            let g = loss(dot(row, &w) + b, t);
            if g == 0.0 {
                continue;
            }
            for &(idx, v) in row {
                grad_w[idx] += g * v / n;
            }
            grad_b += g / n;
        }
        for (wi, gi) in w.iter_mut().zip(&grad_w) {
            *wi -= opts.learning_rate * gi;
        }
        b -= opts.learning_rate * grad_b;
    }

    (w, b)
}

fn fit_one_vs_rest(
    rows: &[SparseVector],
    labels: &[usize],
    n_classes: usize,
    n_features: usize,
    opts: LinearOptions,
    loss: LossGrad,
) -> Result<LinearModel, ClassifierError> {
    if rows.is_empty() || rows.len() != labels.len() {
        return Err(ClassifierError::Training(format!(
            "linear model needs one label per row (rows={}, labels={})",
            rows.len(),
            labels.len()
        )));
    }
    if n_classes < 2 {
        return Err(ClassifierError::Training(
            "at least two classes are required".to_string(),
        ));
    }

    let positives: Vec<usize> = if n_classes == 2 { vec![1] } else { (0..n_classes).collect() };
    let mut coef = Vec::with_capacity(positives.len());
    let mut intercept = Vec::with_capacity(positives.len());
    for class in positives {
        let targets: Vec<f64> = labels.iter().map(|&l| if l == class { 1.0 } else { 0.0 }).collect();
        let (w, b) = fit_binary(rows, &targets, n_features, opts, loss);
        coef.push(w);
        intercept.push(b);
    }
    Ok(LinearModel { coef, intercept })
}

/// Turn per-class positive-class probabilities into a distribution
fn distribution(model_is_binary: bool, positive: Vec<f64>) -> Vec<f64> {
    if model_is_binary {
        let p = positive.first().copied().unwrap_or(0.5);
        return vec![1.0 - p, p];
    }
    let sum: f64 = positive.iter().sum();
    if sum <= 0.0 {
        let k = positive.len().max(1) as f64;
        return vec![1.0 / k; positive.len()];
    }
    positive.into_iter().map(|p| p / sum).collect()
}

// ============ Logistic Regression ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    model: LinearModel,
}

impl LogisticRegression {
    pub fn fit(
        rows: &[SparseVector],
        labels: &[usize],
        n_classes: usize,
        n_features: usize,
        opts: LinearOptions,
    ) -> Result<Self, ClassifierError> {
        let model = fit_one_vs_rest(rows, labels, n_classes, n_features, opts, logistic_grad)?;
        Ok(Self { model })
    }

    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        let positive = self
            .model
            .decision_function(row)
            .into_iter()
            .map(sigmoid)
            .collect();
        distribution(self.model.is_binary(), positive)
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        self.model.validate(n_classes, n_features)
    }
}

// ============ Calibrated Linear SVM ============

/// P(positive | f) = 1 / (1 + exp(a * f + b))
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    const ITERATIONS: usize = 1000;
    const STEP: f64 = 1.0;

    pub fn fit(decisions: &[f64], targets: &[f64]) -> Self {
        let n_pos = targets.iter().filter(|t| **t > 0.5).count() as f64;
        let n_neg = targets.len() as f64 - n_pos;
        // Smoothed targets guard against overfitting separable data
        let hi = (n_pos + 1.0) / (n_pos + 2.0);
        let lo = 1.0 / (n_neg + 2.0);
        let soft: Vec<f64> = targets.iter().map(|t| if *t > 0.5 { hi } else { lo }).collect();

        let n = decisions.len().max(1) as f64;
        let mut a = 0.0;
        let mut b = ((n_neg + 1.0) / (n_pos + 1.0)).ln();
        for _ in 0..Self::ITERATIONS {
            let (mut ga, mut gb) = (0.0, 0.0);
            for (f, t) in decisions.iter().zip(&soft) {
                let p = sigmoid(-(a * f + b));
                ga += (t - p) * f;
                gb += t - p;
            }
            a -= Self::STEP * ga / n;
            b -= Self::STEP * gb / n;
        }
        Self { a, b }
    }

    pub fn probability(&self, decision: f64) -> f64 {
        sigmoid(-(self.a * decision + self.b))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratedSvm {
    model: LinearModel,
    calibrators: Vec<PlattScaling>,
}

impl CalibratedSvm {
    pub fn fit(
        rows: &[SparseVector],
        labels: &[usize],
        n_classes: usize,
        n_features: usize,
        opts: LinearOptions,
    ) -> Result<Self, ClassifierError> {
        let model = fit_one_vs_rest(rows, labels, n_classes, n_features, opts, squared_hinge_grad)?;

        let decisions: Vec<Vec<f64>> = rows.iter().map(|r| model.decision_function(r)).collect();
        let positives: Vec<usize> = if model.is_binary() { vec![1] } else { (0..n_classes).collect() };
        let calibrators = positives
            .iter()
            .enumerate()
            .map(|(k, &class)| {
                let f: Vec<f64> = decisions.iter().map(|d| d[k]).collect();
                let t: Vec<f64> = labels.iter().map(|&l| if l == class { 1.0 } else { 0.0 }).collect();
                PlattScaling::fit(&f, &t)
            })
            .collect();

        Ok(Self { model, calibrators })
    }

    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        let positive = self
            .model
            .decision_function(row)
            .into_iter()
            .zip(&self.calibrators)
            .map(|(d, cal)| cal.probability(d))
            .collect();
        distribution(self.model.is_binary(), positive)
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        self.model.validate(n_classes, n_features)?;
        if self.calibrators.len() != self.model.coef.len() {
            return Err(format!(
                "{} calibrators for {} weight rows",
                self.calibrators.len(),
                self.model.coef.len()
            ));
        }
        Ok(())
    }
}
