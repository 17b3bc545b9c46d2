// Model Training
// Fits the three pipelines on a labelled dataset and evaluates them on a held-out split

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use super::dataset::LabelledDataset;
use super::linear::{CalibratedSvm, LinearOptions, LogisticRegression};
use super::naive_bayes::MultinomialNb;
use super::pipeline::{Estimator, ModelKind, TextPipeline};
use super::tfidf::TfidfVectorizer;
use super::TextClassifier;
use crate::models::{ModelMetrics, TrainReport};
use crate::services::config_store::TrainingConfig;
use crate::services::errors::ClassifierError;

const NB_ALPHA: f64 = 1.0;

pub struct TrainOutcome {
    pub report: TrainReport,
    pub pipelines: Vec<TextPipeline>,
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Accuracy, macro precision/recall, positive-class precision/recall and the
/// confusion matrix (rows = truth, columns = prediction, in `classes` order)
pub fn evaluate(truth: &[usize], predicted: &[usize], classes: &[String], positive_label: &str) -> ModelMetrics {
    let k = classes.len();
    let mut cm = vec![vec![0usize; k]; k];
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < k && p < k {
            cm[t][p] += 1;
        }
    }

    let total = truth.len() as f64;
    let correct: usize = (0..k).map(|i| cm[i][i]).sum();

    let per_class: Vec<(f64, f64)> = (0..k)
        .map(|c| {
            let tp = cm[c][c] as f64;
            let predicted_c: usize = (0..k).map(|r| cm[r][c]).sum();
            let actual_c: usize = cm[c].iter().sum();
            (safe_div(tp, predicted_c as f64), safe_div(tp, actual_c as f64))
        })
        .collect();

    let (positive_precision, positive_recall) = match classes.iter().position(|c| c == positive_label) {
        Some(idx) => per_class[idx],
        None => {
            warn!(
                "[TRAIN] Positive label '{}' not among classes {:?}; reporting 0",
                positive_label, classes
            );
            (0.0, 0.0)
        }
    };

    ModelMetrics {
        accuracy: safe_div(correct as f64, total),
        precision: safe_div(per_class.iter().map(|(p, _)| p).sum(), k as f64),
        recall: safe_div(per_class.iter().map(|(_, r)| r).sum(), k as f64),
        positive_label: positive_label.to_string(),
        positive_precision,
        positive_recall,
        classes: classes.to_vec(),
        cm,
    }
}

fn fit_estimator(
    kind: ModelKind,
    rows: &[super::tfidf::SparseVector],
    labels: &[usize],
    n_classes: usize,
    n_features: usize,
) -> Result<Estimator, ClassifierError> {
    let opts = LinearOptions::default();
    Ok(match kind {
        ModelKind::Svm => Estimator::LinearSvm(CalibratedSvm::fit(rows, labels, n_classes, n_features, opts)?),
        ModelKind::NaiveBayes => {
            Estimator::NaiveBayes(MultinomialNb::fit(rows, labels, n_classes, n_features, NB_ALPHA)?)
        }
        ModelKind::LogisticRegression => {
            Estimator::LogisticRegression(LogisticRegression::fit(rows, labels, n_classes, n_features, opts)?)
        }
    })
}

/// Fit every model kind on the train split and score it on the test split
pub fn train_all(
    dataset: &LabelledDataset,
    config: &TrainingConfig,
    positive_label: &str,
) -> Result<TrainOutcome, ClassifierError> {
    let started = Instant::now();
    let classes = dataset.classes();
    if classes.len() < 2 {
        return Err(ClassifierError::Training(format!(
            "need at least two distinct labels, found {:?}",
            classes
        )));
    }
    if dataset.len() < 2 {
        return Err(ClassifierError::Training(
            "need at least two labelled rows".to_string(),
        ));
    }

    let (train, test) = dataset.split(config.test_fraction, config.seed);
    let class_index = |label: &str| classes.iter().position(|c| c == label);
    let train_labels: Vec<usize> = train.labels.iter().filter_map(|l| class_index(l)).collect();
    let test_labels: Vec<usize> = test.labels.iter().filter_map(|l| class_index(l)).collect();

    info!(
        "[TRAIN] Training on {} rows, evaluating on {} rows, classes={:?}",
        train.len(),
        test.len(),
        classes
    );

    let mut pipelines = Vec::with_capacity(ModelKind::ALL.len());
    let mut metrics = BTreeMap::new();

    for kind in ModelKind::ALL {
        let mut vectorizer = TfidfVectorizer::new(config.ngram_max, config.max_features);
        let rows = vectorizer.fit_transform(&train.texts)?;
        let estimator = fit_estimator(kind, &rows, &train_labels, classes.len(), vectorizer.vocabulary_size())?;
        let pipeline = TextPipeline::new(kind.name(), classes.clone(), vectorizer, estimator);

        let mut predicted = Vec::with_capacity(test.len());
        for text in &test.texts {
            let prediction = pipeline.predict(text)?;
            predicted.push(class_index(&prediction.label).unwrap_or(0));
        }
        let model_metrics = evaluate(&test_labels, &predicted, &classes, positive_label);
        info!(
            "[TRAIN] {} accuracy={:.4} precision={:.4} recall={:.4}",
            kind.name(),
            model_metrics.accuracy,
            model_metrics.precision,
            model_metrics.recall
        );
        metrics.insert(kind.name().to_string(), model_metrics);
        pipelines.push(pipeline);
    }

    info!("[TRAIN] Done in {} ms", started.elapsed().as_millis());

    Ok(TrainOutcome {
        report: TrainReport {
            message: "Training complete".to_string(),
            train_size: train.len(),
            test_size: test.len(),
            metrics,
        },
        pipelines,
    })
}

/// Write every pipeline under its artifact name
pub fn persist(pipelines: &[TextPipeline], model_dir: &Path) -> Result<Vec<PathBuf>, ClassifierError> {
    let mut written = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        let kind = ModelKind::from_name(pipeline.name())
            .ok_or_else(|| ClassifierError::UnknownModel(pipeline.name().to_string()))?;
        let path = model_dir.join(kind.artifact_file());
        pipeline.save(&path)?;
        info!("[TRAIN] Saved {} -> {}", pipeline.name(), path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> LabelledDataset {
        let fake = [
            "best product ever buy now",
            "amazing amazing deal buy now",
            "incredible best purchase trust me",
            "perfect perfect five stars buy",
            "amazing product use code save",
            "best deal ever trust me amazing",
        ];
        let real = [
            "battery died after two weeks",
            "strap broke but support replaced it",
            "fits well, color slightly darker than photo",
            "shipping was slow, box was dented",
            "decent sound for the price, weak bass",
            "stopped charging after a month",
        ];
        let mut ds = LabelledDataset::default();
        for t in fake {
            ds.texts.push(t.to_string());
            ds.labels.push("CG".to_string());
        }
        for t in real {
            ds.texts.push(t.to_string());
            ds.labels.push("OR".to_string());
        }
        ds
    }

    #[test]
    fn test_evaluate_confusion_and_macro_scores() {
        let classes = vec!["CG".to_string(), "OR".to_string()];
        // truth: CG CG OR OR, predicted: CG OR OR OR
        let m = evaluate(&[0, 0, 1, 1], &[0, 1, 1, 1], &classes, "CG");
        assert_eq!(m.cm, vec![vec![1, 1], vec![0, 2]]);
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.positive_precision, 1.0);
        assert_eq!(m.positive_recall, 0.5);
        // precision: CG 1.0, OR 2/3; recall: CG 0.5, OR 1.0
        assert!((m.precision - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        assert_eq!(m.recall, 0.75);
    }

    #[test]
    fn test_evaluate_unknown_positive_label() {
        let classes = vec!["fake".to_string(), "real".to_string()];
        let m = evaluate(&[0, 1], &[0, 1], &classes, "CG");
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.positive_precision, 0.0);
    }

    #[test]
    fn test_train_all_fits_every_model() {
        let outcome = train_all(&dataset(), &TrainingConfig::default(), "CG").unwrap();
        assert_eq!(outcome.pipelines.len(), 3);
        assert_eq!(outcome.report.train_size + outcome.report.test_size, 12);
        assert_eq!(outcome.report.test_size, 3);
        for name in ["SVM", "NaiveBayes", "LogisticRegression"] {
            let m = &outcome.report.metrics[name];
            assert!((0.0..=1.0).contains(&m.accuracy));
            assert_eq!(m.cm.iter().flatten().sum::<usize>(), 3);
        }
    }

    #[test]
    fn test_train_rejects_single_class() {
        let mut ds = dataset();
        ds.labels.iter_mut().for_each(|l| *l = "OR".to_string());
        assert!(matches!(
            train_all(&ds, &TrainingConfig::default(), "CG"),
            Err(ClassifierError::Training(_))
        ));
    }

    #[test]
    fn test_persist_writes_artifacts() {
        let outcome = train_all(&dataset(), &TrainingConfig::default(), "CG").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let written = persist(&outcome.pipelines, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("svm_pipeline.json").exists());
        assert!(dir.path().join("nb_pipeline.json").exists());
        assert!(dir.path().join("lr_pipeline.json").exists());
    }
}
