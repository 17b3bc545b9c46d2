// Labelled Dataset
// CSV loading and a deterministic seeded train/test split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::services::errors::ClassifierError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelledDataset {
    pub texts: Vec<String>,
    pub labels: Vec<String>,
}

impl LabelledDataset {
    pub fn load_csv(path: &Path, text_column: &str, label_column: &str) -> Result<Self, ClassifierError> {
        let f = File::open(path)?;
        let dataset = Self::from_reader(f, text_column, label_column)?;
        info!(
            "[DATASET] Loaded {} rows from {} ({} classes)",
            dataset.len(),
            path.display(),
            dataset.classes().len()
        );
        Ok(dataset)
    }

    /// Rows with an empty text or label are skipped
    pub fn from_reader<R: Read>(reader: R, text_column: &str, label_column: &str) -> Result<Self, ClassifierError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| ClassifierError::Training(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        let find = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                ClassifierError::Training(format!(
                    "Dataset must contain '{}' and '{}' columns (found: {})",
                    text_column,
                    label_column,
                    headers.join(", ")
                ))
            })
        };
        let text_idx = find(text_column)?;
        let label_idx = find(label_column)?;

        let mut dataset = LabelledDataset::default();
        let mut skipped = 0usize;
        for (row, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("[DATASET] Row {} error: {}", row, e);
                    skipped += 1;
                    continue;
                }
            };
            let text = record.get(text_idx).unwrap_or("").trim();
            let label = record.get(label_idx).unwrap_or("").trim();
            if text.is_empty() || label.is_empty() {
                skipped += 1;
                continue;
            }
            dataset.texts.push(text.to_string());
            dataset.labels.push(label.to_string());
        }

        if skipped > 0 {
            warn!("[DATASET] Skipped {} incomplete rows", skipped);
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Distinct labels in sorted order
    pub fn classes(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.labels.iter().collect();
        set.into_iter().cloned().collect()
    }

    /// Seeded shuffle split; the test side gets ceil(len * test_fraction) rows,
    /// at least one when possible, and the train side keeps at least one row.
    pub fn split(&self, test_fraction: f64, seed: u64) -> (LabelledDataset, LabelledDataset) {
        let n = self.len();
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let fraction = test_fraction.clamp(0.0, 1.0);
        let mut n_test = (n as f64 * fraction).ceil() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }

        let mut train = LabelledDataset::default();
        let mut test = LabelledDataset::default();
        for (pos, i) in order.into_iter().enumerate() {
            let target = if pos < n_test { &mut test } else { &mut train };
            target.texts.push(self.texts[i].clone());
            target.labels.push(self.labels[i].clone());
        }
        (train, test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "category,rating,label,text\n\
        Home,5,CG,Best product ever buy now\n\
        Home,4,OR,The handle broke after a week\n\
        Toys,3,OR,\n\
        Toys,5,CG,Amazing amazing amazing\n\
        Toys,2,OR,\"Okay, but smaller than expected\"\n";

    #[test]
    fn test_from_reader_skips_incomplete_rows() {
        let ds = LabelledDataset::from_reader(CSV.as_bytes(), "text", "label").unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.texts[3], "Okay, but smaller than expected");
        assert_eq!(ds.classes(), vec!["CG", "OR"]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let err = LabelledDataset::from_reader(CSV.as_bytes(), "review", "label").unwrap_err();
        assert!(err.to_string().contains("review"));
    }

    #[test]
    fn test_split_is_deterministic_and_complete() {
        let ds = LabelledDataset {
            texts: (0..10).map(|i| format!("review {}", i)).collect(),
            labels: (0..10).map(|i| if i % 2 == 0 { "CG" } else { "OR" }.to_string()).collect(),
        };
        let (train_a, test_a) = ds.split(0.2, 42);
        let (train_b, test_b) = ds.split(0.2, 42);
        assert_eq!(test_a, test_b);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);
    }

    #[test]
    fn test_split_is_pinned_for_seed() {
        let ds = LabelledDataset {
            texts: (0..10).map(|i| format!("review {}", i)).collect(),
            labels: vec!["CG".to_string(); 10],
        };
        let (train, test) = ds.split(0.2, 42);
        assert_eq!(test.texts, vec!["review 7", "review 3"]);
        assert_eq!(
            train.texts,
            vec!["review 9", "review 5", "review 0", "review 8", "review 6", "review 4", "review 2", "review 1"]
        );
    }

    #[test]
    fn test_split_keeps_both_sides_non_empty() {
        let ds = LabelledDataset {
            texts: vec!["a".to_string(), "b".to_string()],
            labels: vec!["CG".to_string(), "OR".to_string()],
        };
        let (train, test) = ds.split(0.9, 1);
        assert_eq!((train.len(), test.len()), (1, 1));
    }
}
