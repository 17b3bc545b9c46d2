// TF-IDF Vectorizer
// Word n-gram features with smoothed idf and l2-normalized rows

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use crate::services::errors::ClassifierError;

/// Sparse row: (feature index, value), sorted by index
pub type SparseVector = Vec<(usize, f64)>;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token regex"))
}

pub fn dot(row: &SparseVector, weights: &[f64]) -> f64 {
    row.iter()
        .map(|(idx, v)| weights.get(*idx).copied().unwrap_or(0.0) * v)
        .sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TfidfVectorizer {
    /// Term -> column index; columns are assigned in term order
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_ngram_max")]
    ngram_max: usize,
    #[serde(default)]
    max_features: Option<usize>,
}

fn default_ngram_max() -> usize {
    1
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(1, None)
    }
}

impl TfidfVectorizer {
    pub fn new(ngram_max: usize, max_features: Option<usize>) -> Self {
        Self {
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
            ngram_max: ngram_max.max(1),
            max_features,
        }
    }

    /// Lowercased word n-grams (1..=ngram_max), unigrams of two or more word characters
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let unigrams: Vec<&str> = token_re().find_iter(&lower).map(|m| m.as_str()).collect();
        let mut terms: Vec<String> = unigrams.iter().map(|s| s.to_string()).collect();
        for n in 2..=self.ngram_max {
            if unigrams.len() < n {
                break;
            }
            for window in unigrams.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    pub fn fit(&mut self, documents: &[String]) -> Result<(), ClassifierError> {
        let n_documents = documents.len();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut term_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = self.analyze(doc);
            for term in &terms {
                *term_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            let unique: HashSet<String> = terms.into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(ClassifierError::Training(
                "empty vocabulary; documents contain no terms".to_string(),
            ));
        }

        let mut terms: Vec<String> = document_frequency.keys().cloned().collect();
        if let Some(limit) = self.max_features {
            // Most frequent across the corpus, ties by term
            terms.sort_by(|a, b| term_frequency[b].cmp(&term_frequency[a]).then(a.cmp(b)));
            terms.truncate(limit.max(1));
        }
        terms.sort();

        let vocabulary: BTreeMap<String, usize> =
            terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();
        let mut idf = vec![0.0; vocabulary.len()];
        for (term, idx) in &vocabulary {
            let df = document_frequency.get(term).copied().unwrap_or(0);
            idf[*idx] = ((n_documents as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0;
        }

        self.vocabulary = vocabulary;
        self.idf = idf;
        Ok(())
    }

    pub fn transform(&self, document: &str) -> Result<SparseVector, ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted);
        }

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyze(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVector = Vec::with_capacity(counts.len());
        for (idx, tf) in counts {
            let idf = self.idf.get(idx).ok_or_else(|| ClassifierError::Inference {
                model: "TfidfVectorizer".to_string(),
                message: format!("feature index {} out of range for {} idf weights", idx, self.idf.len()),
            })?;
            row.push((idx, tf * idf));
        }

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }
        Ok(row)
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Vec<SparseVector>, ClassifierError> {
        self.fit(documents)?;
        documents.iter().map(|d| self.transform(d)).collect()
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty() && self.idf.len() == self.vocabulary.len()
    }

    /// Structural check for a deserialized vectorizer: every column index
    /// addresses an idf weight and every weight is finite
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_fitted() {
            return Err(format!(
                "vectorizer is not fitted ({} terms, {} idf weights)",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        if let Some((term, idx)) = self.vocabulary.iter().find(|(_, idx)| **idx >= self.idf.len()) {
            return Err(format!(
                "term {:?} maps to column {} but only {} columns exist",
                term,
                idx,
                self.idf.len()
            ));
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err("non-finite idf weight".to_string());
        }
        Ok(())
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Feature names in column order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.vocabulary.len()];
        for (term, idx) in &self.vocabulary {
            if let Some(slot) = names.get_mut(*idx) {
                *slot = term.clone();
            }
        }
        names
    }
}
