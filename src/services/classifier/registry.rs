// Classifier Registry
// Immutable name -> model snapshots; the shared handle swaps whole snapshots so
// readers see either the old or the new set, never a mix

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::pipeline::{ModelKind, TextPipeline};
use super::TextClassifier;
use crate::models::RegistryStatus;
use crate::services::errors::ClassifierError;

#[derive(Clone)]
pub struct ClassifierRegistry {
    models: BTreeMap<String, Arc<dyn TextClassifier>>,
    authentic_label: String,
}

impl std::fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierRegistry")
            .field("models", &self.names())
            .field("authentic_label", &self.authentic_label)
            .finish()
    }
}

impl ClassifierRegistry {
    pub fn new(authentic_label: impl Into<String>) -> Self {
        Self {
            models: BTreeMap::new(),
            authentic_label: authentic_label.into(),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn TextClassifier>) -> Self {
        self.insert(model);
        self
    }

    /// Keyed by the model's own name; replaces an existing entry
    pub fn insert(&mut self, model: Arc<dyn TextClassifier>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TextClassifier>> {
        self.models.get(name).cloned()
    }

    /// Model names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn TextClassifier>)> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The class label that denotes a genuine review
    pub fn authentic_label(&self) -> &str {
        &self.authentic_label
    }

    /// Load every known artifact present in `dir`. Unreadable artifacts are
    /// logged and skipped so one corrupt file does not hide the others.
    pub fn load_dir(dir: &Path, authentic_label: &str) -> Self {
        let mut registry = Self::new(authentic_label);
        if !dir.exists() {
            warn!("[REGISTRY] Model folder does not exist: {}", dir.display());
            return registry;
        }

        for kind in ModelKind::ALL {
            let path = dir.join(kind.artifact_file());
            if !path.exists() {
                continue;
            }
            match TextPipeline::load(&path) {
                Ok(pipeline) => {
                    info!("[REGISTRY] Loaded {} from {}", kind.name(), path.display());
                    registry.insert(Arc::new(pipeline));
                }
                Err(e) => warn!("[REGISTRY] Failed to load {}: {}", path.display(), e),
            }
        }

        info!("[REGISTRY] {} model(s) available: {:?}", registry.len(), registry.names());
        registry
    }
}

/// Process-wide handle to the current registry snapshot
pub struct SharedRegistry {
    current: RwLock<Arc<ClassifierRegistry>>,
    source: Option<PathBuf>,
    /// Serializes writers so copy-on-write updates do not lose each other
    write_lock: Mutex<()>,
}

impl SharedRegistry {
    pub fn new(registry: ClassifierRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
            source: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Registry backed by a model folder; loaded immediately
    pub fn from_dir(dir: impl Into<PathBuf>, authentic_label: &str) -> Self {
        let dir = dir.into();
        let registry = ClassifierRegistry::load_dir(&dir, authentic_label);
        Self {
            current: RwLock::new(Arc::new(registry)),
            source: Some(dir),
            write_lock: Mutex::new(()),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The snapshot in effect right now; stays valid across later swaps
    pub fn snapshot(&self) -> Arc<ClassifierRegistry> {
        self.current.read().clone()
    }

    /// Replace the whole registry in one step
    pub fn publish(&self, registry: ClassifierRegistry) {
        let _guard = self.write_lock.lock();
        let names = registry.names();
        *self.current.write() = Arc::new(registry);
        info!("[REGISTRY] Published registry with models {:?}", names);
    }

    /// Copy the current snapshot, swap one entry, publish the copy
    pub fn replace_model(&self, model: Arc<dyn TextClassifier>) {
        let _guard = self.write_lock.lock();
        let mut next = (*self.snapshot()).clone();
        let name = model.name().to_string();
        next.insert(model);
        *self.current.write() = Arc::new(next);
        info!("[REGISTRY] Replaced model {}", name);
    }

    /// Re-read the model folder and publish the result
    pub fn reload(&self) -> Result<usize, ClassifierError> {
        let Some(dir) = self.source.as_deref() else {
            return Err(ClassifierError::Artifact {
                path: PathBuf::new(),
                message: "registry has no model folder to reload from".to_string(),
            });
        };
        let label = self.snapshot().authentic_label().to_string();
        let registry = ClassifierRegistry::load_dir(dir, &label);
        let count = registry.len();
        self.publish(registry);
        Ok(count)
    }

    /// Snapshot, reloading once first when it is empty and a model folder is known
    pub fn ensure_loaded(&self) -> Arc<ClassifierRegistry> {
        let snapshot = self.snapshot();
        if !snapshot.is_empty() || self.source.is_none() {
            return snapshot;
        }
        info!("[REGISTRY] Registry empty; reloading from disk");
        match self.reload() {
            Ok(_) => self.snapshot(),
            Err(e) => {
                warn!("[REGISTRY] Reload failed: {}", e);
                snapshot
            }
        }
    }

    pub fn status(&self) -> RegistryStatus {
        let snapshot = self.snapshot();
        let (exists, files) = match self.source.as_deref() {
            Some(dir) if dir.exists() => {
                let mut files: Vec<String> = fs::read_dir(dir)
                    .map(|rd| {
                        rd.filter_map(|e| e.ok())
                            .map(|e| e.file_name().to_string_lossy().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                files.sort();
                (true, files)
            }
            _ => (false, Vec::new()),
        };
        RegistryStatus {
            model_folder: self.source.as_ref().map(|p| p.display().to_string()),
            exists,
            files,
            trained_keys: snapshot.names(),
            authentic_label: snapshot.authentic_label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::testing::FixedModel;
    use crate::services::classifier::{train_all, train::persist};
    use crate::services::classifier::dataset::LabelledDataset;
    use crate::services::config_store::TrainingConfig;

    fn fixed(name: &str, p_or: f64) -> Arc<dyn TextClassifier> {
        Arc::new(FixedModel::new(name, &["CG", "OR"], &[1.0 - p_or, p_or]))
    }

    fn small_dataset() -> LabelledDataset {
        let mut ds = LabelledDataset::default();
        for (t, l) in [
            ("buy now best deal", "CG"),
            ("amazing best product", "CG"),
            ("use code amazing", "CG"),
            ("battery died quickly", "OR"),
            ("strap broke after a week", "OR"),
            ("slow shipping dented box", "OR"),
        ] {
            ds.texts.push(t.to_string());
            ds.labels.push(l.to_string());
        }
        ds
    }

    #[test]
    fn test_registry_lookup_and_names() {
        let reg = ClassifierRegistry::new("OR")
            .with_model(fixed("SVM", 0.7))
            .with_model(fixed("NaiveBayes", 0.4));
        assert_eq!(reg.names(), vec!["NaiveBayes", "SVM"]);
        assert!(reg.get("SVM").is_some());
        assert!(reg.get("KNN").is_none());
        assert_eq!(reg.authentic_label(), "OR");
    }

    #[test]
    fn test_snapshot_survives_publish() {
        let shared = SharedRegistry::new(ClassifierRegistry::new("OR").with_model(fixed("SVM", 0.7)));
        let before = shared.snapshot();
        shared.publish(ClassifierRegistry::new("OR").with_model(fixed("LogisticRegression", 0.2)));

        assert_eq!(before.names(), vec!["SVM"]);
        assert_eq!(shared.snapshot().names(), vec!["LogisticRegression"]);
    }

    #[test]
    fn test_replace_model_is_copy_on_write() {
        let shared = SharedRegistry::new(ClassifierRegistry::new("OR").with_model(fixed("SVM", 0.7)));
        let before = shared.snapshot();
        shared.replace_model(fixed("SVM", 0.1));
        shared.replace_model(fixed("NaiveBayes", 0.5));

        let p_old = before.get("SVM").unwrap().predict_proba("x").unwrap()[1];
        let p_new = shared.snapshot().get("SVM").unwrap().predict_proba("x").unwrap()[1];
        assert_eq!(p_old, 0.7);
        assert_eq!(p_new, 0.1);
        assert_eq!(shared.snapshot().len(), 2);
    }

    #[test]
    fn test_load_dir_and_lazy_reload() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedRegistry::from_dir(dir.path(), "OR");
        assert!(shared.snapshot().is_empty());

        let outcome = train_all(&small_dataset(), &TrainingConfig::default(), "CG").unwrap();
        persist(&outcome.pipelines, dir.path()).unwrap();

        let reloaded = shared.ensure_loaded();
        assert_eq!(reloaded.names(), vec!["LogisticRegression", "NaiveBayes", "SVM"]);
        let status = shared.status();
        assert!(status.exists);
        assert!(status.files.contains(&"svm_pipeline.json".to_string()));
    }

    #[test]
    fn test_corrupt_artifact_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("nb_pipeline.json"), "garbage").unwrap();
        let reg = ClassifierRegistry::load_dir(dir.path(), "OR");
        assert!(reg.is_empty());
    }

    #[test]
    fn test_reload_without_source_fails() {
        let shared = SharedRegistry::new(ClassifierRegistry::new("OR"));
        assert!(shared.reload().is_err());
        assert!(shared.ensure_loaded().is_empty());
    }
}
