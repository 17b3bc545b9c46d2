// Configuration Storage Service
// Handles config file read/write and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::lexicons::DEFAULT_REPETITION_EXCEPTIONS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
    /// JSON-lines history file; history is kept in memory when unset
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_model: default_model(),
            model_dir: None,
            history_file: None,
            scoring: ScoringConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Configured folder, then TRUSTLENS_MODEL_DIR, then the per-user data folder
    pub fn resolve_model_dir(&self) -> PathBuf {
        if let Some(dir) = &self.model_dir {
            return dir.clone();
        }
        match std::env::var("TRUSTLENS_MODEL_DIR") {
            Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => dirs::data_local_dir()
                .map(|d| d.join("trustLens").join("models"))
                .unwrap_or_else(|| PathBuf::from("models")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// Class label denoting a genuine review
    #[serde(default = "default_authentic_label")]
    pub authentic_label: String,
    /// Class label reported as "positive" in training metrics, for every model
    #[serde(default = "default_positive_label")]
    pub positive_label: String,
    #[serde(default = "default_repetition_exceptions")]
    pub repetition_exceptions: Vec<String>,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            authentic_label: default_authentic_label(),
            positive_label: default_positive_label(),
            repetition_exceptions: default_repetition_exceptions(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    #[serde(default = "default_text_column")]
    pub text_column: String,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
    #[serde(default)]
    pub max_features: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            text_column: default_text_column(),
            label_column: default_label_column(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            ngram_max: default_ngram_max(),
            max_features: None,
        }
    }
}

fn default_version() -> String { "1.0.0".to_string() }
fn default_model() -> String { "SVM".to_string() }
fn default_authentic_label() -> String { "OR".to_string() }
fn default_positive_label() -> String { "CG".to_string() }
fn default_repetition_exceptions() -> Vec<String> {
    DEFAULT_REPETITION_EXCEPTIONS.iter().map(|w| w.to_string()).collect()
}
fn default_batch_concurrency() -> usize { 4 }
fn default_text_column() -> String { "text".to_string() }
fn default_label_column() -> String { "label".to_string() }
fn default_test_fraction() -> f64 { 0.2 }
fn default_seed() -> u64 { 42 }
fn default_ngram_max() -> usize { 1 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("trustLens"))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first; names carry the timestamp
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Change the default scoring model
    pub fn set_default_model(&self, model: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.default_model = model.to_string();
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_model, "SVM");
        assert_eq!(config.scoring.authentic_label, "OR");
        assert_eq!(config.scoring.positive_label, "CG");
        assert_eq!(config.scoring.repetition_exceptions.len(), 9);
        assert_eq!(config.training.seed, 42);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"defaultModel":"NaiveBayes","scoring":{"batchConcurrency":8}}"#).unwrap();
        assert_eq!(parsed.default_model, "NaiveBayes");
        assert_eq!(parsed.scoring.batch_concurrency, 8);
        assert_eq!(parsed.scoring.authentic_label, "OR");
        assert_eq!(parsed.training.text_column, "text");
    }

    #[test]
    fn test_save_load_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.load().unwrap().default_model, "SVM");

        store.save(&AppConfig::default()).unwrap();
        store.set_default_model("LogisticRegression").unwrap();

        assert_eq!(store.load().unwrap().default_model, "LogisticRegression");
        let backups = fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_explicit_model_dir_wins() {
        let config = AppConfig {
            model_dir: Some(PathBuf::from("/srv/models")),
            ..AppConfig::default()
        };
        assert_eq!(config.resolve_model_dir(), PathBuf::from("/srv/models"));
    }
}
