pub mod models;
pub mod services;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use models::{FeatureImpact, RegistryStatus, TrainReport};
use services::classifier::dataset::LabelledDataset;
use services::classifier::train::{persist, train_all};
use services::{
    top_features, AppConfig, ClassifierError, ClassifierRegistry, ConfigStore, DeceptionScorer,
    HistoryEntry, HistoryStore, InMemoryHistoryStore, JsonlHistoryStore, ScoringError,
    ScoringOrchestrator, SharedRegistry,
};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_PREFIX: &str = "trustLens_";
const LOGS_KEPT: usize = 30;

fn startup_elapsed_ms() -> u128 {
    PROCESS_START
        .get()
        .map(|t| t.elapsed().as_millis())
        .unwrap_or(0)
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Initialize logging: a per-session file plus stderr. Stdout is left for command output.
pub fn init_logging() {
    PROCESS_START.get_or_init(Instant::now);
    let disable_file_log = env_flag("TRUSTLENS_DISABLE_FILE_LOG");
    let disable_cleanup = env_flag("TRUSTLENS_DISABLE_LOG_CLEANUP");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if disable_file_log {
        init_console_only_logging(env_filter);
        info!("File logging disabled via TRUSTLENS_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("TRUSTLENS_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}{}.log", LOG_PREFIX, timestamp);

    // One file per session; writes stay non-blocking.
    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    info!("=== TrustLens Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Best-effort cleanup off the startup path
    if !disable_cleanup {
        std::thread::spawn(move || {
            cleanup_old_logs(&logs_dir, LOGS_KEPT);
        });
    }
}

fn get_logs_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("trustLens").join("logs");
    }
    PathBuf::from("logs")
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(LOG_PREFIX) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// Fully wired scoring services for one configuration
pub struct TrustLens {
    pub config: AppConfig,
    pub registry: Arc<SharedRegistry>,
    pub orchestrator: Arc<ScoringOrchestrator>,
    history: Arc<dyn HistoryStore>,
}

impl TrustLens {
    /// Load config from `config_dir` (or the per-user default) and assemble services
    pub fn open(config_dir: Option<PathBuf>) -> Result<Self, String> {
        let dir = config_dir
            .or_else(ConfigStore::default_config_dir)
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        let store = ConfigStore::new(dir);
        let config = store.load()?;
        info!("Config loaded from {}", store.config_dir().display());
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AppConfig) -> Self {
        let model_dir = config.resolve_model_dir();
        let registry = Arc::new(SharedRegistry::from_dir(model_dir, &config.scoring.authentic_label));
        let history: Arc<dyn HistoryStore> = match &config.history_file {
            Some(path) => Arc::new(JsonlHistoryStore::new(path.clone())),
            None => Arc::new(InMemoryHistoryStore::new()),
        };
        Self::assemble(config, registry, history)
    }

    /// Wire services around an existing registry and history store
    pub fn assemble(config: AppConfig, registry: Arc<SharedRegistry>, history: Arc<dyn HistoryStore>) -> Self {
        let deception = DeceptionScorer::default()
            .with_repetition_exceptions(config.scoring.repetition_exceptions.clone());
        let orchestrator = ScoringOrchestrator::new(registry.clone())
            .with_deception(deception)
            .with_history(history.clone());

        info!(
            startup_ms = startup_elapsed_ms(),
            models = ?registry.snapshot().names(),
            "services.ready"
        );

        Self {
            config,
            registry,
            orchestrator: Arc::new(orchestrator),
            history,
        }
    }

    /// Train all models from a CSV, persist them, then publish them as one registry
    pub fn train(&self, csv_path: &Path, text_column: &str, label_column: &str) -> Result<TrainReport, ClassifierError> {
        let dataset = LabelledDataset::load_csv(csv_path, text_column, label_column)?;
        let outcome = train_all(&dataset, &self.config.training, &self.config.scoring.positive_label)?;

        if let Some(dir) = self.registry.source() {
            persist(&outcome.pipelines, dir)?;
        }

        let next = outcome
            .pipelines
            .into_iter()
            .fold(ClassifierRegistry::new(self.config.scoring.authentic_label.clone()), |registry, pipeline| {
                registry.with_model(Arc::new(pipeline))
            });
        self.registry.publish(next);
        Ok(outcome.report)
    }

    /// Most influential features of a linear model
    pub fn features(&self, model: &str, top: usize) -> Result<Vec<FeatureImpact>, ScoringError> {
        let snapshot = self.registry.ensure_loaded();
        let classifier = snapshot.get(model).ok_or_else(|| ScoringError::ModelNotFound {
            requested: model.to_string(),
            available: snapshot.names(),
        })?;
        Ok(top_features(classifier.as_ref(), top)?)
    }

    pub fn models(&self) -> RegistryStatus {
        self.registry.status()
    }

    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ScoringError> {
        self.history.recent(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn app_in(dir: &Path) -> TrustLens {
        let config = AppConfig {
            model_dir: Some(dir.join("models")),
            history_file: Some(dir.join("history.jsonl")),
            ..AppConfig::default()
        };
        TrustLens::from_config(config)
    }

    fn write_csv(dir: &Path) -> PathBuf {
        let path = dir.join("reviews.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "category,rating,label,text").unwrap();
        let rows = [
            ("CG", "best product ever buy now"),
            ("CG", "amazing amazing deal buy now"),
            ("CG", "incredible best purchase trust me"),
            ("CG", "perfect perfect five stars buy"),
            ("CG", "amazing product use code save"),
            ("OR", "battery died after two weeks"),
            ("OR", "strap broke but support replaced it"),
            ("OR", "shipping was slow and the box was dented"),
            ("OR", "decent sound for the price with weak bass"),
            ("OR", "stopped charging after a month"),
        ];
        for (label, text) in rows {
            writeln!(f, "Home,4,{},{}", label, text).unwrap();
        }
        path
    }

    #[test]
    fn test_train_then_score_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        assert!(app.registry.snapshot().is_empty());

        let csv = write_csv(dir.path());
        let report = app.train(&csv, "text", "label").unwrap();
        assert_eq!(report.metrics.len(), 3);
        assert!(dir.path().join("models").join("svm_pipeline.json").exists());

        let record = app.orchestrator.score_one("buy now, amazing deal", "SVM").unwrap();
        assert_eq!(record.consensus.len(), 3);
        assert!((0.0..=100.0).contains(&record.trust_score));

        let history = app.history(50).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "buy now, amazing deal");

        // A fresh instance picks the artifacts up from disk
        let reopened = app_in(dir.path());
        assert_eq!(reopened.models().trained_keys.len(), 3);
    }

    #[test]
    fn test_features_capability() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        app.train(&write_csv(dir.path()), "text", "label").unwrap();

        let impacts = app.features("LogisticRegression", 5).unwrap();
        assert!(!impacts.is_empty());
        assert!(matches!(
            app.features("NaiveBayes", 5),
            Err(ScoringError::FeatureWeights(_))
        ));
        assert!(matches!(
            app.features("KNN", 5),
            Err(ScoringError::ModelNotFound { .. })
        ));
    }
}
