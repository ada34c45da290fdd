use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Full runtime configuration loaded from TOML + env vars.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub batch: BatchConfig,
    pub dataset: DatasetConfig,
    pub distill: DistillSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    pub concurrency: usize,
    /// Fixed inter-call delay per worker slot, in milliseconds.
    pub pacing_ms: u64,
    /// Per-call timeout; a hung call becomes a timeout failure.
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetConfig {
    pub text_column: String,
    pub label_column: String,
    /// Keep only labels with at least this many occurrences.
    pub min_label_count: usize,
    /// Sample size; 0 means use every row.
    pub sample_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistillSection {
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig { base_url: "https://api.openai.com/v1".to_string() },
            batch: BatchConfig { concurrency: 8, pacing_ms: 500, call_timeout_secs: 60 },
            dataset: DatasetConfig {
                text_column: "description".to_string(),
                label_column: "variety".to_string(),
                min_label_count: 200,
                sample_size: 500,
            },
            distill: DistillSection { poll_interval_secs: 30, poll_timeout_secs: 14_400 },
        }
    }
}

/// Load configuration from:
/// 1. Built-in defaults
/// 2. `config/default.toml` (if present)
/// 3. A custom config file path (if provided)
/// 4. Environment variables prefixed with `CEPAGE__`
pub fn load_config(config_file: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        // Layer 1: defaults baked in
        .set_default("api.base_url", "https://api.openai.com/v1")?
        .set_default("batch.concurrency", 8_i64)?
        .set_default("batch.pacing_ms", 500_i64)?
        .set_default("batch.call_timeout_secs", 60_i64)?
        .set_default("dataset.text_column", "description")?
        .set_default("dataset.label_column", "variety")?
        .set_default("dataset.min_label_count", 200_i64)?
        .set_default("dataset.sample_size", 500_i64)?
        .set_default("distill.poll_interval_secs", 30_i64)?
        .set_default("distill.poll_timeout_secs", 14_400_i64)?
        // Layer 2: project default.toml
        .add_source(File::with_name("config/default").required(false));

    // Layer 3: optional user-supplied config file
    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    // Layer 4: environment variables (CEPAGE__BATCH__CONCURRENCY, etc.).
    // Double underscore keeps multi-word keys like pacing_ms intact.
    builder = builder.add_source(
        Environment::with_prefix("CEPAGE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(raw: &std::path::Path) -> PathBuf {
    if let Some(s) = raw.to_str() {
        if let Some(rest) = s.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    raw.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── load_config defaults ──────────────────────────────────────────────────

    #[test]
    fn test_default_api_base_url() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.api.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_default_batch_values() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.batch.concurrency, 8);
        assert_eq!(cfg.batch.pacing_ms, 500);
        assert_eq!(cfg.batch.call_timeout_secs, 60);
    }

    #[test]
    fn test_default_dataset_policy() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.dataset.text_column, "description");
        assert_eq!(cfg.dataset.label_column, "variety");
        assert_eq!(cfg.dataset.min_label_count, 200);
        assert_eq!(cfg.dataset.sample_size, 500);
    }

    #[test]
    fn test_default_distill_polling() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.distill.poll_interval_secs, 30);
        assert_eq!(cfg.distill.poll_timeout_secs, 14_400);
    }

    // ── load_config from a custom file ────────────────────────────────────────

    #[test]
    fn test_custom_config_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        std::fs::write(&file, "[batch]\nconcurrency = 2\npacing_ms = 0\n").unwrap();

        let cfg = load_config(Some(&file)).unwrap();
        assert_eq!(cfg.batch.concurrency, 2);
        assert_eq!(cfg.batch.pacing_ms, 0);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.dataset.sample_size, 500);
    }

    // ── expand_path ───────────────────────────────────────────────────────────

    #[test]
    fn test_expand_absolute_path_unchanged() {
        let p = expand_path(std::path::Path::new("/data/reviews.csv"));
        assert_eq!(p, PathBuf::from("/data/reviews.csv"));
    }

    #[test]
    fn test_expand_tilde_produces_non_tilde_prefix() {
        let p = expand_path(std::path::Path::new("~/datasets/reviews.csv"));
        let s = p.to_string_lossy();
        assert!(!s.starts_with('~'), "expanded path must not start with '~', got: {s}");
        assert!(s.contains("reviews.csv"));
    }

    #[test]
    fn test_app_config_default_matches_load_config() {
        let from_load = load_config(None).unwrap();
        let default = AppConfig::default();
        assert_eq!(from_load.batch.concurrency, default.batch.concurrency);
        assert_eq!(from_load.dataset.min_label_count, default.dataset.min_label_count);
    }
}
