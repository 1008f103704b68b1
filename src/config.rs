use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Days before a stored activity expires and is purged.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
}

fn default_ttl_days() -> i64 {
    7
}

/// Explicit knobs for the clustering and assembly pipeline. These are
/// construction-time configuration, never ambient process state.
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Tabs included per summarization prompt; extra cluster members are
    /// still counted and hashed, just not quoted to the model.
    #[serde(default = "default_max_tabs_per_prompt")]
    pub max_tabs_per_prompt: usize,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,
}

fn default_similarity_threshold() -> f64 {
    0.55
}
fn default_max_tabs_per_prompt() -> usize {
    6
}
fn default_max_images() -> usize {
    2
}
fn default_summary_max_chars() -> usize {
    400
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_tabs_per_prompt: default_max_tabs_per_prompt(),
            max_images: default_max_images(),
            summary_max_chars: default_summary_max_chars(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: "stub".to_string(),
            model: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "stub".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// When set, requests must present this key via `x-api-key` or a
    /// bearer token. Unset means the gate is not enforced.
    #[serde(default)]
    pub api_key: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !(0.0..=1.0).contains(&config.pipeline.similarity_threshold) {
        anyhow::bail!("pipeline.similarity_threshold must be in [0.0, 1.0]");
    }

    if config.pipeline.max_tabs_per_prompt == 0 {
        anyhow::bail!("pipeline.max_tabs_per_prompt must be >= 1");
    }

    if config.pipeline.summary_max_chars == 0 {
        anyhow::bail!("pipeline.summary_max_chars must be >= 1");
    }

    if config.db.ttl_days < 1 {
        anyhow::bail!("db.ttl_days must be >= 1");
    }

    match config.summarizer.provider.as_str() {
        "stub" | "anthropic" => {}
        other => anyhow::bail!(
            "Unknown summarizer provider: '{}'. Must be stub or anthropic.",
            other
        ),
    }

    Ok(config)
}
