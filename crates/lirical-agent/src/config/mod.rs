//! Configuration loading for LIRICAL.
//! Reads lirical.toml from the current directory or path in LIRICAL_CONFIG env var.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use lirical_common::scoring_config::ScoringConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub pretest: PretestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Tab-separated background frequency table. A bundle may override it.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PretestConfig {
    /// Disease databases ranked under the uniform prior.
    #[serde(default = "default_databases")]
    pub databases: Vec<String>,
}

impl Default for PretestConfig {
    fn default() -> Self {
        Self { databases: default_databases() }
    }
}

fn default_databases() -> Vec<String> {
    vec!["OMIM".to_string(), "ORPHA".to_string(), "DECIPHER".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// `text`, `json` or `yaml`.
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_top")]
    pub top: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: default_format(), top: default_top() }
    }
}

fn default_format() -> String { "text".to_string() }
fn default_top()    -> usize  { 10 }

fn config_path() -> String {
    std::env::var("LIRICAL_CONFIG").unwrap_or_else(|_| "lirical.toml".to_string())
}


impl Config {
    /// Load configuration from lirical.toml.
    /// Checks LIRICAL_CONFIG env var first, then current directory. A missing
    /// file yields the defaults; one that fails to parse or validate is an error.
    pub fn load_or_default() -> anyhow::Result<Self> {
        Self::load_or_default_from(Path::new(&config_path()))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy lirical.example.toml to lirical.toml and edit it.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn load_or_default_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!("{} not found; using default scoring parameters", path.display());
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.scoring.validate()?;
        match config.output.format.as_str() {
            "text" | "json" | "yaml" => {}
            other => anyhow::bail!("Unknown output format '{other}' (expected text, json or yaml)"),
        }
        Ok(config)
    }
}
