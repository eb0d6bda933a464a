//! Run configuration.
//!
//! A single immutable [`Config`] is loaded once at start-up from a TOML
//! file and passed by reference to every stage of the pipeline. Every
//! section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [input]
//! root = "data"
//! pattern = "*.pdf"
//!
//! [output]
//! dir = "out"
//!
//! [slicing]
//! primary_pages = 2
//! fallback_pages = 4
//! max_chars = 2000
//!
//! [generation]
//! url = "http://localhost:11434"
//! model = "llama3.2:3b"
//! timeout_secs = 600
//! max_retries = 2
//! retry_delay_ms = 2000
//!
//! [prompt]
//! template_path = "prompts/front.txt"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prompt::PLACEHOLDER;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub slicing: SlicingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_input_root")]
    pub root: PathBuf,
    /// Glob matched against paths relative to `root`. `*` stays within a
    /// directory, `**` crosses directories.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: default_input_root(),
            pattern: default_pattern(),
        }
    }
}

fn default_input_root() -> PathBuf {
    PathBuf::from("data")
}
fn default_pattern() -> String {
    "*.pdf".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlicingConfig {
    #[serde(default = "default_primary_pages")]
    pub primary_pages: usize,
    #[serde(default = "default_fallback_pages")]
    pub fallback_pages: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for SlicingConfig {
    fn default() -> Self {
        Self {
            primary_pages: default_primary_pages(),
            fallback_pages: default_fallback_pages(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_primary_pages() -> usize {
    2
}
fn default_fallback_pages() -> usize {
    4
}
fn default_max_chars() -> usize {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptConfig {
    /// Custom instruction template. Must contain the `{TEXT}` placeholder.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
}

impl Config {
    /// All-defaults configuration for commands that can run without a file.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;

    // Relative template paths resolve against the working directory, same as
    // input/output paths, so only existence is checked here.
    if let Some(template_path) = &config.prompt.template_path {
        let template = std::fs::read_to_string(template_path).with_context(|| {
            format!(
                "Failed to read prompt.template_path: {}",
                template_path.display()
            )
        })?;
        if !template.contains(PLACEHOLDER) {
            anyhow::bail!(
                "prompt.template_path {} does not contain the {} placeholder",
                template_path.display(),
                PLACEHOLDER
            );
        }
    }

    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.input.pattern.trim().is_empty() {
        anyhow::bail!("input.pattern must not be empty");
    }

    // Validate slicing
    if config.slicing.primary_pages == 0 {
        anyhow::bail!("slicing.primary_pages must be > 0");
    }
    if config.slicing.fallback_pages < config.slicing.primary_pages {
        anyhow::bail!(
            "slicing.fallback_pages ({}) must be >= slicing.primary_pages ({})",
            config.slicing.fallback_pages,
            config.slicing.primary_pages
        );
    }
    if config.slicing.max_chars == 0 {
        anyhow::bail!("slicing.max_chars must be > 0");
    }

    // Validate generation
    if config.generation.url.trim().is_empty() {
        anyhow::bail!("generation.url must not be empty");
    }
    if config.generation.model.trim().is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }
    if config.generation.timeout_secs == 0 {
        anyhow::bail!("generation.timeout_secs must be > 0");
    }

    Ok(())
}
