use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::project::ProjectMetadata;
use crate::providers::Backend;
use crate::reconcile::DEFAULT_SIMILARITY_THRESHOLD;
use crate::translation::prompts::DEFAULT_TAG_INSTRUCTION;
use crate::translation::{RetryPolicy, SchedulerConfig};

/// Settings read from `conf.json`; CLI flags override them after loading
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language tag for new projects (`zh-CN`, `fr`, `original`)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Model id passed to the translation backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// SQLite database file; the platform data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub autosave: AutosaveConfig,
}

/// Translation settings applied to new projects and runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    // @field: Backend used by the CLI
    #[serde(default)]
    pub backend: Backend,

    // @field: Blocks per window for new projects
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    // @field: Upper bound applied to every project's batch size
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    // @field: Previous source texts sent as context
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    // @field: Send the work's tags with every window
    #[serde(default = "default_true")]
    pub include_tags: bool,

    // @field: How the model should use the tags
    #[serde(default = "default_tag_instruction")]
    pub tag_instruction: String,

    // @field: Extra system prompt text
    #[serde(default)]
    pub custom_prompt: String,

    // @field: Refinement template; empty selects the built-in one
    #[serde(default)]
    pub refine_prompt_template: String,

    // @field: Glossary lines ("source = target")
    #[serde(default)]
    pub glossary: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            batch_size: default_batch_size(),
            max_batch_size: default_max_batch_size(),
            context_window: default_context_window(),
            include_tags: true,
            tag_instruction: default_tag_instruction(),
            custom_prompt: String::new(),
            refine_prompt_template: String::new(),
            glossary: String::new(),
        }
    }
}

/// Retry settings for transient backend failures
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts per window (at least one is always made)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay, doubled after every failed attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Random delay added on top of the backoff
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

/// Source refresh settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReconcileConfig {
    /// Refreshes below this similarity percentage need confirmation
    #[serde(default = "default_similarity_threshold")]
    pub similarity_warning_threshold: u8,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            similarity_warning_threshold: default_similarity_threshold(),
        }
    }
}

/// Periodic backup settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AutosaveConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Directory for backup files; `backups` next to the database when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_interval_minutes(),
            backup_dir: None,
        }
    }
}

impl AutosaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "zh-CN".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_max_batch_size() -> usize {
    50
}

fn default_context_window() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_tag_instruction() -> String {
    DEFAULT_TAG_INSTRUCTION.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000 // doubled on each retry
}

fn default_max_jitter_ms() -> u64 {
    500
}

fn default_similarity_threshold() -> u8 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_interval_minutes() -> u64 {
    30
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config to file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("A model id is required"));
        }

        crate::language_utils::validate_language_code(&self.target_language)
            .with_context(|| format!("Unknown target language: {}", self.target_language))?;

        if self.translation.batch_size == 0 {
            return Err(anyhow!("translation.batch_size must be at least 1"));
        }
        if self.translation.max_batch_size == 0 {
            return Err(anyhow!("translation.max_batch_size must be at least 1"));
        }
        if self.reconcile.similarity_warning_threshold > 100 {
            return Err(anyhow!(
                "reconcile.similarity_warning_threshold must be between 0 and 100, got {}",
                self.reconcile.similarity_warning_threshold
            ));
        }

        Ok(())
    }

    /// Metadata defaults stamped on newly imported projects
    pub fn project_defaults(&self) -> ProjectMetadata {
        ProjectMetadata {
            target_language: self.target_language.clone(),
            model: self.model.clone(),
            custom_prompt: self.translation.custom_prompt.clone(),
            refine_prompt_template: self.translation.refine_prompt_template.clone(),
            context_window: self.translation.context_window,
            batch_size: self.translation.batch_size,
            include_tags: self.translation.include_tags,
            tag_instruction: self.translation.tag_instruction.clone(),
            glossary: self.translation.glossary.clone(),
            ..ProjectMetadata::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_retries, self.retry.base_delay_ms, self.retry.max_jitter_ms)
    }

    /// Scheduler settings for one project
    pub fn scheduler_config(&self, metadata: &ProjectMetadata) -> SchedulerConfig {
        SchedulerConfig::for_project(metadata, self.translation.max_batch_size, self.retry_policy())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            model: default_model(),
            log_level: LogLevel::default(),
            database_path: None,
            translation: TranslationConfig::default(),
            retry: RetryConfig::default(),
            reconcile: ReconcileConfig::default(),
            autosave: AutosaveConfig::default(),
        }
    }
}
