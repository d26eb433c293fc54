use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub suggestions: SuggestionConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".autocompleter").join("context.db"),
        None => PathBuf::from("./data/context.db"),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            anthropic_api_key: None,
            openai_api_key: None,
        }
    }
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_max_tokens() -> u32 {
    150
}
fn default_temperature() -> f64 {
    0.7
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuggestionConfig {
    #[serde(default = "default_num_suggestions")]
    pub num_suggestions: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            num_suggestions: default_num_suggestions(),
            debounce_ms: default_debounce_ms(),
            hotkey: default_hotkey(),
        }
    }
}

fn default_num_suggestions() -> usize {
    3
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_hotkey() -> String {
    "ctrl+space".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
            max_entries: default_max_entries(),
            window_chars: default_window_chars(),
        }
    }
}

fn default_max_age_hours() -> u64 {
    72
}
fn default_max_entries() -> usize {
    5000
}
fn default_window_chars() -> usize {
    4000
}

impl Config {
    /// Apply `AUTOCOMPLETER_*` overrides and fill API keys from the
    /// provider-standard variables when the file leaves them unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("AUTOCOMPLETER_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("AUTOCOMPLETER_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(hotkey) = lookup("AUTOCOMPLETER_HOTKEY") {
            self.suggestions.hotkey = hotkey;
        }
        if self.llm.anthropic_api_key.is_none() {
            self.llm.anthropic_api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty());
        }
        if self.llm.openai_api_key.is_none() {
            self.llm.openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        }
    }

    fn validate(&self) -> Result<()> {
        if self.suggestions.num_suggestions == 0 {
            anyhow::bail!("suggestions.num_suggestions must be > 0");
        }
        if self.context.window_chars == 0 {
            anyhow::bail!("context.window_chars must be > 0");
        }
        if self.context.max_entries == 0 {
            anyhow::bail!("context.max_entries must be > 0");
        }
        if self.context.max_age_hours == 0 {
            anyhow::bail!("context.max_age_hours must be > 0");
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be > 0");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }
        Ok(())
    }
}

/// Parse and validate a TOML document, applying environment overrides.
pub fn parse_config<F>(content: &str, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        String::new()
    };

    parse_config(&content, |key| std::env::var(key).ok())
}
