use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the application home directory
pub const HOME_ENV: &str = "PIXEL_ASSISTANT_HOME";

/// URL a model artifact is fetched from; `{model_id}` is substituted
pub const DEFAULT_MODEL_URL_TEMPLATE: &str =
    "https://huggingface.co/{model_id}/resolve/main/model.litert?download=1";

const CONFIG_FILE: &str = "config.toml";
const MEMORY_FILE: &str = "chat_memory.json";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application home directory
    #[serde(skip)]
    pub app_home: PathBuf,

    /// Where downloaded model artifacts are cached
    pub models_dir: PathBuf,

    /// Template for model artifact downloads
    pub model_url_template: String,

    /// Simulated model warm-up before each reply, in milliseconds
    pub warmup_ms: u64,

    /// Persist the conversation after each reply
    pub memory_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        let app_home = default_home();
        Config {
            models_dir: app_home.join("models"),
            app_home,
            model_url_template: DEFAULT_MODEL_URL_TEMPLATE.to_string(),
            warmup_ms: 1500,
            memory_enabled: true,
        }
    }
}

fn default_home() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pixel-assistant")
}

impl Config {
    /// Load configuration from the default home directory
    pub fn load() -> Result<Self> {
        Self::load_from(&default_home())
    }

    /// Load configuration rooted at `app_home`, falling back to defaults
    pub fn load_from(app_home: &Path) -> Result<Self> {
        fs::create_dir_all(app_home)
            .with_context(|| format!("Failed to create {}", app_home.display()))?;

        let config_path = app_home.join(CONFIG_FILE);
        let mut config: Config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        // Relative and defaulted paths follow the resolved home
        let default_models = Config::default().models_dir;
        if config.models_dir == default_models || config.models_dir.as_os_str().is_empty() {
            config.models_dir = app_home.join("models");
        } else if config.models_dir.is_relative() {
            config.models_dir = app_home.join(&config.models_dir);
        }
        config.app_home = app_home.to_path_buf();

        Ok(config)
    }

    /// Save configuration to `config.toml` in the home directory
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.app_home.join(CONFIG_FILE), content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Backing file of the conversation memory
    pub fn memory_path(&self) -> PathBuf {
        self.app_home.join(MEMORY_FILE)
    }
}
