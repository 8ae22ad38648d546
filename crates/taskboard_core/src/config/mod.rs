use crate::deadline::{DEFAULT_APPROACH_DAYS, DeadlinePolicy};
use crate::error::AppError;
use crate::store::DEFAULT_PAGE_SIZE;
use crate::workflow::TransitionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod theme;

pub use theme::{
    JsonThemeStore, MemoryThemeStore, Mode, Palette, ThemeController, ThemeOverrides,
    ThemeSettings, ThemeStore, ThemeTokens, ThemeUpdate,
};

const CONFIG_FILE_NAME: &str = "config.json";
const THEME_FILE_NAME: &str = "theme.json";
const CONFIG_ENV_VAR: &str = "TASKBOARD_CONFIG_PATH";
const TOKEN_ENV_VAR: &str = "TASKBOARD_API_TOKEN";

pub const DEFAULT_BASE_URL: &str = "http://localhost:1337";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Strapi,
    File,
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strapi" => Ok(Self::Strapi),
            "file" => Ok(Self::File),
            other => Err(AppError::invalid_input(format!(
                "unknown backend '{other}' (expected strapi or file)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub backend: Backend,
    pub base_url: String,
    pub token: Option<String>,
    pub page_size: u32,
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Strapi,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub user_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    pub approach_days: i64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            approach_days: DEFAULT_APPROACH_DAYS,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub transitions: TransitionPolicy,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub store_path: Option<PathBuf>,
    pub identity: IdentityConfig,
    pub deadline: DeadlineConfig,
    pub workflow: WorkflowConfig,
    pub theme: ThemeSettings,
}

impl Config {
    pub fn deadline_policy(&self) -> DeadlinePolicy {
        DeadlinePolicy::from_days(self.deadline.approach_days)
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        self.workflow.transitions
    }

    pub fn page_size(&self) -> u32 {
        self.api.page_size.max(1)
    }

    /// `TASKBOARD_API_TOKEN` wins over the file so tokens can stay out of it.
    pub fn api_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| {
                self.api
                    .token
                    .clone()
                    .filter(|token| !token.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub backend: Option<Backend>,
    pub base_url: Option<String>,
    pub page_size: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub store_path: Option<PathBuf>,
    pub user_id: Option<u64>,
    pub approach_days: Option<i64>,
    pub transitions: Option<TransitionPolicy>,
    pub theme: ThemeOverrides,
}

pub fn config_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskboard"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("taskboard"))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Saved theme settings live next to the config file.
pub fn theme_path() -> Result<PathBuf, AppError> {
    let config = config_path()?;
    Ok(match config.parent() {
        Some(parent) => parent.join(THEME_FILE_NAME),
        None => PathBuf::from(THEME_FILE_NAME),
    })
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(mut config: Config) -> Config {
    config.api.base_url = config.api.base_url.trim().trim_end_matches('/').to_string();
    if config.api.base_url.is_empty() {
        config.api.base_url = DEFAULT_BASE_URL.to_string();
    }
    if let Some(scheme) = theme::find_scheme(&config.theme.color_scheme) {
        config.theme.color_scheme = scheme.name.to_string();
    }
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(backend) = overrides.backend {
        merged.api.backend = backend;
    }
    if let Some(base_url) = overrides.base_url.as_ref() {
        merged.api.base_url = base_url.clone();
    }
    if let Some(page_size) = overrides.page_size {
        merged.api.page_size = page_size;
    }
    if let Some(timeout) = overrides.timeout_secs {
        merged.api.timeout_secs = Some(timeout);
    }
    if let Some(store_path) = overrides.store_path.as_ref() {
        merged.store_path = Some(store_path.clone());
    }
    if let Some(user_id) = overrides.user_id {
        merged.identity.user_id = Some(user_id);
    }
    if let Some(days) = overrides.approach_days {
        merged.deadline.approach_days = days;
    }
    if let Some(transitions) = overrides.transitions {
        merged.workflow.transitions = transitions;
    }
    overrides.theme.apply(&mut merged.theme);

    normalize_config(merged)
}
