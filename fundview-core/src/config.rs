//! Client settings.
//!
//! Loaded from `<config dir>/fundview/config.toml` (missing file means
//! defaults), then overridden from the environment:
//!
//! | variable                     | field                  |
//! |------------------------------|------------------------|
//! | `FUNDVIEW_BASE_URL`          | `base_url`             |
//! | `FUNDVIEW_RESEARCH_BASE_URL` | `research_base_url`    |
//! | `FUNDVIEW_TIMEOUT_SECS`      | `request_timeout_secs` |
//! | `FUNDVIEW_EMPTY_MARKET`      | `empty_market_policy`  |
//! | `FUNDVIEW_LEAVE_POLICY`      | `leave_policy`         |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::router::{RouterConfig, Screen};
use crate::selection::{EmptyMarketPolicy, Selection};

/// What happens to a screen's in-flight requests when it is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeavePolicy {
    #[default]
    CancelOnLeave,
    KeepInFlight,
}

impl LeavePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cancel_on_leave" | "cancel" => Some(LeavePolicy::CancelOnLeave),
            "keep_in_flight" | "keep" => Some(LeavePolicy::KeepInFlight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fund department server.
    pub base_url: String,
    /// Research department server, used by every research screen.
    pub research_base_url: String,
    pub api_prefix: String,
    /// Prefix under `api_prefix` for the research analysis endpoints.
    pub research_analysis_prefix: String,
    pub request_timeout_secs: u64,
    pub worker_threads: usize,
    pub empty_market_policy: EmptyMarketPolicy,
    pub leave_policy: LeavePolicy,
    /// Enabled screens. `None` enables all of them.
    pub screens: Option<Vec<Screen>>,
    pub default_days_to_predict: u32,
    pub default_use_beta: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            research_base_url: "http://localhost:5001".into(),
            api_prefix: "/api".into(),
            research_analysis_prefix: "/data-analysis".into(),
            request_timeout_secs: 30,
            worker_threads: 4,
            empty_market_policy: EmptyMarketPolicy::default(),
            leave_policy: LeavePolicy::default(),
            screens: None,
            default_days_to_predict: 5,
            default_use_beta: true,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("fundview").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read `path`; a missing file yields defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// File (explicit path or the default location) plus process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => Self::load_file(&p)?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("FUNDVIEW_BASE_URL") {
            self.base_url = url;
        }
        if let Some(url) = lookup("FUNDVIEW_RESEARCH_BASE_URL") {
            self.research_base_url = url;
        }
        if let Some(raw) = lookup("FUNDVIEW_TIMEOUT_SECS") {
            self.request_timeout_secs =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "request_timeout_secs",
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup("FUNDVIEW_EMPTY_MARKET") {
            self.empty_market_policy =
                EmptyMarketPolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                    field: "empty_market_policy",
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup("FUNDVIEW_LEAVE_POLICY") {
            self.leave_policy = LeavePolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                field: "leave_policy",
                value: raw.clone(),
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, value: String| ConfigError::InvalidValue { field, value };
        let is_http = |url: &str| url.starts_with("http://") || url.starts_with("https://");
        if !is_http(&self.base_url) {
            return Err(invalid("base_url", self.base_url.clone()));
        }
        if !is_http(&self.research_base_url) {
            return Err(invalid("research_base_url", self.research_base_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "0".into()));
        }
        if self.worker_threads == 0 {
            return Err(invalid("worker_threads", "0".into()));
        }
        if self.default_days_to_predict == 0 {
            return Err(invalid("default_days_to_predict", "0".into()));
        }
        Ok(())
    }

    pub fn router_config(&self) -> RouterConfig {
        match &self.screens {
            Some(screens) => RouterConfig::with_screens(screens.iter().copied()),
            None => RouterConfig::default(),
        }
    }

    pub fn default_selection(&self) -> Selection {
        Selection::with_defaults(self.default_days_to_predict, self.default_use_beta)
    }
}
