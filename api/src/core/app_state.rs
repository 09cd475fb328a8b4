use std::{path::PathBuf, sync::Arc};

use chat_history::InMemoryHistory;
use contextor::{DEFAULT_HISTORY_WINDOW, PromptTemplates};

use crate::{
    core::{backends::ChatBackends, configuration::EnvSource},
    error_handler::AppError,
};

pub const DEFAULT_API_ADDRESS: &str = "127.0.0.1:8080";

/// Process-level settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Listen address.
    pub bind_addr: String,
    /// Directory with prompt template overrides.
    pub template_dir: Option<PathBuf>,
    /// Prior turns replayed into each prompt.
    pub history_window: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_API_ADDRESS.to_string(),
            template_dir: None,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl AppSettings {
    /// Load settings from environment variables.
    ///
    /// Under the Azure Functions host `FUNCTIONS_CUSTOMHANDLER_PORT` decides the
    /// port and the server listens on all interfaces; otherwise `API_ADDRESS`
    /// is used as is.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("FUNCTIONS_CUSTOMHANDLER_PORT") {
            Some(port) => {
                let port: u16 = port.trim().parse().map_err(|e| {
                    AppError::Config(format!("FUNCTIONS_CUSTOMHANDLER_PORT={port:?}: {e}"))
                })?;
                format!("0.0.0.0:{port}")
            }
            None => get("API_ADDRESS").unwrap_or_else(|| DEFAULT_API_ADDRESS.to_string()),
        };

        let history_window = match get("CHAT_HISTORY_WINDOW") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|e| AppError::Config(format!("CHAT_HISTORY_WINDOW={v:?}: {e}")))?,
            None => DEFAULT_HISTORY_WINDOW,
        };

        Ok(Self {
            bind_addr,
            template_dir: get("PROMPT_TEMPLATE_DIR").map(PathBuf::from),
            history_window,
        })
    }

    /// Built-in templates, or the overrides from `template_dir`.
    pub fn load_templates(&self) -> Result<PromptTemplates, AppError> {
        let templates = match &self.template_dir {
            Some(dir) => PromptTemplates::load(dir)?,
            None => PromptTemplates::builtin()?,
        };
        Ok(templates)
    }
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub settings: AppSettings,
    pub templates: PromptTemplates,
    /// Client factories for search, chat completion and persistent history.
    pub backends: Arc<dyn ChatBackends>,
    /// Turns of `/api/query` sessions; lost on restart.
    pub ephemeral: InMemoryHistory,
    /// Source of per-request credentials.
    pub env: EnvSource,
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        templates: PromptTemplates,
        backends: Arc<dyn ChatBackends>,
    ) -> Self {
        Self {
            settings,
            templates,
            backends,
            ephemeral: InMemoryHistory::new(),
            env: EnvSource::Process,
        }
    }

    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<AppSettings, AppError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppSettings::from_lookup(|k| map.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn functions_port_wins_over_api_address() {
        let s = settings(&[
            ("FUNCTIONS_CUSTOMHANDLER_PORT", "7071"),
            ("API_ADDRESS", "127.0.0.1:9000"),
        ])
        .unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:7071");

        let s = settings(&[("API_ADDRESS", "127.0.0.1:9000")]).unwrap();
        assert_eq!(s.bind_addr, "127.0.0.1:9000");

        assert_eq!(settings(&[]).unwrap(), AppSettings::default());
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        assert!(matches!(
            settings(&[("FUNCTIONS_CUSTOMHANDLER_PORT", "http")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            settings(&[("CHAT_HISTORY_WINDOW", "-1")]),
            Err(AppError::Config(_))
        ));
        assert_eq!(
            settings(&[("CHAT_HISTORY_WINDOW", "0")]).unwrap().history_window,
            0
        );
    }
}
