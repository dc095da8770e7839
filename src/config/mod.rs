//! Launcher configuration.
//!
//! Defaults mirror the stack's conventions: API backend on 0.0.0.0:8000,
//! UI frontend on 0.0.0.0:8501. An optional `launcher.toml` next to the
//! binary overrides the defaults, and a small set of environment variables
//! (`PORT`, `PYTHON`) overrides both. Configuration is resolved once at
//! startup and passed explicitly into the preflight checker and the
//! service runners.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::preflight::PreflightConfig;

pub const CONFIG_FILE: &str = "launcher.toml";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LauncherConfig {
    pub backend: BackendConfig,
    pub frontend: FrontendConfig,
    pub preflight: PreflightConfig,
    /// Interpreter used to launch both services. `None` means the
    /// platform default (`python3` on Unix, `python` on Windows).
    pub python: Option<String>,
    /// How long to wait for the backend port to accept connections
    /// before starting the frontend anyway.
    pub readiness_timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FrontendConfig {
    pub host: String,
    pub port: u16,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            frontend: FrontendConfig::default(),
            preflight: PreflightConfig::default(),
            python: None,
            readiness_timeout_secs: 30,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
        }
    }
}

impl LauncherConfig {
    /// Load `launcher.toml` if present, then apply process-environment
    /// overrides.
    pub fn load() -> Self {
        let mut cfg = Self::from_file(Path::new(CONFIG_FILE));
        cfg.apply_env(&std::env::vars().collect());
        cfg
    }

    /// Parse a config file, falling back to defaults when it is missing
    /// or malformed. A broken config file should not stop the launcher.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!("Invalid {}: {}, using defaults", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Environment overrides, applied from an explicit snapshot so tests
    /// do not have to mutate the process environment.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        match env.get("PORT").map(|v| v.parse::<u16>()) {
            Some(Ok(port)) => self.frontend.port = port,
            Some(Err(_)) => {
                tracing::warn!("Ignoring non-numeric PORT value, keeping {}", self.frontend.port)
            }
            None => {}
        }
        if let Some(python) = env.get("PYTHON").filter(|v| !v.is_empty()) {
            self.python = Some(python.clone());
        }
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }
}
