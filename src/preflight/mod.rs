//! Pre-flight validation run before any service is launched.
//!
//! Two independent checks:
//! - Required application files must exist. A missing file fails the
//!   check and nothing gets started.
//! - At least one API credential should be discoverable, either as an
//!   environment variable or via a local settings file. A missing
//!   credential is only a warning: hosting platforms often inject keys
//!   after this check runs, so the launcher writes a placeholder
//!   settings file and continues.
//!
//! The checker reads nothing ambient. Paths come from [`PreflightConfig`]
//! and the environment is passed in as a snapshot, so the whole module is
//! testable against a temp directory.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PreflightConfig {
    /// Directory the required files and the settings file live in.
    pub base_dir: PathBuf,
    pub required_files: Vec<String>,
    /// Settings file checked for existence and written as a template
    /// when no credential is found. Never parsed.
    pub env_file: String,
    /// Environment variables accepted as a credential source.
    pub credential_vars: Vec<String>,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            required_files: vec!["app.py".to_string(), "frontend.py".to_string()],
            env_file: ".env".to_string(),
            credential_vars: vec![
                "OPENROUTER_API_KEY".to_string(),
                "OPENAI_API_KEY".to_string(),
            ],
        }
    }
}

impl PreflightConfig {
    pub fn env_file_path(&self) -> PathBuf {
        self.base_dir.join(&self.env_file)
    }
}

/// Where a credential was found, if anywhere.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Found in the environment snapshot; carries the variable name.
    Environment(String),
    /// A settings file exists; its contents are not inspected.
    SettingsFile,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub missing_files: Vec<String>,
    pub credential: CredentialSource,
    /// True when this run wrote a new template settings file.
    pub env_file_created: bool,
}

impl PreflightReport {
    /// Only required-file presence decides pass/fail. Credentials are
    /// advisory.
    pub fn ok(&self) -> bool {
        self.missing_files.is_empty()
    }
}

/// Run the pre-flight check against an explicit environment snapshot.
pub fn run(config: &PreflightConfig, env: &HashMap<String, String>) -> PreflightReport {
    let missing_files: Vec<String> = config
        .required_files
        .iter()
        .filter(|f| !config.base_dir.join(f.as_str()).exists())
        .cloned()
        .collect();
    if !missing_files.is_empty() {
        tracing::error!("Missing required files: {}", missing_files.join(", "));
    }

    let env_credential = config
        .credential_vars
        .iter()
        .find(|var| env.get(var.as_str()).is_some_and(|v| !v.is_empty()));

    let env_path = config.env_file_path();
    let (credential, env_file_created) = match env_credential {
        Some(var) => (CredentialSource::Environment(var.clone()), false),
        None if env_path.exists() => (CredentialSource::SettingsFile, false),
        None => {
            tracing::warn!(
                "No {} file found and no API keys in environment, writing a template",
                config.env_file
            );
            match write_template(&env_path, &config.credential_vars) {
                Ok(()) => {
                    tracing::info!("Template {} created", config.env_file);
                    (CredentialSource::Missing, true)
                }
                Err(e) => {
                    // Credentials may still arrive from the platform, so
                    // a failed template write stays a warning.
                    tracing::warn!("Failed to write template {}: {}", config.env_file, e);
                    (CredentialSource::Missing, false)
                }
            }
        }
    };

    PreflightReport {
        missing_files,
        credential,
        env_file_created,
    }
}

/// Snapshot of the process environment, in the shape [`run`] expects.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn write_template(path: &Path, vars: &[String]) -> std::io::Result<()> {
    let mut contents = String::from("# API Configuration\n");
    for var in vars {
        contents.push_str(var);
        contents.push_str("=your_key_here\n");
    }
    // create_new: an existing settings file must never be clobbered,
    // even if it appeared between the exists() check and this write.
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(contents.as_bytes())
}
