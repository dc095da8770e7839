//! Command-line definitions for the two launched services.
//!
//! The launcher itself has no knowledge of the applications it starts;
//! a [`ServiceSpec`] is just a name plus the command line to run. The
//! backend is a uvicorn ASGI server, the frontend a streamlit app, both
//! run through the same Python interpreter.

use crate::config::LauncherConfig;

pub const BACKEND: &str = "backend";
pub const FRONTEND: &str = "frontend";

#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: &'static str,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ServiceSpec {
    /// uvicorn ASGI server serving `app:app`.
    pub fn backend(config: &LauncherConfig) -> Self {
        Self {
            name: BACKEND,
            program: interpreter(config),
            args: str_args(&[
                "-m",
                "uvicorn",
                "app:app",
                "--host",
                &config.backend.host,
                "--port",
                &config.backend.port.to_string(),
            ]),
            env: Vec::new(),
        }
    }

    /// streamlit server running `frontend.py`.
    pub fn frontend(config: &LauncherConfig) -> Self {
        Self {
            name: FRONTEND,
            program: interpreter(config),
            args: str_args(&[
                "-m",
                "streamlit",
                "run",
                "frontend.py",
                "--server.port",
                &config.frontend.port.to_string(),
                "--server.address",
                &config.frontend.host,
            ]),
            env: Vec::new(),
        }
    }

    /// Full command line, for logging.
    pub fn command_line(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

fn interpreter(config: &LauncherConfig) -> String {
    config
        .python
        .clone()
        .unwrap_or_else(|| default_python().to_string())
}

pub fn default_python() -> &'static str {
    if cfg!(target_os = "windows") {
        "python"
    } else {
        "python3"
    }
}

fn str_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
