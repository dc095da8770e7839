//! Launcher error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("failed to spawn {service}: {source}")]
    SpawnFailed {
        service: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait on {service}: {source}")]
    WaitFailed {
        service: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl LauncherError {
    pub fn service(&self) -> &'static str {
        match self {
            Self::SpawnFailed { service, .. } | Self::WaitFailed { service, .. } => service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_names_the_service() {
        let err = LauncherError::SpawnFailed {
            service: "backend",
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.service(), "backend");
        assert!(err.to_string().contains("backend"));
    }
}
