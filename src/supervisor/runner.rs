//! One task per service: spawns the child process, waits on it, and
//! reports its fate back to the supervisor.
//!
//! A runner never takes down its sibling. Whatever happens to the child
//! (clean exit, crash, spawn failure, shutdown kill) is reported as a
//! [`ServiceEvent`] and the decision is left to the supervisor.

use std::process::ExitStatus;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::LauncherError;
use crate::service::ServiceSpec;

#[derive(Debug)]
pub enum ServiceEvent {
    /// Child exited on its own; `status` may be non-zero.
    Exited {
        service: &'static str,
        status: ExitStatus,
    },
    /// Child could not be spawned or waited on.
    Failed {
        service: &'static str,
        error: LauncherError,
    },
    /// Child was killed because the launcher is shutting down.
    Stopped { service: &'static str },
}

impl ServiceEvent {
    pub fn service(&self) -> &'static str {
        match self {
            Self::Exited { service, .. }
            | Self::Failed { service, .. }
            | Self::Stopped { service } => service,
        }
    }
}

/// Run one service until it exits or `shutdown` fires. Always sends
/// exactly one [`ServiceEvent`] before returning.
pub async fn run(spec: ServiceSpec, shutdown: CancellationToken, events: mpsc::Sender<ServiceEvent>) {
    tracing::info!("Starting {}: {}", spec.name, spec.command_line());

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    // Children must not outlive the launcher.
    cmd.kill_on_drop(true);
    crate::utils::apply_creation_flags(&mut cmd);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            let error = LauncherError::SpawnFailed {
                service: spec.name,
                source,
            };
            tracing::error!("{}", error);
            let _ = events.send(ServiceEvent::Failed {
                service: spec.name,
                error,
            })
            .await;
            return;
        }
    };
    if let Some(pid) = child.id() {
        tracing::info!("{} running with PID {}", spec.name, pid);
    }

    tokio::select! {
        status = child.wait() => {
            let event = match status {
                Ok(status) => {
                    if status.success() {
                        tracing::info!("{} exited cleanly", spec.name);
                    } else {
                        tracing::warn!("{} exited with {}", spec.name, status);
                    }
                    ServiceEvent::Exited { service: spec.name, status }
                }
                Err(source) => {
                    let error = LauncherError::WaitFailed { service: spec.name, source };
                    tracing::error!("{}", error);
                    ServiceEvent::Failed { service: spec.name, error }
                }
            };
            let _ = events.send(event).await;
        }
        _ = shutdown.cancelled() => {
            tracing::info!("Stopping {}", spec.name);
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill {}: {}", spec.name, e);
            }
            let _ = events.send(ServiceEvent::Stopped { service: spec.name }).await;
        }
    }
}
