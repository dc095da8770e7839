//! Launcher supervisor.
//!
//! Composes the pre-flight checker and one runner per service:
//!
//! 1. Run the pre-flight check. On failure, abort without starting
//!    anything.
//! 2. Spawn the backend runner, then spawn the frontend once the backend
//!    port accepts connections (bounded by a timeout).
//! 3. Wait for an interrupt or for every service to exit. On interrupt
//!    the shutdown token is cancelled and each runner kills its child;
//!    no child is left orphaned.

pub mod error;
pub mod readiness;
pub mod runner;
pub mod state;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::LauncherConfig;
use crate::preflight;
use crate::service::ServiceSpec;
use runner::ServiceEvent;
use state::{State, StateMachine};

/// How long to wait for runners to confirm shutdown before giving up.
/// kill_on_drop covers any child still alive past this point.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Readiness is probed over loopback; the configured bind host
/// (0.0.0.0) is not a connectable address.
const PROBE_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Required files were missing; nothing was started.
    PreflightFailed,
    /// Both services terminated on their own.
    AllExited,
    /// Shutdown was requested and the children were stopped.
    Interrupted,
}

pub struct Supervisor {
    config: LauncherConfig,
    env: HashMap<String, String>,
    state: StateMachine,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(config: LauncherConfig, env: HashMap<String, String>) -> Self {
        Self {
            config,
            env,
            state: StateMachine::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Supervisor over the real process environment and `launcher.toml`.
    pub fn from_process_env() -> Self {
        Self::new(LauncherConfig::load(), preflight::process_env())
    }

    pub fn state(&self) -> State {
        self.state.state()
    }

    /// Token that triggers the same shutdown path as Ctrl-C.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(&mut self) -> Result<Outcome> {
        let report = preflight::run(&self.config.preflight, &self.env);
        if let Ok(summary) = serde_json::to_string(&report) {
            tracing::debug!("Preflight report: {}", summary);
        }

        if !report.ok() {
            self.state.transition(State::Aborted)?;
            return Ok(Outcome::PreflightFailed);
        }
        tracing::info!("All required files found");

        self.state.transition(State::Starting)?;
        let (events_tx, mut events_rx) = mpsc::channel::<ServiceEvent>(16);

        let backend = ServiceSpec::backend(&self.config);
        let frontend = ServiceSpec::frontend(&self.config);
        tracing::info!(
            "Backend API will be at http://localhost:{}",
            self.config.backend.port
        );
        tracing::info!(
            "Frontend UI will be at http://localhost:{}",
            self.config.frontend.port
        );
        tracing::info!("Press Ctrl+C to stop both services");

        tokio::spawn(runner::run(
            backend,
            self.shutdown.clone(),
            events_tx.clone(),
        ));

        // The frontend waits for the backend to accept connections. On
        // timeout it starts anyway; the backend may simply be slow.
        let backend_port = self.config.backend.port;
        let readiness_timeout = self.config.readiness_timeout();
        let frontend_shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let ready = tokio::select! {
                ready = readiness::wait_for_port(PROBE_HOST, backend_port, readiness_timeout) => ready,
                _ = frontend_shutdown.cancelled() => return,
            };
            if !ready {
                tracing::warn!(
                    "Backend not reachable on port {} after {:?}, starting frontend anyway",
                    backend_port,
                    readiness_timeout
                );
            }
            runner::run(frontend, frontend_shutdown, events_tx).await;
        });

        self.state.transition(State::Running)?;
        let shutdown = self.shutdown.clone();
        let mut live = 2usize;
        let interrupted = loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                    }
                    break true;
                }
                _ = shutdown.cancelled() => break true,
                event = events_rx.recv() => match event {
                    Some(event) => {
                        live = live.saturating_sub(1);
                        self.note_event(&event, live);
                        if live == 0 {
                            break false;
                        }
                    }
                    // Every sender gone means every runner has finished.
                    None => break false,
                }
            }
        };

        if interrupted {
            return self.shut_down(&mut events_rx).await;
        }
        self.state.transition(State::Stopped)?;
        Ok(Outcome::AllExited)
    }

    async fn shut_down(&mut self, events: &mut mpsc::Receiver<ServiceEvent>) -> Result<Outcome> {
        tracing::info!("Shutting down services");
        self.state.transition(State::ShuttingDown)?;
        self.shutdown.cancel();

        // Wait for the runners to confirm; the channel closes once both
        // tasks have finished.
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(event) = events.recv().await {
                tracing::debug!("During shutdown: {:?}", event);
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!("Timed out waiting for services to stop");
        }

        self.state.transition(State::Stopped)?;
        tracing::info!("Goodbye");
        Ok(Outcome::Interrupted)
    }

    fn note_event(&self, event: &ServiceEvent, live: usize) {
        match event {
            ServiceEvent::Exited { service, status } => {
                tracing::info!(
                    "{} is down ({}), {} service(s) still running",
                    service,
                    status,
                    live
                );
            }
            ServiceEvent::Failed { service, error } => {
                tracing::error!(
                    "{} failed ({}), {} service(s) still running",
                    service,
                    error,
                    live
                );
            }
            ServiceEvent::Stopped { service } => {
                tracing::debug!("{} stopped, {} service(s) still running", service, live);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> LauncherConfig {
        let mut config = LauncherConfig::default();
        config.preflight.base_dir = dir.path().to_path_buf();
        config
    }

    fn env_with_key() -> HashMap<String, String> {
        HashMap::from([("OPENAI_API_KEY".to_string(), "x".to_string())])
    }

    #[tokio::test]
    async fn aborts_without_spawning_when_files_missing() {
        let dir = TempDir::new().unwrap();
        let mut supervisor = Supervisor::new(config_in(&dir), env_with_key());

        let outcome = supervisor.run().await.unwrap();
        assert_eq!(outcome, Outcome::PreflightFailed);
        assert_eq!(supervisor.state(), State::Aborted);
    }

    #[tokio::test]
    async fn spawn_failures_end_in_all_exited() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "").unwrap();
        fs::write(dir.path().join("frontend.py"), "").unwrap();

        let mut config = config_in(&dir);
        // Both spawns fail immediately; the frontend is held back only
        // by the readiness probe, kept short here.
        config.python = Some("/nonexistent/interpreter".to_string());
        config.readiness_timeout_secs = 1;

        let mut supervisor = Supervisor::new(config, env_with_key());
        let outcome = tokio::time::timeout(Duration::from_secs(30), supervisor.run())
            .await
            .expect("run must finish once both services fail")
            .unwrap();
        assert_eq!(outcome, Outcome::AllExited);
        assert_eq!(supervisor.state(), State::Stopped);
    }

    #[tokio::test]
    async fn shutdown_handle_interrupts_promptly() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "").unwrap();
        fs::write(dir.path().join("frontend.py"), "").unwrap();

        let mut config = config_in(&dir);
        config.python = Some("/nonexistent/interpreter".to_string());
        // Long readiness wait keeps the frontend pending so the run loop
        // is genuinely interrupted mid-flight.
        config.readiness_timeout_secs = 120;

        let mut supervisor = Supervisor::new(config, env_with_key());
        let shutdown = supervisor.shutdown_handle();

        let handle = tokio::spawn(async move {
            let outcome = supervisor.run().await.unwrap();
            (outcome, supervisor.state())
        });
        tokio::time::sleep(Duration::from_millis(300)).await;

        let start = tokio::time::Instant::now();
        shutdown.cancel();
        let (outcome, state) = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("interrupt must not hang")
            .unwrap();

        assert_eq!(outcome, Outcome::Interrupted);
        assert_eq!(state, State::Stopped);
        assert!(start.elapsed() < SHUTDOWN_GRACE + Duration::from_secs(2));
    }
}
