//! End-to-end launcher scenarios: pre-flight outcomes and the
//! supervisor's behavior around them, run against temp directories so
//! nothing touches the real working directory.

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use rx_launcher::config::LauncherConfig;
use rx_launcher::preflight::{self, CredentialSource, PreflightConfig};
use rx_launcher::supervisor::{Outcome, Supervisor};

fn preflight_in(dir: &TempDir) -> PreflightConfig {
    PreflightConfig {
        base_dir: dir.path().to_path_buf(),
        ..PreflightConfig::default()
    }
}

fn write_app_files(dir: &TempDir) {
    fs::write(dir.path().join("app.py"), "# backend\n").unwrap();
    fs::write(dir.path().join("frontend.py"), "# frontend\n").unwrap();
}

#[test]
fn files_present_and_env_credential_set() {
    let dir = TempDir::new().unwrap();
    write_app_files(&dir);

    let env = HashMap::from([("OPENAI_API_KEY".to_string(), "x".to_string())]);
    let report = preflight::run(&preflight_in(&dir), &env);

    assert!(report.ok());
    assert!(!report.env_file_created);
    assert!(!dir.path().join(".env").exists());
}

#[test]
fn missing_backend_file_fails_preflight() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("frontend.py"), "").unwrap();

    let report = preflight::run(&preflight_in(&dir), &HashMap::new());
    assert!(!report.ok());
    assert_eq!(report.missing_files, vec!["app.py".to_string()]);
}

#[test]
fn no_credentials_anywhere_creates_template() {
    let dir = TempDir::new().unwrap();
    write_app_files(&dir);

    let report = preflight::run(&preflight_in(&dir), &HashMap::new());
    assert!(report.ok());
    assert_eq!(report.credential, CredentialSource::Missing);

    let contents = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert!(contents.contains("OPENROUTER_API_KEY=your_key_here"));
    assert!(contents.contains("OPENAI_API_KEY=your_key_here"));
}

#[test]
fn repeated_preflight_never_touches_existing_template() {
    let dir = TempDir::new().unwrap();
    write_app_files(&dir);

    preflight::run(&preflight_in(&dir), &HashMap::new());
    let first = fs::read_to_string(dir.path().join(".env")).unwrap();

    let report = preflight::run(&preflight_in(&dir), &HashMap::new());
    assert_eq!(report.credential, CredentialSource::SettingsFile);
    assert!(!report.env_file_created);

    let second = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert_eq!(first, second);
}

fn launcher_config_in(dir: &TempDir) -> LauncherConfig {
    let mut config = LauncherConfig::default();
    config.preflight = preflight_in(dir);
    config
}

#[tokio::test]
async fn supervisor_aborts_before_spawning_on_missing_files() {
    let dir = TempDir::new().unwrap();
    // No app files at all.
    let env = HashMap::from([("OPENAI_API_KEY".to_string(), "x".to_string())]);
    let mut supervisor = Supervisor::new(launcher_config_in(&dir), env);

    let outcome = supervisor.run().await.unwrap();
    assert_eq!(outcome, Outcome::PreflightFailed);
}

#[tokio::test]
async fn interrupt_shuts_the_launcher_down_promptly() {
    let dir = TempDir::new().unwrap();
    write_app_files(&dir);

    let mut config = launcher_config_in(&dir);
    // A broken interpreter keeps real services out of the test; the
    // long readiness wait keeps the frontend pending until interrupt.
    config.python = Some("/nonexistent/interpreter".to_string());
    config.readiness_timeout_secs = 120;

    let env = HashMap::from([("OPENAI_API_KEY".to_string(), "x".to_string())]);
    let mut supervisor = Supervisor::new(config, env);
    let shutdown = supervisor.shutdown_handle();

    let handle = tokio::spawn(async move { supervisor.run().await });
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("interrupt must not leave the launcher hanging")
        .unwrap()
        .unwrap();
    assert_eq!(outcome, Outcome::Interrupted);
}

#[cfg(unix)]
#[tokio::test]
async fn short_lived_services_drive_the_run_to_completion() {
    use rx_launcher::service::ServiceSpec;
    use rx_launcher::supervisor::runner::{self, ServiceEvent};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    // Two real (if trivial) children through the same runner path the
    // supervisor uses.
    let specs = [
        ServiceSpec {
            name: "backend",
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 0".to_string()],
            env: Vec::new(),
        },
        ServiceSpec {
            name: "frontend",
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 2".to_string()],
            env: Vec::new(),
        },
    ];

    let (tx, mut rx) = mpsc::channel(4);
    for spec in specs {
        tokio::spawn(runner::run(spec, CancellationToken::new(), tx.clone()));
    }
    drop(tx);

    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        match &event {
            ServiceEvent::Exited { service, .. } => seen.push(*service),
            other => panic!("expected Exited events only, got {:?}", other),
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, vec!["backend", "frontend"]);
}
