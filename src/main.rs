use rx_launcher::supervisor::{Outcome, Supervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Prescription verification stack launcher starting");

    let mut supervisor = Supervisor::from_process_env();
    match supervisor.run().await? {
        Outcome::PreflightFailed => {
            tracing::error!("Initialization failed, check the logs above");
        }
        Outcome::AllExited => {
            tracing::info!("All services exited on their own");
        }
        Outcome::Interrupted => {
            tracing::info!("Launcher stopped");
        }
    }

    Ok(())
}
