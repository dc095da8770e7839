//! TCP readiness probe.
//!
//! The frontend is only useful once the backend answers, so instead of
//! sleeping a fixed number of seconds and hoping, the supervisor polls
//! the backend port until it accepts a connection or a deadline passes.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll `host:port` until a TCP connect succeeds. Returns false once
/// `deadline` has elapsed without a successful connection.
pub async fn wait_for_port(host: &str, port: u16, deadline: Duration) -> bool {
    let addr = format!("{}:{}", host, port);
    let start = Instant::now();
    loop {
        if let Ok(Ok(_)) = timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            tracing::debug!("{} accepting connections after {:?}", addr, start.elapsed());
            return true;
        }
        if start.elapsed() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
