//! Readiness polling and shutdown notification for the driver's control
//! endpoint.

use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::LauncherConfig;

/// Result of a readiness poll.
///
/// `TimedOut` does not distinguish a driver that never started from one that
/// is merely slow; the supervisor's launch reports carry that information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Status document legacy drivers answer on their root endpoint.
#[derive(Debug, Deserialize)]
struct StatusDocument {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    value: Option<serde_json::Value>,
}

/// Polls `http://127.0.0.1:<port>/` until the driver answers or the attempt
/// budget is exhausted.
///
/// Any HTTP response counts as ready, whatever the status code; a freshly
/// started driver answers its root route before it is willing to do real
/// work.
pub async fn wait_until_ready(
    client: &reqwest::Client,
    port: u16,
    config: &LauncherConfig,
) -> Readiness {
    let url = format!("http://127.0.0.1:{port}/");

    for attempt in 0..config.poll_attempts {
        match client
            .get(&url)
            .timeout(config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!(attempt, status = %response.status(), "driver endpoint responded");
                if let Ok(document) = response.json::<StatusDocument>().await {
                    debug!(
                        status = ?document.status,
                        value = ?document.value,
                        "driver status document"
                    );
                }
                return Readiness::Ready;
            }
            Err(error) => {
                trace!(attempt, %error, "driver endpoint not up yet");
                tokio::time::sleep(config.poll_interval).await;
            }
        }
    }

    Readiness::TimedOut
}

/// Asks the driver to shut itself down. Fire-and-forget: the response and
/// any error are ignored, and a driver that ignores the request is leaked
/// rather than killed.
pub async fn request_shutdown(client: &reqwest::Client, port: u16) {
    let url = format!("http://127.0.0.1:{port}/shutdown");
    debug!(%url, "requesting driver shutdown");
    let _ = client.get(&url).send().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use axum::Router;
    use axum::routing::get;
    use tokio::net::TcpListener;

    fn test_config() -> LauncherConfig {
        let mut config = LauncherConfig::new(PathBuf::from("/nonexistent"));
        config.poll_attempts = 20;
        config.poll_interval = Duration::from_millis(1);
        config.probe_timeout = Duration::from_millis(100);
        config
    }

    #[tokio::test]
    async fn returns_timed_out_when_nothing_listens() {
        // Allocate a port and let the listener go, so probes are refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = reqwest::Client::new();
        let readiness = wait_until_ready(&client, port, &test_config()).await;
        assert_eq!(readiness, Readiness::TimedOut);
    }

    #[tokio::test]
    async fn returns_ready_once_the_endpoint_answers() {
        let app = Router::new().route(
            "/",
            get(|| async { r#"{"sessionId":null,"status":0,"value":{"build":{"version":"2.10"}}}"# }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        let readiness = wait_until_ready(&client, port, &test_config()).await;
        assert_eq!(readiness, Readiness::Ready);
    }

    #[tokio::test]
    async fn shutdown_request_ignores_a_dead_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        // Must not panic or error however the request goes.
        let client = reqwest::Client::new();
        request_shutdown(&client, port).await;
    }

    #[tokio::test]
    async fn shutdown_request_hits_the_shutdown_route() {
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::channel::<()>(1);
        let app = Router::new().route(
            "/shutdown",
            get(move || {
                let seen_tx = seen_tx.clone();
                async move {
                    let _ = seen_tx.send(()).await;
                    "shutting down"
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        request_shutdown(&client, port).await;

        tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
            .await
            .expect("shutdown route was never hit");
    }
}
