//! Background supervision of the driver child process.

use std::path::Path;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::DriverSource;
use crate::cache;
use crate::config::LauncherConfig;
use crate::error::LauncherError;
use crate::resolver::ReleaseChannel;

/// Outcome of one launch attempt, sent to the foreground flow.
#[derive(Debug)]
pub struct LaunchReport {
    pub channel: ReleaseChannel,
    pub outcome: Result<(), LauncherError>,
}

/// Spawns the supervisor task and returns the channel its launch reports
/// arrive on.
///
/// The task first tries the latest release; if resolving, caching, or
/// running it fails, a single fallback attempt runs against the last stable
/// release. Each attempt's outcome is reported, so neither failure is
/// silent. A successful attempt reports only once the driver process exits.
pub fn spawn_supervisor(
    client: reqwest::Client,
    config: LauncherConfig,
    source: Arc<dyn DriverSource>,
    port: u16,
) -> mpsc::Receiver<LaunchReport> {
    let (reports, receiver) = mpsc::channel(2);

    tokio::spawn(async move {
        let outcome =
            run_attempt(&client, &config, source.as_ref(), ReleaseChannel::Latest, port).await;
        let fall_back = outcome.is_err();
        if let Err(error) = &outcome {
            warn!(%error, "latest driver failed, falling back to last stable");
        }
        let _ = reports
            .send(LaunchReport {
                channel: ReleaseChannel::Latest,
                outcome,
            })
            .await;

        if fall_back {
            let outcome = run_attempt(
                &client,
                &config,
                source.as_ref(),
                ReleaseChannel::LastStable,
                port,
            )
            .await;
            if let Err(error) = &outcome {
                warn!(%error, "last stable driver failed as well");
            }
            let _ = reports
                .send(LaunchReport {
                    channel: ReleaseChannel::LastStable,
                    outcome,
                })
                .await;
        }
    });

    receiver
}

/// One attempt: resolve the release, make sure the artifact is cached, run
/// the driver to exit.
async fn run_attempt(
    client: &reqwest::Client,
    config: &LauncherConfig,
    source: &dyn DriverSource,
    channel: ReleaseChannel,
    port: u16,
) -> Result<(), LauncherError> {
    info!(?channel, "resolving driver release");
    let release = source.resolve(client, channel).await?;
    info!(
        version = %release.version,
        url = %release.download_url,
        "resolved driver release"
    );

    let driver_path = cache::ensure_artifact(
        client,
        config,
        source.cache_browser_dir(),
        source.driver_name(),
        &release,
    )
    .await?;

    run_driver(&driver_path, port).await
}

/// Runs the driver bound to `port`, capturing its output, until it exits.
///
/// A driver normally runs until its shutdown endpoint is hit, so this
/// returns only at teardown or on a failed launch.
async fn run_driver(driver_path: &Path, port: u16) -> Result<(), LauncherError> {
    info!(path = %driver_path.display(), port, "launching driver");

    let output = Command::new(driver_path)
        .arg(format!("--port={port}"))
        .output()
        .await
        .map_err(|source| LauncherError::DriverSpawn {
            path: driver_path.to_path_buf(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        debug!(%stdout, %stderr, "driver exited cleanly");
        Ok(())
    } else {
        Err(LauncherError::DriverExited {
            status: output.status,
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use async_trait::async_trait;

    use crate::resolver::DriverRelease;

    /// Driver source with canned per-channel results. Artifacts are seeded
    /// straight into the cache, so resolution never reaches the network.
    struct FakeSource {
        latest_version: Option<&'static str>,
        stable_version: Option<&'static str>,
    }

    #[async_trait]
    impl DriverSource for FakeSource {
        fn driver_name(&self) -> &str {
            "fake-driver"
        }

        fn cache_browser_dir(&self) -> &str {
            "fake"
        }

        async fn resolve(
            &self,
            _client: &reqwest::Client,
            channel: ReleaseChannel,
        ) -> Result<DriverRelease, LauncherError> {
            let version = match channel {
                ReleaseChannel::Latest => self.latest_version,
                ReleaseChannel::LastStable => self.stable_version,
            };
            match version {
                Some(version) => Ok(DriverRelease {
                    version: version.to_string(),
                    download_url: "http://127.0.0.1:9/unused.zip".to_string(),
                }),
                None => Err(LauncherError::ListingMarkerNotFound {
                    marker: "supports Chrome",
                }),
            }
        }
    }

    fn seed_cached_driver(config: &LauncherConfig, version: &str, script: &str) -> PathBuf {
        let dir = config.drivers_dir().join("fake").join(version);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fake-driver");
        std::fs::write(&path, script).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_latest_run_reports_once() {
        let home = tempfile::tempdir().unwrap();
        let config = LauncherConfig::new(home.path().to_path_buf());
        seed_cached_driver(&config, "9.9", "#!/bin/sh\nexit 0\n");
        let source = Arc::new(FakeSource {
            latest_version: Some("9.9"),
            stable_version: None,
        });

        let mut reports = spawn_supervisor(reqwest::Client::new(), config, source, 40000);

        let report = reports.recv().await.unwrap();
        assert_eq!(report.channel, ReleaseChannel::Latest);
        assert!(report.outcome.is_ok());
        // No fallback attempt after a success.
        assert!(reports.recv().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_latest_falls_back_and_both_outcomes_are_observable() {
        let home = tempfile::tempdir().unwrap();
        let config = LauncherConfig::new(home.path().to_path_buf());
        seed_cached_driver(&config, "v8.8", "#!/bin/sh\nexit 0\n");
        let source = Arc::new(FakeSource {
            latest_version: None,
            stable_version: Some("v8.8"),
        });

        let mut reports = spawn_supervisor(reqwest::Client::new(), config, source, 40000);

        let first = reports.recv().await.unwrap();
        assert_eq!(first.channel, ReleaseChannel::Latest);
        assert!(matches!(
            first.outcome,
            Err(LauncherError::ListingMarkerNotFound { .. })
        ));

        let second = reports.recv().await.unwrap();
        assert_eq!(second.channel, ReleaseChannel::LastStable);
        assert!(second.outcome.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn crashing_driver_reports_captured_output() {
        let home = tempfile::tempdir().unwrap();
        let config = LauncherConfig::new(home.path().to_path_buf());
        seed_cached_driver(&config, "7.7", "#!/bin/sh\necho boom >&2\nexit 3\n");
        let source = Arc::new(FakeSource {
            latest_version: Some("7.7"),
            stable_version: None,
        });

        let mut reports = spawn_supervisor(reqwest::Client::new(), config, source, 40000);

        let first = reports.recv().await.unwrap();
        match first.outcome {
            Err(LauncherError::DriverExited { status, stderr, .. }) => {
                assert_eq!(status.code(), Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The fallback attempt runs and its own failure is reported too.
        let second = reports.recv().await.unwrap();
        assert_eq!(second.channel, ReleaseChannel::LastStable);
        assert!(second.outcome.is_err());
    }
}
