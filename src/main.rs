use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use selenium_launcher::drivers::chromium::ChromiumDriver;
use selenium_launcher::probe::{self, Readiness};
use selenium_launcher::{LauncherConfig, LauncherError, port, supervisor};

/// How long teardown waits for the supervisor's launch reports after the
/// shutdown request goes out.
const REPORT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "selenium-launcher")]
#[command(about = "Downloads a browser driver, runs it on a free local port, and shuts it down")]
#[command(version)]
struct Cli {
    /// Browser to drive: chromium|chrome|firefox|iceweasel|ie|opera
    /// (only chromium is implemented)
    #[arg(long, default_value = "chromium")]
    browser: String,
}

fn init_logging() {
    // Allow RUST_LOG overrides, default to info
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    // Gate failures and run failures are printed, then main returns
    // normally without setting an error exit code.
    if let Err(error) = run(cli).await {
        eprintln!("Error: {error}");
    }
}

fn platform_gate() -> Result<(), LauncherError> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => Ok(()),
        (os, arch) => Err(LauncherError::UnsupportedPlatform { os, arch }),
    }
}

async fn run(cli: Cli) -> Result<(), LauncherError> {
    platform_gate()?;
    if cli.browser != "chromium" {
        return Err(LauncherError::UnsupportedBrowser {
            browser: cli.browser,
        });
    }
    info!(browser = %cli.browser, "browser selected");

    let port = port::allocate_ephemeral_port().await?;
    info!(port, "driver port allocated");

    let home_dir = dirs::home_dir().ok_or(LauncherError::HomeDirectoryUnknown)?;
    let config = LauncherConfig::new(home_dir);
    let client = reqwest::Client::new();
    let source = Arc::new(ChromiumDriver::new());

    let mut reports = supervisor::spawn_supervisor(client.clone(), config.clone(), source, port);

    match probe::wait_until_ready(&client, port, &config).await {
        Readiness::Ready => info!(port, "driver endpoint is ready"),
        Readiness::TimedOut => warn!(port, "driver endpoint never answered within the poll budget"),
    }

    // Hold the driver open for the caller, then ask it to stop.
    tokio::time::sleep(config.hold_duration).await;
    probe::request_shutdown(&client, port).await;

    // Surface how the launch attempts went. The driver exits after the
    // shutdown request, which completes the pending attempt's report.
    while let Ok(Some(report)) =
        tokio::time::timeout(REPORT_DRAIN_TIMEOUT, reports.recv()).await
    {
        match report.outcome {
            Ok(()) => info!(channel = ?report.channel, "driver attempt finished cleanly"),
            Err(error) => warn!(channel = ?report.channel, %error, "driver attempt failed"),
        }
    }

    Ok(())
}
