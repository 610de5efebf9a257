use std::path::PathBuf;
use std::time::Duration;

/// Environment and tuning knobs for a launcher run.
///
/// Defaults: a 5000-attempt poll loop at 1 ms cadence and a 20 second hold
/// once the driver answers.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// User home directory; the driver cache lives under
    /// `<home>/.selenium/drivers/`.
    pub home_dir: PathBuf,

    /// Maximum number of readiness probes before giving up.
    pub poll_attempts: u32,

    /// Pause between readiness probes.
    pub poll_interval: Duration,

    /// Per-probe request timeout.
    pub probe_timeout: Duration,

    /// How long the driver is held open for the caller once ready.
    pub hold_duration: Duration,
}

impl LauncherConfig {
    pub fn new(home_dir: PathBuf) -> Self {
        Self {
            home_dir,
            poll_attempts: 5000,
            poll_interval: Duration::from_millis(1),
            probe_timeout: Duration::from_millis(250),
            hold_duration: Duration::from_secs(20),
        }
    }

    /// Root of the versioned driver cache.
    pub fn drivers_dir(&self) -> PathBuf {
        self.home_dir.join(".selenium").join("drivers")
    }
}
