
// Top-level public modules
pub mod cache;
pub mod config;
pub mod drivers;
pub mod error;
pub mod port;
pub mod probe;
pub mod resolver;
pub mod supervisor;

pub use config::LauncherConfig;
pub use error::LauncherError;
pub use resolver::{DriverRelease, ReleaseChannel};

// Main public trait
use async_trait::async_trait;

/// A driver family the launcher can acquire and run.
#[async_trait]
pub trait DriverSource: Send + Sync {
    /// Gets the name of the driver binary (e.g., "chromedriver").
    fn driver_name(&self) -> &str;

    /// Gets the cache subdirectory this driver's versions live under
    /// (e.g., "chrome" for `<home>/.selenium/drivers/chrome/<version>/`).
    fn cache_browser_dir(&self) -> &str;

    /// Resolves the download URL and version token for the given release
    /// channel.
    async fn resolve(
        &self,
        client: &reqwest::Client,
        channel: ReleaseChannel,
    ) -> Result<DriverRelease, LauncherError>;
}
