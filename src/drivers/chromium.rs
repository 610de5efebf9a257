//! Chromium driver source: chromedriver releases scraped from the legacy
//! googlecode downloads listing.

use async_trait::async_trait;
use tracing::debug;

use crate::DriverSource;
use crate::error::LauncherError;
use crate::resolver::{self, DriverRelease, ReleaseChannel};

// The listing page enumerating chromedriver releases.
const CHROMEDRIVER_LISTING_URL: &str = "https://code.google.com/p/chromedriver/downloads/list";

/// Start of a 64-bit Linux download entry in the listing body.
const FILE_MARKER: &str = "'//chromedriver.googlecode.com/files/chromedriver_linux64_";

/// Descriptive text ending the newest release's row.
const LATEST_MARKER: &str = "supports Chrome";

/// Descriptive text ending a row retired to deprecated status.
const DEPRECATED_MARKER: &str = "deprecated";

/// Public struct for resolving chromedriver releases.
pub struct ChromiumDriver {
    listing_url: String,
}

impl ChromiumDriver {
    pub fn new() -> Self {
        Self {
            listing_url: CHROMEDRIVER_LISTING_URL.to_string(),
        }
    }

    /// Points resolution at a different listing page, e.g. a local fixture
    /// server in tests.
    pub fn with_listing_url(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
        }
    }
}

impl Default for ChromiumDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverSource for ChromiumDriver {
    fn driver_name(&self) -> &str {
        "chromedriver"
    }

    fn cache_browser_dir(&self) -> &str {
        "chrome"
    }

    async fn resolve(
        &self,
        client: &reqwest::Client,
        channel: ReleaseChannel,
    ) -> Result<DriverRelease, LauncherError> {
        debug!(url = %self.listing_url, ?channel, "fetching driver listing");

        let body = client
            .get(&self.listing_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| LauncherError::RemoteFetch {
                url: self.listing_url.clone(),
                source,
            })?
            .text()
            .await
            .map_err(|source| LauncherError::RemoteFetch {
                url: self.listing_url.clone(),
                source,
            })?;

        parse_listing(&body, channel)
    }
}

/// Extracts the download URL and version for `channel` from the listing body.
///
/// Each release appears as a protocol-relative href
/// (`'//chromedriver.googlecode.com/files/chromedriver_linux64_<v>.zip',`)
/// followed by descriptive text. The latest release's description carries the
/// version in parentheses and ends with "supports Chrome"; retired releases
/// end with "deprecated" and the version is read out of the file name, with
/// a `v` prefix distinguishing the fallback token in the cache layout.
pub fn parse_listing(body: &str, channel: ReleaseChannel) -> Result<DriverRelease, LauncherError> {
    match channel {
        ReleaseChannel::Latest => {
            let entry = resolver::enclosed_first_last(body, FILE_MARKER, LATEST_MARKER)?;
            let version = resolver::between_last(entry, "(", ")")?;
            let url = resolver::leading_span(entry, "//", "',")?;
            Ok(DriverRelease {
                version: version.to_string(),
                download_url: format!("https:{url}"),
            })
        }
        ReleaseChannel::LastStable => {
            let entry = resolver::enclosed_last_last(body, FILE_MARKER, DEPRECATED_MARKER)?;
            let version = resolver::between_last(entry, "chromedriver_linux64_", ".zip")?;
            let url = resolver::leading_span(entry, "//", "',")?;
            Ok(DriverRelease {
                version: format!("v{version}"),
                download_url: format!("https:{url}"),
            })
        }
    }
}
