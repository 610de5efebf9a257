//! Types and text-scanning helpers for resolving a driver release from the
//! remote listing page.
//!
//! The listing is plain HTML with no stable structure, so releases are
//! located by fixed textual markers. Every helper here returns a named
//! [`LauncherError::ListingMarkerNotFound`] when a marker is absent or the
//! markers appear out of order; nothing in this module can slice out of
//! range.

use crate::error::LauncherError;

/// Which release policy to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseChannel {
    /// The newest published driver.
    Latest,
    /// The most recent release marked deprecated, used as the known-good
    /// fallback when the latest driver fails to launch.
    LastStable,
}

/// A resolved driver release: a cache-directory version token and the
/// HTTPS-normalized absolute download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverRelease {
    pub version: String,
    pub download_url: String,
}

/// Slice between the first occurrence of `start` (inclusive) and the last
/// occurrence of `end` (exclusive).
pub(crate) fn enclosed_first_last<'a>(
    text: &'a str,
    start: &'static str,
    end: &'static str,
) -> Result<&'a str, LauncherError> {
    let lo = text
        .find(start)
        .ok_or(LauncherError::ListingMarkerNotFound { marker: start })?;
    let hi = text
        .rfind(end)
        .filter(|&hi| hi >= lo)
        .ok_or(LauncherError::ListingMarkerNotFound { marker: end })?;
    Ok(&text[lo..hi])
}

/// Slice between the last occurrence of `start` (inclusive) and the last
/// occurrence of `end` (exclusive).
pub(crate) fn enclosed_last_last<'a>(
    text: &'a str,
    start: &'static str,
    end: &'static str,
) -> Result<&'a str, LauncherError> {
    let lo = text
        .rfind(start)
        .ok_or(LauncherError::ListingMarkerNotFound { marker: start })?;
    let hi = text
        .rfind(end)
        .filter(|&hi| hi >= lo)
        .ok_or(LauncherError::ListingMarkerNotFound { marker: end })?;
    Ok(&text[lo..hi])
}

/// Text between the last occurrence of `open` (exclusive) and the last
/// occurrence of `close` (exclusive).
pub(crate) fn between_last<'a>(
    text: &'a str,
    open: &'static str,
    close: &'static str,
) -> Result<&'a str, LauncherError> {
    let lo = text
        .rfind(open)
        .map(|i| i + open.len())
        .ok_or(LauncherError::ListingMarkerNotFound { marker: open })?;
    let hi = text
        .rfind(close)
        .filter(|&hi| hi >= lo)
        .ok_or(LauncherError::ListingMarkerNotFound { marker: close })?;
    Ok(&text[lo..hi])
}

/// Text from the first occurrence of `open` (inclusive) to the first
/// occurrence of `close` (exclusive).
pub(crate) fn leading_span<'a>(
    text: &'a str,
    open: &'static str,
    close: &'static str,
) -> Result<&'a str, LauncherError> {
    let lo = text
        .find(open)
        .ok_or(LauncherError::ListingMarkerNotFound { marker: open })?;
    let hi = text[lo..]
        .find(close)
        .map(|i| lo + i)
        .ok_or(LauncherError::ListingMarkerNotFound { marker: close })?;
    Ok(&text[lo..hi])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosed_first_last_picks_outer_window() {
        let text = "aa START one END two END bb";
        assert_eq!(
            enclosed_first_last(text, "START", "END").unwrap(),
            "START one END two "
        );
    }

    #[test]
    fn enclosed_last_last_picks_final_entry() {
        let text = "START one STOP START two STOP";
        assert_eq!(enclosed_last_last(text, "START", "STOP").unwrap(), "START two ");
    }

    #[test]
    fn between_last_excludes_markers() {
        let text = "x (1.0) y (2.10) z";
        assert_eq!(between_last(text, "(", ")").unwrap(), "2.10");
    }

    #[test]
    fn leading_span_keeps_open_marker() {
        let text = "href='//host/file.zip', rest";
        assert_eq!(leading_span(text, "//", "',").unwrap(), "//host/file.zip");
    }

    #[test]
    fn missing_marker_is_a_named_error() {
        let err = enclosed_first_last("no markers here", "START", "END").unwrap_err();
        match err {
            LauncherError::ListingMarkerNotFound { marker } => assert_eq!(marker, "START"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_order_markers_are_a_named_error() {
        let err = enclosed_first_last("END before START", "START", "END").unwrap_err();
        match err {
            LauncherError::ListingMarkerNotFound { marker } => assert_eq!(marker, "END"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
