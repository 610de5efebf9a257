use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Error type for all possible failures in the launcher.
#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("selenium not yet implemented on {os}/{arch}")]
    UnsupportedPlatform {
        os: &'static str,
        arch: &'static str,
    },

    #[error("selenium not yet implemented for browser '{browser}'")]
    UnsupportedBrowser { browser: String },

    #[error("unable to listen on an ephemeral port: {source}")]
    PortAllocation {
        #[source]
        source: io::Error,
    },

    #[error("operating system reported port 0 for the allocated listener")]
    PortUnavailable,

    #[error("unable to fetch driver listing from '{url}': {source}")]
    RemoteFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("listing page marker '{marker}' not found")]
    ListingMarkerNotFound { marker: &'static str },

    #[error("home directory '{path}' does not exist")]
    HomeDirectoryMissing { path: PathBuf },

    #[error("unable to determine the user home directory")]
    HomeDirectoryUnknown,

    #[error("unable to create '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to download '{url}': {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to open driver archive '{path}': {source}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("unable to extract '{entry}' from the driver archive: {source}")]
    ArchiveExtract {
        entry: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to mark '{path}' executable: {source}")]
    PermissionChange {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("driver executable not found under '{path}'")]
    DriverExecutableNotFound { path: PathBuf },

    #[error("unable to run driver at '{path}': {source}")]
    DriverSpawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("driver exited with {status}; stdout: {stdout:?}; stderr: {stderr:?}")]
    DriverExited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}
