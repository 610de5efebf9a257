//! Versioned on-disk cache for driver binaries.
//!
//! Layout: `<home>/.selenium/drivers/<browser>/<version>/<binary>`. A version
//! directory, once fully populated, is treated as immutable; later runs reuse
//! it without any network or filesystem work.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LauncherConfig;
use crate::error::LauncherError;
use crate::resolver::DriverRelease;

/// Makes sure the driver binary for `release` is present in the cache and
/// returns its path.
///
/// If the binary is missing the archive is downloaded to a temporary file,
/// every entry is extracted into the version directory, and the binary gets
/// the owner-execute bit. The temporary archive is removed on every exit
/// path.
pub async fn ensure_artifact(
    client: &reqwest::Client,
    config: &LauncherConfig,
    browser_dir: &str,
    driver_name: &str,
    release: &DriverRelease,
) -> Result<PathBuf, LauncherError> {
    let version_dir = config
        .drivers_dir()
        .join(browser_dir)
        .join(&release.version);

    if tokio::fs::metadata(&version_dir).await.is_err() {
        create_version_dir(&config.home_dir, &version_dir).await?;
    } else if let Some(existing) = find_driver_binary(&version_dir, driver_name) {
        debug!(path = %existing.display(), "driver already cached");
        return Ok(existing);
    }

    // --- 1. Download the archive to a temporary file. Dropping the guard
    // removes the file, whichever way this function exits.
    let archive = tempfile::Builder::new()
        .prefix(driver_name)
        .suffix(".zip")
        .tempfile()
        .map_err(|source| LauncherError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

    download_archive(client, &release.download_url, archive.path()).await?;

    // --- 2. Extract every entry into the version directory.
    unzip_archive(archive.path(), &version_dir).await?;

    // --- 3. Locate the binary and make it runnable.
    let driver_path = find_driver_binary(&version_dir, driver_name).ok_or_else(|| {
        LauncherError::DriverExecutableNotFound {
            path: version_dir.clone(),
        }
    })?;
    mark_executable(&driver_path).await?;

    info!(
        version = %release.version,
        path = %driver_path.display(),
        "driver downloaded and unpacked"
    );
    Ok(driver_path)
}

/// Creates the version directory, propagating the home directory's permission
/// mode to every directory created along the way.
async fn create_version_dir(home_dir: &Path, version_dir: &Path) -> Result<(), LauncherError> {
    let home_meta =
        tokio::fs::metadata(home_dir)
            .await
            .map_err(|_| LauncherError::HomeDirectoryMissing {
                path: home_dir.to_path_buf(),
            })?;

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.mode(home_meta.permissions().mode() & 0o777);
    }
    #[cfg(not(unix))]
    let _ = home_meta;

    builder
        .create(version_dir)
        .await
        .map_err(|source| LauncherError::DirectoryCreate {
            path: version_dir.to_path_buf(),
            source,
        })
}

/// Downloads `url` into `dest_path`.
async fn download_archive(
    client: &reqwest::Client,
    url: &str,
    dest_path: &Path,
) -> Result<(), LauncherError> {
    debug!(%url, "downloading driver archive");

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|source| LauncherError::Download {
            url: url.to_string(),
            source,
        })?;

    let content = response
        .bytes()
        .await
        .map_err(|source| LauncherError::Download {
            url: url.to_string(),
            source,
        })?;

    let mut dest_file =
        tokio::fs::File::create(dest_path)
            .await
            .map_err(|source| LauncherError::Io {
                path: dest_path.to_path_buf(),
                source,
            })?;
    dest_file
        .write_all(&content)
        .await
        .map_err(|source| LauncherError::Io {
            path: dest_path.to_path_buf(),
            source,
        })?;

    Ok(())
}

/// Decompresses the archive into `extract_to`.
///
/// The zip logic is synchronous, so it runs under `spawn_blocking` to keep
/// the runtime free.
async fn unzip_archive(archive_path: &Path, extract_to: &Path) -> Result<(), LauncherError> {
    let archive_path = archive_path.to_path_buf();
    let extract_to = extract_to.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive_path).map_err(|source| LauncherError::Io {
            path: archive_path.clone(),
            source,
        })?;

        let mut archive =
            zip::ZipArchive::new(file).map_err(|source| LauncherError::ArchiveOpen {
                path: archive_path.clone(),
                source,
            })?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|source| LauncherError::ArchiveOpen {
                    path: archive_path.clone(),
                    source,
                })?;
            let entry_name = entry.name().to_string();

            let outpath = match entry.enclosed_name() {
                Some(path) => extract_to.join(path),
                None => continue,
            };

            if entry_name.ends_with('/') {
                std::fs::create_dir_all(&outpath).map_err(|source| {
                    LauncherError::ArchiveExtract {
                        entry: entry_name.clone(),
                        source,
                    }
                })?;
            } else {
                if let Some(parent) = outpath.parent() {
                    if !parent.exists() {
                        std::fs::create_dir_all(parent).map_err(|source| {
                            LauncherError::ArchiveExtract {
                                entry: entry_name.clone(),
                                source,
                            }
                        })?;
                    }
                }

                let mut outfile = std::fs::File::create(&outpath).map_err(|source| {
                    LauncherError::ArchiveExtract {
                        entry: entry_name.clone(),
                        source,
                    }
                })?;

                std::io::copy(&mut entry, &mut outfile).map_err(|source| {
                    LauncherError::ArchiveExtract {
                        entry: entry_name.clone(),
                        source,
                    }
                })?;
            }
        }
        Ok(())
    })
    .await
    // Propagate panics from the blocking task.
    .unwrap()
}

/// Searches the version directory for the driver executable. Archives
/// sometimes nest the binary under a top-level directory.
fn find_driver_binary(search_path: &Path, driver_name: &str) -> Option<PathBuf> {
    WalkDir::new(search_path)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_str() == Some(driver_name)
        })
        .map(|entry| entry.into_path())
}

/// Adds the owner-execute bit on top of whatever mode the archive entry
/// carried.
async fn mark_executable(path: &Path) -> Result<(), LauncherError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata =
            tokio::fs::metadata(path)
                .await
                .map_err(|source| LauncherError::PermissionChange {
                    path: path.to_path_buf(),
                    source,
                })?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o100);
        tokio::fs::set_permissions(path, permissions)
            .await
            .map_err(|source| LauncherError::PermissionChange {
                path: path.to_path_buf(),
                source,
            })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
