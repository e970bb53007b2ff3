//! HTTP-backed update provider.
//!
//! Implements [`UpdateProvider`] against a remote manifest URL:
//! - manifest fetch and semver comparison for the version check
//! - streaming package download into a staging directory, with size and
//!   SHA-256 verification when the manifest provides them
//! - archive unpacking (zip, tar.gz)
//! - directory-swap installation with restore on failure
//! - detached process spawning for relaunch and installer hand-off
//!
//! Partial downloads are removed on failure. Unpacked trees are left in
//! place for the install flow and are not cleaned up here.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use semver::Version;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::error::UpdateError;
use crate::manifest::{current_platform, PackageDescriptor, UpdateManifest};
use crate::provider::UpdateProvider;

/// Archive format of a release package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// .zip
    Zip,
    /// .tar.gz / .tgz
    TarGz,
}

/// Update provider backed by a remote manifest over HTTPS.
pub struct HttpUpdateProvider {
    /// HTTP client configured with timeouts
    client: reqwest::Client,
    /// Configuration settings
    config: UpdateConfig,
    /// Version of the running application
    current_version: Version,
    /// Installed application directory
    app_location: PathBuf,
    /// Running application executable
    app_executable: PathBuf,
}

impl HttpUpdateProvider {
    /// Create a new provider.
    ///
    /// Application paths are derived from the current executable; override
    /// them with [`with_app_paths`](Self::with_app_paths) when embedding.
    pub fn new(config: UpdateConfig, current_version: Version) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.network.timeout_seconds))
            .read_timeout(Duration::from_secs(config.network.read_timeout_seconds))
            .user_agent(config.network.user_agent())
            .build()?;

        let app_executable = std::env::current_exe()?;
        let app_location = default_app_location(&app_executable);

        Ok(Self {
            client,
            config,
            current_version,
            app_location,
            app_executable,
        })
    }

    /// Override the detected application paths.
    pub fn with_app_paths(mut self, location: PathBuf, executable: PathBuf) -> Self {
        self.app_location = location;
        self.app_executable = executable;
        self
    }

    /// Staging path for a release package.
    fn staged_package_path(
        &self,
        manifest: &UpdateManifest,
        package: &PackageDescriptor,
    ) -> Result<PathBuf, UpdateError> {
        let extension = package_extension(&package.url)
            .ok_or_else(|| UpdateError::UnsupportedPackageFormat(package.url.clone()))?;
        Ok(self
            .config
            .staging_dir()
            .join(format!("gitter-{}{}", manifest.version, extension)))
    }

    /// Stream a package to `dest`, hashing and counting as it goes.
    /// The partial file is removed on any failure.
    async fn stream_package(
        &self,
        package: &PackageDescriptor,
        dest: &Path,
    ) -> Result<(), UpdateError> {
        let result = self.stream_package_inner(package, dest).await;
        if result.is_err() {
            let _ = std::fs::remove_file(dest);
        }
        result
    }

    async fn stream_package_inner(
        &self,
        package: &PackageDescriptor,
        dest: &Path,
    ) -> Result<(), UpdateError> {
        let response = self.client.get(&package.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let mut file = std::fs::File::create(dest)?;
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| UpdateError::NetworkError(e.to_string()))?;
            file.write_all(&chunk)?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }
        file.sync_all()?;

        verify_integrity(package, downloaded, hasher.finalize().into())?;

        debug!("downloaded {} bytes to {:?}", downloaded, dest);
        Ok(())
    }
}

/// Check a completed download against the size and digest the manifest
/// declares for it. Fields the manifest omits are not checked.
fn verify_integrity(
    package: &PackageDescriptor,
    downloaded: u64,
    digest: [u8; 32],
) -> Result<(), UpdateError> {
    if let Some(expected) = package.size {
        if downloaded != expected {
            return Err(UpdateError::SizeMismatch {
                expected,
                actual: downloaded,
            });
        }
    }

    if let Some(expected) = &package.sha256 {
        let actual = hex::encode(digest);
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(UpdateError::DigestMismatch {
                expected: expected.clone(),
                actual,
            });
        }
    }

    Ok(())
}

#[async_trait]
impl UpdateProvider for HttpUpdateProvider {
    async fn check_version(&self) -> Result<Option<UpdateManifest>, UpdateError> {
        debug!("fetching update manifest from {}", self.config.manifest_url);

        let response = self.client.get(&self.config.manifest_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::ManifestRequestFailed {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let manifest = UpdateManifest::parse(&bytes)?;

        if manifest.is_newer_than(&self.current_version) {
            info!(
                "update available: {} -> {}",
                self.current_version, manifest.version
            );
            Ok(Some(manifest))
        } else {
            info!(
                "no update available (current: {}, latest: {})",
                self.current_version, manifest.version
            );
            Ok(None)
        }
    }

    async fn download(&self, manifest: &UpdateManifest) -> Result<PathBuf, UpdateError> {
        let platform = current_platform();
        let package = manifest
            .package_for(&platform)
            .ok_or(UpdateError::NoPackageForPlatform(platform))?;

        let dest = self.staged_package_path(manifest, package)?;
        std::fs::create_dir_all(self.config.staging_dir())?;

        info!("downloading {} -> {:?}", package.url, dest);
        self.stream_package(package, &dest).await?;
        Ok(dest)
    }

    async fn unpack(
        &self,
        package: &Path,
        manifest: &UpdateManifest,
    ) -> Result<PathBuf, UpdateError> {
        let dest = self
            .config
            .staging_dir()
            .join(format!("gitter-{}-unpacked", manifest.version));

        // A previous run may have left a stale tree behind.
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        std::fs::create_dir_all(&dest)?;

        let archive_type = detect_archive_type(package).ok_or_else(|| {
            UpdateError::UnsupportedPackageFormat(package.display().to_string())
        })?;

        info!("unpacking {:?} ({:?}) to {:?}", package, archive_type, dest);
        match archive_type {
            ArchiveType::Zip => extract_zip(package, &dest)?,
            ArchiveType::TarGz => extract_tar_gz(package, &dest)?,
        }

        // The archive is consumed; the unpacked tree is what the install
        // flow needs from here on.
        let _ = std::fs::remove_file(package);

        let exec_name = self
            .app_executable
            .file_name()
            .ok_or_else(|| UpdateError::UnpackFailed("app executable has no file name".into()))?;
        find_executable(&dest, exec_name).ok_or_else(|| {
            UpdateError::UnpackFailed(format!(
                "no executable named {:?} in unpacked package",
                exec_name
            ))
        })
    }

    async fn install(&self, old_location: &Path) -> Result<(), UpdateError> {
        let source = self.app_location.clone();
        info!("installing {:?} over {:?}", source, old_location);
        replace_app_dir(&source, old_location)
    }

    fn run(&self, executable: &Path) {
        info!("starting {:?}", executable);
        match detached_command(executable).spawn() {
            Ok(child) => debug!("started process {}", child.id()),
            Err(err) => warn!("failed to start {:?}: {}", executable, err),
        }
    }

    fn run_installer(&self, executable: &Path, args: &[PathBuf]) {
        info!("starting installer {:?} with args {:?}", executable, args);
        match detached_command(executable).args(args).spawn() {
            Ok(child) => debug!("started installer process {}", child.id()),
            Err(err) => warn!("failed to start installer {:?}: {}", executable, err),
        }
    }

    fn app_location(&self) -> PathBuf {
        self.app_location.clone()
    }

    fn app_executable(&self) -> PathBuf {
        self.app_executable.clone()
    }
}

/// Derive the installed application directory from the executable path.
///
/// On macOS the executable sits at `Foo.app/Contents/MacOS/foo`; the bundle
/// directory is the unit that gets replaced. Everywhere else it is the
/// executable's parent directory.
pub fn default_app_location(executable: &Path) -> PathBuf {
    if let Some(bundle) = executable.ancestors().nth(3) {
        if bundle.extension().is_some_and(|e| e == "app") {
            return bundle.to_path_buf();
        }
    }
    executable
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Map a package URL to the staged file extension, if recognised.
pub fn package_extension(url: &str) -> Option<&'static str> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    if url.ends_with(".zip") {
        Some(".zip")
    } else if url.ends_with(".tar.gz") || url.ends_with(".tgz") {
        Some(".tar.gz")
    } else {
        None
    }
}

/// Detect the archive type of a staged package by file name.
pub fn detect_archive_type(package: &Path) -> Option<ArchiveType> {
    let name = package.file_name()?.to_str()?;
    if name.ends_with(".zip") {
        Some(ArchiveType::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveType::TarGz)
    } else {
        None
    }
}

/// Extract a zip archive into `dest`.
fn extract_zip(archive: &Path, dest: &Path) -> Result<(), UpdateError> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        // Skip entries that would escape the destination.
        let Some(relative) = entry.enclosed_name() else {
            warn!("skipping zip entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

/// Extract a gzipped tarball into `dest`.
fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), UpdateError> {
    let file = std::fs::File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(dest)
        .map_err(|e| UpdateError::UnpackFailed(e.to_string()))?;
    Ok(())
}

/// Find a file named `name` under `root`, breadth-first, at most four
/// directory levels deep. Release archives nest the app at most a couple
/// of levels down (e.g., a top-level directory or an .app bundle).
pub fn find_executable(root: &Path, name: &OsStr) -> Option<PathBuf> {
    let mut queue = std::collections::VecDeque::from([(root.to_path_buf(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if depth < 4 {
                    queue.push_back((path, depth + 1));
                }
            } else if path.file_name() == Some(name) {
                return Some(path);
            }
        }
    }
    None
}

/// Replace the application directory at `dest` with the tree at `source`.
///
/// The old directory is moved aside first and restored if placing the new
/// tree fails.
pub fn replace_app_dir(source: &Path, dest: &Path) -> Result<(), UpdateError> {
    if !source.exists() {
        return Err(UpdateError::InstallationFailed(format!(
            "source {:?} does not exist",
            source
        )));
    }

    let backup = backup_path(dest);
    let _ = std::fs::remove_dir_all(&backup);

    let had_old = dest.exists();
    if had_old {
        std::fs::rename(dest, &backup).map_err(|e| {
            UpdateError::InstallationFailed(format!("failed to move old app aside: {}", e))
        })?;
    }

    match copy_dir_all(source, dest) {
        Ok(()) => {
            if had_old {
                let _ = std::fs::remove_dir_all(&backup);
            }
            Ok(())
        }
        Err(err) => {
            // Restore the old version before reporting.
            let _ = std::fs::remove_dir_all(dest);
            if had_old {
                let _ = std::fs::rename(&backup, dest);
            }
            Err(UpdateError::InstallationFailed(format!(
                "failed to place new app: {}",
                err
            )))
        }
    }
}

/// Sibling path used to hold the old app dir during a swap.
fn backup_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".old");
    dest.with_file_name(name)
}

/// Recursively copy a directory tree. The staging dir and the install
/// location are often on different filesystems, so a plain rename is not
/// enough.
fn copy_dir_all(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Build a command that outlives the current process.
fn detached_command(executable: &Path) -> std::process::Command {
    #[allow(unused_mut)]
    let mut command = std::process::Command::new(executable);

    // Without this the child dies with the installer console on Windows.
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        command.creation_flags(DETACHED_PROCESS);
    }

    command
}
