//! Update provider interface.
//!
//! The provider does all the real work of an update: talking to the update
//! server, fetching and unpacking packages, and swapping application files.
//! The coordinator only sequences these calls, so the provider is a trait
//! and is injected at construction time.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::UpdateError;
use crate::manifest::UpdateManifest;

/// External collaborator performing version checks, downloads, unpacking,
/// and installation.
#[async_trait]
pub trait UpdateProvider: Send + Sync {
    /// Check the remote manifest for a newer release.
    ///
    /// Returns `Ok(Some(manifest))` when a newer version is available,
    /// `Ok(None)` when the app is already at the latest version.
    async fn check_version(&self) -> Result<Option<UpdateManifest>, UpdateError>;

    /// Download the release package described by the manifest.
    ///
    /// Returns the path of the downloaded package archive.
    async fn download(&self, manifest: &UpdateManifest) -> Result<PathBuf, UpdateError>;

    /// Unpack a downloaded package archive.
    ///
    /// Returns the path of the new application executable inside the
    /// unpacked tree. The unpacked tree is left in place for the install
    /// flow; this crate never cleans it up.
    async fn unpack(&self, package: &Path, manifest: &UpdateManifest)
        -> Result<PathBuf, UpdateError>;

    /// Replace the application at `old_location` with the version this
    /// process is running from. Used by the installer-mode launch.
    async fn install(&self, old_location: &Path) -> Result<(), UpdateError>;

    /// Start `executable` as a detached process. Fire-and-forget: spawn
    /// failures are logged by the provider, not surfaced.
    fn run(&self, executable: &Path);

    /// Start `executable` in installer mode with the given arguments,
    /// detached. Fire-and-forget, like [`run`](Self::run).
    fn run_installer(&self, executable: &Path, args: &[PathBuf]);

    /// Location of the currently installed application directory.
    fn app_location(&self) -> PathBuf;

    /// Path of the currently running application executable.
    fn app_executable(&self) -> PathBuf;
}
