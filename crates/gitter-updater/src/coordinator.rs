//! Update coordinator - sequences the update flow over time.
//!
//! The coordinator owns no I/O of its own. It drives three injected
//! collaborators:
//! - an [`UpdateProvider`] for version checks, downloads, unpacking, and
//!   installation
//! - a [`Notifier`] for user-visible alerts
//! - an [`AppHost`] for process exit
//!
//! Two independent entry points:
//! - [`UpdateCoordinator::listen`] starts the polling loop used by a normal
//!   app launch
//! - [`UpdateCoordinator::finalize_install`] is called by an installer-mode
//!   launch to overwrite the old app and hand back off
//!
//! Polling is interval-after-completion, not wall-clock periodic: the next
//! check is scheduled only once the previous cycle has fully finished.
//! Wall-clock timers bunch up after system sleep and fire in a burst on
//! wake; waiting for each cycle to complete keeps at most one check in
//! flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::UpdateConfig;
use crate::host::AppHost;
use crate::notify::{NotificationResponse, Notifier, UpdateNotice};
use crate::platform::PlatformClass;
use crate::provider::UpdateProvider;

/// Outcome of a single poll cycle.
enum PollOutcome {
    /// Nothing to do; check again after the poll interval
    Retry,
    /// Update found on a platform that cannot self-update
    NotifyOnly { version: Version },
    /// Update downloaded and unpacked, ready for a user-triggered install
    ReadyToInstall { version: Version, executable: PathBuf },
}

/// Handle to a running poll loop started by [`UpdateCoordinator::listen`].
pub struct ListenHandle {
    task: tokio::task::JoinHandle<()>,
}

impl ListenHandle {
    /// Stop the poll loop, including any notification loop it entered.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Whether the loop has ended (stopped, or handed off to the installer).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Coordinates update polling, platform branching, and the installer
/// hand-off.
#[derive(Clone)]
pub struct UpdateCoordinator {
    provider: Arc<dyn UpdateProvider>,
    notifier: Arc<dyn Notifier>,
    host: Arc<dyn AppHost>,
    config: UpdateConfig,
    platform: PlatformClass,
}

impl UpdateCoordinator {
    /// Create a coordinator for the current platform.
    pub fn new(
        provider: Arc<dyn UpdateProvider>,
        notifier: Arc<dyn Notifier>,
        host: Arc<dyn AppHost>,
        config: UpdateConfig,
    ) -> Self {
        Self::with_platform(provider, notifier, host, config, PlatformClass::current())
    }

    /// Create a coordinator with an explicit platform class.
    ///
    /// Useful for testing the platform branch without cross-compiling.
    pub fn with_platform(
        provider: Arc<dyn UpdateProvider>,
        notifier: Arc<dyn Notifier>,
        host: Arc<dyn AppHost>,
        config: UpdateConfig,
        platform: PlatformClass,
    ) -> Self {
        Self {
            provider,
            notifier,
            host,
            config,
            platform,
        }
    }

    /// Begin polling for updates.
    ///
    /// The first check runs immediately; each subsequent check runs one
    /// poll interval after the previous cycle completes. Call this once
    /// per process lifetime; the returned handle's
    /// [`stop`](ListenHandle::stop) is the only way to cancel the loop.
    pub fn listen(&self) -> ListenHandle {
        let coordinator = self.clone();
        let task = tokio::spawn(async move { coordinator.poll_loop().await });
        ListenHandle { task }
    }

    /// Installer-mode flow: overwrite the old app, start the new version,
    /// and quit.
    ///
    /// On install failure the process quits immediately and the new
    /// version is never started. All outcomes are observed through logs
    /// and process exit.
    pub async fn finalize_install(&self, old_location: &Path, new_executable: &Path) {
        if let Err(err) = self.provider.install(old_location).await {
            error!("update failed, shutting down installer: {}", err);
            self.host.quit();
            return;
        }

        info!("starting new version");
        self.provider.run(new_executable);

        // Give the new process time to get going before this one exits.
        sleep(self.config.restart_grace()).await;
        info!("shutting down installer");
        self.host.quit();
    }

    async fn poll_loop(self) {
        loop {
            match self.poll_once().await {
                PollOutcome::Retry => {
                    info!(
                        "trying update check again in {} seconds",
                        self.config.check_interval_secs
                    );
                    sleep(self.config.check_interval()).await;
                }
                PollOutcome::NotifyOnly { version } => {
                    // Polling ends here: the notice repeats for the rest of
                    // the process lifetime, and the manifest is never
                    // re-checked.
                    self.manual_update_loop(&version).await;
                    return;
                }
                PollOutcome::ReadyToInstall {
                    version,
                    executable,
                } => {
                    self.install_notice_loop(&version, &executable).await;
                    return;
                }
            }
        }
    }

    /// Run one check-and-branch cycle.
    async fn poll_once(&self) -> PollOutcome {
        let manifest = match self.provider.check_version().await {
            Err(err) => {
                error!("update manifest request failed: {}", err);
                return PollOutcome::Retry;
            }
            Ok(None) => {
                info!("app currently at the latest version");
                return PollOutcome::Retry;
            }
            Ok(Some(manifest)) => manifest,
        };

        let version = manifest.version.clone();
        info!("update {} available ({} platform)", version, self.platform);

        if !self.platform.can_self_update() {
            return PollOutcome::NotifyOnly { version };
        }

        let package = match self.provider.download(&manifest).await {
            Ok(package) => package,
            Err(err) => {
                error!("update {} failed to download: {}", version, err);
                return PollOutcome::Retry;
            }
        };

        match self.provider.unpack(&package, &manifest).await {
            Ok(executable) => PollOutcome::ReadyToInstall {
                version,
                executable,
            },
            Err(err) => {
                error!("update {} failed to unpack: {}", version, err);
                PollOutcome::Retry
            }
        }
    }

    /// Repeating notice for platforms that cannot self-update.
    async fn manual_update_loop(&self, version: &Version) {
        let notice = UpdateNotice::manual_update(version);
        loop {
            sleep(self.config.notify_interval()).await;
            if let Err(err) = self.notifier.notify(&notice) {
                warn!("failed to show update notice: {}", err);
            }
        }
    }

    /// Repeating "click to install" notice. User activation hands off to
    /// the installer and quits the app.
    async fn install_notice_loop(&self, version: &Version, executable: &Path) {
        let notice = UpdateNotice::install_ready(version);
        loop {
            sleep(self.config.notify_interval()).await;
            match self.notifier.notify(&notice) {
                Ok(NotificationResponse::Activated) => {
                    let args = [
                        self.provider.app_location(),
                        self.provider.app_executable(),
                    ];
                    info!("starting new app to install itself");
                    self.provider.run_installer(executable, &args);
                    info!("quitting outdated app");
                    self.host.quit();
                    return;
                }
                Ok(NotificationResponse::Dismissed) => {}
                Err(err) => {
                    warn!("failed to show update notice: {}", err);
                }
            }
        }
    }
}
