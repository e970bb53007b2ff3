//! # gitter-updater
//!
//! Auto-update system for the Gitter desktop app.
//!
//! This crate handles:
//! - Periodic update manifest polling with interval-after-completion
//!   scheduling (no overlapping checks, no pile-up after system sleep)
//! - Package download with size and SHA-256 verification
//! - Archive unpacking (zip, tar.gz)
//! - Platform-aware branching: Windows and macOS self-update, Linux gets a
//!   pointer to the download page
//! - User notification through native notification systems
//! - The installer-mode hand-off that overwrites the old app, relaunches,
//!   and exits
//!
//! ## Structure
//!
//! The [`UpdateCoordinator`] sequences everything but performs no I/O.
//! All real work lives behind three injected traits: [`UpdateProvider`]
//! (checks, downloads, unpacking, installation), [`Notifier`] (user
//! alerts), and [`AppHost`] (process exit). [`HttpUpdateProvider`] is the
//! production provider; tests substitute their own.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod http;
pub mod manifest;
pub mod notify;
pub mod platform;
pub mod provider;
#[cfg(test)]
mod proptests;

// Re-export main types for convenience
pub use config::{NetworkConfig, UpdateConfig};
pub use coordinator::{ListenHandle, UpdateCoordinator};
pub use error::UpdateError;
pub use host::{AppHost, ProcessHost};
pub use http::{ArchiveType, HttpUpdateProvider};
pub use manifest::{current_platform, PackageDescriptor, UpdateManifest};
pub use notify::{
    default_notifier, NotificationResponse, Notifier, StubNotifier, UpdateNotice,
};
pub use platform::PlatformClass;
pub use provider::UpdateProvider;
