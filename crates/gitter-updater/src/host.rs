//! Application host interface.
//!
//! The host owns process lifecycle. The coordinator only ever asks it to
//! quit, either after handing off to the installer or when the installer
//! flow finishes (or fails).

use tracing::info;

/// External collaborator exposing process lifecycle control.
pub trait AppHost: Send + Sync {
    /// Terminate the application.
    fn quit(&self);
}

/// Host backed by the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHost;

impl AppHost for ProcessHost {
    fn quit(&self) {
        info!("terminating process");
        std::process::exit(0);
    }
}
