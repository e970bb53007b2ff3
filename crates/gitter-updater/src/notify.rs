//! User-facing update notifications.
//!
//! Notifications are shown through the native notification system of each
//! platform:
//! - Windows: toast notification via PowerShell
//! - macOS: osascript
//! - Linux: notify-send, falling back to D-Bus via gdbus
//!
//! The command-line backends are fire-and-forget: they cannot observe a
//! click, so they always report [`NotificationResponse::Dismissed`]. A GUI
//! shell embedding this crate supplies its own [`Notifier`] that reports
//! [`NotificationResponse::Activated`] when the user clicks the notice.

use semver::Version;
use tracing::{debug, warn};

use crate::error::UpdateError;

/// User response to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationResponse {
    /// User clicked the notification's action
    Activated,
    /// Notification was dismissed, timed out, or could not report a click
    Dismissed,
}

/// Content of a user-visible update notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    /// Title of the notification
    pub title: String,
    /// Body text of the notification
    pub message: String,
    /// Whether clicking the notice triggers the install flow
    pub actionable: bool,
}

impl UpdateNotice {
    /// Notice for platforms that cannot self-update: point the user at the
    /// download page.
    pub fn manual_update(version: &Version) -> Self {
        Self {
            title: format!("Gitter {} Available", version),
            message: "Head over to gitter.im/apps to update.".to_string(),
            actionable: false,
        }
    }

    /// Notice offering to restart into a downloaded and unpacked update.
    pub fn install_ready(version: &Version) -> Self {
        Self {
            title: format!("Gitter {} Available", version),
            message: "Click to restart and apply update.".to_string(),
            actionable: true,
        }
    }
}

/// External collaborator displaying a user-facing alert.
pub trait Notifier: Send + Sync {
    /// Show a notification and report the user's response.
    fn notify(&self, notice: &UpdateNotice) -> Result<NotificationResponse, UpdateError>;
}

/// Create the appropriate notifier for the current platform.
pub fn default_notifier() -> Box<dyn Notifier> {
    #[cfg(target_os = "windows")]
    {
        Box::new(WindowsNotifier::new())
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(MacOsNotifier)
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(LinuxNotifier::new())
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        Box::new(StubNotifier)
    }
}

/// Notifier that only logs, for unsupported platforms and tests.
pub struct StubNotifier;

impl Notifier for StubNotifier {
    fn notify(&self, notice: &UpdateNotice) -> Result<NotificationResponse, UpdateError> {
        debug!("stub notification: {} - {}", notice.title, notice.message);
        Ok(NotificationResponse::Dismissed)
    }
}

// =============================================================================
// Windows backend
// =============================================================================

#[cfg(target_os = "windows")]
pub struct WindowsNotifier {
    app_id: String,
}

#[cfg(target_os = "windows")]
impl WindowsNotifier {
    pub fn new() -> Self {
        Self {
            app_id: "Gitter".to_string(),
        }
    }

    pub fn with_app_id(app_id: String) -> Self {
        Self { app_id }
    }
}

#[cfg(target_os = "windows")]
impl Default for WindowsNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "windows")]
impl Notifier for WindowsNotifier {
    fn notify(&self, notice: &UpdateNotice) -> Result<NotificationResponse, UpdateError> {
        use std::process::Command;

        let script = format!(
            r#"
            [Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] | Out-Null
            [Windows.Data.Xml.Dom.XmlDocument, Windows.Data.Xml.Dom.XmlDocument, ContentType = WindowsRuntime] | Out-Null

            $template = @"
            <toast>
                <visual>
                    <binding template="ToastGeneric">
                        <text>{}</text>
                        <text>{}</text>
                    </binding>
                </visual>
            </toast>
"@

            $xml = New-Object Windows.Data.Xml.Dom.XmlDocument
            $xml.LoadXml($template)
            $toast = [Windows.UI.Notifications.ToastNotification]::new($xml)
            [Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier("{}").Show($toast)
            "#,
            escape_xml(&notice.title),
            escape_xml(&notice.message),
            &self.app_id
        );

        let output = Command::new("powershell")
            .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", &script])
            .output()
            .map_err(|e| UpdateError::NotificationFailed(e.to_string()))?;

        if output.status.success() {
            debug!("Windows toast notification shown");
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Failed to show Windows notification: {}", stderr);
        }
        Ok(NotificationResponse::Dismissed)
    }
}

#[cfg(target_os = "windows")]
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// =============================================================================
// macOS backend
// =============================================================================

#[cfg(target_os = "macos")]
pub struct MacOsNotifier;

#[cfg(target_os = "macos")]
impl Notifier for MacOsNotifier {
    fn notify(&self, notice: &UpdateNotice) -> Result<NotificationResponse, UpdateError> {
        use std::process::Command;

        let script = format!(
            r#"display notification "{}" with title "{}""#,
            escape_applescript(&notice.message),
            escape_applescript(&notice.title)
        );

        let output = Command::new("osascript")
            .args(["-e", &script])
            .output()
            .map_err(|e| UpdateError::NotificationFailed(e.to_string()))?;

        if output.status.success() {
            debug!("macOS notification shown");
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Failed to show macOS notification: {}", stderr);
        }
        Ok(NotificationResponse::Dismissed)
    }
}

#[cfg(target_os = "macos")]
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// =============================================================================
// Linux backend
// =============================================================================

#[cfg(target_os = "linux")]
pub struct LinuxNotifier {
    app_name: String,
}

#[cfg(target_os = "linux")]
impl LinuxNotifier {
    pub fn new() -> Self {
        Self {
            app_name: "Gitter".to_string(),
        }
    }

    pub fn with_app_name(app_name: String) -> Self {
        Self { app_name }
    }
}

#[cfg(target_os = "linux")]
impl Default for LinuxNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
impl Notifier for LinuxNotifier {
    fn notify(&self, notice: &UpdateNotice) -> Result<NotificationResponse, UpdateError> {
        use std::process::Command;

        let output = Command::new("notify-send")
            .args([
                "--app-name",
                &self.app_name,
                &notice.title,
                &notice.message,
            ])
            .output();

        match output {
            Ok(result) if result.status.success() => {
                debug!("Linux notification shown via notify-send");
                Ok(NotificationResponse::Dismissed)
            }
            _ => self.notify_via_dbus(notice),
        }
    }
}

#[cfg(target_os = "linux")]
impl LinuxNotifier {
    fn notify_via_dbus(
        &self,
        notice: &UpdateNotice,
    ) -> Result<NotificationResponse, UpdateError> {
        use std::process::Command;

        let output = Command::new("gdbus")
            .args([
                "call",
                "--session",
                "--dest",
                "org.freedesktop.Notifications",
                "--object-path",
                "/org/freedesktop/Notifications",
                "--method",
                "org.freedesktop.Notifications.Notify",
                &self.app_name,
                "0",  // replaces_id
                "",   // app_icon
                &notice.title,
                &notice.message,
                "[]", // actions
                "{}", // hints
                "-1", // expire_timeout
            ])
            .output()
            .map_err(|e| UpdateError::NotificationFailed(e.to_string()))?;

        if output.status.success() {
            debug!("Linux notification shown via D-Bus");
        } else {
            warn!("Failed to show Linux notification via D-Bus");
        }
        Ok(NotificationResponse::Dismissed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_update_notice() {
        let notice = UpdateNotice::manual_update(&Version::new(2, 0, 0));
        assert_eq!(notice.title, "Gitter 2.0.0 Available");
        assert_eq!(notice.message, "Head over to gitter.im/apps to update.");
        assert!(!notice.actionable);
    }

    #[test]
    fn test_install_ready_notice() {
        let notice = UpdateNotice::install_ready(&Version::new(3, 1, 4));
        assert_eq!(notice.title, "Gitter 3.1.4 Available");
        assert_eq!(notice.message, "Click to restart and apply update.");
        assert!(notice.actionable);
    }

    #[test]
    fn test_stub_notifier() {
        let notice = UpdateNotice::manual_update(&Version::new(1, 0, 0));
        let response = StubNotifier.notify(&notice).unwrap();
        assert_eq!(response, NotificationResponse::Dismissed);
    }
}
