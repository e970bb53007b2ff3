//! Remote update manifest.
//!
//! The manifest is a small JSON document published alongside each release.
//! It carries the latest release version and one download descriptor per
//! platform. The coordinator reads only the version; the rest is passed
//! through to the provider untouched.
//!
//! A manifest is fetched fresh on every poll and never persisted.

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::UpdateError;

/// Download descriptor for a single platform's release package.
///
/// Only `url` is required. `size` and `sha256`, when present, let the
/// provider verify the download before unpacking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// URL of the package archive (zip or tar.gz)
    pub url: String,

    /// Expected package size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Expected SHA-256 digest of the package, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Remote descriptor of the latest available release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateManifest {
    /// Version of the latest release
    pub version: Version,

    /// Download descriptors keyed by platform string (see [`current_platform`])
    #[serde(default)]
    pub packages: BTreeMap<String, PackageDescriptor>,
}

impl UpdateManifest {
    /// Parse a manifest from raw JSON bytes.
    pub fn parse(data: &[u8]) -> Result<Self, UpdateError> {
        let manifest: Self = serde_json::from_slice(data)?;
        Ok(manifest)
    }

    /// Whether this manifest describes a release newer than `current`.
    pub fn is_newer_than(&self, current: &Version) -> bool {
        self.version > *current
    }

    /// Get the package descriptor for a platform, if the release ships one.
    pub fn package_for(&self, platform: &str) -> Option<&PackageDescriptor> {
        self.packages.get(platform)
    }
}

/// Get the platform string for the current system.
///
/// Format: `{os}-{arch}` (e.g., "windows-x86_64", "macos-aarch64").
pub fn current_platform() -> String {
    let os = if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    };

    let arch = if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else if cfg!(target_arch = "arm") {
        "arm"
    } else {
        "unknown"
    };

    format!("{}-{}", os, arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_manifest() {
        let data = br#"{"version": "2.0.0"}"#;
        let manifest = UpdateManifest::parse(data).unwrap();
        assert_eq!(manifest.version, Version::new(2, 0, 0));
        assert!(manifest.packages.is_empty());
    }

    #[test]
    fn test_parse_manifest_with_packages() {
        let data = br#"{
            "version": "2.1.0",
            "packages": {
                "windows-x86_64": {
                    "url": "https://update.gitter.im/win/gitter-2.1.0.zip",
                    "size": 1048576,
                    "sha256": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
                },
                "linux-x86_64": {
                    "url": "https://update.gitter.im/linux/gitter-2.1.0.tar.gz"
                }
            }
        }"#;
        let manifest = UpdateManifest::parse(data).unwrap();
        assert_eq!(manifest.version, Version::new(2, 1, 0));

        let win = manifest.package_for("windows-x86_64").unwrap();
        assert_eq!(win.size, Some(1_048_576));
        assert!(win.sha256.is_some());

        let linux = manifest.package_for("linux-x86_64").unwrap();
        assert!(linux.size.is_none());
        assert!(manifest.package_for("macos-aarch64").is_none());
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        let data = br#"{"version": "not-a-version"}"#;
        assert!(UpdateManifest::parse(data).is_err());
    }

    #[test]
    fn test_is_newer_than() {
        let manifest = UpdateManifest {
            version: Version::new(2, 0, 0),
            packages: BTreeMap::new(),
        };
        assert!(manifest.is_newer_than(&Version::new(1, 9, 9)));
        assert!(!manifest.is_newer_than(&Version::new(2, 0, 0)));
        assert!(!manifest.is_newer_than(&Version::new(2, 0, 1)));
    }

    #[test]
    fn test_current_platform_format() {
        let platform = current_platform();
        assert!(platform.contains('-'));
        let (os, arch) = platform.split_once('-').unwrap();
        assert!(!os.is_empty());
        assert!(!arch.is_empty());
    }
}
