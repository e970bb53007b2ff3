//! Property-based tests for gitter-updater.
//!
//! These tests use proptest to verify correctness properties across
//! randomly generated inputs: manifest round-trips, version comparison
//! consistency, and config file persistence.

#![cfg(test)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use semver::Version;
use tempfile::TempDir;

use crate::config::UpdateConfig;
use crate::manifest::{PackageDescriptor, UpdateManifest};

// =============================================================================
// Generators
// =============================================================================

/// Generate a random version.
fn arb_version() -> impl Strategy<Value = Version> {
    (0u64..100, 0u64..100, 0u64..100)
        .prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

/// Generate a random platform string.
fn arb_platform() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("windows-x86_64".to_string()),
        Just("windows-aarch64".to_string()),
        Just("macos-x86_64".to_string()),
        Just("macos-aarch64".to_string()),
        Just("linux-x86_64".to_string()),
    ]
}

/// Generate a random package descriptor.
fn arb_package() -> impl Strategy<Value = PackageDescriptor> {
    ("[a-z0-9-]{1,20}", any::<Option<u64>>()).prop_map(|(name, size)| PackageDescriptor {
        url: format!("https://update.gitter.im/{}.zip", name),
        size,
        sha256: None,
    })
}

/// Generate a manifest with random platform packages.
fn arb_manifest() -> impl Strategy<Value = UpdateManifest> {
    (
        arb_version(),
        prop::collection::btree_map(arb_platform(), arb_package(), 0..4),
    )
        .prop_map(|(version, packages)| UpdateManifest { version, packages })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Serializing a manifest and parsing it back yields the same manifest.
    #[test]
    fn prop_manifest_round_trip(manifest in arb_manifest()) {
        let json = serde_json::to_vec(&manifest).unwrap();
        let parsed = UpdateManifest::parse(&json).unwrap();
        prop_assert_eq!(parsed, manifest);
    }

    /// `is_newer_than` agrees with semver ordering.
    #[test]
    fn prop_is_newer_matches_ordering(a in arb_version(), b in arb_version()) {
        let manifest = UpdateManifest {
            version: a.clone(),
            packages: BTreeMap::new(),
        };
        prop_assert_eq!(manifest.is_newer_than(&b), a > b);
    }

    /// A manifest never reports itself as newer than its own version.
    #[test]
    fn prop_manifest_not_newer_than_self(manifest in arb_manifest()) {
        let version = manifest.version.clone();
        prop_assert!(!manifest.is_newer_than(&version));
    }

    /// Every inserted platform package is found; absent platforms are not.
    #[test]
    fn prop_package_lookup(manifest in arb_manifest()) {
        for (platform, package) in &manifest.packages {
            prop_assert_eq!(manifest.package_for(platform), Some(package));
        }
        prop_assert!(manifest.package_for("solaris-sparc").is_none());
    }

    /// Config files survive a save/load round-trip.
    #[test]
    fn prop_config_round_trip(
        check in 1u64..100_000,
        notify in 1u64..10_000,
        grace in 1u64..600,
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("update.toml");

        let config = UpdateConfig {
            check_interval_secs: check,
            notify_interval_secs: notify,
            restart_grace_secs: grace,
            ..UpdateConfig::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = UpdateConfig::load_from_file(&path).unwrap();
        prop_assert_eq!(loaded.check_interval_secs, check);
        prop_assert_eq!(loaded.notify_interval_secs, notify);
        prop_assert_eq!(loaded.restart_grace_secs, grace);
        prop_assert_eq!(loaded.manifest_url, config.manifest_url);
    }
}
