//! Version negotiation between the data store and the registry
//!
//! The locally declared version wins when it is strictly newer than what the
//! registry holds. Otherwise the registry version is bumped by one patch, so a
//! publish never collides with an existing release.
//!
//! # Example
//!
//! ```
//! use npm_packager::package::negotiator::{SemverCrateComparer, VersionNegotiator};
//!
//! let comparer = SemverCrateComparer;
//! let negotiator = VersionNegotiator::new(&comparer);
//!
//! assert_eq!(negotiator.negotiate("2.1.0", Some("2.0.5")).unwrap(), "2.1.0");
//! assert_eq!(negotiator.negotiate("1.0.0", Some("1.0.0")).unwrap(), "1.0.1");
//! assert_eq!(negotiator.negotiate("1.0.0", None).unwrap(), "1.0.0");
//! ```

use crate::core::error::{PublishError, Result};
use crate::core::traits::SemverComparer;
use semver::{BuildMetadata, Prerelease, Version};

/// Version assumed for packages the registry has never seen
pub const UNPUBLISHED_VERSION: &str = "0.0.0";

/// [`SemverComparer`] backed by the `semver` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SemverCrateComparer;

impl SemverCrateComparer {
    /// Parse a version, tolerating surrounding whitespace and a leading `v`
    fn parse(version: &str) -> Result<Version> {
        let trimmed = version.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        Version::parse(trimmed).map_err(|e| PublishError::InvalidVersion {
            version: version.to_string(),
            message: e.to_string(),
        })
    }
}

impl SemverComparer for SemverCrateComparer {
    fn gt(&self, left: &str, right: &str) -> Result<bool> {
        let mut left = Self::parse(left)?;
        let mut right = Self::parse(right)?;

        // Build metadata carries no precedence
        left.build = BuildMetadata::EMPTY;
        right.build = BuildMetadata::EMPTY;

        Ok(left > right)
    }

    fn increment_patch(&self, version: &str) -> Result<String> {
        let mut version = Self::parse(version)?;

        // A prerelease is released at its own patch: 1.2.3-beta.1 -> 1.2.3
        if version.pre.is_empty() {
            version.patch += 1;
        }
        version.pre = Prerelease::EMPTY;
        version.build = BuildMetadata::EMPTY;

        Ok(version.to_string())
    }
}

/// Computes the version to publish
pub struct VersionNegotiator<'a> {
    comparer: &'a dyn SemverComparer,
}

impl<'a> VersionNegotiator<'a> {
    pub fn new(comparer: &'a dyn SemverComparer) -> Self {
        Self { comparer }
    }

    /// Pick the version to publish
    ///
    /// # Arguments
    ///
    /// * `local` - Version declared in the data store
    /// * `registry` - Version currently installed from the registry, `None`
    ///   when the package is unpublished
    ///
    /// # Errors
    ///
    /// `InvalidVersion` when either version is not valid semver.
    pub fn negotiate(&self, local: &str, registry: Option<&str>) -> Result<String> {
        let registry = registry.unwrap_or(UNPUBLISHED_VERSION);

        let next = if self.comparer.gt(local, registry)? {
            local.to_string()
        } else {
            self.comparer.increment_patch(registry)?
        };

        log::info!(
            "Negotiated version {} (local {}, registry {})",
            next,
            local,
            registry
        );

        Ok(next)
    }
}
