//! Orchestration layer for package publishing
//!
//! Sequences the registry, package and workspace components into one publish
//! run per trigger.

pub mod package_publisher;

pub use package_publisher::{PackageLocation, PackagePublisher, PublishReport};
