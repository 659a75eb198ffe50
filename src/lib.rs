//! Wiring: dependency-injection composer
//!
//! This crate re-exports the resolution engine from `wiring-core` and adds
//! the outer surfaces used by the `wiring` binary: configuration, the YAML
//! wiring manifest and plan reports.

pub use wiring_core::*;

/// Configuration management.
pub mod config;

/// Error display with suggestions for the CLI.
pub mod error_help;

/// YAML wiring manifests.
pub mod manifest;

/// Human and machine readable composition reports.
pub mod report;
