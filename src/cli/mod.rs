use std::path::Path;
use wiring::config::Config;
use wiring::manifest::{LoadedManifest, Manifest};
use wiring::{ApplicationComposer, ComposedApplication, WiringResult};

pub mod boot;
pub mod check;
pub mod plan;

/// Load a manifest and compose it under the given config
fn compose_manifest(
    manifest: &Path,
    config: &Config,
) -> WiringResult<(LoadedManifest, ComposedApplication)> {
    let loaded = Manifest::load(manifest)?.build()?;
    let composer = ApplicationComposer::with_options(loaded.selector(), config.compose_options());
    let composed = composer.compose(&loaded.application)?;
    Ok((loaded, composed))
}
