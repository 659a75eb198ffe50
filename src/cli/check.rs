use super::compose_manifest;
use std::path::Path;
use wiring::config::Config;
use wiring::WiringResult;

pub fn run(manifest: &Path, config: &Config) -> WiringResult<()> {
    let (loaded, composed) = compose_manifest(manifest, config)?;

    println!("✓ {} composes", manifest.display());
    println!(
        "  {} module(s), {} element(s), {} assignment(s)",
        loaded.application.module_count(),
        loaded.application.element_count(),
        composed.assignments().count()
    );
    Ok(())
}
