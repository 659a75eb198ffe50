use super::compose_manifest;
use std::path::Path;
use wiring::config::Config;
use wiring::report::{BootReport, ReportFormat};
use wiring::{ApplicationInstanceBuilder, InstanceState, WiringResult};

pub struct BootOptions {
    pub format: Option<ReportFormat>,
    /// Force parallel bootstrap regardless of config
    pub parallel: bool,
}

pub fn run(manifest: &Path, options: BootOptions, config: &Config) -> WiringResult<()> {
    let (loaded, composed) = compose_manifest(manifest, config)?;

    let mut instance_options = config.instance_options();
    instance_options.parallel |= options.parallel;
    let instance = ApplicationInstanceBuilder::new(&composed)
        .with_options(instance_options)
        .build()?;
    if instance.state() == InstanceState::Uninitialized {
        instance.boot()?;
    }

    let report = BootReport::new(instance.state(), loaded.log.entries());
    print!("{}", report.render(options.format.unwrap_or(config.report_format))?);
    Ok(())
}
