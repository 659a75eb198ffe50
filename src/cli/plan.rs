use super::compose_manifest;
use std::path::Path;
use wiring::config::Config;
use wiring::report::{PlanReport, ReportFormat};
use wiring::WiringResult;

pub fn run(manifest: &Path, format: Option<ReportFormat>, config: &Config) -> WiringResult<()> {
    let (_, composed) = compose_manifest(manifest, config)?;
    let report = PlanReport::from_composed(&composed);
    print!("{}", report.render(format.unwrap_or(config.report_format))?);
    Ok(())
}
