use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use wiring_core::{
    Application, Assignment, ComposedApplication, ElementId, InstanceState, ValuesMapper,
    WiringError, WiringResult,
};

/// Output format of `wiring plan` and `wiring boot`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Everything composition decided, by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    /// Module names, one list per import stage
    pub import_stages: Vec<Vec<String>>,
    pub modules: Vec<ModulePlanReport>,
    /// Element labels, one list per bootstrap step
    pub bootstrap: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePlanReport {
    pub module: String,
    pub stages: Vec<Vec<String>>,
    pub assignments: Vec<AssignmentReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    pub element: String,
    pub arg: String,
    /// "single", or the container kind built by aggregation
    pub mapper: String,
    pub sources: Vec<String>,
}

impl PlanReport {
    pub fn from_composed(composed: &ComposedApplication) -> Self {
        let app = &composed.application;
        let import_stages = composed
            .import_plan
            .stages
            .iter()
            .map(|stage| stage.iter().map(|&m| app.module_label(m)).collect())
            .collect();

        let modules = composed
            .injection_plans
            .iter()
            .map(|plan| ModulePlanReport {
                module: app.module_label(plan.module),
                stages: plan.plan.stages.iter().map(|s| labels(app, s)).collect(),
                assignments: plan
                    .plan
                    .assignments
                    .iter()
                    .map(|a| AssignmentReport::new(app, a))
                    .collect(),
            })
            .collect();

        let bootstrap = composed
            .bootstrap_sequence()
            .iter()
            .map(|step| labels(app, step))
            .collect();

        Self {
            import_stages,
            modules,
            bootstrap,
        }
    }

    pub fn render(&self, format: ReportFormat) -> WiringResult<String> {
        match format {
            ReportFormat::Json => to_json(self),
            ReportFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Import stages:");
        for (idx, stage) in self.import_stages.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", idx + 1, stage.join(", "));
        }

        for module in &self.modules {
            let _ = writeln!(out, "\nModule {}:", module.module);
            for (idx, stage) in module.stages.iter().enumerate() {
                let _ = writeln!(out, "  stage {}: {}", idx + 1, stage.join(", "));
            }
            for assignment in &module.assignments {
                let arrow = if assignment.mapper == "single" {
                    format!("<- {}", assignment.sources.join(", "))
                } else {
                    format!("<= {}[{}]", assignment.mapper, assignment.sources.join(", "))
                };
                let _ = writeln!(out, "  {}.{} {}", assignment.element, assignment.arg, arrow);
            }
        }

        let _ = writeln!(out, "\nBootstrap:");
        if self.bootstrap.is_empty() {
            let _ = writeln!(out, "  (nothing to bootstrap)");
        }
        for (idx, step) in self.bootstrap.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", idx + 1, step.join(", "));
        }
        out
    }
}

impl AssignmentReport {
    fn new(app: &Application, assignment: &Assignment) -> Self {
        let mapper = match &assignment.mapper {
            ValuesMapper::Single => "single".to_string(),
            ValuesMapper::MixedIterable { kind, .. } => kind.to_string(),
        };
        Self {
            element: app.element_label(assignment.dependency.source),
            arg: assignment.dependency.arg.clone(),
            mapper,
            sources: assignment
                .sources()
                .into_iter()
                .map(|source| app.element_label(source))
                .collect(),
        }
    }
}

/// What an eager boot constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootReport {
    pub state: String,
    /// Labels in construction order
    pub constructed: Vec<String>,
}

impl BootReport {
    pub fn new(state: InstanceState, constructed: Vec<String>) -> Self {
        let state = match state {
            InstanceState::Uninitialized => "uninitialized",
            InstanceState::Booted => "booted",
            InstanceState::Live => "live",
        };
        Self {
            state: state.to_string(),
            constructed,
        }
    }

    pub fn render(&self, format: ReportFormat) -> WiringResult<String> {
        match format {
            ReportFormat::Json => to_json(self),
            ReportFormat::Text => {
                let mut out = String::new();
                let _ = writeln!(
                    out,
                    "✓ Application {} ({} element(s) constructed)",
                    self.state,
                    self.constructed.len()
                );
                for (idx, label) in self.constructed.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", idx + 1, label);
                }
                Ok(out)
            }
        }
    }
}

fn labels(app: &Application, elements: &BTreeSet<ElementId>) -> Vec<String> {
    elements.iter().map(|&e| app.element_label(e)).collect()
}

fn to_json<T: Serialize>(report: &T) -> WiringResult<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| WiringError::Report(format!("Failed to serialize report: {}", e)))
}
