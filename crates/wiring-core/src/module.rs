//! Module-level solving: import order and ownership consistency

use crate::app::{Application, ElementId, ModuleId};
use crate::error::{
    ConsistencyError, ConsistencyViolation, ElementLabel, ModuleImportSolverError, ModuleLabel,
};
use crate::graph::DirectedGraph;
use std::collections::BTreeSet;
use tracing::debug;

/// Module import graph staged so imported modules come first
#[derive(Debug, Clone)]
pub struct ModuleImportPlan {
    /// Edge `a -> b`: `a` imports `b`
    pub graph: DirectedGraph<ModuleId>,
    pub stages: Vec<BTreeSet<ModuleId>>,
}

impl ModuleImportPlan {
    /// Modules in resolution order
    pub fn ordered(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.stages.iter().flat_map(|stage| stage.iter().copied())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleImportSolver;

impl ModuleImportSolver {
    pub fn solve(&self, app: &Application) -> Result<ModuleImportPlan, ModuleImportSolverError> {
        let mut graph = DirectedGraph::new();
        for module in app.modules() {
            graph.add_node(module.id());
            for &imported in module.imports() {
                graph.add_edge(module.id(), imported);
            }
        }

        let stages = graph
            .topological_stages()
            .map_err(|err| ModuleImportSolverError::CyclicImport {
                modules: err
                    .remaining
                    .into_iter()
                    .map(|id| ModuleLabel::of(app, id))
                    .collect(),
            })?;

        debug!(modules = graph.node_count(), stages = stages.len(), "Solved module imports");
        Ok(ModuleImportPlan { graph, stages })
    }
}

/// Validates module ownership and visibility before solving
///
/// Checks, per module: handles belong to this application, exports are owned
/// or imported, bootstrap elements are owned. Then no element may be owned
/// by two modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleElementConsistencyCheck {
    /// Keep going after the first violation
    pub collect_all: bool,
}

impl ModuleElementConsistencyCheck {
    pub fn new(collect_all: bool) -> Self {
        Self { collect_all }
    }

    pub fn check(&self, app: &Application) -> Result<(), ConsistencyError> {
        let mut violations = Violations {
            collect_all: self.collect_all,
            found: Vec::new(),
        };

        'modules: for module in app.modules() {
            let label = || ModuleLabel::of(app, module.id());
            let referenced = module
                .elements()
                .iter()
                .chain(module.exports())
                .chain(module.bootstrap());
            for &element in referenced {
                if !app.contains_element(element)
                    && !violations.record(ConsistencyViolation::UnknownElement {
                        module: label(),
                        element,
                    })
                {
                    break 'modules;
                }
            }
            for &import in module.imports() {
                if !app.contains_module(import)
                    && !violations.record(ConsistencyViolation::UnknownImport {
                        module: label(),
                        import,
                    })
                {
                    break 'modules;
                }
            }

            let mut accessible = module.elements().clone();
            accessible.extend(app.imported_elements(module.id()));
            let inaccessible = difference(app, module.exports(), &accessible);
            if !inaccessible.is_empty()
                && !violations.record(ConsistencyViolation::InaccessibleExports {
                    module: label(),
                    elements: inaccessible,
                })
            {
                break 'modules;
            }

            let not_owned = difference(app, module.bootstrap(), module.elements());
            if !not_owned.is_empty()
                && !violations.record(ConsistencyViolation::BootstrapNotOwned {
                    module: label(),
                    elements: not_owned,
                })
            {
                break 'modules;
            }
        }

        if violations.found.is_empty() || self.collect_all {
            let modules: Vec<_> = app.modules().collect();
            'pairs: for (idx, first) in modules.iter().enumerate() {
                for second in &modules[idx + 1..] {
                    let shared: Vec<ElementLabel> = first
                        .elements()
                        .intersection(second.elements())
                        .map(|&id| ElementLabel::of(app, id))
                        .collect();
                    if !shared.is_empty()
                        && !violations.record(ConsistencyViolation::SharedElements {
                            first: ModuleLabel::of(app, first.id()),
                            second: ModuleLabel::of(app, second.id()),
                            elements: shared,
                        })
                    {
                        break 'pairs;
                    }
                }
            }
        }

        if violations.found.is_empty() {
            Ok(())
        } else {
            Err(ConsistencyError {
                violations: violations.found,
            })
        }
    }
}

struct Violations {
    collect_all: bool,
    found: Vec<ConsistencyViolation>,
}

impl Violations {
    /// Record a violation; returns whether checking should continue
    fn record(&mut self, violation: ConsistencyViolation) -> bool {
        self.found.push(violation);
        self.collect_all
    }
}

fn difference(
    app: &Application,
    subset: &BTreeSet<ElementId>,
    superset: &BTreeSet<ElementId>,
) -> Vec<ElementLabel> {
    subset
        .difference(superset)
        .map(|&id| ElementLabel::of(app, id))
        .collect()
}
