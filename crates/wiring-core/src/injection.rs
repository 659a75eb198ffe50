//! Per-module dependency solving
//!
//! Binds every dependency of the module's own elements against the pool of
//! owned and imported values, then stages the resulting element graph.

use crate::app::{Application, ElementId};
use crate::assignment::{Assignment, AssignmentFactorySelector, DirectAssignmentFactorySelector};
use crate::error::{ElementLabel, InjectionSolverError};
use crate::element::Value;
use crate::graph::DirectedGraph;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Elements to solve and the imported elements they may draw from
#[derive(Debug, Clone, Default)]
pub struct InjectionProblem {
    pub imports: BTreeSet<ElementId>,
    pub elements: BTreeSet<ElementId>,
}

/// Assignments of one module plus the staged element graph
#[derive(Debug, Clone)]
pub struct InjectionPlan {
    pub assignments: Vec<Assignment>,
    /// Edge `a -> b`: `a` has a dependency assigned to `b`
    pub graph: DirectedGraph<ElementId>,
    pub stages: Vec<BTreeSet<ElementId>>,
}

impl InjectionPlan {
    /// Stage index of an element, if it is part of the plan
    pub fn stage_of(&self, element: ElementId) -> Option<usize> {
        self.stages.iter().position(|stage| stage.contains(&element))
    }

    /// Assignments made for one element's dependencies
    pub fn assignments_of(&self, element: ElementId) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(move |assignment| assignment.dependency.source == element)
    }
}

#[derive(Clone)]
pub struct InjectionSolver {
    selector: Arc<dyn AssignmentFactorySelector>,
}

impl InjectionSolver {
    pub fn new(selector: Arc<dyn AssignmentFactorySelector>) -> Self {
        Self { selector }
    }

    pub fn solve(
        &self,
        app: &Application,
        problem: &InjectionProblem,
    ) -> Result<InjectionPlan, InjectionSolverError> {
        let assignments = self.assign(app, problem)?;

        let mut graph = DirectedGraph::new();
        for &element in problem.imports.iter().chain(problem.elements.iter()) {
            graph.add_node(element);
        }
        for assignment in &assignments {
            for value in &assignment.values {
                graph.add_edge(assignment.dependency.source, value.source);
            }
        }

        let stages = graph
            .topological_stages()
            .map_err(|err| InjectionSolverError::CyclicDependency {
                elements: err
                    .remaining
                    .into_iter()
                    .map(|id| ElementLabel::of(app, id))
                    .collect(),
            })?;

        debug!(
            elements = problem.elements.len(),
            imports = problem.imports.len(),
            assignments = assignments.len(),
            stages = stages.len(),
            "Solved injection problem"
        );

        Ok(InjectionPlan {
            assignments,
            graph,
            stages,
        })
    }

    fn assign(
        &self,
        app: &Application,
        problem: &InjectionProblem,
    ) -> Result<Vec<Assignment>, InjectionSolverError> {
        let values: BTreeSet<Value> = problem
            .imports
            .iter()
            .chain(problem.elements.iter())
            .filter_map(|&id| app.value(id))
            .collect();

        let mut assignments = Vec::new();
        for &element in &problem.elements {
            let Some(owner) = app.value(element) else {
                continue;
            };
            for dependency in app.dependencies(element) {
                let factory = self.selector.select(&dependency, &owner);
                match factory.assign(&dependency, &values) {
                    Ok(Some(assignment)) => assignments.push(assignment),
                    Ok(None) => {}
                    Err(source) => {
                        return Err(InjectionSolverError::Assignment { dependency, source })
                    }
                }
            }
        }
        Ok(assignments)
    }
}

impl Default for InjectionSolver {
    fn default() -> Self {
        Self::new(Arc::new(DirectAssignmentFactorySelector::default()))
    }
}
