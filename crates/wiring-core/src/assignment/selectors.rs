//! Policies choosing a factory per dependency

use super::factories::{AggregationAssignmentFactory, AssignmentFactory, DirectAssignmentFactory};
use crate::app::{Application, ElementId, ModuleId};
use crate::element::{Dependency, Value};
use crate::types::{aggregated_element_type, is_compatible, TypeSpec};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Picks the assignment factory for a dependency
///
/// `owner` is the value of the element the dependency belongs to.
pub trait AssignmentFactorySelector: Send + Sync {
    fn select(&self, dependency: &Dependency, owner: &Value) -> &dyn AssignmentFactory;
}

/// Always direct assignment
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectAssignmentFactorySelector {
    factory: DirectAssignmentFactory,
}

impl AssignmentFactorySelector for DirectAssignmentFactorySelector {
    fn select(&self, _dependency: &Dependency, _owner: &Value) -> &dyn AssignmentFactory {
        &self.factory
    }
}

/// Predicate routing a dependency to aggregation
pub trait DependencyCheck: Send + Sync {
    fn check(&self, dependency: &Dependency, owner: &Value) -> bool;
}

impl<F> DependencyCheck for F
where
    F: Fn(&Dependency, &Value) -> bool + Send + Sync,
{
    fn check(&self, dependency: &Dependency, owner: &Value) -> bool {
        self(dependency, owner)
    }
}

/// Matches by argument name
#[derive(Debug, Clone)]
pub struct ArgCheck(pub String);

impl DependencyCheck for ArgCheck {
    fn check(&self, dependency: &Dependency, _owner: &Value) -> bool {
        dependency.arg == self.0
    }
}

/// Matches an argument name on elements producing a given type
#[derive(Debug, Clone)]
pub struct FactoryArgCheck {
    pub result: TypeSpec,
    pub arg: String,
}

impl DependencyCheck for FactoryArgCheck {
    fn check(&self, dependency: &Dependency, owner: &Value) -> bool {
        dependency.arg == self.arg && is_compatible(owner.ty.as_ref(), Some(&self.result))
    }
}

/// Matches collection dependencies whose item type fits
#[derive(Debug, Clone)]
pub struct AggregatedTypeCheck(pub TypeSpec);

impl DependencyCheck for AggregatedTypeCheck {
    fn check(&self, dependency: &Dependency, _owner: &Value) -> bool {
        let item = dependency.ty.as_ref().and_then(aggregated_element_type);
        is_compatible(item.as_ref(), Some(&self.0))
    }
}

type SharedCheck = Arc<dyn DependencyCheck>;

/// Routes to aggregation by explicit dependency, then element rules, then global rules
pub struct AggregationSelector {
    direct: DirectAssignmentFactory,
    aggregation: AggregationAssignmentFactory,
    dependencies: HashSet<(ElementId, String)>,
    elements: HashMap<ElementId, Vec<SharedCheck>>,
    globals: Vec<SharedCheck>,
}

impl AggregationSelector {
    fn aggregates(&self, dependency: &Dependency, owner: &Value) -> bool {
        if self
            .dependencies
            .contains(&(dependency.source, dependency.arg.clone()))
        {
            return true;
        }
        let element_checks = self.elements.get(&dependency.source).into_iter().flatten();
        element_checks
            .chain(self.globals.iter())
            .any(|check| check.check(dependency, owner))
    }
}

impl AssignmentFactorySelector for AggregationSelector {
    fn select(&self, dependency: &Dependency, owner: &Value) -> &dyn AssignmentFactory {
        if self.aggregates(dependency, owner) {
            &self.aggregation
        } else {
            &self.direct
        }
    }
}

/// Collects aggregation rules at every scope
///
/// # Example
///
/// ```
/// use wiring_core::{AggregationRegistry, ArgCheck, Application};
///
/// let app = Application::new();
/// let mut registry = AggregationRegistry::new();
/// registry.include_global(ArgCheck("plugins".to_string()));
/// let _selector = registry.build_selector(&app);
/// ```
#[derive(Default, Clone)]
pub struct AggregationRegistry {
    globals: Vec<SharedCheck>,
    modules: Vec<(ModuleId, SharedCheck)>,
    elements: Vec<(ElementId, SharedCheck)>,
    dependencies: HashSet<(ElementId, String)>,
}

impl AggregationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule for every dependency in the application
    pub fn include_global(&mut self, check: impl DependencyCheck + 'static) -> &mut Self {
        self.globals.push(Arc::new(check));
        self
    }

    /// Rule for dependencies of elements owned by `module`
    pub fn include_module(
        &mut self,
        module: ModuleId,
        check: impl DependencyCheck + 'static,
    ) -> &mut Self {
        self.modules.push((module, Arc::new(check)));
        self
    }

    /// Rule for the dependencies of one element
    pub fn include_element(
        &mut self,
        element: ElementId,
        check: impl DependencyCheck + 'static,
    ) -> &mut Self {
        self.elements.push((element, Arc::new(check)));
        self
    }

    /// Always aggregate this argument of this element
    pub fn include_dependency(&mut self, element: ElementId, arg: impl Into<String>) -> &mut Self {
        self.dependencies.insert((element, arg.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
            && self.modules.is_empty()
            && self.elements.is_empty()
            && self.dependencies.is_empty()
    }

    /// Freeze the rules; module rules expand to the elements owned right now
    pub fn build_selector(&self, app: &Application) -> AggregationSelector {
        let mut elements: HashMap<ElementId, Vec<SharedCheck>> = HashMap::new();
        for (element, check) in &self.elements {
            elements.entry(*element).or_default().push(check.clone());
        }
        for (module, check) in &self.modules {
            let Some(module) = app.module(*module) else {
                continue;
            };
            for element in module.elements() {
                elements.entry(*element).or_default().push(check.clone());
            }
        }
        AggregationSelector {
            direct: DirectAssignmentFactory::default(),
            aggregation: AggregationAssignmentFactory::default(),
            dependencies: self.dependencies.clone(),
            elements,
            globals: self.globals.clone(),
        }
    }
}
