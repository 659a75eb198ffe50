use crate::app::{Application, ElementId, ModuleId};
use crate::element::{Dependency, InjectError};
use std::fmt;
use thiserror::Error;

pub type WiringResult<T> = Result<T, WiringError>;

#[derive(Error, Debug)]
pub enum WiringError {
    #[error(transparent)]
    Compose(#[from] ComposerError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Report error: {0}")]
    Report(String),
}

/// An element handle with its label, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLabel {
    pub id: ElementId,
    pub label: Option<String>,
}

impl ElementLabel {
    pub fn of(app: &Application, id: ElementId) -> Self {
        Self {
            id,
            label: app.element(id).and_then(|e| e.label()).map(str::to_string),
        }
    }
}

impl fmt::Display for ElementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "'{}'", label),
            None => write!(f, "{}", self.id),
        }
    }
}

/// A module handle with its name, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLabel {
    pub id: ModuleId,
    pub name: Option<String>,
}

impl ModuleLabel {
    pub fn of(app: &Application, id: ModuleId) -> Self {
        Self {
            id,
            name: app.module(id).and_then(|m| m.name()).map(str::to_string),
        }
    }
}

impl fmt::Display for ModuleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "module '{}'", name),
            None => write!(f, "{}", self.id),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure to bind one dependency
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("Unsatisfied dependency {dependency}: no compatible value")]
    Unsatisfied { dependency: Dependency },

    #[error(
        "Ambiguous dependency {dependency}: {} compatible values ({})",
        .candidates.len(),
        join(.candidates)
    )]
    Ambiguous {
        dependency: Dependency,
        candidates: Vec<ElementId>,
    },

    #[error("Dependency {dependency} cannot aggregate: its type is not a collection of items")]
    InvalidAggregationType { dependency: Dependency },
}

impl AssignmentError {
    pub fn dependency(&self) -> &Dependency {
        match self {
            AssignmentError::Unsatisfied { dependency }
            | AssignmentError::Ambiguous { dependency, .. }
            | AssignmentError::InvalidAggregationType { dependency } => dependency,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectionSolverError {
    #[error("Cannot assign {dependency}")]
    Assignment {
        dependency: Dependency,
        #[source]
        source: AssignmentError,
    },

    #[error("Cyclic dependency between {}", join(.elements))]
    CyclicDependency { elements: Vec<ElementLabel> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleImportSolverError {
    #[error("Cyclic import between {}", join(.modules))]
    CyclicImport { modules: Vec<ModuleLabel> },
}

/// One broken module invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// Exports that are neither owned nor imported
    InaccessibleExports {
        module: ModuleLabel,
        elements: Vec<ElementLabel>,
    },
    /// Bootstrap elements the module does not own
    BootstrapNotOwned {
        module: ModuleLabel,
        elements: Vec<ElementLabel>,
    },
    /// Elements owned by two modules at once
    SharedElements {
        first: ModuleLabel,
        second: ModuleLabel,
        elements: Vec<ElementLabel>,
    },
    /// A module refers to an element this application never minted
    UnknownElement { module: ModuleLabel, element: ElementId },
    /// A module imports a module this application never minted
    UnknownImport { module: ModuleLabel, import: ModuleId },
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyViolation::InaccessibleExports { module, elements } => write!(
                f,
                "{} exports elements it neither owns nor imports: {}",
                module,
                join(elements)
            ),
            ConsistencyViolation::BootstrapNotOwned { module, elements } => write!(
                f,
                "{} bootstraps elements it does not own: {}",
                module,
                join(elements)
            ),
            ConsistencyViolation::SharedElements {
                first,
                second,
                elements,
            } => write!(
                f,
                "{} and {} both own: {}",
                first,
                second,
                join(elements)
            ),
            ConsistencyViolation::UnknownElement { module, element } => {
                write!(f, "{} refers to unknown element {}", module, element)
            }
            ConsistencyViolation::UnknownImport { module, import } => {
                write!(f, "{} imports unknown {}", module, import)
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Module element consistency check failed: {}", join(.violations))]
pub struct ConsistencyError {
    pub violations: Vec<ConsistencyViolation>,
}

/// Composition failure, tagged with the module it happened in
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposerError {
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("Unresolved module imports: {0}")]
    UnresolvedImport(#[from] ModuleImportSolverError),

    #[error("Failed to compose {module}: {source}")]
    ModuleAssignment {
        module: ModuleLabel,
        dependency: Dependency,
        #[source]
        source: AssignmentError,
    },

    #[error("Failed to compose {module}: cyclic dependency between {}", join(.elements))]
    ModuleCyclicDependency {
        module: ModuleLabel,
        elements: Vec<ElementLabel>,
    },
}

impl ComposerError {
    /// Attach the failing module to an injection solver error
    pub fn in_module(module: ModuleLabel, error: InjectionSolverError) -> Self {
        match error {
            InjectionSolverError::Assignment { dependency, source } => {
                ComposerError::ModuleAssignment {
                    module,
                    dependency,
                    source,
                }
            }
            InjectionSolverError::CyclicDependency { elements } => {
                ComposerError::ModuleCyclicDependency { module, elements }
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("Element {0} is not part of this application")]
    ElementNotFound(ElementId),

    #[error("Provide state diverged from the composed plan: {0}")]
    State(String),

    #[error("Injector of {element} failed: {source}")]
    Injection {
        element: ElementLabel,
        #[source]
        source: InjectError,
    },

    #[error("Cannot map values for {dependency}: {reason}")]
    Mapping {
        dependency: Dependency,
        reason: String,
    },

    #[error("No element provides type {0}")]
    TypeNotFound(String),
}
