//! Wiring core: dependency-injection resolution engine
//!
//! Elements (providers) live in modules. Composition binds every declared
//! dependency to the values that satisfy it, orders modules by import and
//! elements by dependency, and derives the bootstrap sequence. A built
//! instance then provides values lazily or eagerly per element strategy.
//!
//! # Example
//!
//! ```
//! use wiring_core::{
//!     build, compose, instance, Application, Class, Element, FactoryInjector, Strategy, TypeSpec,
//! };
//!
//! let config_type = Class::new("Config");
//! let mut app = Application::new();
//! let config = app.add_named_module("config");
//! let system = app.add_named_module("system");
//!
//! let cfg = app.add_element(Element::value(
//!     instance(String::from("prod")),
//!     Some(TypeSpec::from(&config_type)),
//! ));
//! let svc = app.add_element(Element::new(
//!     FactoryInjector::new(|args| {
//!         let cfg = args.require::<String>("cfg")?;
//!         Ok(instance(format!("service for {}", cfg)))
//!     })
//!     .requires("cfg", TypeSpec::from(&config_type)),
//!     Strategy::Singleton,
//! ));
//! app.module_mut(config).unwrap().add_element(cfg).add_export(cfg);
//! app.module_mut(system).unwrap().add_element(svc);
//! app.import(system, config, false);
//!
//! let composed = compose(&app).unwrap();
//! let running = build(&composed).unwrap();
//! let value = running.value_of(svc).unwrap();
//! assert_eq!(value.downcast_ref::<String>().unwrap(), "service for prod");
//! ```

pub mod app;
pub mod assignment;
pub mod compose;
pub mod element;
pub mod error;
pub mod graph;
pub mod injection;
pub mod instance;
pub mod module;
pub mod navigator;
pub mod types;

pub use app::{Application, ElementId, Module, ModuleId};
pub use assignment::{
    AggregatedTypeCheck, AggregationAssignmentFactory, AggregationRegistry, AggregationSelector,
    ArgCheck, Assignment, AssignmentFactory, AssignmentFactorySelector, DependencyCheck,
    DirectAssignmentFactory, DirectAssignmentFactorySelector, FactoryArgCheck, ValuesMapper,
};
pub use compose::{
    ApplicationComposer, ComposeOptions, ComposedApplication, ModuleBootstrapStep,
    ModuleInjectionPlan,
};
pub use element::{
    instance, Aggregate, Arguments, Dependency, Element, FactoryInjector, InjectError, Injector,
    InjectorDependency, Instance, Strategy, Value, ValueInjector,
};
pub use error::{
    AssignmentError, ComposerError, ConsistencyError, ConsistencyViolation, ElementLabel,
    InjectionSolverError, InstanceError, ModuleImportSolverError, ModuleLabel, WiringError,
    WiringResult,
};
pub use graph::{DirectedGraph, GraphCycleError};
pub use injection::{InjectionPlan, InjectionProblem, InjectionSolver};
pub use instance::{
    ApplicationInstance, ApplicationInstanceBuilder, InstanceOptions, InstanceState,
    ProvideContext,
};
pub use module::{ModuleElementConsistencyCheck, ModuleImportPlan, ModuleImportSolver};
pub use navigator::Navigator;
pub use types::{builtins, Class, ContainerKind, TypeSpec};

/// Compose with direct assignment only
pub fn compose(app: &Application) -> Result<ComposedApplication, ComposerError> {
    ApplicationComposer::default().compose(app)
}

/// Build and boot an instance with default options
pub fn build(composed: &ComposedApplication) -> Result<ApplicationInstance, InstanceError> {
    ApplicationInstanceBuilder::new(composed).build()
}
