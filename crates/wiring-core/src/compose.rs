//! Composition pipeline: consistency, import order, per-module injection, bootstrap

use crate::app::{Application, ElementId, ModuleId};
use crate::assignment::{Assignment, AssignmentFactorySelector, DirectAssignmentFactorySelector};
use crate::error::{ComposerError, ModuleLabel};
use crate::injection::{InjectionPlan, InjectionProblem, InjectionSolver};
use crate::module::{ModuleElementConsistencyCheck, ModuleImportPlan, ModuleImportSolver};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Tunables of the composer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Report every consistency violation rather than the first
    pub collect_all_violations: bool,
}

/// Injection plan of one module
#[derive(Debug, Clone)]
pub struct ModuleInjectionPlan {
    pub module: ModuleId,
    pub plan: InjectionPlan,
}

/// The bootstrap stages of one module, in stage order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBootstrapStep {
    pub module: ModuleId,
    pub steps: Vec<BTreeSet<ElementId>>,
}

/// A validated application plus everything needed to run it
#[derive(Debug, Clone)]
pub struct ComposedApplication {
    pub application: Arc<Application>,
    pub import_plan: ModuleImportPlan,
    /// One plan per module, in import order
    pub injection_plans: Vec<ModuleInjectionPlan>,
    /// Modules without bootstrap elements are left out
    pub bootstrap_steps: Vec<ModuleBootstrapStep>,
}

impl ComposedApplication {
    /// Every bootstrap stage of every module, in order
    pub fn bootstrap_sequence(&self) -> Vec<BTreeSet<ElementId>> {
        self.bootstrap_steps
            .iter()
            .flat_map(|step| step.steps.iter().cloned())
            .collect()
    }

    pub fn injection_plan(&self, module: ModuleId) -> Option<&InjectionPlan> {
        self.injection_plans
            .iter()
            .find(|plan| plan.module == module)
            .map(|plan| &plan.plan)
    }

    /// All assignments across modules
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.injection_plans
            .iter()
            .flat_map(|plan| plan.plan.assignments.iter())
    }
}

/// Turns an [`Application`] into a [`ComposedApplication`]
///
/// # Example
///
/// ```
/// use wiring_core::{instance, Application, ApplicationComposer, Element};
///
/// let mut app = Application::new();
/// let m = app.add_module();
/// let e = app.add_element(Element::value(instance(1u32), None));
/// app.module_mut(m).unwrap().add_element(e).add_bootstrap(e);
///
/// let composed = ApplicationComposer::default().compose(&app).unwrap();
/// assert_eq!(composed.bootstrap_sequence().len(), 1);
/// ```
#[derive(Clone)]
pub struct ApplicationComposer {
    injection_solver: InjectionSolver,
    import_solver: ModuleImportSolver,
    consistency_check: ModuleElementConsistencyCheck,
}

impl ApplicationComposer {
    pub fn new(selector: Arc<dyn AssignmentFactorySelector>) -> Self {
        Self::with_options(selector, ComposeOptions::default())
    }

    pub fn with_options(
        selector: Arc<dyn AssignmentFactorySelector>,
        options: ComposeOptions,
    ) -> Self {
        Self {
            injection_solver: InjectionSolver::new(selector),
            import_solver: ModuleImportSolver,
            consistency_check: ModuleElementConsistencyCheck::new(options.collect_all_violations),
        }
    }

    pub fn compose(&self, app: &Application) -> Result<ComposedApplication, ComposerError> {
        self.consistency_check.check(app)?;
        let import_plan = self.import_solver.solve(app)?;

        let mut injection_plans = Vec::with_capacity(app.module_count());
        for module in import_plan.ordered() {
            injection_plans.push(self.injection_plan(app, module)?);
        }

        let bootstrap_steps: Vec<ModuleBootstrapStep> = injection_plans
            .iter()
            .filter_map(|plan| bootstrap_step(app, plan))
            .collect();

        debug!(
            modules = injection_plans.len(),
            bootstrap_modules = bootstrap_steps.len(),
            "Composed application"
        );

        Ok(ComposedApplication {
            application: Arc::new(app.clone()),
            import_plan,
            injection_plans,
            bootstrap_steps,
        })
    }

    fn injection_plan(
        &self,
        app: &Application,
        module: ModuleId,
    ) -> Result<ModuleInjectionPlan, ComposerError> {
        let problem = InjectionProblem {
            imports: app.imported_elements(module),
            elements: app
                .module(module)
                .map(|m| m.elements().clone())
                .unwrap_or_default(),
        };
        debug!(module = %app.module_label(module), "Solving module");
        let plan = self
            .injection_solver
            .solve(app, &problem)
            .map_err(|err| ComposerError::in_module(ModuleLabel::of(app, module), err))?;
        Ok(ModuleInjectionPlan { module, plan })
    }
}

impl Default for ApplicationComposer {
    fn default() -> Self {
        Self::new(Arc::new(DirectAssignmentFactorySelector::default()))
    }
}

fn bootstrap_step(app: &Application, plan: &ModuleInjectionPlan) -> Option<ModuleBootstrapStep> {
    let bootstrap = app.module(plan.module)?.bootstrap();
    let steps: Vec<BTreeSet<ElementId>> = plan
        .plan
        .stages
        .iter()
        .map(|stage| stage.intersection(bootstrap).copied().collect::<BTreeSet<_>>())
        .filter(|step| !step.is_empty())
        .collect();
    if steps.is_empty() {
        None
    } else {
        Some(ModuleBootstrapStep {
            module: plan.module,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{instance, Element, FactoryInjector, Strategy};
    use crate::error::{AssignmentError, ConsistencyViolation};
    use crate::types::{Class, TypeSpec};

    fn provider(
        app: &mut Application,
        label: &str,
        needs: &[(&str, &Class)],
        returns: &Class,
    ) -> ElementId {
        let mut injector =
            FactoryInjector::new(|_| Ok(instance(()))).returns(TypeSpec::from(returns));
        for (arg, class) in needs {
            injector = injector.requires(*arg, TypeSpec::from(*class));
        }
        app.add_element(Element::new(injector, Strategy::Singleton).with_label(label))
    }

    #[test]
    fn test_bootstrap_steps_follow_stages() {
        let a_ty = Class::new("A");
        let b_ty = Class::new("B");
        let c_ty = Class::new("C");
        let mut app = Application::new();
        let m = app.add_module();
        let a = provider(&mut app, "a", &[], &a_ty);
        let b = provider(&mut app, "b", &[("a", &a_ty)], &b_ty);
        let c = provider(&mut app, "c", &[("b", &b_ty)], &c_ty);
        app.module_mut(m)
            .unwrap()
            .add_element(a)
            .add_element(b)
            .add_element(c)
            .add_bootstrap(c)
            .add_bootstrap(a);

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        assert_eq!(
            composed.bootstrap_sequence(),
            vec![BTreeSet::from([a]), BTreeSet::from([c])]
        );
        assert_eq!(composed.assignments().count(), 2);
        assert_eq!(composed.injection_plan(m).unwrap().stages.len(), 3);
    }

    #[test]
    fn test_modules_without_bootstrap_are_skipped() {
        let a_ty = Class::new("A");
        let mut app = Application::new();
        let quiet = app.add_module();
        let eager = app.add_module();
        let a = provider(&mut app, "a", &[], &a_ty);
        let b = provider(&mut app, "b", &[], &a_ty);
        app.module_mut(quiet).unwrap().add_element(a);
        app.module_mut(eager).unwrap().add_element(b).add_bootstrap(b);

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        assert_eq!(composed.bootstrap_steps.len(), 1);
        assert_eq!(composed.bootstrap_steps[0].module, eager);
        assert_eq!(composed.injection_plans.len(), 2);
    }

    #[test]
    fn test_errors_name_the_module() {
        let cfg_ty = Class::new("Config");
        let svc_ty = Class::new("Service");
        let mut app = Application::new();
        let system = app.add_named_module("system");
        let svc = provider(&mut app, "svc", &[("cfg", &cfg_ty)], &svc_ty);
        app.module_mut(system).unwrap().add_element(svc);

        match ApplicationComposer::default().compose(&app) {
            Err(ComposerError::ModuleAssignment {
                module,
                dependency,
                source,
            }) => {
                assert_eq!(module.id, system);
                assert_eq!(dependency.arg, "cfg");
                assert!(matches!(source, AssignmentError::Unsatisfied { .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_consistency_runs_before_solving() {
        let a_ty = Class::new("A");
        let mut app = Application::new();
        let first = app.add_module();
        let second = app.add_module();
        let a = provider(&mut app, "a", &[], &a_ty);
        app.module_mut(first).unwrap().add_element(a);
        app.module_mut(second).unwrap().add_element(a);
        app.import(first, second, false);
        app.import(second, first, false);

        let composer = ApplicationComposer::with_options(
            Arc::new(DirectAssignmentFactorySelector::default()),
            ComposeOptions {
                collect_all_violations: true,
            },
        );
        match composer.compose(&app) {
            Err(ComposerError::Consistency(err)) => assert!(matches!(
                err.violations.as_slice(),
                [ConsistencyViolation::SharedElements { .. }]
            )),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_cyclic_import_is_unresolved() {
        let mut app = Application::new();
        let a = app.add_module();
        let b = app.add_module();
        app.import(a, b, false);
        app.import(b, a, false);

        assert!(matches!(
            ApplicationComposer::default().compose(&app),
            Err(ComposerError::UnresolvedImport(_))
        ));
    }

    #[test]
    fn test_composition_does_not_touch_input() {
        let a_ty = Class::new("A");
        let mut app = Application::new();
        let m = app.add_module();
        let a = provider(&mut app, "a", &[], &a_ty);
        app.module_mut(m).unwrap().add_element(a);

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        assert_eq!(composed.application.element_count(), app.element_count());
        assert!(composed.application.contains_element(a));
    }
}
