//! Runtime evaluation of a composed application
//!
//! A [`ProvideContext`] answers "give me the value of element E" by
//! recursively providing the sources of E's assignments. Singletons are
//! memoised per context; transient elements are evaluated on every request.

use crate::app::{Application, ElementId, ModuleId};
use crate::assignment::Assignment;
use crate::compose::ComposedApplication;
use crate::element::{Arguments, Instance, Strategy};
use crate::error::{ElementLabel, InstanceError};
use crate::navigator::Navigator;
use crate::types::TypeSpec;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, trace};

/// Resolved assignments plus the singleton memo of one instance
pub struct ProvideContext {
    app: Arc<Application>,
    assignments: HashMap<ElementId, Vec<Assignment>>,
    bootstrap: Vec<BTreeSet<ElementId>>,
    memo: Mutex<HashMap<ElementId, Arc<OnceCell<Instance>>>>,
}

impl ProvideContext {
    pub fn new(composed: &ComposedApplication) -> Self {
        let app = composed.application.clone();

        let mut assignments: HashMap<ElementId, Vec<Assignment>> = HashMap::new();
        for module in composed.import_plan.ordered() {
            if let Some(module) = app.module(module) {
                for &element in module.elements() {
                    assignments.entry(element).or_default();
                }
            }
        }
        for assignment in composed.assignments() {
            assignments
                .entry(assignment.dependency.source)
                .or_default()
                .push(assignment.clone());
        }

        Self {
            app,
            assignments,
            bootstrap: composed.bootstrap_sequence(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.app
    }

    /// Whether the element belongs to the resolved universe
    pub fn has(&self, element: ElementId) -> bool {
        self.assignments.contains_key(&element)
    }

    /// Value of an element, honouring its strategy
    pub fn provide(&self, element: ElementId) -> Result<Instance, InstanceError> {
        let strategy = self
            .app
            .element(element)
            .map(|e| e.strategy())
            .ok_or_else(|| InstanceError::State(format!("unknown element {}", element)))?;

        match strategy {
            Strategy::Singleton => {
                let cell = self.memo.lock().entry(element).or_default().clone();
                cell.get_or_try_init(|| self.eval(element)).cloned()
            }
            Strategy::Transient => self.eval(element),
        }
    }

    /// Build a fresh value, providing every dependency first
    pub fn eval(&self, element: ElementId) -> Result<Instance, InstanceError> {
        let (Some(assignments), Some(target)) =
            (self.assignments.get(&element), self.app.element(element))
        else {
            return Err(InstanceError::State(format!(
                "element {} has no resolved assignments",
                ElementLabel::of(&self.app, element)
            )));
        };
        trace!(element = %self.app.element_label(element), "Evaluating element");

        let mut args = Arguments::new();
        for assignment in assignments {
            let values = assignment
                .values
                .iter()
                .map(|value| self.provide(value.source))
                .collect::<Result<Vec<_>, _>>()?;
            let value = assignment
                .mapper
                .map(values)
                .map_err(|err| InstanceError::Mapping {
                    dependency: assignment.dependency.clone(),
                    reason: err.to_string(),
                })?;
            args.insert(assignment.dependency.arg.clone(), value);
        }

        target
            .injector()
            .inject(&args)
            .map_err(|source| InstanceError::Injection {
                element: ElementLabel::of(&self.app, element),
                source,
            })
    }

    /// Provide every bootstrap element, stage by stage
    pub fn boot(&self) -> Result<(), InstanceError> {
        for stage in &self.bootstrap {
            for &element in stage {
                self.provide(element)?;
            }
        }
        info!(elements = self.bootstrap_len(), "Booted application");
        Ok(())
    }

    /// Like [`ProvideContext::boot`], constructing each stage's members concurrently
    pub fn boot_parallel(&self) -> Result<(), InstanceError> {
        for stage in &self.bootstrap {
            stage
                .par_iter()
                .try_for_each(|&element| self.provide(element).map(|_| ()))?;
        }
        info!(elements = self.bootstrap_len(), parallel = true, "Booted application");
        Ok(())
    }

    fn bootstrap_len(&self) -> usize {
        self.bootstrap.iter().map(BTreeSet::len).sum()
    }
}

/// Lifecycle of an [`ApplicationInstance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Built without running the bootstrap pass
    Uninitialized,
    /// Bootstrap elements constructed, nothing requested yet
    Booted,
    /// At least one value was requested
    Live,
}

/// How an instance is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceOptions {
    /// Run the bootstrap pass during build
    pub boot: bool,
    /// Construct bootstrap stages concurrently
    pub parallel: bool,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            boot: true,
            parallel: false,
        }
    }
}

/// A running application
pub struct ApplicationInstance {
    context: ProvideContext,
    navigator: Navigator,
    options: InstanceOptions,
    state: Mutex<InstanceState>,
}

impl ApplicationInstance {
    pub fn state(&self) -> InstanceState {
        *self.state.lock()
    }

    /// Run the bootstrap pass; repeated calls reuse memoised singletons
    pub fn boot(&self) -> Result<(), InstanceError> {
        if self.options.parallel {
            self.context.boot_parallel()?;
        } else {
            self.context.boot()?;
        }
        let mut state = self.state.lock();
        if *state == InstanceState::Uninitialized {
            *state = InstanceState::Booted;
        }
        Ok(())
    }

    pub fn value_of(&self, element: ElementId) -> Result<Instance, InstanceError> {
        if !self.context.has(element) {
            return Err(InstanceError::ElementNotFound(element));
        }
        let value = self.context.provide(element)?;
        *self.state.lock() = InstanceState::Live;
        Ok(value)
    }

    /// Values of every element providing `ty`
    pub fn values_by_type(
        &self,
        ty: &TypeSpec,
        module: Option<ModuleId>,
        strict: bool,
    ) -> Result<Vec<Instance>, InstanceError> {
        self.navigator
            .by_type(ty, module, strict)?
            .into_iter()
            .map(|element| self.value_of(element))
            .collect()
    }

    pub fn context(&self) -> &ProvideContext {
        &self.context
    }
}

/// Builds an [`ApplicationInstance`] from a composed application
pub struct ApplicationInstanceBuilder<'a> {
    composed: &'a ComposedApplication,
    options: InstanceOptions,
}

impl<'a> ApplicationInstanceBuilder<'a> {
    pub fn new(composed: &'a ComposedApplication) -> Self {
        Self {
            composed,
            options: InstanceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InstanceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<ApplicationInstance, InstanceError> {
        let context = ProvideContext::new(self.composed);
        let instance = ApplicationInstance {
            navigator: Navigator::new(context.application().clone()),
            context,
            options: self.options,
            state: Mutex::new(InstanceState::Uninitialized),
        };
        if self.options.boot {
            instance.boot()?;
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ApplicationComposer;
    use crate::element::{instance, Element, FactoryInjector, InjectError, MockInjector};
    use crate::types::Class;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(counter: Arc<AtomicUsize>) -> FactoryInjector {
        FactoryInjector::new(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(instance(n))
        })
    }

    fn mocked_singleton(calls: usize) -> Element {
        let mut mock = MockInjector::new();
        mock.expect_dependencies().returning(Vec::new);
        mock.expect_result().returning(|| None);
        mock.expect_inject()
            .times(calls)
            .returning(|_| Ok(instance(String::from("booted"))));
        Element::new(mock, Strategy::Singleton)
    }

    #[test]
    fn test_singleton_is_built_once() {
        let mut app = Application::new();
        let m = app.add_module();
        let e = app.add_element(mocked_singleton(1));
        app.module_mut(m).unwrap().add_element(e).add_bootstrap(e);

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        let instance = ApplicationInstanceBuilder::new(&composed).build().unwrap();
        assert_eq!(instance.state(), InstanceState::Booted);

        let first = instance.value_of(e).unwrap();
        let second = instance.value_of(e).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(instance.state(), InstanceState::Live);
    }

    #[test]
    fn test_parallel_boot_builds_singletons_once() {
        let mut app = Application::new();
        let m = app.add_module();
        let mut elements = Vec::new();
        for _ in 0..8 {
            let e = app.add_element(mocked_singleton(1));
            app.module_mut(m).unwrap().add_element(e).add_bootstrap(e);
            elements.push(e);
        }

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        let instance = ApplicationInstanceBuilder::new(&composed)
            .with_options(InstanceOptions {
                boot: true,
                parallel: true,
            })
            .build()
            .unwrap();
        for e in elements {
            instance.value_of(e).unwrap();
        }
    }

    #[test]
    fn test_transient_is_rebuilt_but_shares_singletons() {
        let dep_ty = Class::new("Dep");
        let singleton_calls = Arc::new(AtomicUsize::new(0));
        let transient_calls = Arc::new(AtomicUsize::new(0));

        let mut app = Application::new();
        let m = app.add_module();
        let dep = app.add_element(Element::new(
            counted(singleton_calls.clone()).returns(TypeSpec::from(&dep_ty)),
            Strategy::Singleton,
        ));
        let fresh = app.add_element(Element::new(
            counted(transient_calls.clone()).requires("dep", TypeSpec::from(&dep_ty)),
            Strategy::Transient,
        ));
        app.module_mut(m).unwrap().add_element(dep).add_element(fresh);

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        let instance = ApplicationInstanceBuilder::new(&composed).build().unwrap();

        let first = instance.value_of(fresh).unwrap();
        let second = instance.value_of(fresh).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(transient_calls.load(Ordering::SeqCst), 2);
        assert_eq!(singleton_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_build_stays_uninitialized() {
        let mut app = Application::new();
        let m = app.add_module();
        let e = app.add_element(mocked_singleton(0));
        app.module_mut(m).unwrap().add_element(e).add_bootstrap(e);

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        let instance = ApplicationInstanceBuilder::new(&composed)
            .with_options(InstanceOptions {
                boot: false,
                parallel: false,
            })
            .build()
            .unwrap();
        assert_eq!(instance.state(), InstanceState::Uninitialized);
    }

    #[test]
    fn test_unknown_elements() {
        let mut app = Application::new();
        let m = app.add_module();
        let owned = app.add_element(Element::value(instance(1u8), None));
        let orphan = app.add_element(Element::value(instance(2u8), None));
        app.module_mut(m).unwrap().add_element(owned);

        let mut other = Application::new();
        let foreign = other.add_element(Element::value(instance(3u8), None));

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        let instance = ApplicationInstanceBuilder::new(&composed).build().unwrap();

        assert!(instance.value_of(owned).is_ok());
        assert_eq!(
            instance.value_of(orphan).unwrap_err(),
            InstanceError::ElementNotFound(orphan)
        );
        assert_eq!(
            instance.value_of(foreign).unwrap_err(),
            InstanceError::ElementNotFound(foreign)
        );
        assert!(matches!(
            instance.context().eval(orphan),
            Err(InstanceError::State(_))
        ));
    }

    #[test]
    fn test_injector_failure_is_reported() {
        let mut app = Application::new();
        let m = app.add_module();
        let broken = app.add_element(
            Element::new(
                FactoryInjector::new(|_| Err(InjectError::Failed("boom".to_string()))),
                Strategy::Singleton,
            )
            .with_label("broken"),
        );
        app.module_mut(m).unwrap().add_element(broken).add_bootstrap(broken);

        let composed = ApplicationComposer::default().compose(&app).unwrap();
        let err = ApplicationInstanceBuilder::new(&composed)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Injector of 'broken' failed: Injection failed: boom");
    }
}
