//! Application arena: elements, modules and the handles that name them

use crate::element::{Dependency, Element, Value};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_APPLICATION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle of an element inside one [`Application`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId {
    app: u64,
    index: usize,
}

impl ElementId {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Handle of a module inside one [`Application`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId {
    app: u64,
    index: usize,
}

impl ModuleId {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module #{}", self.index)
    }
}

/// A named owner of elements with controlled visibility
#[derive(Debug, Clone)]
pub struct Module {
    id: ModuleId,
    name: Option<String>,
    elements: BTreeSet<ElementId>,
    exports: BTreeSet<ElementId>,
    bootstrap: BTreeSet<ElementId>,
    imports: BTreeSet<ModuleId>,
}

impl Module {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn elements(&self) -> &BTreeSet<ElementId> {
        &self.elements
    }

    pub fn exports(&self) -> &BTreeSet<ElementId> {
        &self.exports
    }

    pub fn bootstrap(&self) -> &BTreeSet<ElementId> {
        &self.bootstrap
    }

    pub fn imports(&self) -> &BTreeSet<ModuleId> {
        &self.imports
    }

    pub fn owns(&self, element: ElementId) -> bool {
        self.elements.contains(&element)
    }

    pub fn add_element(&mut self, element: ElementId) -> &mut Self {
        self.elements.insert(element);
        self
    }

    pub fn add_export(&mut self, element: ElementId) -> &mut Self {
        self.exports.insert(element);
        self
    }

    pub fn add_bootstrap(&mut self, element: ElementId) -> &mut Self {
        self.bootstrap.insert(element);
        self
    }

    pub fn add_import(&mut self, module: ModuleId) -> &mut Self {
        self.imports.insert(module);
        self
    }
}

/// The unit of composition
///
/// Owns every element and module; callers refer to them through
/// [`ElementId`] and [`ModuleId`] handles minted by this application.
/// Handles minted by another application are never resolved here.
///
/// # Example
///
/// ```
/// use wiring_core::{instance, Application, Element};
///
/// let mut app = Application::new();
/// let config = app.add_named_module("config");
/// let cfg = app.add_element(Element::value(instance(String::from("prod")), None));
/// app.module_mut(config).unwrap().add_element(cfg).add_export(cfg);
///
/// assert_eq!(app.module(config).unwrap().exports().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Application {
    id: u64,
    elements: Vec<Element>,
    modules: Vec<Module>,
}

impl Application {
    pub fn new() -> Self {
        Self {
            id: NEXT_APPLICATION_ID.fetch_add(1, Ordering::Relaxed),
            elements: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Register an element in the arena; it still has to be placed in a module
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = ElementId {
            app: self.id,
            index: self.elements.len(),
        };
        self.elements.push(element);
        id
    }

    pub fn add_module(&mut self) -> ModuleId {
        self.push_module(None)
    }

    pub fn add_named_module(&mut self, name: impl Into<String>) -> ModuleId {
        self.push_module(Some(name.into()))
    }

    fn push_module(&mut self, name: Option<String>) -> ModuleId {
        let id = ModuleId {
            app: self.id,
            index: self.modules.len(),
        };
        self.modules.push(Module {
            id,
            name,
            elements: BTreeSet::new(),
            exports: BTreeSet::new(),
            bootstrap: BTreeSet::new(),
            imports: BTreeSet::new(),
        });
        id
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        if id.app != self.id {
            return None;
        }
        self.elements.get(id.index)
    }

    pub fn contains_element(&self, id: ElementId) -> bool {
        self.element(id).is_some()
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        if id.app != self.id {
            return None;
        }
        self.modules.get(id.index)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        if id.app != self.id {
            return None;
        }
        self.modules.get_mut(id.index)
    }

    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.module(id).is_some()
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        let app = self.id;
        self.elements
            .iter()
            .enumerate()
            .map(move |(index, element)| (ElementId { app, index }, element))
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Import `imported` into `module`, optionally re-exporting its exports
    ///
    /// Returns `false` when either handle is unknown.
    pub fn import(&mut self, module: ModuleId, imported: ModuleId, reexport: bool) -> bool {
        let Some(exports) = self.module(imported).map(|m| m.exports.clone()) else {
            return false;
        };
        let Some(target) = self.module_mut(module) else {
            return false;
        };
        target.add_import(imported);
        if reexport {
            target.exports.extend(exports);
        }
        true
    }

    /// Exports of the modules `module` imports directly
    pub fn imported_elements(&self, module: ModuleId) -> BTreeSet<ElementId> {
        let Some(module) = self.module(module) else {
            return BTreeSet::new();
        };
        module
            .imports
            .iter()
            .filter_map(|&imported| self.module(imported))
            .flat_map(|imported| imported.exports.iter().copied())
            .collect()
    }

    /// Transitive closure of `module`'s imports
    pub fn recursive_imports(&self, module: ModuleId) -> BTreeSet<ModuleId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<ModuleId> = self
            .module(module)
            .map(|m| m.imports.iter().copied().collect())
            .unwrap_or_default();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            if let Some(imported) = self.module(next) {
                queue.extend(imported.imports.iter().copied());
            }
        }
        seen
    }

    /// Dependency slots of an element, in declaration order
    pub fn dependencies(&self, id: ElementId) -> Vec<Dependency> {
        let Some(element) = self.element(id) else {
            return Vec::new();
        };
        let label: Option<Arc<str>> = element.label().map(Arc::from);
        element
            .declared_dependencies()
            .iter()
            .map(|declared| Dependency {
                source: id,
                label: label.clone(),
                arg: declared.arg.clone(),
                ty: declared.ty.clone(),
                mandatory: declared.mandatory,
            })
            .collect()
    }

    /// The value an element offers
    pub fn value(&self, id: ElementId) -> Option<Value> {
        self.element(id).map(|element| Value {
            source: id,
            ty: element.result_type().cloned(),
        })
    }

    /// Human-readable name of an element: its label, else its handle
    pub fn element_label(&self, id: ElementId) -> String {
        self.element(id)
            .and_then(Element::label)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    /// Human-readable name of a module: its name, else its handle
    pub fn module_label(&self, id: ModuleId) -> String {
        self.module(id)
            .and_then(Module::name)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    /// Module owning an element, if any
    pub fn owner_of(&self, element: ElementId) -> Option<ModuleId> {
        self.modules.iter().find(|m| m.owns(element)).map(Module::id)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}
