//! YAML wiring manifests
//!
//! A manifest declares classes, modules and the elements they own. Loading
//! it yields an [`Application`] ready for composition plus the aggregation
//! rules it declares. Manifest elements are placeholders: constructing one
//! records its label in a shared [`ConstructionLog`] and produces a
//! [`Constructed`] marker.

pub mod type_parser;

pub use type_parser::{TypeParseError, TypeParser};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use wiring_core::types::{aggregated_element_type, aggregation_container_kind};
use wiring_core::{
    instance, AggregatedTypeCheck, Aggregate, AggregationRegistry, Application, ArgCheck,
    AssignmentFactorySelector, Class, DirectAssignmentFactorySelector, Element, ElementId,
    FactoryInjector, InjectorDependency, ModuleId, Strategy, TypeSpec, WiringError, WiringResult,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub classes: Vec<ClassSpec>,

    #[serde(default)]
    pub modules: Vec<ModuleSpec>,

    /// Application-wide aggregation rules
    #[serde(default)]
    pub aggregation: AggregationSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassSpec {
    pub name: String,

    /// Declared classes (earlier in the list) or builtins
    #[serde(default)]
    pub bases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    pub name: String,

    #[serde(default)]
    pub imports: Vec<ImportSpec>,

    #[serde(default)]
    pub elements: Vec<ElementSpec>,

    /// Aggregation rules for the elements of this module
    #[serde(default)]
    pub aggregation: AggregationSpec,
}

/// `- config` or `- { module: config, reexport: true }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportSpec {
    Name(String),
    Detailed {
        module: String,
        #[serde(default)]
        reexport: bool,
    },
}

impl ImportSpec {
    pub fn module(&self) -> &str {
        match self {
            ImportSpec::Name(module) => module,
            ImportSpec::Detailed { module, .. } => module,
        }
    }

    pub fn reexport(&self) -> bool {
        matches!(self, ImportSpec::Detailed { reexport: true, .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    /// Unique across the manifest
    pub label: String,

    /// Type expression of the provided value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provides: Option<String>,

    #[serde(default)]
    pub args: Vec<ArgSpec>,

    /// "singleton" (default) or "transient"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Constant string value; such elements take no arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    pub export: bool,

    #[serde(default)]
    pub bootstrap: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgSpec {
    pub name: String,

    /// Type expression; untyped arguments never match anything
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    #[serde(default = "default_true")]
    pub mandatory: bool,

    /// Always aggregate this argument
    #[serde(default)]
    pub aggregate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationSpec {
    /// Aggregate dependencies whose item type is one of these
    #[serde(default)]
    pub types: Vec<String>,

    /// Aggregate dependencies on arguments with these names
    #[serde(default)]
    pub args: Vec<String>,
}

impl AggregationSpec {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.args.is_empty()
    }
}

fn default_true() -> bool {
    true
}

/// Value produced by a manifest element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructed {
    pub label: String,
    /// Names of the arguments it received, sorted
    pub args: Vec<String>,
}

/// Labels of manifest elements in construction order
#[derive(Debug, Clone, Default)]
pub struct ConstructionLog(Arc<Mutex<Vec<String>>>);

impl ConstructionLog {
    pub fn record(&self, label: &str) {
        self.0.lock().push(label.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// A manifest turned into an application
pub struct LoadedManifest {
    pub application: Application,
    pub aggregation: AggregationRegistry,
    pub log: ConstructionLog,
    elements: BTreeMap<String, ElementId>,
    modules: BTreeMap<String, ModuleId>,
}

impl std::fmt::Debug for LoadedManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedManifest")
            .field("application", &self.application)
            .field("log", &self.log)
            .field("elements", &self.elements)
            .field("modules", &self.modules)
            .finish_non_exhaustive()
    }
}

impl LoadedManifest {
    pub fn element(&self, label: &str) -> Option<ElementId> {
        self.elements.get(label).copied()
    }

    pub fn module(&self, name: &str) -> Option<ModuleId> {
        self.modules.get(name).copied()
    }

    /// Selector honouring the declared aggregation rules
    pub fn selector(&self) -> Arc<dyn AssignmentFactorySelector> {
        if self.aggregation.is_empty() {
            Arc::new(DirectAssignmentFactorySelector::default())
        } else {
            Arc::new(self.aggregation.build_selector(&self.application))
        }
    }
}

impl Manifest {
    pub fn from_yaml(content: &str) -> WiringResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| WiringError::Manifest(format!("Failed to parse manifest: {}", e)))
    }

    pub fn load(path: &Path) -> WiringResult<Self> {
        if !path.exists() {
            return Err(WiringError::Manifest(format!(
                "Manifest not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Build the application described by this manifest
    pub fn build(&self) -> WiringResult<LoadedManifest> {
        let classes = self.classes()?;
        let parser = TypeParser::new(&classes);
        let parse = |expr: &str, context: &str| {
            parser
                .parse(expr)
                .map_err(|e| WiringError::Manifest(format!("{}: {}", context, e)))
        };

        let mut application = Application::new();
        let mut aggregation = AggregationRegistry::new();
        let log = ConstructionLog::default();
        let mut modules: BTreeMap<String, ModuleId> = BTreeMap::new();
        let mut elements: BTreeMap<String, ElementId> = BTreeMap::new();

        for spec in &self.modules {
            if modules.contains_key(&spec.name) {
                return Err(WiringError::Manifest(format!(
                    "Duplicate module '{}'",
                    spec.name
                )));
            }
            let module = application.add_named_module(spec.name.clone());
            modules.insert(spec.name.clone(), module);

            for element_spec in &spec.elements {
                if elements.contains_key(&element_spec.label) {
                    return Err(WiringError::Manifest(format!(
                        "Duplicate element label '{}'",
                        element_spec.label
                    )));
                }
                let element = self.element(element_spec, &parse, &log)?;
                let id = application.add_element(element);
                elements.insert(element_spec.label.clone(), id);

                let Some(owner) = application.module_mut(module) else {
                    continue;
                };
                owner.add_element(id);
                if element_spec.export {
                    owner.add_export(id);
                }
                if element_spec.bootstrap {
                    owner.add_bootstrap(id);
                }
                for arg in element_spec.args.iter().filter(|arg| arg.aggregate) {
                    aggregation.include_dependency(id, arg.name.clone());
                }
            }

            for ty in &spec.aggregation.types {
                let context = format!("Aggregation rule of module '{}'", spec.name);
                let ty = parse(ty.as_str(), context.as_str())?;
                aggregation.include_module(module, AggregatedTypeCheck(ty));
            }
            for arg in &spec.aggregation.args {
                aggregation.include_module(module, ArgCheck(arg.clone()));
            }
        }

        for ty in &self.aggregation.types {
            let ty = parse(ty.as_str(), "Aggregation rule")?;
            aggregation.include_global(AggregatedTypeCheck(ty));
        }
        for arg in &self.aggregation.args {
            aggregation.include_global(ArgCheck(arg.clone()));
        }

        self.link_imports(&mut application, &modules)?;

        debug!(
            modules = modules.len(),
            elements = elements.len(),
            aggregation = !aggregation.is_empty(),
            "Loaded manifest"
        );

        Ok(LoadedManifest {
            application,
            aggregation,
            log,
            elements,
            modules,
        })
    }

    fn classes(&self) -> WiringResult<HashMap<String, Class>> {
        let mut classes: HashMap<String, Class> = HashMap::new();
        for spec in &self.classes {
            let builtin = wiring_core::builtins().by_name(&spec.name).is_some();
            if builtin || classes.contains_key(&spec.name) {
                return Err(WiringError::Manifest(format!(
                    "Duplicate class '{}'",
                    spec.name
                )));
            }
            let mut bases = Vec::with_capacity(spec.bases.len());
            for base in &spec.bases {
                let class = classes
                    .get(base)
                    .or_else(|| wiring_core::builtins().by_name(base))
                    .cloned()
                    .ok_or_else(|| {
                        WiringError::Manifest(format!(
                            "Class '{}' extends unknown class '{}'",
                            spec.name, base
                        ))
                    })?;
                bases.push(class);
            }
            classes.insert(spec.name.clone(), Class::with_bases(spec.name.clone(), bases));
        }
        Ok(classes)
    }

    fn element<P>(
        &self,
        spec: &ElementSpec,
        parse: &P,
        log: &ConstructionLog,
    ) -> WiringResult<Element>
    where
        P: Fn(&str, &str) -> WiringResult<TypeSpec>,
    {
        let context = format!("Element '{}'", spec.label);
        let strategy = match &spec.strategy {
            Some(name) => Strategy::parse(name).ok_or_else(|| {
                WiringError::Manifest(format!("{}: unknown strategy '{}'", context, name))
            })?,
            None => Strategy::default(),
        };
        let provides = spec
            .provides
            .as_deref()
            .map(|expr| parse(expr, context.as_str()))
            .transpose()?;

        if let Some(value) = &spec.value {
            if !spec.args.is_empty() {
                return Err(WiringError::Manifest(format!(
                    "{}: a value element takes no arguments",
                    context
                )));
            }
            return Ok(Element::value(instance(value.clone()), provides).with_label(&spec.label));
        }

        let placeholder = provides
            .as_ref()
            .filter(|ty| aggregated_element_type(ty).is_some())
            .map(aggregation_container_kind);
        let label = spec.label.clone();
        let recorder = log.clone();
        let mut injector = FactoryInjector::new(move |args| {
            recorder.record(&label);
            if let Some(kind) = placeholder {
                return Ok(instance(Aggregate::empty(kind)));
            }
            let mut received: Vec<String> = args.names().map(str::to_string).collect();
            received.sort();
            Ok(instance(Constructed {
                label: label.clone(),
                args: received,
            }))
        });

        let mut seen = HashSet::new();
        for arg in &spec.args {
            if !seen.insert(arg.name.as_str()) {
                return Err(WiringError::Manifest(format!(
                    "{}: duplicate argument '{}'",
                    context, arg.name
                )));
            }
            let ty = arg
                .ty
                .as_deref()
                .map(|expr| {
                    let context = format!("{} argument '{}'", context, arg.name);
                    parse(expr, context.as_str())
                })
                .transpose()?;
            injector = injector.declare(if arg.mandatory {
                InjectorDependency::mandatory(arg.name.clone(), ty)
            } else {
                InjectorDependency::optional(arg.name.clone(), ty)
            });
        }
        if let Some(ty) = provides {
            injector = injector.returns(ty);
        }

        Ok(Element::new(injector, strategy).with_label(&spec.label))
    }

    /// Imported modules are linked before their importers so re-exports chain
    fn link_imports(
        &self,
        application: &mut Application,
        modules: &BTreeMap<String, ModuleId>,
    ) -> WiringResult<()> {
        let specs: HashMap<&str, &ModuleSpec> =
            self.modules.iter().map(|m| (m.name.as_str(), m)).collect();
        let mut linked: HashSet<&str> = HashSet::new();

        for spec in &self.modules {
            link_module(spec, &specs, modules, application, &mut linked)?;
        }
        Ok(())
    }
}

fn link_module<'m>(
    spec: &'m ModuleSpec,
    specs: &HashMap<&'m str, &'m ModuleSpec>,
    modules: &BTreeMap<String, ModuleId>,
    application: &mut Application,
    linked: &mut HashSet<&'m str>,
) -> WiringResult<()> {
    // Cycles stop here and surface later as a cyclic import
    if !linked.insert(spec.name.as_str()) {
        return Ok(());
    }
    let Some(&module) = modules.get(&spec.name) else {
        return Ok(());
    };

    for import in &spec.imports {
        let imported_spec = specs.get(import.module()).copied().ok_or_else(|| {
            WiringError::Manifest(format!(
                "Module '{}' imports unknown module '{}'",
                spec.name,
                import.module()
            ))
        })?;
        link_module(imported_spec, specs, modules, application, linked)?;
        if let Some(&imported) = modules.get(import.module()) {
            application.import(module, imported, import.reexport());
        }
    }
    Ok(())
}
