//! Providers, their declarations, and the runtime objects they exchange

use crate::app::ElementId;
use crate::types::{ContainerKind, TypeSpec};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// A provided runtime object
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wrap a value as an [`Instance`]
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value)
}

/// Errors an injector may report while producing its value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectError {
    #[error("Missing argument '{0}'")]
    MissingArgument(String),

    #[error("Argument '{arg}' is not a {expected}")]
    WrongType { arg: String, expected: &'static str },

    #[error("Injection failed: {0}")]
    Failed(String),
}

/// One argument an injector asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectorDependency {
    pub arg: String,
    pub ty: Option<TypeSpec>,
    pub mandatory: bool,
}

impl InjectorDependency {
    pub fn mandatory(arg: impl Into<String>, ty: Option<TypeSpec>) -> Self {
        Self {
            arg: arg.into(),
            ty,
            mandatory: true,
        }
    }

    pub fn optional(arg: impl Into<String>, ty: Option<TypeSpec>) -> Self {
        Self {
            arg: arg.into(),
            ty,
            mandatory: false,
        }
    }
}

/// Keyword arguments handed to [`Injector::inject`]
///
/// Optional dependencies that found no provider are simply absent.
#[derive(Clone, Default)]
pub struct Arguments {
    values: BTreeMap<String, Instance>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, arg: impl Into<String>, value: Instance) {
        self.values.insert(arg.into(), value);
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.values.contains_key(arg)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The untyped argument value
    pub fn raw(&self, arg: &str) -> Option<&Instance> {
        self.values.get(arg)
    }

    /// The argument downcast to `T`; `None` if absent or of another type
    pub fn get<T: Any + Send + Sync>(&self, arg: &str) -> Option<Arc<T>> {
        self.values.get(arg).cloned()?.downcast::<T>().ok()
    }

    /// Like [`Arguments::get`] but reporting why the argument is unusable
    pub fn require<T: Any + Send + Sync>(&self, arg: &str) -> Result<Arc<T>, InjectError> {
        let value = self
            .values
            .get(arg)
            .cloned()
            .ok_or_else(|| InjectError::MissingArgument(arg.to_string()))?;
        value.downcast::<T>().map_err(|_| InjectError::WrongType {
            arg: arg.to_string(),
            expected: type_name::<T>(),
        })
    }

    /// An aggregated argument
    pub fn aggregate(&self, arg: &str) -> Result<Arc<Aggregate>, InjectError> {
        self.require::<Aggregate>(arg)
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Collection built for an aggregated argument
///
/// Set kinds keep the first occurrence of each instance (by identity).
#[derive(Clone)]
pub struct Aggregate {
    kind: ContainerKind,
    items: Vec<Instance>,
}

impl Aggregate {
    pub fn new(kind: ContainerKind, items: impl IntoIterator<Item = Instance>) -> Self {
        let mut collected: Vec<Instance> = Vec::new();
        for item in items {
            if kind.is_set() && collected.iter().any(|seen| Arc::ptr_eq(seen, &item)) {
                continue;
            }
            collected.push(item);
        }
        Self {
            kind,
            items: collected,
        }
    }

    pub fn empty(kind: ContainerKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Instance] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.items.iter()
    }

    /// Items of type `T`, skipping anything else
    pub fn downcast<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.items
            .iter()
            .filter_map(|item| item.clone().downcast::<T>().ok())
            .collect()
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(<{} item(s)>)", self.kind, self.items.len())
    }
}

/// Describes and performs the construction of one provided value
#[cfg_attr(test, mockall::automock)]
pub trait Injector: Send + Sync {
    /// Arguments this injector needs, in declaration order
    fn dependencies(&self) -> Vec<InjectorDependency> {
        Vec::new()
    }

    /// Declared type of the produced value
    fn result(&self) -> Option<TypeSpec> {
        None
    }

    /// Produce the value from resolved keyword arguments
    fn inject(&self, args: &Arguments) -> Result<Instance, InjectError>;
}

type FactoryFn = dyn Fn(&Arguments) -> Result<Instance, InjectError> + Send + Sync;

/// Injector backed by a closure with explicitly declared arguments
///
/// # Example
///
/// ```
/// use wiring_core::{instance, FactoryInjector, TypeSpec, Class};
///
/// let config = Class::new("Config");
/// let service = Class::new("Service");
///
/// let injector = FactoryInjector::new(|args| {
///     let _config = args.require::<String>("config")?;
///     Ok(instance(42u32))
/// })
/// .requires("config", TypeSpec::from(&config))
/// .returns(TypeSpec::from(&service));
/// ```
#[derive(Clone)]
pub struct FactoryInjector {
    factory: Arc<FactoryFn>,
    dependencies: Vec<InjectorDependency>,
    result: Option<TypeSpec>,
}

impl FactoryInjector {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Instance, InjectError> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            dependencies: Vec::new(),
            result: None,
        }
    }

    /// Declare a mandatory argument
    pub fn requires(self, arg: impl Into<String>, ty: TypeSpec) -> Self {
        self.declare(InjectorDependency::mandatory(arg, Some(ty)))
    }

    /// Declare an optional argument
    pub fn accepts(self, arg: impl Into<String>, ty: TypeSpec) -> Self {
        self.declare(InjectorDependency::optional(arg, Some(ty)))
    }

    /// Declare an argument as-is, typed or not
    pub fn declare(mut self, dependency: InjectorDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Declare the produced type
    pub fn returns(mut self, ty: TypeSpec) -> Self {
        self.result = Some(ty);
        self
    }
}

impl Injector for FactoryInjector {
    fn dependencies(&self) -> Vec<InjectorDependency> {
        self.dependencies.clone()
    }

    fn result(&self) -> Option<TypeSpec> {
        self.result.clone()
    }

    fn inject(&self, args: &Arguments) -> Result<Instance, InjectError> {
        (self.factory)(args)
    }
}

/// Injector for a constant, already-built value
#[derive(Clone)]
pub struct ValueInjector {
    value: Instance,
    ty: Option<TypeSpec>,
}

impl ValueInjector {
    pub fn new(value: Instance, ty: Option<TypeSpec>) -> Self {
        Self { value, ty }
    }
}

impl Injector for ValueInjector {
    fn result(&self) -> Option<TypeSpec> {
        self.ty.clone()
    }

    fn inject(&self, _args: &Arguments) -> Result<Instance, InjectError> {
        Ok(self.value.clone())
    }
}

/// How provided values are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// One value per application instance, built on first request
    #[default]
    Singleton,
    /// A fresh value on every request
    Transient,
}

impl Strategy {
    /// Parse a strategy name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "singleton" => Some(Strategy::Singleton),
            "transient" | "local" | "non-singleton" => Some(Strategy::Transient),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Singleton => f.write_str("singleton"),
            Strategy::Transient => f.write_str("transient"),
        }
    }
}

/// A provider node
///
/// The injector's declaration is read once, at construction.
#[derive(Clone)]
pub struct Element {
    injector: Arc<dyn Injector>,
    strategy: Strategy,
    label: Option<String>,
    declared: Vec<InjectorDependency>,
    result: Option<TypeSpec>,
}

impl Element {
    pub fn new(injector: impl Injector + 'static, strategy: Strategy) -> Self {
        Self::from_arc(Arc::new(injector), strategy)
    }

    pub fn from_arc(injector: Arc<dyn Injector>, strategy: Strategy) -> Self {
        let declared = injector.dependencies();
        let result = injector.result();
        Self {
            injector,
            strategy,
            label: None,
            declared,
            result,
        }
    }

    /// Singleton element for a constant value
    pub fn value(value: Instance, ty: Option<TypeSpec>) -> Self {
        Self::new(ValueInjector::new(value, ty), Strategy::Singleton)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn injector(&self) -> &dyn Injector {
        self.injector.as_ref()
    }

    pub fn declared_dependencies(&self) -> &[InjectorDependency] {
        &self.declared
    }

    pub fn result_type(&self) -> Option<&TypeSpec> {
        self.result.as_ref()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("label", &self.label)
            .field("strategy", &self.strategy)
            .field("result", &self.result)
            .finish()
    }
}

/// One named argument slot of one element
///
/// Equality and hashing use `(source, arg)` only.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub source: ElementId,
    /// Label of the source element, kept for error messages
    pub label: Option<Arc<str>>,
    pub arg: String,
    pub ty: Option<TypeSpec>,
    pub mandatory: bool,
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.arg == other.arg
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.arg.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "'{}'", label)?,
            None => write!(f, "{}", self.source)?,
        }
        write!(f, " argument '{}'", self.arg)?;
        if let Some(ty) = &self.ty {
            write!(f, ": {}", ty)?;
        }
        Ok(())
    }
}

/// The capability an element offers
///
/// Equality, ordering and hashing use the source element only.
#[derive(Debug, Clone)]
pub struct Value {
    pub source: ElementId,
    pub ty: Option<TypeSpec>,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.source.cmp(&other.source)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}
