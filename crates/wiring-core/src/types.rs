//! Nominal type descriptors and the compatibility oracle
//!
//! Matching never looks at runtime values: a provider declares a
//! [`TypeSpec`] for what it produces, a dependency declares one for what it
//! accepts, and [`is_compatible`] decides whether the two fit.
//!
//! # Rules
//!
//! - Concrete types: the proposal must be the model class or a subclass of it.
//! - Generic types: origins compare like concrete types, arguments compare
//!   covariantly position by position. Positions present on only one side
//!   are wildcards.
//! - Unions: a union model accepts a proposal that fits *any* member; a
//!   union proposal fits only if *every* member fits.
//! - Aliases are transparent.

use once_cell::sync::Lazy;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A nominal class with explicit base classes
///
/// Identity is pointer identity: two classes created separately are
/// different classes even when they share a name.
#[derive(Clone)]
pub struct Class(Arc<ClassInner>);

struct ClassInner {
    name: String,
    bases: Vec<Class>,
    builtin: bool,
}

impl Class {
    /// Create a user class without explicit bases (implicitly derives `object`)
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_bases(name, Vec::new())
    }

    /// Create a user class deriving from `bases`
    pub fn with_bases(name: impl Into<String>, bases: impl IntoIterator<Item = Class>) -> Self {
        Self(Arc::new(ClassInner {
            name: name.into(),
            bases: bases.into_iter().collect(),
            builtin: false,
        }))
    }

    fn builtin(name: &str, bases: &[&Class]) -> Self {
        Self(Arc::new(ClassInner {
            name: name.to_string(),
            bases: bases.iter().map(|&base| base.clone()).collect(),
            builtin: true,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn bases(&self) -> &[Class] {
        &self.0.bases
    }

    /// Whether this class belongs to the builtin/standard-library set
    pub fn is_builtin(&self) -> bool {
        self.0.builtin
    }

    /// Reflexive, transitive subclass test; every class derives `object`
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        if self == other || *other == builtins().object {
            return true;
        }
        self.bases().iter().any(|base| base.is_subclass_of(other))
    }

    /// Parameterize this class: `List.of([X])` is `List[X]`
    pub fn of(&self, args: impl IntoIterator<Item = TypeSpec>) -> TypeSpec {
        TypeSpec::generic(self.clone(), args)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.name())
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The builtin classes and their hierarchy
pub struct Builtins {
    pub object: Class,
    pub none_type: Class,
    pub str: Class,
    pub int: Class,
    pub float: Class,
    pub bool: Class,
    pub bytes: Class,
    pub iterable: Class,
    pub collection: Class,
    pub sequence: Class,
    pub list: Class,
    pub tuple: Class,
    pub abstract_set: Class,
    pub set: Class,
    pub frozen_set: Class,
    pub mapping: Class,
    pub dict: Class,
}

impl Builtins {
    fn create() -> Self {
        let object = Class::builtin("object", &[]);
        let none_type = Class::builtin("NoneType", &[]);
        let int = Class::builtin("int", &[]);
        let bool = Class::builtin("bool", &[&int]);
        let float = Class::builtin("float", &[]);
        let iterable = Class::builtin("Iterable", &[]);
        let collection = Class::builtin("Collection", &[&iterable]);
        let sequence = Class::builtin("Sequence", &[&collection]);
        let str = Class::builtin("str", &[&sequence]);
        let bytes = Class::builtin("bytes", &[&sequence]);
        let list = Class::builtin("List", &[&sequence]);
        let tuple = Class::builtin("Tuple", &[&sequence]);
        let abstract_set = Class::builtin("AbstractSet", &[&collection]);
        let set = Class::builtin("Set", &[&abstract_set]);
        let frozen_set = Class::builtin("FrozenSet", &[&abstract_set]);
        let mapping = Class::builtin("Mapping", &[&collection]);
        let dict = Class::builtin("Dict", &[&mapping]);
        Self {
            object,
            none_type,
            str,
            int,
            float,
            bool,
            bytes,
            iterable,
            collection,
            sequence,
            list,
            tuple,
            abstract_set,
            set,
            frozen_set,
            mapping,
            dict,
        }
    }

    /// Look a builtin class up by the name used in type expressions
    pub fn by_name(&self, name: &str) -> Option<&Class> {
        let class = match name {
            "object" => &self.object,
            "None" | "NoneType" => &self.none_type,
            "str" => &self.str,
            "int" => &self.int,
            "float" => &self.float,
            "bool" => &self.bool,
            "bytes" => &self.bytes,
            "Iterable" => &self.iterable,
            "Collection" => &self.collection,
            "Sequence" => &self.sequence,
            "List" | "list" => &self.list,
            "Tuple" | "tuple" => &self.tuple,
            "AbstractSet" => &self.abstract_set,
            "Set" | "set" => &self.set,
            "FrozenSet" | "frozenset" => &self.frozen_set,
            "Mapping" => &self.mapping,
            "Dict" | "dict" => &self.dict,
            _ => return None,
        };
        Some(class)
    }
}

static BUILTINS: Lazy<Builtins> = Lazy::new(Builtins::create);

/// Process-wide builtin class registry
pub fn builtins() -> &'static Builtins {
    &BUILTINS
}

/// Declared type of a provided value or an accepted argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    Concrete(Class),
    Generic { origin: Class, args: Vec<TypeSpec> },
    Union(Vec<TypeSpec>),
    Optional(Box<TypeSpec>),
    /// Named alias of another type (a "new type"); transparent for matching
    Alias { name: String, target: Box<TypeSpec> },
}

impl TypeSpec {
    pub fn concrete(class: &Class) -> Self {
        TypeSpec::Concrete(class.clone())
    }

    /// Parameterized type; an empty argument list collapses to the bare class
    pub fn generic(origin: Class, args: impl IntoIterator<Item = TypeSpec>) -> Self {
        let args: Vec<TypeSpec> = args.into_iter().collect();
        if args.is_empty() {
            TypeSpec::Concrete(origin)
        } else {
            TypeSpec::Generic { origin, args }
        }
    }

    /// Union of members; a single member collapses to itself
    pub fn union(members: impl IntoIterator<Item = TypeSpec>) -> Self {
        let mut members: Vec<TypeSpec> = members.into_iter().collect();
        if members.len() == 1 {
            members.remove(0)
        } else {
            TypeSpec::Union(members)
        }
    }

    pub fn optional(inner: TypeSpec) -> Self {
        TypeSpec::Optional(Box::new(inner))
    }

    pub fn alias(name: impl Into<String>, target: TypeSpec) -> Self {
        TypeSpec::Alias {
            name: name.into(),
            target: Box::new(target),
        }
    }

    /// Strip any number of alias layers
    pub fn resolved(&self) -> &TypeSpec {
        match self {
            TypeSpec::Alias { target, .. } => target.resolved(),
            other => other,
        }
    }

    /// Flattened union members, or `None` when the type is not a union
    ///
    /// `Optional[T]` is the union of `T` and `NoneType`.
    fn union_members(&self) -> Option<Vec<&TypeSpec>> {
        match self.resolved() {
            TypeSpec::Union(members) => {
                let mut flat = Vec::new();
                for member in members {
                    flat.extend(flatten_union(member));
                }
                Some(flat)
            }
            TypeSpec::Optional(inner) => {
                let mut flat = flatten_union(inner);
                flat.push(&*NONE_TYPE);
                Some(flat)
            }
            _ => None,
        }
    }

    /// Origin class and arguments of a non-union type
    fn head(&self) -> Option<(&Class, &[TypeSpec])> {
        match self.resolved() {
            TypeSpec::Concrete(class) => Some((class, &[])),
            TypeSpec::Generic { origin, args } => Some((origin, args.as_slice())),
            _ => None,
        }
    }
}

impl From<Class> for TypeSpec {
    fn from(class: Class) -> Self {
        TypeSpec::Concrete(class)
    }
}

impl From<&Class> for TypeSpec {
    fn from(class: &Class) -> Self {
        TypeSpec::Concrete(class.clone())
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[TypeSpec]) -> fmt::Result {
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            TypeSpec::Concrete(class) => write!(f, "{}", class),
            TypeSpec::Generic { origin, args } => {
                write!(f, "{}[", origin)?;
                join(f, args)?;
                f.write_str("]")
            }
            TypeSpec::Union(members) => {
                f.write_str("Union[")?;
                join(f, members)?;
                f.write_str("]")
            }
            TypeSpec::Optional(inner) => write!(f, "Optional[{}]", inner),
            TypeSpec::Alias { name, .. } => f.write_str(name),
        }
    }
}

static NONE_TYPE: Lazy<TypeSpec> = Lazy::new(|| TypeSpec::concrete(&builtins().none_type));

/// Collection produced for an aggregated argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContainerKind {
    #[default]
    List,
    Set,
    FrozenSet,
    Tuple,
}

impl ContainerKind {
    /// Whether the container collapses repeated items
    pub fn is_set(self) -> bool {
        matches!(self, ContainerKind::Set | ContainerKind::FrozenSet)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerKind::List => "list",
            ContainerKind::Set => "set",
            ContainerKind::FrozenSet => "frozenset",
            ContainerKind::Tuple => "tuple",
        };
        f.write_str(name)
    }
}

fn flatten_union(spec: &TypeSpec) -> Vec<&TypeSpec> {
    match spec.union_members() {
        Some(members) => members,
        None => vec![spec.resolved()],
    }
}

/// Whether a value declared as `proposal` may fill a slot declared as `model`
///
/// Absent types are never compatible with anything.
pub fn is_compatible(proposal: Option<&TypeSpec>, model: Option<&TypeSpec>) -> bool {
    match (proposal, model) {
        (Some(proposal), Some(model)) => compatible(proposal, model),
        _ => false,
    }
}

fn compatible(proposal: &TypeSpec, model: &TypeSpec) -> bool {
    match (proposal.union_members(), model.union_members()) {
        (None, Some(models)) => models.iter().any(|m| compatible(proposal, m)),
        (Some(proposals), None) => proposals.iter().all(|p| compatible(p, model)),
        (Some(proposals), Some(models)) => proposals
            .iter()
            .all(|p| models.iter().any(|m| compatible(p, m))),
        (None, None) => {
            let (Some((p_origin, p_args)), Some((m_origin, m_args))) =
                (proposal.head(), model.head())
            else {
                return false;
            };
            // A bare class never matches a parameterized one
            if p_args.is_empty() != m_args.is_empty() {
                return false;
            }
            p_origin.is_subclass_of(m_origin)
                && p_args
                    .iter()
                    .zip(m_args.iter())
                    .all(|(p, m)| compatible(p, m))
        }
    }
}

/// Whether a type is pure plumbing: builtin classes all the way down
///
/// Base types never take part in matching, on either side.
pub fn is_base_type(spec: &TypeSpec) -> bool {
    match spec.resolved() {
        TypeSpec::Concrete(class) => class.is_builtin(),
        TypeSpec::Generic { origin, args } => origin.is_builtin() && args.iter().all(is_base_type),
        TypeSpec::Union(members) => members.iter().all(is_base_type),
        TypeSpec::Optional(inner) => is_base_type(inner),
        TypeSpec::Alias { target, .. } => is_base_type(target),
    }
}

/// Item type of an "iterable of X" type (mappings excluded)
///
/// For a union of iterables the result is the union of their item types.
pub fn aggregated_element_type(spec: &TypeSpec) -> Option<TypeSpec> {
    let b = builtins();
    let mut items: Vec<TypeSpec> = flatten_union(spec)
        .into_iter()
        .filter_map(|member| match member {
            TypeSpec::Generic { origin, args }
                if args.len() == 1
                    && origin.is_subclass_of(&b.iterable)
                    && !origin.is_subclass_of(&b.mapping) =>
            {
                Some(args[0].clone())
            }
            _ => None,
        })
        .collect();

    match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(TypeSpec::Union(items)),
    }
}

/// Container to build for an aggregation type, defaulting to a list
pub fn aggregation_container_kind(spec: &TypeSpec) -> ContainerKind {
    let b = builtins();
    let Some((origin, _)) = unwrap_optional(spec).head() else {
        return ContainerKind::List;
    };
    if origin.is_subclass_of(&b.set) {
        ContainerKind::Set
    } else if origin.is_subclass_of(&b.frozen_set) {
        ContainerKind::FrozenSet
    } else if origin.is_subclass_of(&b.tuple) {
        ContainerKind::Tuple
    } else {
        ContainerKind::List
    }
}

/// `Optional[T]` (or a union with exactly one non-None member) becomes `T`
pub fn unwrap_optional(spec: &TypeSpec) -> &TypeSpec {
    match spec.union_members() {
        Some(members) => {
            let none_type = &builtins().none_type;
            let mut rest = members
                .into_iter()
                .filter(|member| !matches!(member, TypeSpec::Concrete(c) if c == none_type));
            match (rest.next(), rest.next()) {
                (Some(only), None) => unwrap_optional(only),
                _ => spec.resolved(),
            }
        }
        None => spec.resolved(),
    }
}
