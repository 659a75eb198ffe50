//! Binding dependencies to the values that satisfy them

pub mod factories;
pub mod mappers;
pub mod matchers;
pub mod selectors;

pub use factories::{AggregationAssignmentFactory, AssignmentFactory, DirectAssignmentFactory};
pub use mappers::{MappingError, ValuesMapper};
pub use matchers::{Matcher, TypeAggregationMatcher, TypeIterableMatcher, TypeMatcher};
pub use selectors::{
    AggregatedTypeCheck, AggregationRegistry, AggregationSelector, ArgCheck,
    AssignmentFactorySelector, DependencyCheck, DirectAssignmentFactorySelector, FactoryArgCheck,
};

use crate::app::ElementId;
use crate::element::{Dependency, Value};

/// The resolved binding of one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub dependency: Dependency,
    pub mapper: ValuesMapper,
    /// Matched values, in the order the mapper expects them
    pub values: Vec<Value>,
}

impl Assignment {
    /// Source elements of the matched values
    pub fn sources(&self) -> Vec<ElementId> {
        self.values.iter().map(|value| value.source).collect()
    }
}
