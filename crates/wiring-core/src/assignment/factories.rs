use super::matchers::{Matcher, TypeAggregationMatcher, TypeIterableMatcher, TypeMatcher};
use super::mappers::ValuesMapper;
use super::Assignment;
use crate::element::{Dependency, Value};
use crate::error::AssignmentError;
use crate::types::{aggregated_element_type, aggregation_container_kind};
use std::collections::BTreeSet;

/// Binds one dependency to values from a candidate pool
pub trait AssignmentFactory: Send + Sync {
    /// `Ok(None)` means the dependency is optional and stays unfilled
    fn assign(
        &self,
        dependency: &Dependency,
        values: &BTreeSet<Value>,
    ) -> Result<Option<Assignment>, AssignmentError>;
}

/// Exactly one compatible value, or an error
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectAssignmentFactory {
    matcher: TypeMatcher,
}

impl AssignmentFactory for DirectAssignmentFactory {
    fn assign(
        &self,
        dependency: &Dependency,
        values: &BTreeSet<Value>,
    ) -> Result<Option<Assignment>, AssignmentError> {
        let matched = self.matcher.matches(dependency, values);
        match matched.len() {
            0 if dependency.mandatory => Err(AssignmentError::Unsatisfied {
                dependency: dependency.clone(),
            }),
            0 => Ok(None),
            1 => Ok(Some(Assignment {
                dependency: dependency.clone(),
                mapper: ValuesMapper::Single,
                values: matched,
            })),
            _ => Err(AssignmentError::Ambiguous {
                dependency: dependency.clone(),
                candidates: matched.iter().map(|value| value.source).collect(),
            }),
        }
    }
}

/// Every compatible item plus every compatible collection, merged into one container
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregationAssignmentFactory {
    iterable: TypeIterableMatcher,
    aggregation: TypeAggregationMatcher,
}

impl AssignmentFactory for AggregationAssignmentFactory {
    fn assign(
        &self,
        dependency: &Dependency,
        values: &BTreeSet<Value>,
    ) -> Result<Option<Assignment>, AssignmentError> {
        let Some(ty) = dependency
            .ty
            .as_ref()
            .filter(|ty| aggregated_element_type(ty).is_some())
        else {
            return Err(AssignmentError::InvalidAggregationType {
                dependency: dependency.clone(),
            });
        };

        let nested = self.iterable.matches(dependency, values);
        let single = self.aggregation.matches(dependency, values);

        let mut flatten = vec![true; nested.len()];
        flatten.resize(nested.len() + single.len(), false);

        let mut matched = nested;
        matched.extend(single);

        Ok(Some(Assignment {
            dependency: dependency.clone(),
            mapper: ValuesMapper::MixedIterable {
                kind: aggregation_container_kind(ty),
                flatten,
            },
            values: matched,
        }))
    }
}
