//! Candidate filters for one dependency
//!
//! Every matcher first drops plumbing: dependencies and values typed as
//! base types never match, and an element never satisfies itself.

use crate::element::{Dependency, Value};
use crate::types::{aggregated_element_type, is_base_type, is_compatible};
use std::collections::BTreeSet;

pub trait Matcher: Send + Sync {
    /// Candidates from `values` that may fill `dependency`, in handle order
    fn matches(&self, dependency: &Dependency, values: &BTreeSet<Value>) -> Vec<Value>;
}

fn eligible<'v>(
    dependency: &'v Dependency,
    values: &'v BTreeSet<Value>,
) -> impl Iterator<Item = &'v Value> + 'v {
    let skip_all = dependency.ty.as_ref().is_some_and(is_base_type);
    values.iter().filter(move |value| {
        !skip_all
            && !value.ty.as_ref().is_some_and(is_base_type)
            && value.source != dependency.source
    })
}

/// Values whose type fits the dependency's declared type
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeMatcher;

impl Matcher for TypeMatcher {
    fn matches(&self, dependency: &Dependency, values: &BTreeSet<Value>) -> Vec<Value> {
        eligible(dependency, values)
            .filter(|value| is_compatible(value.ty.as_ref(), dependency.ty.as_ref()))
            .cloned()
            .collect()
    }
}

/// Values that are themselves collections of the dependency's item type
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeIterableMatcher;

impl Matcher for TypeIterableMatcher {
    fn matches(&self, dependency: &Dependency, values: &BTreeSet<Value>) -> Vec<Value> {
        let Some(item) = dependency.ty.as_ref().and_then(aggregated_element_type) else {
            return Vec::new();
        };
        eligible(dependency, values)
            .filter(|value| {
                let nested = value.ty.as_ref().and_then(aggregated_element_type);
                is_compatible(nested.as_ref(), Some(&item))
            })
            .cloned()
            .collect()
    }
}

/// Values that are single items of the dependency's item type
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeAggregationMatcher;

impl Matcher for TypeAggregationMatcher {
    fn matches(&self, dependency: &Dependency, values: &BTreeSet<Value>) -> Vec<Value> {
        let Some(item) = dependency.ty.as_ref().and_then(aggregated_element_type) else {
            return Vec::new();
        };
        eligible(dependency, values)
            .filter(|value| is_compatible(value.ty.as_ref(), Some(&item)))
            .cloned()
            .collect()
    }
}
