//! Turning provided source values into one argument value

use crate::element::{instance, Aggregate, Instance};
use crate::types::ContainerKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("expected {expected} value(s), got {got}")]
    Arity { expected: usize, got: usize },

    #[error("value #{0} was marked for flattening but is not a collection")]
    NotACollection(usize),
}

/// How the values of an assignment merge into the argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuesMapper {
    /// Exactly one value, passed through
    Single,
    /// Build a container; flagged values are collections to flatten in
    MixedIterable {
        kind: ContainerKind,
        flatten: Vec<bool>,
    },
}

impl ValuesMapper {
    pub fn map(&self, values: Vec<Instance>) -> Result<Instance, MappingError> {
        match self {
            ValuesMapper::Single => {
                let got = values.len();
                let mut values = values.into_iter();
                match (values.next(), values.next()) {
                    (Some(value), None) => Ok(value),
                    _ => Err(MappingError::Arity { expected: 1, got }),
                }
            }
            ValuesMapper::MixedIterable { kind, flatten } => {
                if values.len() != flatten.len() {
                    return Err(MappingError::Arity {
                        expected: flatten.len(),
                        got: values.len(),
                    });
                }
                let mut items = Vec::with_capacity(values.len());
                for (position, (value, &nested)) in values.into_iter().zip(flatten).enumerate() {
                    if nested {
                        let collection = value
                            .downcast::<Aggregate>()
                            .map_err(|_| MappingError::NotACollection(position))?;
                        items.extend(collection.iter().cloned());
                    } else {
                        items.push(value);
                    }
                }
                Ok(instance(Aggregate::new(*kind, items)))
            }
        }
    }
}
