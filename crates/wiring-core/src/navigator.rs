//! Element lookup by provided type

use crate::app::{Application, ElementId, ModuleId};
use crate::error::InstanceError;
use crate::types::{is_base_type, is_compatible, TypeSpec};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct Navigator {
    app: Arc<Application>,
}

impl Navigator {
    pub fn new(app: Arc<Application>) -> Self {
        Self { app }
    }

    /// Elements providing `ty`, optionally limited to one module's own elements
    ///
    /// Strict lookup wants the declared result type to be exactly `ty`;
    /// otherwise any subtype qualifies, as long as `ty` is not a base type.
    pub fn by_type(
        &self,
        ty: &TypeSpec,
        module: Option<ModuleId>,
        strict: bool,
    ) -> Result<Vec<ElementId>, InstanceError> {
        let candidates: BTreeSet<ElementId> = match module {
            Some(module) => self
                .app
                .module(module)
                .map(|m| m.elements().clone())
                .unwrap_or_default(),
            None => self
                .app
                .modules()
                .flat_map(|m| m.elements().iter().copied())
                .collect(),
        };

        let found: Vec<ElementId> = candidates
            .into_iter()
            .filter(|&id| {
                let Some(provided) = self.app.element(id).and_then(|e| e.result_type()) else {
                    return false;
                };
                if strict {
                    provided == ty
                } else {
                    !is_base_type(ty) && is_compatible(Some(provided), Some(ty))
                }
            })
            .collect();

        if found.is_empty() {
            return Err(InstanceError::TypeNotFound(ty.to_string()));
        }
        Ok(found)
    }
}
