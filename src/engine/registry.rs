//! Model registry: creation and lookup of elements by kind

use crate::error::{EngineError, Result};
use crate::models::{Model, ModelData, ModelKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Kinds that may be requested by `_class` name in a spec
static KIND_BY_NAME: Lazy<HashMap<&'static str, ModelKind>> = Lazy::new(|| {
    crate::models::KINDS
        .iter()
        .map(|kind| (kind.name(), *kind))
        .collect()
});

pub trait ModelRegistry {
    /// Build a fresh element of `kind` with default content
    fn create(&self, kind: ModelKind) -> Result<Model>;

    /// Build an element from its JSON spec (`_class` selects the kind)
    fn from_spec(&self, spec: &serde_json::Value) -> Result<Model>;

    fn model_has_type(&self, model: &Model, kinds: &[ModelKind]) -> bool {
        kinds.contains(&model.effective_kind())
    }

    /// Indices of elements matching `kinds` at the timestep of `models[idx]`.
    ///
    /// The timestep extends backwards over zero-duration elements and forwards
    /// up to and including the first element with a duration.
    fn search(&self, models: &[Model], idx: usize, kinds: &[ModelKind]) -> Vec<usize> {
        if models.is_empty() {
            return Vec::new();
        }
        let mut start = idx.min(models.len() - 1);
        while start > 0 && models[start - 1].div_count == 0 {
            start -= 1;
        }
        let mut found = Vec::new();
        for (i, model) in models.iter().enumerate().skip(start) {
            if self.model_has_type(model, kinds) {
                found.push(i);
            }
            if model.div_count > 0 {
                break;
            }
        }
        found
    }
}

/// Registry for the built-in element kinds
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardRegistry;

impl ModelRegistry for StandardRegistry {
    fn create(&self, kind: ModelKind) -> Result<Model> {
        ModelData::empty(kind)
            .map(Model::new)
            .ok_or_else(|| EngineError::InvalidSpec(format!("{} cannot be created without a target", kind)))
    }

    fn from_spec(&self, spec: &serde_json::Value) -> Result<Model> {
        let class = spec
            .get("_class")
            .and_then(|c| c.as_str())
            .ok_or_else(|| EngineError::InvalidSpec("missing `_class`".to_string()))?;
        if !KIND_BY_NAME.contains_key(class) {
            return Err(EngineError::UnknownType(class.to_string()));
        }
        if let Some(div_count) = spec.get("divCount").and_then(|d| d.as_i64()) {
            if div_count < 0 {
                return Err(EngineError::NegativeDivCount(div_count));
            }
        }
        Ok(serde_json::from_value(spec.clone())?)
    }
}
