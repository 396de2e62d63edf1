//! Polymorphic type registry: type tag → concrete model factory.
//!
//! A type tag stored in a merged view is either a morph alias (looked up in the morph
//! map) or the class name itself. The class name then selects a registered factory.

use crate::error::{MergeError, MergeResult};
use crate::model::attributes::Attributes;
use crate::model::traits::{FromAttributes, MergedModel};
use std::collections::HashMap;

/// Constructor for one concrete model type
pub type ModelFactory = fn(Attributes) -> MergeResult<Box<dyn MergedModel>>;

/// Registry of concrete model types that may appear in merged views
#[derive(Debug, Clone, Default)]
pub struct MorphRegistry {
    morph_map: HashMap<String, String>,
    factories: HashMap<String, ModelFactory>,
}

fn instantiate<T: FromAttributes>(attributes: Attributes) -> MergeResult<Box<dyn MergedModel>> {
    Ok(Box::new(T::from_attributes(attributes)))
}

impl MorphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model type under its class name
    pub fn register<T: FromAttributes + Default>(&mut self) -> &mut Self {
        let class = T::default().class_name();
        self.factories.insert(class.to_string(), instantiate::<T>);
        self
    }

    /// Register a custom factory for a class name
    pub fn register_factory(&mut self, class: impl Into<String>, factory: ModelFactory) -> &mut Self {
        self.factories.insert(class.into(), factory);
        self
    }

    /// Map a morph alias to a class name
    pub fn morph(&mut self, alias: impl Into<String>, class: impl Into<String>) -> &mut Self {
        self.morph_map.insert(alias.into(), class.into());
        self
    }

    /// Resolve a type tag to a class name (identity when the tag is not an alias)
    pub fn resolve<'a>(&'a self, tag: &'a str) -> &'a str {
        self.morph_map.get(tag).map(String::as_str).unwrap_or(tag)
    }

    /// Type tag stored in views for a class: its alias if one exists, otherwise the class name
    pub fn morph_class<'a>(&'a self, class: &'a str) -> &'a str {
        self.morph_map
            .iter()
            .find(|(_, mapped)| mapped.as_str() == class)
            .map(|(alias, _)| alias.as_str())
            .unwrap_or(class)
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.factories.contains_key(self.resolve(tag))
    }

    /// Build the concrete model for a type tag
    ///
    /// # Errors
    ///
    /// Returns `MergeError::UnknownModelType` if no factory is registered for the resolved class.
    pub fn instantiate(&self, tag: &str, attributes: Attributes) -> MergeResult<Box<dyn MergedModel>> {
        let class = self.resolve(tag);
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| MergeError::UnknownModelType(tag.to_string()))?;
        factory(attributes)
    }
}
