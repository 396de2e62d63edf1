//! The `MergedModel` trait and the relation containers attached to hydrated models.
//!
//! Rows coming out of a merged view belong to different concrete types. Each type
//! implements [`MergedModel`] (usually through [`merged_model!`](crate::merged_model)) and
//! is handed around as `Box<dyn MergedModel>`; [`MergedModel::as_any`] recovers the
//! concrete type.

use crate::model::attributes::Attributes;
use sea_query::Value;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;

/// A model that can be hydrated from a merged-view row
///
/// # Example
///
/// ```
/// use merged_relations::{merged_model, Attributes, MergedModel, Relations};
///
/// #[derive(Debug, Clone, Default)]
/// pub struct Post {
///     attributes: Attributes,
///     relations: Relations,
/// }
///
/// merged_model!(Post, "post");
///
/// let post = Post::default();
/// assert_eq!(post.class_name(), "post");
/// ```
pub trait MergedModel: Any + fmt::Debug + Send {
    /// Class name used by the morph registry (the default type tag)
    fn class_name(&self) -> &'static str;

    /// Column values
    fn attributes(&self) -> &Attributes;

    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Loaded relations, keyed by relation name
    fn relations(&self) -> &Relations;

    fn relations_mut(&mut self) -> &mut Relations;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn clone_box(&self) -> Box<dyn MergedModel>;

    /// Primary key column name
    fn key_name(&self) -> &str {
        "id"
    }

    /// Get a column value
    fn get_attribute(&self, column: &str) -> Option<&Value> {
        self.attributes().get(column)
    }

    /// Set a column value
    fn set_attribute(&mut self, column: &str, value: Value) {
        self.attributes_mut().insert(column, value);
    }

    /// Attach a loaded relation
    fn set_relation(&mut self, name: &str, related: Related) {
        self.relations_mut().insert(name.to_string(), related);
    }

    fn relation(&self, name: &str) -> Option<&Related> {
        self.relations().get(name)
    }

    fn relation_loaded(&self, name: &str) -> bool {
        self.relations().contains_key(name)
    }

    /// Concrete runtime type, used to batch eager loading per type
    fn concrete_type(&self) -> TypeId {
        self.as_any().type_id()
    }
}

impl Clone for Box<dyn MergedModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl dyn MergedModel {
    /// Downcast to a concrete model type
    pub fn downcast_ref<T: MergedModel>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: MergedModel>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: MergedModel>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Relations loaded on a model
pub type Relations = BTreeMap<String, Related>;

/// A loaded relation
#[derive(Debug, Clone)]
pub enum Related {
    /// To-many relation
    Many(Vec<Box<dyn MergedModel>>),
    /// To-one relation, `None` when no row matched
    One(Option<Box<dyn MergedModel>>),
    /// Intermediate-table record carried through a merged view
    Pivot(Pivot),
}

impl Related {
    pub fn as_pivot(&self) -> Option<&Pivot> {
        match self {
            Related::Pivot(pivot) => Some(pivot),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Box<dyn MergedModel>]> {
        match self {
            Related::Many(models) => Some(models),
            _ => None,
        }
    }
}

/// Intermediate ("pivot") table record restored from prefixed view columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pivot {
    /// Intermediate table the values came from
    pub table: String,
    pub attributes: Attributes,
}

impl Pivot {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            attributes: Attributes::new(),
        }
    }
}

/// Build a model from hydrated attributes
///
/// Implemented by [`merged_model!`](crate::merged_model) for `Default` structs; registered
/// with [`MorphRegistry::register`](crate::MorphRegistry::register).
pub trait FromAttributes: MergedModel + Sized {
    fn from_attributes(attributes: Attributes) -> Self;
}
