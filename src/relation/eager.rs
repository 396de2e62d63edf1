//! Eager-load dispatch for decoded merged rows.
//!
//! Merged results mix concrete model types, and each type has its own relations. The
//! dispatcher groups decoded models by concrete type and issues one batched
//! [`EagerLoader::load`] call per group. Loading a single relation is up to the host.

use crate::error::MergeResult;
use crate::hydration::decoder::Hydrated;
use crate::model::MergedModel;
use std::any::TypeId;

/// Loads relations onto a homogeneous batch of models
///
/// Implemented for closures, so a host can plug in its loader directly:
///
/// ```
/// use merged_relations::{EagerLoader, MergeResult, MergedModel};
///
/// let loader = |models: &mut [&mut Box<dyn MergedModel>], relations: &[String]| -> MergeResult<()> {
///     for model in models.iter_mut() {
///         for relation in relations {
///             model.set_relation(relation, merged_relations::Related::Many(Vec::new()));
///         }
///     }
///     Ok(())
/// };
/// # fn assert_loader(_: &dyn EagerLoader) {}
/// # assert_loader(&loader);
/// ```
pub trait EagerLoader {
    /// Populate `relations` on every model; all models share one concrete type
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying loading raised.
    fn load(&self, models: &mut [&mut Box<dyn MergedModel>], relations: &[String]) -> MergeResult<()>;
}

impl<F> EagerLoader for F
where
    F: Fn(&mut [&mut Box<dyn MergedModel>], &[String]) -> MergeResult<()>,
{
    fn load(&self, models: &mut [&mut Box<dyn MergedModel>], relations: &[String]) -> MergeResult<()> {
        self(models, relations)
    }
}

/// Loader that loads nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEagerLoading;

impl EagerLoader for NoEagerLoading {
    fn load(&self, models: &mut [&mut Box<dyn MergedModel>], relations: &[String]) -> MergeResult<()> {
        log::debug!(
            "No eager loader configured, skipping {relations:?} on {} models",
            models.len()
        );
        Ok(())
    }
}

/// Relations to load per concrete type, in first-appearance order
///
/// Each group merges `static_loads` with the eager-load list of its **first** model;
/// later models of the same type come from the same branch and carry the same list.
pub fn plan(hydrated: &[Hydrated], static_loads: &[String]) -> Vec<(TypeId, Vec<String>)> {
    let mut groups: Vec<(TypeId, Vec<String>)> = Vec::new();

    for entry in hydrated {
        let type_id = entry.model.concrete_type();
        if groups.iter().any(|(id, _)| *id == type_id) {
            continue;
        }
        let mut relations = static_loads.to_vec();
        for relation in &entry.eager_loads {
            if !relations.contains(relation) {
                relations.push(relation.clone());
            }
        }
        groups.push((type_id, relations));
    }

    groups
}

/// Eager load relations on decoded rows, one loader call per concrete type
///
/// The per-row eager-load lists are cleared afterwards.
///
/// # Errors
///
/// Stops at the first loader error.
pub fn dispatch(hydrated: &mut [Hydrated], static_loads: &[String], loader: &dyn EagerLoader) -> MergeResult<()> {
    for (type_id, relations) in plan(hydrated, static_loads) {
        if relations.is_empty() {
            continue;
        }

        let mut group: Vec<&mut Box<dyn MergedModel>> = hydrated
            .iter_mut()
            .filter(|entry| entry.model.concrete_type() == type_id)
            .map(|entry| &mut entry.model)
            .collect();

        log::debug!(
            "Eager loading {relations:?} on {} {} models",
            group.len(),
            group.first().map(|model| model.class_name()).unwrap_or_default()
        );
        loader.load(&mut group, &relations)?;
    }

    for entry in hydrated.iter_mut() {
        entry.eager_loads.clear();
    }
    Ok(())
}
