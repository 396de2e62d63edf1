//! Relation introspection: classify a relation and derive the keys a merged view needs.
//!
//! Every supported shape maps to one [`RelationKind`]. Two foreign keys are derived:
//!
//! - the **original** key is the column the relation filters on when used on its own;
//!   the compiler removes that predicate from the branch
//! - the **merged** key is what the view exposes as `foreign_key`, i.e. the column that
//!   identifies the parent row of each produced row
//!
//! They only differ for the inverse direct key (the child's own key is exposed) and for
//! a deep chain whose first hop is inverse (the far parent's key is exposed).

use crate::error::{MergeError, MergeResult};
use crate::relation::def::{Join, RelationQuery};
use crate::relation::kinds::{BelongsTo, BelongsToMany, HasManyDeep, HasManyThrough, HasOneOrMany, Relation};
use crate::relation::pivot::PivotTableRef;

/// Structural class of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Direct foreign key; `inverse` when the key lives on the declaring model
    DirectForeignKey { inverse: bool },
    ManyToManyThroughPivot,
    OneHopThrough,
    /// Deep chain; `leading_inverse` when its first hop points back at the far parent's key
    MultiHopDeep { leading_inverse: bool },
}

/// Join constraint a branch needs inside the merged view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchConstraint {
    /// Select distinct rows
    pub distinct: bool,
    pub join: Join,
}

/// Everything the view compiler needs to know about one branch
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
    pub kind: RelationKind,
    pub source_table: String,
    /// Type tag written into the view for this branch's rows
    pub type_tag: String,
    pub original_foreign_key: String,
    pub merged_foreign_key: String,
    /// Intermediate tables this branch can carry, in order
    pub pivot_tables: Vec<PivotTableRef>,
    pub query: RelationQuery,
    pub constraint: Option<BranchConstraint>,
}

impl RelationDescriptor {
    /// Relations eager loaded on this branch's rows
    pub fn eager_loads(&self) -> &[String] {
        &self.query.eager_loads
    }
}

fn unsupported(relation: &Relation, reason: &str) -> MergeError {
    MergeError::UnsupportedRelationKind(format!("{} ({reason})", relation.kind_name()))
}

/// Classify a relation and derive its branch descriptor
///
/// # Errors
///
/// Returns `MergeError::UnsupportedRelationKind` for `MorphTo`, a deep chain without
/// intermediate tables or with mismatched hops, and any relation without a source table.
pub fn describe(relation: &Relation) -> MergeResult<RelationDescriptor> {
    if relation.query().from.is_empty() {
        return Err(unsupported(relation, "no source table"));
    }

    match relation {
        Relation::BelongsTo(belongs_to) => Ok(describe_belongs_to(belongs_to)),
        Relation::HasOneOrMany(has_many) => Ok(describe_has_one_or_many(has_many)),
        Relation::BelongsToMany(belongs_to_many) => Ok(describe_belongs_to_many(belongs_to_many)),
        Relation::HasManyThrough(through) => Ok(describe_has_many_through(through)),
        Relation::HasManyDeep(deep) if deep.has_far_parent_morph_type() => {
            Err(unsupported(relation, "first hop filters by a type column on the far parent"))
        }
        Relation::HasManyDeep(deep) => describe_has_many_deep(deep).ok_or_else(|| {
            unsupported(relation, "deep chain needs intermediate tables and one hop per link")
        }),
        Relation::MorphTo(_) => Err(unsupported(relation, "target table is only known per row")),
    }
}

fn describe_belongs_to(relation: &BelongsTo) -> RelationDescriptor {
    let original = relation.qualified_owner_key();
    RelationDescriptor {
        kind: RelationKind::DirectForeignKey { inverse: true },
        source_table: relation.query.from.clone(),
        type_tag: relation.related.morph_class.clone(),
        merged_foreign_key: relation.qualified_parent_key(),
        pivot_tables: Vec::new(),
        query: relation.query.clone(),
        constraint: Some(BranchConstraint {
            distinct: true,
            join: Join::new(
                relation.child.table.clone(),
                relation.qualified_foreign_key(),
                original.clone(),
            ),
        }),
        original_foreign_key: original,
    }
}

fn describe_has_one_or_many(relation: &HasOneOrMany) -> RelationDescriptor {
    let original = relation.qualified_foreign_key();
    RelationDescriptor {
        kind: RelationKind::DirectForeignKey { inverse: false },
        source_table: relation.query.from.clone(),
        type_tag: relation.related.morph_class.clone(),
        merged_foreign_key: original.clone(),
        original_foreign_key: original,
        pivot_tables: Vec::new(),
        query: relation.query.clone(),
        constraint: None,
    }
}

fn describe_belongs_to_many(relation: &BelongsToMany) -> RelationDescriptor {
    let original = relation.qualified_foreign_pivot_key();
    let pivot_tables = if relation.pivot_columns.is_empty() {
        Vec::new()
    } else {
        vec![PivotTableRef::new(
            relation.table.clone(),
            relation.accessor.clone(),
            relation.pivot_columns.iter().cloned(),
        )]
    };
    RelationDescriptor {
        kind: RelationKind::ManyToManyThroughPivot,
        source_table: relation.query.from.clone(),
        type_tag: relation.related.morph_class.clone(),
        merged_foreign_key: original.clone(),
        original_foreign_key: original,
        pivot_tables,
        query: relation.query.clone(),
        constraint: None,
    }
}

fn describe_has_many_through(relation: &HasManyThrough) -> RelationDescriptor {
    let original = relation.qualified_first_key();
    RelationDescriptor {
        kind: RelationKind::OneHopThrough,
        source_table: relation.query.from.clone(),
        type_tag: relation.related.morph_class.clone(),
        merged_foreign_key: original.clone(),
        original_foreign_key: original,
        pivot_tables: Vec::new(),
        query: relation.query.clone(),
        constraint: None,
    }
}

fn describe_has_many_deep(relation: &HasManyDeep) -> Option<RelationDescriptor> {
    if relation.through.is_empty() || relation.hops.len() != relation.through.len() + 1 {
        return None;
    }

    let original = relation.qualified_first_key()?;
    // Only a leading inverse hop qualifies; the same shape further down the chain does not
    let leading_inverse = relation.has_leading_inverse_hop();

    let (merged, constraint) = if leading_inverse {
        let join = Join::new(
            relation.far_parent.table.clone(),
            relation.qualified_local_key()?,
            original.clone(),
        );
        (
            relation.far_parent.qualified_key_name(),
            Some(BranchConstraint { distinct: false, join }),
        )
    } else {
        (original.clone(), None)
    };

    let pivot_tables = relation
        .intermediates
        .iter()
        .map(|intermediate| {
            PivotTableRef::new(
                intermediate.table.clone(),
                intermediate.accessor.clone(),
                intermediate.columns.iter().cloned(),
            )
        })
        .collect();

    Some(RelationDescriptor {
        kind: RelationKind::MultiHopDeep { leading_inverse },
        source_table: relation.query.from.clone(),
        type_tag: relation.related.morph_class.clone(),
        original_foreign_key: original,
        merged_foreign_key: merged,
        pivot_tables,
        query: relation.query.clone(),
        constraint,
    })
}
