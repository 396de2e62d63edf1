//! Relation definitions and the merged-relation read path.
//!
//! - **Def**: `ModelMeta`, `RelationQuery`, `Where`, `Join`
//! - **Kinds**: the closed `Relation` enum, one struct per relationship shape
//! - **Introspect**: classify a relation into a `RelationDescriptor`
//! - **Pivot**: all-or-nothing pivot column aggregation
//! - **Eager**: per-type eager-load dispatch
//! - **Merged**: `MergedRelation`, the facade reading a merged view

// Relation definitions
pub mod def;
#[doc(inline)]
pub use def::{qualify, Join, ModelMeta, RelationQuery, Where};

pub mod kinds;
#[doc(inline)]
pub use kinds::{
    BelongsTo, BelongsToMany, DeepHop, HasManyDeep, HasManyThrough, HasOneOrMany, IntermediateTable, MorphSide,
    MorphTo, MorphType, Relation,
};

// Analysis
pub mod introspect;
#[doc(inline)]
pub use introspect::{describe, BranchConstraint, RelationDescriptor, RelationKind};

pub mod pivot;
#[doc(inline)]
pub use pivot::PivotTableRef;

// Read path
pub mod eager;
#[doc(inline)]
pub use eager::{EagerLoader, NoEagerLoading};

pub mod merged;
#[doc(inline)]
pub use merged::{MergedRelation, Page};
