//! Merged view compilation and creation.
//!
//! - **Columns**: per-call column listing and reconciliation
//! - **Compiler**: branches → one column-aligned UNION
//! - **Backend**: SQL dialects
//! - **Builder**: `MergeSchema`, the view DDL verbs

pub mod columns;
pub use columns::{reconcile, ColumnSet};

pub mod compiler;
pub use compiler::{compile, compile_relations, BranchFragment, MergedViewSpec, ProjectedColumn, ProjectionSource, UnionKind};

pub mod backend;
pub use backend::Backend;

pub mod builder;
pub use builder::MergeSchema;
