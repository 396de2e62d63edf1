//! # merged-relations
//!
//! Merge several relationships of one parent model into a single database view and
//! read it back as one polymorphic relation.
//!
//! Each relation becomes one branch of a `UNION` (or `UNION ALL`). Branches are aligned
//! column by column: columns a branch's table lacks are projected as `NULL` placeholders,
//! and every row carries `foreign_key`, `type_tag`, `placeholder_list` and
//! `eager_load_list` so it can be decoded back into its own model type.
//!
//! ```no_run
//! use merged_relations::{MergeConfig, MergeManager, MorphRegistry};
//! use merged_relations::relation::{HasManyThrough, HasOneOrMany, ModelMeta, Relation};
//!
//! # fn main() -> Result<(), merged_relations::MergeError> {
//! let manager = MergeManager::connect(MergeConfig::load().unwrap_or_default(), MorphRegistry::new())?;
//!
//! let users = ModelMeta::new("users", "User");
//! let posts = ModelMeta::new("posts", "Post");
//! let comments = ModelMeta::new("comments", "Comment");
//! manager.schema().create_merged_view(
//!     "all_comments",
//!     &[
//!         Relation::from(HasOneOrMany::new(users.clone(), comments.clone(), "user_id")),
//!         Relation::from(HasManyThrough::new(users, posts, comments, "user_id", "post_id")),
//!     ],
//!     true,
//!     false,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod hydration;
mod macros;
pub mod manager;
pub mod metrics;
pub mod model;
pub mod relation;
pub mod schema;
pub mod value;

#[cfg(test)]
mod tests_cfg;

pub use config::MergeConfig;
pub use connection::connect;
pub use error::{MergeError, MergeResult};
pub use executor::{MayPostgresExecutor, MergeExecutor};
pub use hydration::{Hydrated, MergedRow};
pub use manager::MergeManager;
pub use model::{Attributes, FromAttributes, MergedModel, MorphRegistry, Pivot, Related, Relations};
pub use relation::{EagerLoader, MergedRelation, Page, Relation};
pub use schema::{Backend, MergeSchema, MergedViewSpec};
