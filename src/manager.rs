//! `MergeManager`: the executor, morph registry and eager loader a merged view is read with.

use crate::config::MergeConfig;
use crate::connection::connect;
use crate::error::MergeResult;
use crate::executor::{MayPostgresExecutor, MergeExecutor};
use crate::model::{MergedModel, MorphRegistry};
use crate::relation::eager::{EagerLoader, NoEagerLoading};
use crate::relation::kinds::Relation;
use crate::relation::merged::MergedRelation;
use crate::schema::backend::Backend;
use crate::schema::builder::MergeSchema;
use crate::schema::compiler::MergedViewSpec;

/// Owns everything needed to create merged views and read them back
///
/// # Example
///
/// ```no_run
/// use merged_relations::{merged_model, Attributes, MergeConfig, MergeManager, MorphRegistry, Relations};
/// use merged_relations::relation::{HasManyThrough, HasOneOrMany, ModelMeta, Relation};
///
/// #[derive(Debug, Clone, Default)]
/// pub struct Comment {
///     attributes: Attributes,
///     relations: Relations,
/// }
/// merged_model!(Comment, "Comment");
///
/// # fn main() -> Result<(), merged_relations::MergeError> {
/// let mut registry = MorphRegistry::new();
/// registry.register::<Comment>();
/// let manager = MergeManager::connect(MergeConfig::default(), registry)?;
///
/// let users = ModelMeta::new("users", "User");
/// let posts = ModelMeta::new("posts", "Post");
/// let comments = ModelMeta::new("comments", "Comment");
/// manager.create_merged_view(
///     "all_comments",
///     &[
///         Relation::from(HasOneOrMany::new(users.clone(), comments.clone(), "user_id")),
///         Relation::from(HasManyThrough::new(users, posts, comments, "user_id", "post_id")),
///     ],
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct MergeManager {
    executor: Box<dyn MergeExecutor>,
    registry: MorphRegistry,
    loader: Box<dyn EagerLoader>,
    config: MergeConfig,
}

impl MergeManager {
    pub fn new(executor: impl MergeExecutor + 'static, registry: MorphRegistry) -> Self {
        Self {
            executor: Box::new(executor),
            registry,
            loader: Box::new(NoEagerLoading),
            config: MergeConfig::default(),
        }
    }

    /// Connect to `config.url` with may_postgres
    ///
    /// # Errors
    ///
    /// Returns `MergeError` if the URL is malformed or the connection fails.
    pub fn connect(config: MergeConfig, registry: MorphRegistry) -> MergeResult<Self> {
        let client = connect(&config.url)?;
        Ok(Self::new(MayPostgresExecutor::new(client), registry).with_config(config))
    }

    pub fn with_loader(mut self, loader: impl EagerLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_config(mut self, config: MergeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn executor(&self) -> &dyn MergeExecutor {
        self.executor.as_ref()
    }

    pub fn registry(&self) -> &MorphRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MorphRegistry {
        &mut self.registry
    }

    pub fn loader(&self) -> &dyn EagerLoader {
        self.loader.as_ref()
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    /// View DDL through this manager's executor
    pub fn schema(&self) -> MergeSchema<'_, dyn MergeExecutor> {
        MergeSchema::new(self.executor.as_ref(), self.backend())
    }

    /// Create a view with the configured union operator
    ///
    /// # Errors
    ///
    /// See [`MergeSchema::create_merged_view`].
    pub fn create_merged_view(&self, name: &str, relations: &[Relation]) -> MergeResult<MergedViewSpec> {
        self.schema()
            .create_merged_view(name, relations, self.config.allow_duplicates, false)
    }

    /// Relation over `view` for one parent
    pub fn merged_relation(&self, view: impl Into<String>, parent: &dyn MergedModel) -> MergedRelation<'_> {
        MergedRelation::new(self, view).for_parent(parent)
    }

    /// Relation over `view` whose untagged rows decode as `class`
    pub fn merged_relation_with_model(
        &self,
        class: impl Into<String>,
        view: impl Into<String>,
        parent: &dyn MergedModel,
    ) -> MergedRelation<'_> {
        self.merged_relation(view, parent).with_fallback_tag(class)
    }

    /// Relation over `view` with no parent, for batched eager loading
    pub fn merged(&self, view: impl Into<String>) -> MergedRelation<'_> {
        MergedRelation::new(self, view)
    }
}

impl std::fmt::Debug for MergeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
