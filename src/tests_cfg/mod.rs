//! Shared test fixtures: models, relation definitions, a recording executor and loader.
//!
//! Schema used throughout:
//!
//! - `users (id, created_at, updated_at)`
//! - `posts (id, user_id)`
//! - `comments (id, post_id, user_id, parent_id, created_at, updated_at)`
//! - `videos (id, created_at, updated_at)`
//! - `tags (id, name)`
//! - `taggables (tag_id, taggable_type, taggable_id, label, active)`

#![allow(dead_code)]

use crate::error::{MergeError, MergeResult};
use crate::executor::MergeExecutor;
use crate::hydration::row::{MergedRow, EAGER_LOAD_LIST, FOREIGN_KEY, PLACEHOLDER_LIST, TYPE_TAG};
use crate::manager::MergeManager;
use crate::model::{Attributes, MergedModel, MorphRegistry, Related, Relations};
use crate::relation::eager::EagerLoader;
use crate::relation::kinds::{BelongsTo, BelongsToMany, DeepHop, HasManyDeep, HasManyThrough, HasOneOrMany, Relation};
use crate::relation::def::ModelMeta;
use sea_query::{Value, Values};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

macro_rules! fixture_model {
    ($($model:ident),+) => {
        $(
            #[derive(Debug, Clone, Default)]
            pub struct $model {
                attributes: Attributes,
                relations: Relations,
            }

            crate::merged_model!($model, stringify!($model));
        )+
    };
}

fixture_model!(Post, Video, Comment, User, Tag);

pub fn user_meta() -> ModelMeta {
    ModelMeta::new("users", "User")
}

pub fn post_meta() -> ModelMeta {
    ModelMeta::new("posts", "Post")
}

pub fn comment_meta() -> ModelMeta {
    ModelMeta::new("comments", "Comment")
}

pub fn video_meta() -> ModelMeta {
    ModelMeta::new("videos", "Video")
}

pub fn tag_meta() -> ModelMeta {
    ModelMeta::new("tags", "Tag")
}

/// user → comments
pub fn comments_of_user() -> Relation {
    HasOneOrMany::new(user_meta(), comment_meta(), "user_id").into()
}

/// user → posts → comments
pub fn comments_of_posts_of_user() -> Relation {
    HasManyThrough::new(user_meta(), post_meta(), comment_meta(), "user_id", "post_id").into()
}

/// comment → post
pub fn post_of_comment() -> Relation {
    BelongsTo::new(comment_meta(), post_meta(), "post_id").into()
}

/// comment → user
pub fn user_of_comment() -> Relation {
    BelongsTo::new(comment_meta(), user_meta(), "user_id").into()
}

/// comment → post → user, starting with an inverse hop
pub fn user_of_comment_deep() -> Relation {
    HasManyDeep::new(
        comment_meta(),
        user_meta(),
        vec![post_meta()],
        vec![DeepHop::new("id", "post_id"), DeepHop::new("id", "user_id")],
    )
    .into()
}

fn tagged(related: ModelMeta) -> BelongsToMany {
    BelongsToMany::new(tag_meta(), related, "taggables", "tag_id", "taggable_id").morphed_by("taggable_type")
}

/// tag → posts, eager loading `comments`
pub fn posts_of_tag() -> Relation {
    Relation::from(tagged(post_meta())).with(["comments"])
}

pub fn posts_of_tag_with_pivot() -> Relation {
    Relation::from(tagged(post_meta()).with_pivot(["label", "active"])).with(["comments"])
}

/// tag → videos
pub fn videos_of_tag() -> Relation {
    tagged(video_meta()).into()
}

fn videos_of_tag_chain() -> HasManyDeep {
    HasManyDeep::new(
        tag_meta(),
        video_meta(),
        vec![ModelMeta::new("taggables", "Taggable")],
        vec![
            DeepHop::new("tag_id", "id"),
            DeepHop::morph("id", "taggable_id", "taggable_type", "Video"),
        ],
    )
}

/// tag → taggables → videos
pub fn videos_of_tag_deep() -> Relation {
    videos_of_tag_chain().into()
}

pub fn videos_of_tag_deep_with_pivot() -> Relation {
    videos_of_tag_chain()
        .with_intermediate("taggables", ["label", "active"], "pivot")
        .into()
}

pub fn fixture_registry() -> MorphRegistry {
    let mut registry = MorphRegistry::new();
    registry
        .register::<Post>()
        .register::<Video>()
        .register::<Comment>()
        .register::<User>()
        .register::<Tag>();
    registry
}

/// Row of a `posts` branch merged with `videos`
pub fn post_row(id: i32, user_id: i32, foreign_key: i32, eager_loads: &str) -> MergedRow {
    MergedRow::new()
        .with("id", id)
        .with("user_id", user_id)
        .with("created_at", Value::String(None))
        .with("updated_at", Value::String(None))
        .with(FOREIGN_KEY, foreign_key)
        .with(TYPE_TAG, "Post")
        .with(PLACEHOLDER_LIST, "created_at,updated_at")
        .with(EAGER_LOAD_LIST, eager_loads)
}

/// Row of a `videos` branch merged with `posts`
pub fn video_row(id: i32, foreign_key: i32) -> MergedRow {
    MergedRow::new()
        .with("id", id)
        .with("user_id", Value::Int(None))
        .with("created_at", "2024-01-01 00:00:00")
        .with("updated_at", "2024-01-02 00:00:00")
        .with(FOREIGN_KEY, foreign_key)
        .with(TYPE_TAG, "Video")
        .with(PLACEHOLDER_LIST, "user_id")
        .with(EAGER_LOAD_LIST, "")
}

#[derive(Debug, Default)]
struct MockState {
    tables: HashMap<String, Vec<String>>,
    listed: Vec<String>,
    executed: Vec<String>,
    queries: Vec<(String, Vec<Value>)>,
    rows: VecDeque<Vec<MergedRow>>,
    fail_next: Option<String>,
    fail_statement: Option<(String, String)>,
}

/// Executor that records every call and serves canned rows
///
/// Clones share state, so a clone handed to a `MergeManager` can still be inspected.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    state: Rc<RefCell<MockState>>,
}

impl MockExecutor {
    pub fn with_fixture_tables() -> Self {
        let executor = Self::default();
        for (table, columns) in [
            ("users", &["id", "created_at", "updated_at"][..]),
            ("posts", &["id", "user_id"][..]),
            (
                "comments",
                &["id", "post_id", "user_id", "parent_id", "created_at", "updated_at"][..],
            ),
            ("videos", &["id", "created_at", "updated_at"][..]),
            ("tags", &["id", "name"][..]),
            (
                "taggables",
                &["tag_id", "taggable_type", "taggable_id", "label", "active"][..],
            ),
        ] {
            executor.add_table(table, columns);
        }
        executor
    }

    pub fn add_table(&self, table: &str, columns: &[&str]) {
        self.state
            .borrow_mut()
            .tables
            .insert(table.to_string(), columns.iter().map(|c| c.to_string()).collect());
    }

    /// Queue the rows returned by the next `query_all`
    pub fn push_rows(&self, rows: Vec<MergedRow>) {
        self.state.borrow_mut().rows.push_back(rows);
    }

    /// Make the next `execute` or `query_all` fail with `QueryError(message)`
    pub fn fail_next(&self, message: &str) {
        self.state.borrow_mut().fail_next = Some(message.to_string());
    }

    /// Make the next `execute` whose SQL contains `pattern` fail with `QueryError(message)`
    pub fn fail_statement(&self, pattern: &str, message: &str) {
        self.state.borrow_mut().fail_statement = Some((pattern.to_string(), message.to_string()));
    }

    pub fn listed_tables(&self) -> Vec<String> {
        self.state.borrow().listed.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.borrow().executed.clone()
    }

    pub fn queries(&self) -> Vec<(String, Vec<Value>)> {
        self.state.borrow().queries.clone()
    }

    fn take_failure(&self) -> MergeResult<()> {
        match self.state.borrow_mut().fail_next.take() {
            Some(message) => Err(MergeError::QueryError(message)),
            None => Ok(()),
        }
    }
}

impl MergeExecutor for MockExecutor {
    fn execute(&self, sql: &str, _values: &Values) -> MergeResult<u64> {
        self.take_failure()?;
        let mut state = self.state.borrow_mut();
        let matches = state
            .fail_statement
            .as_ref()
            .is_some_and(|(pattern, _)| sql.contains(pattern.as_str()));
        if matches {
            if let Some((_, message)) = state.fail_statement.take() {
                return Err(MergeError::QueryError(message));
            }
        }
        state.executed.push(sql.to_string());
        Ok(0)
    }

    fn query_all(&self, sql: &str, values: &Values) -> MergeResult<Vec<MergedRow>> {
        self.take_failure()?;
        let mut state = self.state.borrow_mut();
        state.queries.push((sql.to_string(), values.0.clone()));
        Ok(state.rows.pop_front().unwrap_or_default())
    }

    fn column_listing(&self, table: &str) -> MergeResult<Vec<String>> {
        let mut state = self.state.borrow_mut();
        state.listed.push(table.to_string());
        Ok(state.tables.get(table).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCall {
    pub class: String,
    pub relations: Vec<String>,
    pub count: usize,
}

/// Eager loader that records its calls and sets every relation to an empty list
#[derive(Debug, Clone, Default)]
pub struct RecordingLoader {
    calls: Rc<RefCell<Vec<LoadCall>>>,
}

impl RecordingLoader {
    pub fn calls(&self) -> Vec<LoadCall> {
        self.calls.borrow().clone()
    }
}

impl EagerLoader for RecordingLoader {
    fn load(&self, models: &mut [&mut Box<dyn MergedModel>], relations: &[String]) -> MergeResult<()> {
        self.calls.borrow_mut().push(LoadCall {
            class: models.first().map(|model| model.class_name().to_string()).unwrap_or_default(),
            relations: relations.to_vec(),
            count: models.len(),
        });
        for model in models.iter_mut() {
            for relation in relations {
                model.set_relation(relation, Related::Many(Vec::new()));
            }
        }
        Ok(())
    }
}

pub fn manager_with(executor: MockExecutor, loader: RecordingLoader) -> MergeManager {
    MergeManager::new(executor, fixture_registry()).with_loader(loader)
}

/// Manager over the fixture tables, plus handles on its executor and loader
pub fn fixture_manager() -> (MergeManager, MockExecutor, RecordingLoader) {
    let executor = MockExecutor::with_fixture_tables();
    let loader = RecordingLoader::default();
    let manager = manager_with(executor.clone(), loader.clone());
    (manager, executor, loader)
}
