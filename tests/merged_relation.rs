//! End-to-end tests of the public API against an in-memory executor
//!
//! Relations used:
//! - User has_many Comments
//! - User has_many Comments through Posts
//! - Tag morphed_by_many Posts / Videos through `taggables`

use merged_relations::relation::{BelongsToMany, HasManyThrough, HasOneOrMany, ModelMeta, Relation};
use merged_relations::{
    merged_model, Attributes, MergeError, MergeExecutor, MergeManager, MergeResult, MergedModel, MergedRow,
    MorphRegistry, Related, Relations,
};
use sea_query::{Value, Values};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

// ============================================================================
// Test Models
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct User {
    attributes: Attributes,
    relations: Relations,
}
merged_model!(User, "User");

#[derive(Debug, Clone, Default)]
pub struct Comment {
    attributes: Attributes,
    relations: Relations,
}
merged_model!(Comment, "Comment");

#[derive(Debug, Clone, Default)]
pub struct Post {
    attributes: Attributes,
    relations: Relations,
}
merged_model!(Post, "Post");

#[derive(Debug, Clone, Default)]
pub struct Video {
    attributes: Attributes,
    relations: Relations,
}
merged_model!(Video, "Video");

// ============================================================================
// In-memory executor
// ============================================================================

#[derive(Clone, Default)]
struct MemoryExecutor {
    tables: Rc<HashMap<String, Vec<String>>>,
    statements: Rc<RefCell<Vec<String>>>,
    rows: Rc<RefCell<Vec<MergedRow>>>,
}

impl MemoryExecutor {
    fn new(tables: &[(&str, &[&str])]) -> Self {
        let tables = tables
            .iter()
            .map(|(table, columns)| (table.to_string(), columns.iter().map(|c| c.to_string()).collect()))
            .collect();
        Self {
            tables: Rc::new(tables),
            ..Self::default()
        }
    }

    fn serve(&self, rows: Vec<MergedRow>) {
        *self.rows.borrow_mut() = rows;
    }

    fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }
}

impl MergeExecutor for MemoryExecutor {
    fn execute(&self, sql: &str, _values: &Values) -> MergeResult<u64> {
        self.statements.borrow_mut().push(sql.to_string());
        Ok(0)
    }

    fn query_all(&self, sql: &str, values: &Values) -> MergeResult<Vec<MergedRow>> {
        self.statements.borrow_mut().push(sql.to_string());
        let Some(Value::Int(Some(parent))) = values.0.first() else {
            return Ok(self.rows.borrow().clone());
        };
        Ok(self
            .rows
            .borrow()
            .iter()
            .filter(|row| row.get("foreign_key") == Some(&Value::Int(Some(*parent))))
            .cloned()
            .collect())
    }

    fn column_listing(&self, table: &str) -> MergeResult<Vec<String>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| MergeError::QueryError(format!("relation \"{table}\" does not exist")))
    }
}

fn registry() -> MorphRegistry {
    let mut registry = MorphRegistry::new();
    registry
        .register::<User>()
        .register::<Comment>()
        .register::<Post>()
        .register::<Video>();
    registry
}

fn user(id: i32) -> User {
    let mut user = User::default();
    user.set_attribute("id", Value::Int(Some(id)));
    user
}

fn comment_row(id: i32, foreign_key: i32) -> MergedRow {
    MergedRow::new()
        .with("id", id)
        .with("post_id", 1)
        .with("user_id", 1)
        .with("foreign_key", foreign_key)
        .with("type_tag", "Comment")
        .with("placeholder_list", "")
        .with("eager_load_list", "")
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_user_comments_view_round_trip() {
    let executor = MemoryExecutor::new(&[
        ("posts", &["id", "user_id"]),
        ("comments", &["id", "post_id", "user_id"]),
    ]);
    let manager = MergeManager::new(executor.clone(), registry());

    let users = ModelMeta::new("users", "User");
    let posts = ModelMeta::new("posts", "Post");
    let comments = ModelMeta::new("comments", "Comment");
    let relations = [
        Relation::from(HasOneOrMany::new(users.clone(), comments.clone(), "user_id")),
        Relation::from(HasManyThrough::new(users, posts, comments, "user_id", "post_id")),
    ];

    let spec = manager
        .schema()
        .create_merged_view("all_comments", &relations, true, false)
        .unwrap();
    assert_eq!(spec.branches.len(), 2);
    let create = &executor.statements()[0];
    assert!(create.contains(r#""comments"."user_id" AS "foreign_key""#), "{create}");
    assert!(create.contains(r#""posts"."user_id" AS "foreign_key""#), "{create}");

    executor.serve(vec![
        comment_row(1, 1),
        comment_row(2, 1),
        comment_row(1, 1),
        comment_row(3, 2),
    ]);
    let models = manager.merged_relation("all_comments", &user(1)).get_results().unwrap();

    let ids: Vec<&Value> = models.iter().filter_map(|model| model.get_attribute("id")).collect();
    assert_eq!(ids, vec![&Value::Int(Some(1)), &Value::Int(Some(2)), &Value::Int(Some(1))]);
    for model in &models {
        assert!(model.is::<Comment>());
        let keys: Vec<&str> = model.attributes().keys().collect();
        assert_eq!(keys, vec!["id", "post_id", "user_id"]);
    }
}

#[test]
fn test_polymorphic_rows_with_pivot_and_eager_loads() {
    let executor = MemoryExecutor::new(&[
        ("posts", &["id", "user_id"]),
        ("videos", &["id", "created_at", "updated_at"]),
    ]);
    let loader = |models: &mut [&mut Box<dyn MergedModel>], relations: &[String]| -> MergeResult<()> {
        for model in models.iter_mut() {
            for relation in relations {
                model.set_relation(relation, Related::Many(Vec::new()));
            }
        }
        Ok(())
    };
    let manager = MergeManager::new(executor.clone(), registry()).with_loader(loader);

    let tags = ModelMeta::new("tags", "Tag");
    let tagged = |related: ModelMeta| {
        BelongsToMany::new(tags.clone(), related, "taggables", "tag_id", "taggable_id")
            .morphed_by("taggable_type")
            .with_pivot(["label"])
    };
    let relations = [
        Relation::from(tagged(ModelMeta::new("posts", "Post"))).with(["comments"]),
        Relation::from(tagged(ModelMeta::new("videos", "Video"))),
    ];
    let spec = manager
        .schema()
        .create_merged_view_distinct("all_taggables", &relations)
        .unwrap();
    assert_eq!(spec.pivot_columns(), vec!["__taggables__pivot__label"]);

    executor.serve(vec![
        MergedRow::new()
            .with("id", 1)
            .with("user_id", 7)
            .with("created_at", Value::String(None))
            .with("updated_at", Value::String(None))
            .with("__taggables__pivot__label", "featured")
            .with("foreign_key", 1)
            .with("type_tag", "Post")
            .with("placeholder_list", "created_at,updated_at")
            .with("eager_load_list", "comments"),
        MergedRow::new()
            .with("id", 2)
            .with("user_id", Value::Int(None))
            .with("created_at", "2024-01-01 00:00:00")
            .with("updated_at", "2024-01-01 00:00:00")
            .with("__taggables__pivot__label", "archived")
            .with("foreign_key", 1)
            .with("type_tag", "Video")
            .with("placeholder_list", "user_id")
            .with("eager_load_list", ""),
    ]);
    let mut tag = Post::default();
    tag.set_attribute("id", Value::Int(Some(1)));
    let models = manager.merged_relation("all_taggables", &tag).get(&[]).unwrap();

    assert_eq!(models.len(), 2);
    let post = models[0].downcast_ref::<Post>().unwrap();
    assert!(post.attributes().contains_key("user_id"));
    assert!(!post.attributes().contains_key("created_at"));
    assert!(post.relation_loaded("comments"));
    let pivot = post.relation("pivot").and_then(Related::as_pivot).unwrap();
    assert_eq!(pivot.attributes.get("label"), Some(&Value::from("featured")));

    let video = models[1].downcast_ref::<Video>().unwrap();
    assert!(video.attributes().contains_key("created_at"));
    assert!(!video.attributes().contains_key("user_id"));
    assert!(!video.relation_loaded("comments"));
}

#[test]
fn test_unknown_table_fails_before_ddl() {
    let executor = MemoryExecutor::new(&[]);
    let manager = MergeManager::new(executor.clone(), registry());
    let relation = Relation::from(HasOneOrMany::new(
        ModelMeta::new("users", "User"),
        ModelMeta::new("comments", "Comment"),
        "user_id",
    ));

    let err = manager.create_merged_view("all_comments", &[relation]).unwrap_err();

    assert!(matches!(err, MergeError::QueryError(_)));
    assert!(executor.statements().is_empty());
}

#[test]
fn test_unregistered_type_tag_is_an_error() {
    let executor = MemoryExecutor::new(&[]);
    let manager = MergeManager::new(executor.clone(), MorphRegistry::new());
    executor.serve(vec![comment_row(1, 1)]);

    let err = manager.merged_relation("all_comments", &user(1)).get(&[]).unwrap_err();
    assert!(matches!(err, MergeError::UnknownModelType(tag) if tag == "Comment"));
}
