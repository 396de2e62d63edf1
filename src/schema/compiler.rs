//! View compiler: lower merged relation branches into one column-aligned UNION.
//!
//! Each branch projects, in order:
//!
//! 1. every column of the reconciled union, as `table.column` when the branch's table has
//!    it and as `NULL` otherwise (a placeholder)
//! 2. the shared pivot columns, aliased `__{table}__{accessor}__{column}`
//! 3. the metadata columns `foreign_key`, `type_tag`, `placeholder_list`, `eager_load_list`
//!
//! so every branch projects the same names in the same order.

use crate::error::{MergeError, MergeResult};
use crate::executor::MergeExecutor;
use crate::hydration::row::{pivot_alias, EAGER_LOAD_LIST, FOREIGN_KEY, PLACEHOLDER_LIST, TYPE_TAG};
use crate::relation::def::{column_expr, qualify, RelationQuery};
use crate::relation::introspect::{describe, RelationDescriptor};
use crate::relation::kinds::Relation;
use crate::relation::pivot::{aggregate, PivotTableRef};
use crate::schema::backend::Backend;
use crate::schema::columns::{reconcile, ColumnSet};
use sea_query::{Alias, Expr, Query, SelectStatement, UnionType};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Set operator combining the branches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    /// `UNION ALL`, keeps duplicate rows
    All,
    /// `UNION`, drops exact-row duplicates
    Distinct,
}

impl UnionKind {
    pub fn from_duplicates(allow_duplicates: bool) -> Self {
        if allow_duplicates {
            UnionKind::All
        } else {
            UnionKind::Distinct
        }
    }

    fn union_type(self) -> UnionType {
        match self {
            UnionKind::All => UnionType::All,
            UnionKind::Distinct => UnionType::Distinct,
        }
    }
}

/// What a projected column is filled with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionSource {
    /// A real column of the branch, qualified
    Column(String),
    /// `NULL` placeholder for a column the branch's table lacks
    Placeholder,
    /// A pivot column, qualified
    Pivot(String),
    /// The merged foreign key, qualified
    ForeignKey(String),
    /// A string literal
    Literal(String),
}

/// One projected column of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub alias: String,
    pub source: ProjectionSource,
}

impl ProjectedColumn {
    fn expr(&self) -> Expr {
        match &self.source {
            ProjectionSource::Column(column)
            | ProjectionSource::Pivot(column)
            | ProjectionSource::ForeignKey(column) => column_expr(column),
            ProjectionSource::Placeholder => Expr::cust("NULL"),
            ProjectionSource::Literal(literal) => Expr::val(literal.clone()),
        }
    }
}

/// One branch of a merged view
#[derive(Debug, Clone, PartialEq)]
pub struct BranchFragment {
    pub source_table: String,
    pub type_tag: String,
    /// Qualified merged foreign key
    pub foreign_key: String,
    /// Columns this branch fills with `NULL`
    pub placeholders: Vec<String>,
    pub eager_loads: Vec<String>,
    pub projection: Vec<ProjectedColumn>,
    pub distinct: bool,
    /// Branch query with the original foreign-key predicate removed
    pub query: RelationQuery,
}

impl BranchFragment {
    /// Projected column names, in order
    pub fn projected_names(&self) -> Vec<&str> {
        self.projection.iter().map(|column| column.alias.as_str()).collect()
    }

    pub fn to_select(&self) -> SelectStatement {
        let mut select = Query::select();
        for column in &self.projection {
            select.expr_as(column.expr(), Alias::new(column.alias.clone()));
        }
        select.from(Alias::new(self.source_table.clone()));
        if self.distinct {
            select.distinct();
        }
        self.query.apply(&mut select);
        select
    }
}

/// A compiled merged view
#[derive(Debug, Clone, PartialEq)]
pub struct MergedViewSpec {
    pub branches: Vec<BranchFragment>,
    pub union: UnionKind,
    /// Reconciled real columns, in view order
    pub columns: Vec<String>,
    /// Pivot tables carried by every row (empty when suppressed)
    pub pivot_tables: Vec<PivotTableRef>,
}

impl MergedViewSpec {
    /// Column names of the view, in order
    pub fn output_columns(&self) -> Vec<String> {
        self.branches
            .first()
            .map(|branch| branch.projected_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Aliases of the pivot columns
    pub fn pivot_columns(&self) -> Vec<String> {
        self.pivot_tables
            .iter()
            .flat_map(|pivot| {
                pivot
                    .columns
                    .iter()
                    .map(move |column| pivot_alias(&pivot.table, &pivot.accessor, column))
            })
            .collect()
    }

    /// The combined query: first branch, then every other branch unioned on
    pub fn to_statement(&self) -> SelectStatement {
        let mut branches = self.branches.iter();
        let mut statement = match branches.next() {
            Some(first) => first.to_select(),
            None => Query::select(),
        };
        for branch in branches {
            statement.union(self.union.union_type(), branch.to_select());
        }
        statement
    }

    /// The combined query as SQL with literals inlined
    pub fn to_sql(&self, backend: Backend) -> String {
        backend.render_select(&self.to_statement())
    }
}

/// Compile analysed branches into a merged view
///
/// # Errors
///
/// Returns `MergeError::EmptyRelationSet` when `descriptors` is empty.
pub fn compile(
    descriptors: Vec<RelationDescriptor>,
    columns: &ColumnSet,
    all_columns: &[String],
    pivot_tables: &[PivotTableRef],
    allow_duplicates: bool,
) -> MergeResult<MergedViewSpec> {
    if descriptors.is_empty() {
        return Err(MergeError::EmptyRelationSet);
    }

    let branches = descriptors
        .into_iter()
        .map(|descriptor| compile_branch(descriptor, columns, all_columns, pivot_tables))
        .collect();

    Ok(MergedViewSpec {
        branches,
        union: UnionKind::from_duplicates(allow_duplicates),
        columns: all_columns.to_vec(),
        pivot_tables: pivot_tables.to_vec(),
    })
}

fn compile_branch(
    descriptor: RelationDescriptor,
    columns: &ColumnSet,
    all_columns: &[String],
    pivot_tables: &[PivotTableRef],
) -> BranchFragment {
    let RelationDescriptor {
        source_table,
        type_tag,
        original_foreign_key,
        merged_foreign_key,
        mut query,
        constraint,
        ..
    } = descriptor;

    // Re-applied at read time against an explicit parent key
    query.remove_wheres_on(&original_foreign_key);

    let mut projection = Vec::with_capacity(all_columns.len() + 4);
    let mut placeholders = Vec::new();

    for column in all_columns {
        let source = if columns.has_column(&source_table, column) {
            ProjectionSource::Column(qualify(&source_table, column))
        } else {
            placeholders.push(column.clone());
            ProjectionSource::Placeholder
        };
        projection.push(ProjectedColumn {
            alias: column.clone(),
            source,
        });
    }

    for pivot in pivot_tables {
        for column in &pivot.columns {
            projection.push(ProjectedColumn {
                alias: pivot_alias(&pivot.table, &pivot.accessor, column),
                source: ProjectionSource::Pivot(qualify(&pivot.table, column)),
            });
        }
    }

    let eager_loads = query.eager_loads.clone();
    projection.extend([
        ProjectedColumn {
            alias: FOREIGN_KEY.to_string(),
            source: ProjectionSource::ForeignKey(merged_foreign_key.clone()),
        },
        ProjectedColumn {
            alias: TYPE_TAG.to_string(),
            source: ProjectionSource::Literal(type_tag.clone()),
        },
        ProjectedColumn {
            alias: PLACEHOLDER_LIST.to_string(),
            source: ProjectionSource::Literal(placeholders.join(",")),
        },
        ProjectedColumn {
            alias: EAGER_LOAD_LIST.to_string(),
            source: ProjectionSource::Literal(eager_loads.join(",")),
        },
    ]);

    let mut distinct = false;
    if let Some(constraint) = constraint {
        distinct = constraint.distinct;
        query.join(constraint.join);
    }

    BranchFragment {
        source_table,
        type_tag,
        foreign_key: merged_foreign_key,
        placeholders,
        eager_loads,
        projection,
        distinct,
        query,
    }
}

/// Describe, reconcile and compile `relations` into a merged view
///
/// Nothing is sent to the engine except column listings, one per distinct source table.
///
/// # Errors
///
/// Returns `MergeError::EmptyRelationSet` or `MergeError::UnsupportedRelationKind` before
/// any column listing is requested; listing failures are passed through.
pub fn compile_relations<E>(
    executor: &E,
    view: &str,
    relations: &[Relation],
    allow_duplicates: bool,
) -> MergeResult<MergedViewSpec>
where
    E: MergeExecutor + ?Sized,
{
    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::compile_view_span(view, relations.len()).entered();

    if relations.is_empty() {
        return Err(MergeError::EmptyRelationSet);
    }

    let descriptors = relations.iter().map(describe).collect::<MergeResult<Vec<_>>>()?;
    let (columns, all_columns) = reconcile(executor, &descriptors)?;
    let pivot_tables = aggregate(&descriptors);

    let spec = compile(descriptors, &columns, &all_columns, &pivot_tables, allow_duplicates)?;

    log::debug!(
        "Compiled merged view {view}: {} branches, {} columns, {} pivot columns, {:?}",
        spec.branches.len(),
        spec.columns.len(),
        spec.pivot_columns().len(),
        spec.union
    );
    #[cfg(feature = "metrics")]
    METRICS.record_view_compiled();

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::kinds::MorphTo;
    use crate::tests_cfg::{
        comment_meta, comments_of_posts_of_user, comments_of_user, post_of_comment, posts_of_tag,
        posts_of_tag_with_pivot, user_of_comment, user_of_comment_deep, videos_of_tag,
        videos_of_tag_deep_with_pivot, MockExecutor,
    };

    fn compile_fixture(relations: &[Relation], allow_duplicates: bool) -> MergedViewSpec {
        let executor = MockExecutor::with_fixture_tables();
        compile_relations(&executor, "merged", relations, allow_duplicates).unwrap()
    }

    #[test]
    fn test_every_branch_projects_the_same_columns() {
        let spec = compile_fixture(&[posts_of_tag(), videos_of_tag()], true);

        let expected = vec![
            "id",
            "user_id",
            "created_at",
            "updated_at",
            "foreign_key",
            "type_tag",
            "placeholder_list",
            "eager_load_list",
        ];
        for branch in &spec.branches {
            assert_eq!(branch.projected_names(), expected);
        }
        assert_eq!(spec.output_columns(), expected);
    }

    #[test]
    fn test_placeholders_and_metadata() {
        let spec = compile_fixture(&[posts_of_tag(), videos_of_tag()], true);
        let (posts, videos) = (&spec.branches[0], &spec.branches[1]);

        assert_eq!(posts.placeholders, vec!["created_at", "updated_at"]);
        assert_eq!(videos.placeholders, vec!["user_id"]);
        assert_eq!(posts.eager_loads, vec!["comments"]);
        assert!(videos.eager_loads.is_empty());
        assert_eq!(posts.foreign_key, "taggables.tag_id");

        let literal = |branch: &BranchFragment, alias: &str| {
            branch
                .projection
                .iter()
                .find(|column| column.alias == alias)
                .map(|column| column.source.clone())
        };
        assert_eq!(
            literal(posts, PLACEHOLDER_LIST),
            Some(ProjectionSource::Literal("created_at,updated_at".into()))
        );
        assert_eq!(literal(videos, TYPE_TAG), Some(ProjectionSource::Literal("Video".into())));
        assert_eq!(literal(posts, EAGER_LOAD_LIST), Some(ProjectionSource::Literal("comments".into())));
    }

    #[test]
    fn test_original_foreign_key_predicate_is_removed() {
        let relation = comments_of_user().constrain(1);
        let spec = compile_fixture(&[relation], true);

        let sql = spec.to_sql(Backend::Postgres);
        assert!(!sql.contains("WHERE"), "{sql}");
        assert!(sql.contains(r#""comments"."user_id" AS "foreign_key""#), "{sql}");
    }

    #[test]
    fn test_union_operator() {
        let relations = [comments_of_user(), comments_of_posts_of_user()];

        let all = compile_fixture(&relations, true).to_sql(Backend::Postgres);
        assert!(all.contains("UNION ALL"), "{all}");

        let distinct = compile_fixture(&relations, false).to_sql(Backend::Postgres);
        assert!(distinct.contains("UNION"), "{distinct}");
        assert!(!distinct.contains("UNION ALL"), "{distinct}");
    }

    #[test]
    fn test_belongs_to_gets_distinct_join() {
        let spec = compile_fixture(&[post_of_comment()], true);
        let sql = spec.to_sql(Backend::Postgres);

        assert!(sql.starts_with("SELECT DISTINCT"), "{sql}");
        assert!(
            sql.contains(r#"INNER JOIN "comments" ON "comments"."post_id" = "posts"."id""#),
            "{sql}"
        );
        assert!(sql.contains(r#""comments"."id" AS "foreign_key""#), "{sql}");
    }

    #[test]
    fn test_leading_inverse_deep_chain_joins_far_parent() {
        let spec = compile_fixture(&[user_of_comment_deep(), user_of_comment()], true);
        let sql = spec.to_sql(Backend::Postgres);

        assert!(
            sql.contains(r#"INNER JOIN "comments" ON "comments"."post_id" = "posts"."id""#),
            "{sql}"
        );
        assert_eq!(spec.branches[0].foreign_key, "comments.id");
        assert_eq!(spec.branches[1].foreign_key, "comments.id");
    }

    #[test]
    fn test_shared_pivot_columns_are_projected() {
        let spec = compile_fixture(&[posts_of_tag_with_pivot(), videos_of_tag_deep_with_pivot()], true);

        assert_eq!(
            spec.pivot_columns(),
            vec!["__taggables__pivot__label", "__taggables__pivot__active"]
        );
        for branch in &spec.branches {
            let names = branch.projected_names();
            assert!(names.contains(&"__taggables__pivot__label"));
            assert_eq!(names.len(), spec.output_columns().len());
        }
        let sql = spec.to_sql(Backend::Postgres);
        assert!(sql.contains(r#""taggables"."label" AS "__taggables__pivot__label""#), "{sql}");
    }

    #[test]
    fn test_mismatched_pivots_project_none() {
        let spec = compile_fixture(&[posts_of_tag_with_pivot(), videos_of_tag()], true);

        assert!(spec.pivot_columns().is_empty());
        assert!(!spec.output_columns().iter().any(|name| name.starts_with("__")));
    }

    #[test]
    fn test_compile_errors_happen_before_listing() {
        let executor = MockExecutor::with_fixture_tables();

        let err = compile_relations(&executor, "merged", &[], true).unwrap_err();
        assert!(matches!(err, MergeError::EmptyRelationSet));

        let morph_to = Relation::from(MorphTo::new(comment_meta(), "commentable_type", "commentable_id"));
        let err = compile_relations(&executor, "merged", &[comments_of_user(), morph_to], true).unwrap_err();
        assert!(matches!(err, MergeError::UnsupportedRelationKind(_)));

        assert!(executor.listed_tables().is_empty());
    }

    #[test]
    fn test_compile_is_stable() {
        let relations = [posts_of_tag(), videos_of_tag()];
        assert_eq!(compile_fixture(&relations, true), compile_fixture(&relations, true));
    }
}
