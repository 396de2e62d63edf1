//! Underlying query shapes carried by relation definitions.
//!
//! A relation's query is kept as plain data (source table, inner joins, predicates,
//! eager-load names) so that the view compiler can drop the predicate on the original
//! foreign key before lowering everything to a SeaQuery `SelectStatement`.

use sea_query::{Alias, Expr, ExprTrait, JoinType, SelectStatement, Value};

/// Metadata of a model taking part in a relation
///
/// # Example
///
/// ```
/// use merged_relations::relation::ModelMeta;
///
/// let users = ModelMeta::new("users", "User");
/// assert_eq!(users.qualified_key_name(), "users.id");
/// assert_eq!(users.qualify("created_at"), "users.created_at");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMeta {
    /// Table the model is stored in
    pub table: String,
    /// Primary key column
    pub key_name: String,
    /// Type tag written into merged views for rows of this model
    pub morph_class: String,
}

impl ModelMeta {
    pub fn new(table: impl Into<String>, morph_class: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_name: "id".to_string(),
            morph_class: morph_class.into(),
        }
    }

    /// Use a primary key column other than `id`
    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    /// Qualify a column with this model's table
    pub fn qualify(&self, column: &str) -> String {
        qualify(&self.table, column)
    }

    pub fn qualified_key_name(&self) -> String {
        self.qualify(&self.key_name)
    }
}

/// `table.column`
pub fn qualify(table: &str, column: &str) -> String {
    format!("{table}.{column}")
}

/// Column expression for a possibly qualified column name
pub(crate) fn column_expr(column: &str) -> Expr {
    match column.split_once('.') {
        Some((table, column)) => {
            Expr::col((Alias::new(table.to_string()), Alias::new(column.to_string())))
        }
        None => Expr::col(Alias::new(column.to_string())),
    }
}

/// A predicate of a relation query
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// `column = value`
    Eq { column: String, value: Value },
    /// `column IS NOT NULL`
    NotNull { column: String },
    /// `column IN (values)`
    In { column: String, values: Vec<Value> },
    /// Raw SQL fragment, never matched against a foreign key
    Raw(String),
}

impl Where {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Where::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Where::NotNull {
            column: column.into(),
        }
    }

    /// Column the predicate filters on, if it targets a single column
    pub fn column(&self) -> Option<&str> {
        match self {
            Where::Eq { column, .. } | Where::NotNull { column } | Where::In { column, .. } => {
                Some(column)
            }
            Where::Raw(_) => None,
        }
    }

    pub(crate) fn to_expr(&self) -> Expr {
        match self {
            Where::Eq { column, value } => column_expr(column).eq(value.clone()),
            Where::NotNull { column } => column_expr(column).is_not_null(),
            Where::In { column, values } => column_expr(column).is_in(values.clone()),
            Where::Raw(sql) => Expr::cust(sql.clone()),
        }
    }
}

/// `INNER JOIN table ON first = second`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    /// Qualified column on one side
    pub first: String,
    /// Qualified column on the other side
    pub second: String,
}

impl Join {
    pub fn new(table: impl Into<String>, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    pub(crate) fn apply(&self, select: &mut SelectStatement) {
        select.join(
            JoinType::InnerJoin,
            Alias::new(self.table.clone()),
            column_expr(&self.first).eq(column_expr(&self.second)),
        );
    }
}

/// The query a relation runs for its related rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationQuery {
    /// Source table of the related rows
    pub from: String,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    /// Relations eager loaded on every related row
    pub eager_loads: Vec<String>,
}

impl RelationQuery {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Default::default()
        }
    }

    pub fn join(&mut self, join: Join) -> &mut Self {
        self.joins.push(join);
        self
    }

    pub fn and_where(&mut self, predicate: Where) -> &mut Self {
        self.wheres.push(predicate);
        self
    }

    /// Add eager-load names, skipping ones already present
    pub fn with<I, S>(&mut self, relations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for relation in relations {
            let relation = relation.into();
            if !self.eager_loads.contains(&relation) {
                self.eager_loads.push(relation);
            }
        }
        self
    }

    /// Drop every predicate on `column`
    pub fn remove_wheres_on(&mut self, column: &str) {
        self.wheres.retain(|predicate| predicate.column() != Some(column));
    }

    /// Lower joins and predicates onto `select`, which already selects from `self.from`
    pub(crate) fn apply(&self, select: &mut SelectStatement) {
        for join in &self.joins {
            join.apply(select);
        }
        for predicate in &self.wheres {
            select.and_where(predicate.to_expr());
        }
    }
}
