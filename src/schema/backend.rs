//! SQL dialects for rendering merged views and queries against them.

use sea_query::{MysqlQueryBuilder, PostgresQueryBuilder, SelectStatement, SqliteQueryBuilder, Values};
use serde::Deserialize;
use std::fmt;

/// Database engine a merged view lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    #[serde(alias = "mariadb")]
    MySql,
    Sqlite,
}

impl Backend {
    /// Build a parameterized query
    pub fn build_select(&self, select: &SelectStatement) -> (String, Values) {
        match self {
            Backend::Postgres => select.build(PostgresQueryBuilder),
            Backend::MySql => select.build(MysqlQueryBuilder),
            Backend::Sqlite => select.build(SqliteQueryBuilder),
        }
    }

    /// Render a query with every value inlined as a quoted literal
    pub fn render_select(&self, select: &SelectStatement) -> String {
        match self {
            Backend::Postgres => select.to_string(PostgresQueryBuilder),
            Backend::MySql => select.to_string(MysqlQueryBuilder),
            Backend::Sqlite => select.to_string(SqliteQueryBuilder),
        }
    }

    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Backend::MySql => format!("`{}`", name.replace('`', "``")),
            Backend::Postgres | Backend::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Statements creating a view, optionally replacing an existing one
    ///
    /// Replacing drops first on Postgres and SQLite: Postgres refuses `CREATE OR REPLACE`
    /// when the column list changes and SQLite has no `OR REPLACE` for views.
    pub fn create_view_sql(&self, name: &str, query: &str, replace: bool) -> Vec<String> {
        let create = format!("CREATE VIEW {} AS {query}", self.quote_identifier(name));
        match (self, replace) {
            (_, false) => vec![create],
            (Backend::MySql, true) => vec![format!(
                "CREATE OR REPLACE VIEW {} AS {query}",
                self.quote_identifier(name)
            )],
            (Backend::Postgres | Backend::Sqlite, true) => vec![self.drop_view_sql(name), create],
        }
    }

    pub fn drop_view_sql(&self, name: &str) -> String {
        format!("DROP VIEW IF EXISTS {}", self.quote_identifier(name))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Postgres => write!(f, "postgres"),
            Backend::MySql => write!(f, "mysql"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}
