//! Wire shape of one row returned from a merged view.
//!
//! A `MergedRow` carries the unioned real columns (NULL where the branch lacks them),
//! the four metadata columns and zero or more `__{table}__{accessor}__{column}` pivot
//! columns. Executors produce it; the decoder consumes it.

use crate::model::attributes::Attributes;
use sea_query::Value;

/// Alias of the merged foreign key column
pub const FOREIGN_KEY: &str = "foreign_key";
/// Alias of the polymorphic type tag column
pub const TYPE_TAG: &str = "type_tag";
/// Alias of the comma-joined placeholder column list
pub const PLACEHOLDER_LIST: &str = "placeholder_list";
/// Alias of the comma-joined eager-load list
pub const EAGER_LOAD_LIST: &str = "eager_load_list";

/// All metadata column aliases, in projection order
pub const METADATA_COLUMNS: [&str; 4] = [FOREIGN_KEY, TYPE_TAG, PLACEHOLDER_LIST, EAGER_LOAD_LIST];

/// Prefix marking a pivot column
pub const PIVOT_PREFIX: &str = "__";

/// Build the alias of a pivot column
pub fn pivot_alias(table: &str, accessor: &str, column: &str) -> String {
    format!("{PIVOT_PREFIX}{table}__{accessor}__{column}")
}

/// Split a pivot alias into `(table, accessor, column)`
///
/// Accessor and column are taken from the right so that a table name may itself
/// contain a double underscore.
pub fn parse_pivot_alias(alias: &str) -> Option<(&str, &str, &str)> {
    let rest = alias.strip_prefix(PIVOT_PREFIX)?;
    let mut parts = rest.rsplitn(3, "__");
    let column = parts.next()?;
    let accessor = parts.next()?;
    let table = parts.next()?;
    if table.is_empty() || accessor.is_empty() || column.is_empty() {
        return None;
    }
    Some((table, accessor, column))
}

/// Split a comma-joined list; the empty string means an empty list
///
/// Names containing a comma cannot be represented.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// One flat row returned from a merged view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRow {
    columns: Attributes,
}

impl MergedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style)
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column, value.into());
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column, value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys()
    }

    /// Names of the pivot columns present in this row
    pub fn pivot_columns(&self) -> Vec<&str> {
        self.columns
            .keys()
            .filter(|name| name.starts_with(PIVOT_PREFIX))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_attributes(self) -> Attributes {
        self.columns
    }
}

impl From<Attributes> for MergedRow {
    fn from(columns: Attributes) -> Self {
        Self { columns }
    }
}

impl FromIterator<(String, Value)> for MergedRow {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
