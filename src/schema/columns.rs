//! Column reconciliation across merged branches.

use crate::error::{MergeError, MergeResult};
use crate::executor::MergeExecutor;
use crate::relation::introspect::RelationDescriptor;
use std::collections::HashMap;

/// Column listings of the source tables of one merge, fetched once per table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    tables: HashMap<String, Vec<String>>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns of `table`, empty if it was never listed
    pub fn columns(&self, table: &str) -> &[String] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns(table).iter().any(|c| c == column)
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<String>) {
        self.tables.insert(table.into(), columns);
    }
}

/// List the columns of every branch's source table and their ordered union
///
/// The cache lives for this call only, so a table altered between two merges is
/// listed afresh. The union keeps first-seen order over branches.
pub fn reconcile<E>(executor: &E, descriptors: &[RelationDescriptor]) -> MergeResult<(ColumnSet, Vec<String>)>
where
    E: MergeExecutor + ?Sized,
{
    let mut columns = ColumnSet::new();
    let mut all_columns: Vec<String> = Vec::new();

    for descriptor in descriptors {
        let table = &descriptor.source_table;
        if columns.contains_table(table) {
            continue;
        }

        let listing = executor.column_listing(table)?;
        if listing.is_empty() {
            return Err(MergeError::QueryError(format!("table {table} has no columns or does not exist")));
        }
        log::debug!("Listed {} columns of {table}", listing.len());

        for column in &listing {
            if !all_columns.contains(column) {
                all_columns.push(column.clone());
            }
        }
        columns.insert(table.clone(), listing);
    }

    Ok((columns, all_columns))
}
