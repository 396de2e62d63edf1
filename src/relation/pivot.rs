//! Pivot aggregation: decide whether intermediate-table columns travel with a merged view.

use crate::relation::introspect::RelationDescriptor;

/// Intermediate table whose columns are projected into a merged view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PivotTableRef {
    pub table: String,
    /// Name the pivot record is attached under on decoded models
    pub accessor: String,
    pub columns: Vec<String>,
}

impl PivotTableRef {
    pub fn new<I, S>(table: impl Into<String>, accessor: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            accessor: accessor.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Pivot tables shared by every branch, or nothing
///
/// Propagation is all-or-nothing: every descriptor must report a non-empty list and
/// all lists must be identical, otherwise no pivot columns are carried at all.
pub fn aggregate(descriptors: &[RelationDescriptor]) -> Vec<PivotTableRef> {
    let Some(first) = descriptors.first() else {
        return Vec::new();
    };

    let shared = descriptors
        .iter()
        .all(|descriptor| !descriptor.pivot_tables.is_empty() && descriptor.pivot_tables == first.pivot_tables);

    if shared {
        return first.pivot_tables.clone();
    }

    if descriptors.iter().any(|descriptor| !descriptor.pivot_tables.is_empty()) {
        log::debug!(
            "Pivot columns differ across {} merged relations, not propagating them",
            descriptors.len()
        );
    }
    Vec::new()
}
