//! Row decoder: merged-view rows → concrete models.
//!
//! Per row the decoder resolves `type_tag` through the [`MorphRegistry`], removes the
//! metadata columns and every placeholder column (removed, not nulled), rebuilds pivot
//! records from `__{table}__{accessor}__{column}` columns and instantiates the model.
//! The foreign key and eager-load list travel next to the model in [`Hydrated`] instead
//! of inside its attributes.

use crate::error::{MergeError, MergeResult};
use crate::hydration::row::{
    parse_pivot_alias, split_list, MergedRow, EAGER_LOAD_LIST, FOREIGN_KEY, PIVOT_PREFIX,
    PLACEHOLDER_LIST, TYPE_TAG,
};
use crate::model::{is_null, Attributes, MergedModel, MorphRegistry, Pivot, Related};
use sea_query::Value;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// A decoded model with the row metadata that is not part of its attributes
#[derive(Debug, Clone)]
pub struct Hydrated {
    pub model: Box<dyn MergedModel>,
    /// Parent key the row belongs to, if the row carried one
    pub foreign_key: Option<Value>,
    /// Relations the row's branch eager loads
    pub eager_loads: Vec<String>,
}

impl Hydrated {
    pub fn into_model(self) -> Box<dyn MergedModel> {
        self.model
    }
}

/// Pivot column layout of a batch, taken from its first row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotLayout {
    groups: Vec<PivotGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PivotGroup {
    table: String,
    accessor: String,
    /// `(alias, column)` pairs
    columns: Vec<(String, String)>,
}

impl PivotLayout {
    /// Group the pivot columns of `row` by table and accessor
    pub fn from_row(row: &MergedRow) -> Self {
        let mut groups: Vec<PivotGroup> = Vec::new();

        for alias in row.pivot_columns() {
            let Some((table, accessor, column)) = parse_pivot_alias(alias) else {
                continue;
            };
            let entry = (alias.to_string(), column.to_string());
            match groups
                .iter_mut()
                .find(|group| group.table == table && group.accessor == accessor)
            {
                Some(group) => group.columns.push(entry),
                None => groups.push(PivotGroup {
                    table: table.to_string(),
                    accessor: accessor.to_string(),
                    columns: vec![entry],
                }),
            }
        }

        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Accessor names, in column order
    pub fn accessors(&self) -> Vec<&str> {
        self.groups.iter().map(|group| group.accessor.as_str()).collect()
    }
}

fn metadata_string(attributes: &mut Attributes, column: &str) -> Option<String> {
    match attributes.remove(column)? {
        Value::String(Some(value)) => Some(value),
        _ => None,
    }
}

/// Decode one row
///
/// `fallback_tag` is used when the row has no `type_tag`.
///
/// # Errors
///
/// Returns `MergeError::UnknownModelType` when the tag resolves to no registered model.
pub fn decode_row(
    registry: &MorphRegistry,
    row: MergedRow,
    layout: &PivotLayout,
    fallback_tag: Option<&str>,
) -> MergeResult<Hydrated> {
    let mut attributes = row.into_attributes();

    let foreign_key = attributes.remove(FOREIGN_KEY).filter(|value| !is_null(value));
    let type_tag = metadata_string(&mut attributes, TYPE_TAG)
        .or_else(|| fallback_tag.map(str::to_string))
        .ok_or_else(|| MergeError::UnknownModelType(String::new()))?;

    if let Some(placeholders) = metadata_string(&mut attributes, PLACEHOLDER_LIST) {
        for column in split_list(&placeholders) {
            attributes.remove(&column);
        }
    }
    let eager_loads = metadata_string(&mut attributes, EAGER_LOAD_LIST)
        .map(|list| split_list(&list))
        .unwrap_or_default();

    let mut pivot_values: Attributes = attributes
        .drain_matching(|name| name.starts_with(PIVOT_PREFIX))
        .into_iter()
        .collect();

    let mut model = registry.instantiate(&type_tag, attributes)?;

    for group in &layout.groups {
        let mut pivot = Pivot::new(group.table.clone());
        for (alias, column) in &group.columns {
            if let Some(value) = pivot_values.remove(alias) {
                pivot.attributes.insert(column.clone(), value);
            }
        }
        model.set_relation(&group.accessor, Related::Pivot(pivot));
    }

    Ok(Hydrated {
        model,
        foreign_key,
        eager_loads,
    })
}

/// Decode a batch of rows from one query
///
/// # Errors
///
/// Fails on the first row whose tag has no registered model.
pub fn decode_batch(
    registry: &MorphRegistry,
    rows: Vec<MergedRow>,
    fallback_tag: Option<&str>,
) -> MergeResult<Vec<Hydrated>> {
    let layout = rows.first().map(PivotLayout::from_row).unwrap_or_default();
    if !layout.is_empty() {
        log::debug!("Restoring pivot records under {:?}", layout.accessors());
    }

    let count = rows.len();
    let decoded = rows
        .into_iter()
        .map(|row| decode_row(registry, row, &layout, fallback_tag))
        .collect::<MergeResult<Vec<_>>>()?;

    #[cfg(feature = "metrics")]
    METRICS.record_rows_decoded(count as u64);
    log::trace!("Decoded {count} merged rows");

    Ok(decoded)
}
