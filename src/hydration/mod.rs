//! Merged-view rows and their decoding into concrete models.

pub mod row;
pub use row::{MergedRow, EAGER_LOAD_LIST, FOREIGN_KEY, METADATA_COLUMNS, PLACEHOLDER_LIST, TYPE_TAG};

pub mod decoder;
pub use decoder::{decode_batch, decode_row, Hydrated, PivotLayout};
