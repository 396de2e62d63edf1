//! Value conversion between `may_postgres` and `sea_query::Value`
//!
//! - **`params`** - bind SeaQuery `Values` as `may_postgres` parameters
//! - **`row`** - convert result rows into [`MergedRow`](crate::MergedRow)

pub mod params;
pub mod row;

pub use params::with_converted_params;
pub use row::row_to_merged_row;
