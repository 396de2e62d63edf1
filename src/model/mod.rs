//! Hydrated model types.
//!
//! - **Attributes**: insertion-ordered column values
//! - **Traits**: `MergedModel`, `Related`, `Pivot`
//! - **Registry**: type tag → concrete model factory

pub mod attributes;
#[doc(inline)]
pub use attributes::{is_null, Attributes};

pub mod traits;
#[doc(inline)]
pub use traits::{FromAttributes, MergedModel, Pivot, Related, Relations};

pub mod registry;
#[doc(inline)]
pub use registry::{ModelFactory, MorphRegistry};
