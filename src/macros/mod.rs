//! Declarative macros.
//!
//! `merged_model!` implements [`MergedModel`](crate::MergedModel) and
//! [`FromAttributes`](crate::FromAttributes) for a struct that has `attributes: Attributes`
//! and `relations: Relations` fields and derives `Debug`, `Clone` and `Default`.

/// Implement `MergedModel` + `FromAttributes` for a model struct.
///
/// ```
/// use merged_relations::{merged_model, Attributes, Relations};
///
/// #[derive(Debug, Clone, Default)]
/// pub struct Video {
///     attributes: Attributes,
///     relations: Relations,
/// }
///
/// merged_model!(Video, "Video");
///
/// #[derive(Debug, Clone, Default)]
/// pub struct Account {
///     attributes: Attributes,
///     relations: Relations,
/// }
///
/// // custom primary key column
/// merged_model!(Account, "Account", key = "account_no");
/// ```
#[macro_export]
macro_rules! merged_model {
    ($model:ty, $class:expr) => {
        $crate::merged_model!($model, $class, key = "id");
    };
    ($model:ty, $class:expr, key = $key:expr) => {
        impl $crate::MergedModel for $model {
            fn class_name(&self) -> &'static str {
                $class
            }

            fn attributes(&self) -> &$crate::Attributes {
                &self.attributes
            }

            fn attributes_mut(&mut self) -> &mut $crate::Attributes {
                &mut self.attributes
            }

            fn relations(&self) -> &$crate::Relations {
                &self.relations
            }

            fn relations_mut(&mut self) -> &mut $crate::Relations {
                &mut self.relations
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn clone_box(&self) -> ::std::boxed::Box<dyn $crate::MergedModel> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }

            fn key_name(&self) -> &str {
                $key
            }
        }

        impl $crate::FromAttributes for $model {
            fn from_attributes(attributes: $crate::Attributes) -> Self {
                Self {
                    attributes,
                    ..::std::default::Default::default()
                }
            }
        }
    };
}
