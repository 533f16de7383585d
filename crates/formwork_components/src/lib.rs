//! # Formwork Component Library (formwork_components)
//!
//! The concrete item kinds a presentation layer knows how to render, built on
//! the `formwork_core` binding engine.
//!
//! - **Text**: Validatable text entry with placeholder and keyboard style
//! - **Button**: Constant-valued item with a parameterless action
//! - **Picker**: One value out of a source list, optionally clearable
//! - **Multi-value picker**: Any number of values out of a source list
//! - **Segments**: Segmented control over a source list
//!
//! ## Example
//!
//! ```rust
//! use formwork_components::prelude::*;
//! use formwork_core::{FormGroup, PropertyPath};
//!
//! let group = FormGroup::new()
//!     .with_header("Connection")
//!     .with_item(
//!         TextItem::new(PropertyPath::<String>::from_static("host"))
//!             .with_label("Host")
//!             .with_input_type(TextInputType::Url),
//!     )
//!     .with_item(
//!         SegmentsItem::new(PropertyPath::<u16>::from_static("port"))
//!             .with_label("Port")
//!             .with_source([22, 80, 443]),
//!     );
//!
//! assert_eq!(group.len(), 2);
//! ```

pub mod components;

pub use components::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::components::button::{ButtonInputType, ButtonItem};
    pub use crate::components::multi_picker::MultiValuePickerItem;
    pub use crate::components::options::OptionItem;
    pub use crate::components::picker::{PickerInputType, PickerItem};
    pub use crate::components::segments::SegmentsItem;
    pub use crate::components::text::{TextInputType, TextItem};
}

#[cfg(test)]
mod testing;
