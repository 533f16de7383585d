//! Form item kinds
//!
//! Each kind wraps a core item and adds its own metadata, raising
//! property-changed for it while bound:
//!
//! - [`TextItem`]: `placeholder`, `input_type`
//! - [`ButtonItem`]: `prefix`, `input_type`
//! - [`PickerItem`] / [`MultiValuePickerItem`]: `message`, `input_type`,
//!   `can_be_cleared`, `source`, `options`
//! - [`SegmentsItem`]: `source`, `options`

pub mod button;
pub mod multi_picker;
pub mod options;
pub mod picker;
pub mod segments;
pub mod text;

pub use button::{ButtonInputType, ButtonItem};
pub use multi_picker::MultiValuePickerItem;
pub use options::{OptionFormatter, OptionItem};
pub use picker::{PickerInputType, PickerItem};
pub use segments::SegmentsItem;
pub use text::{TextInputType, TextItem};
