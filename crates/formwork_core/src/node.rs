//! Item capability interface
//!
//! Presentation code never sees the value type of an item. It drives every
//! item through two object-safe traits:
//!
//! - [`AnyItem`]: the metadata contract (label, read-only, visibility,
//!   validation message, formatted value), the untyped value contract and the
//!   binding lifecycle.
//! - [`FormNode`]: the closed set of item kinds plus the action contract
//!   (invoke a button, pick an option).

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{FormError, Result};
use crate::form::Form;
use crate::notify::{ChangeNotifier, Subscription};
use crate::property::BindingTarget;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an item across re-renders
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Stable identity of a group across re-renders
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    pub(crate) fn next() -> Self {
        Self(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// The kinds of item a presentation layer knows how to render
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Text,
    Button,
    Picker,
    MultiValuePicker,
    Segments,
    /// Application-defined item rendered by application-defined cells
    Custom(&'static str),
}

impl ItemKind {
    pub fn name(&self) -> &'static str {
        match *self {
            ItemKind::Text => "text",
            ItemKind::Button => "button",
            ItemKind::Picker => "picker",
            ItemKind::MultiValuePicker => "multi-value picker",
            ItemKind::Segments => "segments",
            ItemKind::Custom(name) => name,
        }
    }
}

/// Raised after an item's value-changed pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueChanged {
    pub item: ItemId,
    /// Bound property name, `None` for constant-valued items
    pub property: Option<String>,
}

/// Raised when an item's visibility actually flips
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityChanged {
    pub item: ItemId,
    pub is_visible: bool,
}

/// Render-ready view of one selectable option
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionView {
    pub index: usize,
    pub formatted_value: Option<String>,
    pub is_picked: bool,
}

/// Metadata, untyped value and lifecycle contract of a form item
pub trait AnyItem {
    fn id(&self) -> ItemId;

    /// Name of the bound property, `None` for constant-valued items
    fn property_name(&self) -> Option<&str>;

    fn label(&self) -> Option<String>;

    fn is_read_only(&self) -> bool;

    fn is_visible(&self) -> bool;

    fn is_value_changed(&self) -> bool;

    /// Display string derived from the current value
    fn formatted_value(&self) -> Option<String>;

    fn validation_error_message(&self) -> Option<String>;

    fn is_valid(&self) -> bool {
        self.validation_error_message().is_none()
    }

    /// Re-evaluate validation rules; `true` when valid
    fn validate(&self) -> bool;

    /// Current value, boxed
    fn value_any(&self) -> Box<dyn Any>;

    /// Write a boxed value; it must hold the item's value type
    fn set_value_any(&self, value: Box<dyn Any>) -> Result<()>;

    fn value_type_name(&self) -> &'static str;

    /// Whether the item is attached to a live form
    fn is_bound(&self) -> bool;

    /// Bind (or re-bind) the item to `target` on behalf of `form`
    fn initialize(&self, form: &Form, target: &Rc<dyn BindingTarget>);

    /// Unbind without disposing; the item can be initialized again
    fn detach(&self);

    /// Release the binding for good
    fn dispose(&self);

    fn property_changed(&self) -> &ChangeNotifier;

    fn subscribe_value_changed(&self, listener: Box<dyn Fn(&ValueChanged)>) -> Subscription;

    fn subscribe_visibility_changed(
        &self,
        listener: Box<dyn Fn(&VisibilityChanged)>,
    ) -> Subscription;
}

/// An item as held by a group: kind, core item and interactive actions
pub trait FormNode: 'static {
    fn item(&self) -> &dyn AnyItem;

    fn kind(&self) -> ItemKind;

    fn as_any(&self) -> &dyn Any;

    /// Options a picker-like item offers, in display order
    fn options(&self) -> Vec<OptionView> {
        Vec::new()
    }

    /// Run the item's parameterless action
    fn invoke(&self) -> Result<()> {
        Err(FormError::UnsupportedAction {
            kind: self.kind().name(),
            action: "invoke",
        })
    }

    /// Pick the option at `index`, or clear the value with `None`
    fn pick(&self, _index: Option<usize>) -> Result<()> {
        Err(FormError::UnsupportedAction {
            kind: self.kind().name(),
            action: "pick",
        })
    }

    fn initialize(&self, form: &Form, target: &Rc<dyn BindingTarget>) {
        self.item().initialize(form, target);
    }

    fn detach(&self) {
        self.item().detach();
    }

    fn dispose(&self) {
        self.item().dispose();
    }
}

impl fmt::Debug for dyn FormNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormNode")
            .field("id", &self.item().id())
            .field("kind", &self.kind())
            .field("property", &self.item().property_name())
            .finish()
    }
}
