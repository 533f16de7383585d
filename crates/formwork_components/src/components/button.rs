//! Button item
//!
//! A constant-valued item whose only interaction is its action. A read-only
//! button ignores `invoke`, which lets a form gate its submit button on
//! validity.
//!
//! # Example
//!
//! ```rust
//! use formwork_components::prelude::*;
//! use formwork_core::FormNode;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let clicks = Rc::new(Cell::new(0));
//! let counter = clicks.clone();
//!
//! let button = ButtonItem::new(move || counter.set(counter.get() + 1))
//!     .with_label("Delete")
//!     .with_input_type(ButtonInputType::Destructive);
//!
//! button.invoke().unwrap();
//! assert_eq!(clicks.get(), 1);
//! ```

use formwork_core::{AnyItem, FormError, FormItem, FormNode, ItemKind, Result};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::str::FromStr;

/// Button visual role
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ButtonInputType {
    /// Plain action
    #[default]
    Default,
    /// Completes or confirms a flow
    Done,
    /// Deletes or discards data
    Destructive,
}

impl ButtonInputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonInputType::Default => "default",
            ButtonInputType::Done => "done",
            ButtonInputType::Destructive => "destructive",
        }
    }
}

impl fmt::Display for ButtonInputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ButtonInputType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(ButtonInputType::Default),
            "done" => Ok(ButtonInputType::Done),
            "destructive" => Ok(ButtonInputType::Destructive),
            _ => Err(FormError::UnsupportedInputType {
                kind: "button",
                value: s.to_string(),
            }),
        }
    }
}

struct ButtonState {
    prefix: RefCell<Option<String>>,
    input_type: Cell<ButtonInputType>,
    action: Rc<dyn Fn()>,
}

/// Constant-valued item with a parameterless action
#[derive(Clone)]
pub struct ButtonItem {
    item: FormItem<()>,
    state: Rc<ButtonState>,
}

impl ButtonItem {
    pub fn new(action: impl Fn() + 'static) -> Self {
        Self {
            item: FormItem::constant(()),
            state: Rc::new(ButtonState {
                prefix: RefCell::new(None),
                input_type: Cell::new(ButtonInputType::Default),
                action: Rc::new(action),
            }),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.item.set_label(Some(label.into()));
        self
    }

    /// Leading text shown before the label
    pub fn with_prefix(self, prefix: impl Into<String>) -> Self {
        self.set_prefix(Some(prefix.into()));
        self
    }

    pub fn with_input_type(self, input_type: ButtonInputType) -> Self {
        self.set_input_type(input_type);
        self
    }

    pub fn with_read_only(self, is_read_only: bool) -> Self {
        self.item.set_read_only(is_read_only);
        self
    }

    pub fn with_visible(self, is_visible: bool) -> Self {
        self.item.set_visible(is_visible);
        self
    }

    pub fn prefix(&self) -> Option<String> {
        self.state.prefix.borrow().clone()
    }

    pub fn set_prefix(&self, prefix: Option<String>) {
        *self.state.prefix.borrow_mut() = prefix;
        self.item.notify("prefix");
    }

    pub fn input_type(&self) -> ButtonInputType {
        self.state.input_type.get()
    }

    pub fn set_input_type(&self, input_type: ButtonInputType) {
        self.state.input_type.set(input_type);
        self.item.notify("input_type");
    }
}

impl Deref for ButtonItem {
    type Target = FormItem<()>;

    fn deref(&self) -> &FormItem<()> {
        &self.item
    }
}

impl FormNode for ButtonItem {
    fn item(&self) -> &dyn AnyItem {
        &self.item
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Button
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn invoke(&self) -> Result<()> {
        if self.item.is_read_only() {
            tracing::trace!(item = %self.item.id(), "Read-only button, action skipped");
            return Ok(());
        }

        tracing::debug!(item = %self.item.id(), label = ?self.item.label(), "Button invoked");
        (self.state.action)();
        Ok(())
    }
}

impl fmt::Debug for ButtonItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonItem")
            .field("id", &self.item.id())
            .field("label", &self.item.label())
            .field("input_type", &self.input_type())
            .finish()
    }
}
