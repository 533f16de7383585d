//! Text entry item
//!
//! # Example
//!
//! ```rust
//! use formwork_components::prelude::*;
//! use formwork_core::PropertyPath;
//!
//! let email = TextItem::new(PropertyPath::<String>::from_static("email"))
//!     .with_label("Email")
//!     .with_placeholder("name@example.com")
//!     .with_input_type(TextInputType::Email)
//!     .with_requirement(|value: &String| value.contains('@'), "Enter a valid email");
//!
//! assert_eq!(email.input_type(), TextInputType::Email);
//! ```

use formwork_core::{
    AnyItem, Form, FormError, FormNode, ItemKind, PropertyPath, Result, ValidatableFormItem,
    ValidationRule,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::str::FromStr;

/// Keyboard / entry style of a text item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextInputType {
    /// Free text
    #[default]
    Default,
    Email,
    Number,
    /// Masked entry
    Password,
    Url,
    Phone,
}

impl TextInputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextInputType::Default => "default",
            TextInputType::Email => "email",
            TextInputType::Number => "number",
            TextInputType::Password => "password",
            TextInputType::Url => "url",
            TextInputType::Phone => "phone",
        }
    }
}

impl fmt::Display for TextInputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextInputType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "text" => Ok(TextInputType::Default),
            "email" => Ok(TextInputType::Email),
            "number" => Ok(TextInputType::Number),
            "password" => Ok(TextInputType::Password),
            "url" => Ok(TextInputType::Url),
            "phone" => Ok(TextInputType::Phone),
            _ => Err(FormError::UnsupportedInputType {
                kind: "text",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct TextState {
    placeholder: RefCell<Option<String>>,
    input_type: Cell<TextInputType>,
}

/// Validatable text entry bound to a property
///
/// Cloning yields another handle to the same item.
pub struct TextItem<V> {
    inner: ValidatableFormItem<V>,
    state: Rc<TextState>,
}

impl<V> Clone for TextItem<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<V: Clone + PartialEq + Default + 'static> TextItem<V> {
    pub fn new(path: PropertyPath<V>) -> Self {
        Self {
            inner: ValidatableFormItem::new(path),
            state: Rc::new(TextState::default()),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.set_label(Some(label.into()));
        self
    }

    pub fn with_placeholder(self, placeholder: impl Into<String>) -> Self {
        self.set_placeholder(Some(placeholder.into()));
        self
    }

    pub fn with_input_type(self, input_type: TextInputType) -> Self {
        self.set_input_type(input_type);
        self
    }

    pub fn with_read_only(self, is_read_only: bool) -> Self {
        self.set_read_only(is_read_only);
        self
    }

    pub fn with_formatter(self, formatter: impl Fn(&V) -> String + 'static) -> Self {
        self.set_formatter(Some(Rc::new(formatter)));
        self
    }

    pub fn with_rule(self, rule: ValidationRule<V>) -> Self {
        self.add_rule(rule);
        self
    }

    /// Add a rule requiring `predicate` to hold
    pub fn with_requirement(
        self,
        predicate: impl Fn(&V) -> bool + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.with_rule(ValidationRule::require(predicate, message))
    }

    pub fn with_callback(self, callback: impl Fn(&Form, &V) + 'static) -> Self {
        self.set_callback(Some(Rc::new(callback)));
        self
    }

    pub fn placeholder(&self) -> Option<String> {
        self.state.placeholder.borrow().clone()
    }

    pub fn set_placeholder(&self, placeholder: Option<String>) {
        *self.state.placeholder.borrow_mut() = placeholder;
        self.notify("placeholder");
    }

    pub fn input_type(&self) -> TextInputType {
        self.state.input_type.get()
    }

    pub fn set_input_type(&self, input_type: TextInputType) {
        self.state.input_type.set(input_type);
        self.notify("input_type");
    }
}

impl<V> Deref for TextItem<V> {
    type Target = ValidatableFormItem<V>;

    fn deref(&self) -> &ValidatableFormItem<V> {
        &self.inner
    }
}

impl<V: Clone + PartialEq + Default + 'static> FormNode for TextItem<V> {
    fn item(&self) -> &dyn AnyItem {
        self.inner.as_item()
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Text
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<V> fmt::Debug for TextItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextItem")
            .field("inner", &self.inner)
            .field("input_type", &self.state.input_type.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bind, Settings};
    use formwork_core::property;

    fn name_item() -> TextItem<String> {
        TextItem::new(property!(Settings::name))
            .with_label("Name")
            .with_requirement(|name: &String| !name.is_empty(), "Name is required")
    }

    #[test]
    fn test_input_type_from_str() {
        assert_eq!("Email".parse::<TextInputType>(), Ok(TextInputType::Email));
        assert_eq!(" phone ".parse::<TextInputType>(), Ok(TextInputType::Phone));
        assert_eq!(
            "hex".parse::<TextInputType>(),
            Err(FormError::UnsupportedInputType {
                kind: "text",
                value: "hex".to_string()
            })
        );
    }

    #[test]
    fn test_text_item_binds_and_validates() {
        let settings = Settings::new();
        let name = name_item();
        let form = bind(&settings, name.clone());

        assert_eq!(name.kind(), ItemKind::Text);
        assert!(!form.is_valid());
        assert_eq!(name.validation_error_message().as_deref(), Some("Name is required"));

        name.set_value("Ada".to_string());
        assert_eq!(settings.name(), "Ada");
        assert!(form.is_valid());
    }

    #[test]
    fn test_metadata_notifies_while_bound() {
        let settings = Settings::new();
        let name = name_item();
        let _form = bind(&settings, name.clone());

        let names = Rc::new(RefCell::new(Vec::new()));
        let names_clone = names.clone();
        let _sub = name
            .property_changed()
            .subscribe(move |e| names_clone.borrow_mut().push(e.name().map(str::to_string)));

        name.set_placeholder(Some("Your name".to_string()));
        name.set_input_type(TextInputType::Password);

        assert_eq!(
            *names.borrow(),
            vec![Some("placeholder".to_string()), Some("input_type".to_string())]
        );
        assert_eq!(name.placeholder().as_deref(), Some("Your name"));
    }

    #[test]
    fn test_node_reports_item_metadata() {
        let settings = Settings::new();
        settings.set_name("Grace".to_string());
        let name = name_item().with_formatter(|name| name.to_uppercase());
        let _form = bind(&settings, name.clone());

        let node: &dyn FormNode = &name;
        assert_eq!(node.item().label().as_deref(), Some("Name"));
        assert_eq!(node.item().formatted_value().as_deref(), Some("GRACE"));
        assert!(node.options().is_empty());
        assert!(node.invoke().is_err());
    }
}
