//! Single-value picker item
//!
//! The bound value is `Option<V>`: `None` means nothing is picked. Options
//! are drawn from a bounded `source`; each is materialized as an
//! [`OptionItem`] whose picked state is derived from the current value.
//!
//! # Example
//!
//! ```rust
//! use formwork_components::prelude::*;
//! use formwork_core::PropertyPath;
//!
//! let protocol = PickerItem::new(PropertyPath::<Option<String>>::from_static("protocol"))
//!     .with_label("Protocol")
//!     .with_input_type(PickerInputType::PopUp)
//!     .with_source(["ssh".to_string(), "http".to_string()])
//!     .with_formatter(|value: &String| value.to_uppercase());
//!
//! assert_eq!(protocol.options()[0].formatted_value(), Some("SSH"));
//! ```

use formwork_core::{
    AnyItem, Form, FormError, FormNode, ItemKind, OptionView, PropertyPath, Result,
    ValidatableFormItem, ValidationRule,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::str::FromStr;

use super::options::{OptionItem, OptionList};

/// How the option list is presented
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PickerInputType {
    /// Pushed list screen
    #[default]
    Default,
    /// Modal sheet
    Dialog,
    /// Anchored pop-up menu
    PopUp,
}

impl PickerInputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickerInputType::Default => "default",
            PickerInputType::Dialog => "dialog",
            PickerInputType::PopUp => "popup",
        }
    }
}

impl fmt::Display for PickerInputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PickerInputType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(PickerInputType::Default),
            "dialog" => Ok(PickerInputType::Dialog),
            "popup" | "pop-up" | "pop_up" => Ok(PickerInputType::PopUp),
            _ => Err(FormError::UnsupportedInputType {
                kind: "picker",
                value: s.to_string(),
            }),
        }
    }
}

/// Picker metadata shared by the single and multi-value pickers
pub(crate) struct PickerState<T> {
    pub(crate) message: RefCell<Option<String>>,
    pub(crate) input_type: Cell<PickerInputType>,
    pub(crate) can_be_cleared: Cell<bool>,
    pub(crate) options: OptionList<T>,
}

impl<T> Default for PickerState<T> {
    fn default() -> Self {
        Self {
            message: RefCell::new(None),
            input_type: Cell::new(PickerInputType::Default),
            can_be_cleared: Cell::new(false),
            options: OptionList::default(),
        }
    }
}

/// Validatable item picking one value out of `source`
///
/// Cloning yields another handle to the same item.
pub struct PickerItem<V> {
    inner: ValidatableFormItem<Option<V>>,
    state: Rc<PickerState<V>>,
}

impl<V> Clone for PickerItem<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<V: Clone + PartialEq + 'static> PickerItem<V> {
    pub fn new(path: PropertyPath<Option<V>>) -> Self {
        Self {
            inner: ValidatableFormItem::new(path),
            state: Rc::new(PickerState::default()),
        }
    }

    // =========================================================================
    // BUILDER
    // =========================================================================

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.set_label(Some(label.into()));
        self
    }

    /// Prompt shown above the option list
    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.set_message(Some(message.into()));
        self
    }

    pub fn with_input_type(self, input_type: PickerInputType) -> Self {
        self.set_input_type(input_type);
        self
    }

    pub fn with_can_be_cleared(self, can_be_cleared: bool) -> Self {
        self.set_can_be_cleared(can_be_cleared);
        self
    }

    pub fn with_read_only(self, is_read_only: bool) -> Self {
        self.set_read_only(is_read_only);
        self
    }

    pub fn with_source(self, source: impl IntoIterator<Item = V>) -> Self {
        self.set_source(source);
        self
    }

    pub fn with_formatter(self, formatter: impl Fn(&V) -> String + 'static) -> Self {
        self.set_option_formatter(Some(Rc::new(formatter)));
        self
    }

    pub fn with_rule(self, rule: ValidationRule<Option<V>>) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn with_requirement(
        self,
        predicate: impl Fn(&Option<V>) -> bool + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.with_rule(ValidationRule::require(predicate, message))
    }

    pub fn with_callback(self, callback: impl Fn(&Form, &Option<V>) + 'static) -> Self {
        self.set_callback(Some(Rc::new(callback)));
        self
    }

    // =========================================================================
    // METADATA
    // =========================================================================

    pub fn message(&self) -> Option<String> {
        self.state.message.borrow().clone()
    }

    pub fn set_message(&self, message: Option<String>) {
        *self.state.message.borrow_mut() = message;
        self.notify("message");
    }

    pub fn input_type(&self) -> PickerInputType {
        self.state.input_type.get()
    }

    pub fn set_input_type(&self, input_type: PickerInputType) {
        self.state.input_type.set(input_type);
        self.notify("input_type");
    }

    pub fn can_be_cleared(&self) -> bool {
        self.state.can_be_cleared.get()
    }

    pub fn set_can_be_cleared(&self, can_be_cleared: bool) {
        self.state.can_be_cleared.set(can_be_cleared);
        self.notify("can_be_cleared");
    }

    // =========================================================================
    // OPTIONS
    // =========================================================================

    pub fn source(&self) -> Vec<V> {
        self.state.options.source()
    }

    /// Replace the source; every option record is recreated
    pub fn set_source(&self, source: impl IntoIterator<Item = V>) {
        self.state.options.set_source(source);
        self.notify("source");
        self.notify("options");
    }

    pub fn options(&self) -> Vec<OptionItem<V>> {
        self.state.options.options()
    }

    /// Formatter for option values; also formats the picked value
    pub fn set_option_formatter(&self, formatter: Option<Rc<dyn Fn(&V) -> String>>) {
        self.state.options.set_formatter(formatter.clone());

        let item_formatter = formatter.map(|format| {
            Rc::new(move |value: &Option<V>| value.as_ref().map(|v| format(v)).unwrap_or_default())
                as Rc<dyn Fn(&Option<V>) -> String>
        });
        self.set_formatter(item_formatter);
        self.notify("options");
    }

    pub fn is_picked(&self, option: &OptionItem<V>) -> bool {
        self.value().as_ref() == Some(option.value())
    }

    /// Pick the option at `index`, or clear the value with `None`
    pub fn pick(&self, index: Option<usize>) -> Result<()> {
        match index {
            Some(index) => {
                let value = self
                    .state
                    .options
                    .value_at(index)
                    .ok_or(FormError::OptionOutOfRange {
                        index,
                        len: self.state.options.len(),
                    })?;
                self.set_value(Some(value));
                Ok(())
            }
            None => self.clear(),
        }
    }

    /// Pick a value by equality; it must be part of `source`
    pub fn pick_value(&self, value: V) -> Result<()> {
        if self.state.options.position(&value).is_none() {
            return Err(FormError::UnknownOption);
        }
        self.set_value(Some(value));
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if !self.can_be_cleared() {
            return Err(FormError::NotClearable);
        }
        self.set_value(None);
        Ok(())
    }
}

impl<V> Deref for PickerItem<V> {
    type Target = ValidatableFormItem<Option<V>>;

    fn deref(&self) -> &ValidatableFormItem<Option<V>> {
        &self.inner
    }
}

impl<V: Clone + PartialEq + 'static> FormNode for PickerItem<V> {
    fn item(&self) -> &dyn AnyItem {
        self.inner.as_item()
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Picker
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn options(&self) -> Vec<OptionView> {
        let value = self.value();
        self.state
            .options
            .options()
            .into_iter()
            .enumerate()
            .map(|(index, option)| OptionView {
                index,
                is_picked: value.as_ref() == Some(option.value()),
                formatted_value: option.formatted_value().map(str::to_string),
            })
            .collect()
    }

    fn pick(&self, index: Option<usize>) -> Result<()> {
        if self.is_read_only() {
            tracing::trace!(item = %self.id(), "Read-only picker, pick skipped");
            return Ok(());
        }
        PickerItem::pick(self, index)
    }
}

impl<V> fmt::Debug for PickerItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickerItem")
            .field("inner", &self.inner)
            .field("input_type", &self.state.input_type.get())
            .field("can_be_cleared", &self.state.can_be_cleared.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bind, strings, Settings};
    use formwork_core::property;

    fn theme_picker() -> PickerItem<String> {
        PickerItem::new(property!(Settings::theme))
            .with_label("Theme")
            .with_source(strings(&["light", "dark", "system"]))
            .with_formatter(|theme: &String| theme.to_uppercase())
    }

    #[test]
    fn test_input_type_from_str() {
        assert_eq!("PopUp".parse::<PickerInputType>(), Ok(PickerInputType::PopUp));
        assert_eq!("dialog".parse::<PickerInputType>(), Ok(PickerInputType::Dialog));
        assert_eq!(
            "wheel".parse::<PickerInputType>(),
            Err(FormError::UnsupportedInputType {
                kind: "picker",
                value: "wheel".to_string()
            })
        );
    }

    #[test]
    fn test_pick_writes_target_and_derives_picked_state() {
        let settings = Settings::new();
        let picker = theme_picker();
        let _form = bind(&settings, picker.clone());

        picker.pick(Some(1)).unwrap();
        assert_eq!(settings.theme().as_deref(), Some("dark"));
        assert_eq!(picker.formatted_value().as_deref(), Some("DARK"));

        let picked: Vec<bool> = FormNode::options(&picker).iter().map(|o| o.is_picked).collect();
        assert_eq!(picked, vec![false, true, false]);

        let options = picker.options();
        assert!(picker.is_picked(&options[1]));
        assert!(!picker.is_picked(&options[0]));
    }

    #[test]
    fn test_pick_out_of_range_and_unknown_value() {
        let settings = Settings::new();
        let picker = theme_picker();
        let _form = bind(&settings, picker.clone());

        assert_eq!(
            picker.pick(Some(3)),
            Err(FormError::OptionOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            picker.pick_value("sepia".to_string()),
            Err(FormError::UnknownOption)
        );
        assert_eq!(settings.theme(), None);

        picker.pick_value("system".to_string()).unwrap();
        assert_eq!(settings.theme().as_deref(), Some("system"));
    }

    #[test]
    fn test_clear_requires_permission() {
        let settings = Settings::new();
        let picker = theme_picker();
        let _form = bind(&settings, picker.clone());
        picker.pick(Some(0)).unwrap();

        assert_eq!(picker.pick(None), Err(FormError::NotClearable));
        assert_eq!(settings.theme().as_deref(), Some("light"));

        picker.set_can_be_cleared(true);
        picker.pick(None).unwrap();
        assert_eq!(settings.theme(), None);
        assert_eq!(picker.formatted_value().as_deref(), Some(""));
    }

    #[test]
    fn test_regenerating_source_rebuilds_options() {
        let settings = Settings::new();
        let picker = theme_picker();
        let _form = bind(&settings, picker.clone());

        let names = Rc::new(RefCell::new(Vec::new()));
        let names_clone = names.clone();
        let _sub = picker
            .property_changed()
            .subscribe(move |e| names_clone.borrow_mut().push(e.name().map(str::to_string)));

        picker.set_source(strings(&["solarized"]));

        assert_eq!(picker.source(), strings(&["solarized"]));
        assert_eq!(picker.options()[0].formatted_value(), Some("SOLARIZED"));
        assert_eq!(
            *names.borrow(),
            vec![Some("source".to_string()), Some("options".to_string())]
        );
    }

    #[test]
    fn test_formatter_change_reformats_options() {
        let picker = theme_picker();
        picker.set_option_formatter(Some(Rc::new(|theme: &String| format!("[{theme}]"))));

        let formatted: Vec<Option<String>> = picker
            .options()
            .iter()
            .map(|o| o.formatted_value().map(str::to_string))
            .collect();
        assert_eq!(
            formatted,
            vec![
                Some("[light]".to_string()),
                Some("[dark]".to_string()),
                Some("[system]".to_string())
            ]
        );
    }

    #[test]
    fn test_read_only_picker_ignores_node_pick() {
        let settings = Settings::new();
        let picker = theme_picker().with_read_only(true);
        let form = bind(&settings, picker.clone());

        let node = form.find(picker.id()).unwrap();
        node.pick(Some(2)).unwrap();
        assert_eq!(settings.theme(), None);
    }

    #[test]
    fn test_required_rule_tracks_external_changes() {
        let settings = Settings::new();
        let picker = theme_picker().with_requirement(Option::is_some, "Pick a theme");
        let form = bind(&settings, picker.clone());

        assert!(!form.is_valid());
        settings.set_theme(Some("dark".to_string()));
        assert!(form.is_valid());
        assert_eq!(picker.validation_error_message(), None);
    }
}
