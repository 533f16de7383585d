//! Multi-value picker item
//!
//! The bound value is a `Vec<V>`. Picking an option toggles its membership;
//! the resulting list keeps source order, with values the source does not
//! know about kept at the end.

use formwork_core::{
    AnyItem, Form, FormError, FormNode, ItemKind, OptionView, PropertyPath, Result,
    ValidatableFormItem, ValidationRule,
};
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use super::options::OptionItem;
use super::picker::{PickerInputType, PickerState};

/// Validatable item picking any number of values out of `source`
///
/// Cloning yields another handle to the same item.
pub struct MultiValuePickerItem<V> {
    inner: ValidatableFormItem<Vec<V>>,
    state: Rc<PickerState<V>>,
}

impl<V> Clone for MultiValuePickerItem<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            state: Rc::clone(&self.state),
        }
    }
}

impl<V: Clone + PartialEq + 'static> MultiValuePickerItem<V> {
    pub fn new(path: PropertyPath<Vec<V>>) -> Self {
        let item = Self {
            inner: ValidatableFormItem::new(path),
            state: Rc::new(PickerState::default()),
        };
        item.state.can_be_cleared.set(true);
        item
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.set_label(Some(label.into()));
        self
    }

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

    pub fn with_source(self, source: impl IntoIterator<Item = V>) -> Self {
        self.set_source(source);
        self
    }

    pub fn with_formatter(self, formatter: impl Fn(&V) -> String + 'static) -> Self {
        self.set_option_formatter(Some(Rc::new(formatter)));
        self
    }

    pub fn with_rule(self, rule: ValidationRule<Vec<V>>) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn with_requirement(
        self,
        predicate: impl Fn(&Vec<V>) -> bool + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.with_rule(ValidationRule::require(predicate, message))
    }

    pub fn with_callback(self, callback: impl Fn(&Form, &Vec<V>) + 'static) -> Self {
        self.set_callback(Some(Rc::new(callback)));
        self
    }

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

    pub fn source(&self) -> Vec<V> {
        self.state.options.source()
    }

    pub fn set_source(&self, source: impl IntoIterator<Item = V>) {
        self.state.options.set_source(source);
        self.notify("source");
        self.notify("options");
    }

    pub fn options(&self) -> Vec<OptionItem<V>> {
        self.state.options.options()
    }

    /// Formatter for option values; the item's formatted value joins the
    /// formatted picked values
    pub fn set_option_formatter(&self, formatter: Option<Rc<dyn Fn(&V) -> String>>) {
        self.state.options.set_formatter(formatter.clone());

        let item_formatter = formatter.map(|format| {
            Rc::new(move |values: &Vec<V>| {
                values
                    .iter()
                    .map(|value| format(value))
                    .collect::<Vec<_>>()
                    .join(", ")
            }) as Rc<dyn Fn(&Vec<V>) -> String>
        });
        self.set_formatter(item_formatter);
        self.notify("options");
    }

    pub fn is_picked(&self, option: &OptionItem<V>) -> bool {
        self.value().contains(option.value())
    }

    /// Toggle the option at `index`, or clear every value with `None`
    pub fn pick(&self, index: Option<usize>) -> Result<()> {
        let Some(index) = index else {
            return self.clear();
        };

        let toggled = self
            .state
            .options
            .value_at(index)
            .ok_or(FormError::OptionOutOfRange {
                index,
                len: self.state.options.len(),
            })?;
        self.toggle(toggled);
        Ok(())
    }

    /// Toggle a value by equality; it must be part of `source`
    pub fn pick_value(&self, value: V) -> Result<()> {
        if self.state.options.position(&value).is_none() {
            return Err(FormError::UnknownOption);
        }
        self.toggle(value);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if !self.can_be_cleared() {
            return Err(FormError::NotClearable);
        }
        self.set_value(Vec::new());
        Ok(())
    }

    fn toggle(&self, toggled: V) {
        let current = self.value();
        let was_picked = current.contains(&toggled);

        let source = self.state.options.source();
        let mut next: Vec<V> = source
            .iter()
            .filter(|value| {
                if **value == toggled {
                    !was_picked
                } else {
                    current.contains(value)
                }
            })
            .cloned()
            .collect();

        let unknown: SmallVec<[V; 4]> = current
            .into_iter()
            .filter(|value| !source.contains(value))
            .collect();
        next.extend(unknown);

        self.set_value(next);
    }
}

impl<V> Deref for MultiValuePickerItem<V> {
    type Target = ValidatableFormItem<Vec<V>>;

    fn deref(&self) -> &ValidatableFormItem<Vec<V>> {
        &self.inner
    }
}

impl<V: Clone + PartialEq + 'static> FormNode for MultiValuePickerItem<V> {
    fn item(&self) -> &dyn AnyItem {
        self.inner.as_item()
    }

    fn kind(&self) -> ItemKind {
        ItemKind::MultiValuePicker
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
                is_picked: value.contains(option.value()),
                formatted_value: option.formatted_value().map(str::to_string),
            })
            .collect()
    }

    fn pick(&self, index: Option<usize>) -> Result<()> {
        if self.is_read_only() {
            tracing::trace!(item = %self.id(), "Read-only picker, pick skipped");
            return Ok(());
        }
        MultiValuePickerItem::pick(self, index)
    }
}

impl<V> fmt::Debug for MultiValuePickerItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiValuePickerItem")
            .field("inner", &self.inner)
            .field("input_type", &self.state.input_type.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bind, strings, Settings};
    use formwork_core::property;

    fn tags_picker() -> MultiValuePickerItem<String> {
        MultiValuePickerItem::new(property!(Settings::tags))
            .with_label("Tags")
            .with_source(strings(&["red", "green", "blue"]))
            .with_formatter(|tag: &String| tag.to_uppercase())
    }

    #[test]
    fn test_pick_toggles_in_source_order() {
        let settings = Settings::new();
        let picker = tags_picker();
        let _form = bind(&settings, picker.clone());

        picker.pick(Some(2)).unwrap();
        picker.pick(Some(0)).unwrap();
        assert_eq!(settings.tags(), strings(&["red", "blue"]));
        assert_eq!(picker.formatted_value().as_deref(), Some("RED, BLUE"));

        picker.pick(Some(2)).unwrap();
        assert_eq!(settings.tags(), strings(&["red"]));

        let picked: Vec<bool> = FormNode::options(&picker).iter().map(|o| o.is_picked).collect();
        assert_eq!(picked, vec![true, false, false]);
    }

    #[test]
    fn test_unknown_values_are_kept() {
        let settings = Settings::new();
        settings.set_tags(strings(&["legacy"]));
        let picker = tags_picker();
        let _form = bind(&settings, picker.clone());

        picker.pick_value("green".to_string()).unwrap();
        assert_eq!(settings.tags(), strings(&["green", "legacy"]));

        assert_eq!(picker.pick_value("legacy".to_string()), Err(FormError::UnknownOption));
    }

    #[test]
    fn test_clear() {
        let settings = Settings::new();
        let picker = tags_picker();
        let _form = bind(&settings, picker.clone());
        picker.pick(Some(1)).unwrap();

        picker.pick(None).unwrap();
        assert!(settings.tags().is_empty());

        picker.set_can_be_cleared(false);
        assert_eq!(picker.pick(None), Err(FormError::NotClearable));
        assert_eq!(
            picker.pick(Some(9)),
            Err(FormError::OptionOutOfRange { index: 9, len: 3 })
        );
    }

    #[test]
    fn test_is_picked_follows_target() {
        let settings = Settings::new();
        let picker = tags_picker();
        let _form = bind(&settings, picker.clone());

        settings.set_tags(strings(&["blue"]));
        let options = picker.options();
        assert!(picker.is_picked(&options[2]));
        assert!(!picker.is_picked(&options[0]));
    }
}
