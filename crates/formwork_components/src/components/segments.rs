//! Segmented control item
//!
//! A segmented control always shows one selection, so unlike the picker its
//! value is a plain `V` and cannot be cleared.

use formwork_core::{
    AnyItem, Form, FormError, FormNode, ItemKind, OptionView, PropertyPath, Result,
    ValidatableFormItem, ValidationRule,
};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use super::options::{OptionItem, OptionList};

/// Validatable item choosing one segment out of `source`
///
/// Cloning yields another handle to the same item.
pub struct SegmentsItem<V> {
    inner: ValidatableFormItem<V>,
    options: Rc<OptionList<V>>,
}

impl<V> Clone for SegmentsItem<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            options: Rc::clone(&self.options),
        }
    }
}

impl<V: Clone + PartialEq + Default + 'static> SegmentsItem<V> {
    pub fn new(path: PropertyPath<V>) -> Self {
        Self {
            inner: ValidatableFormItem::new(path),
            options: Rc::new(OptionList::default()),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.set_label(Some(label.into()));
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

    pub fn with_rule(self, rule: ValidationRule<V>) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn with_callback(self, callback: impl Fn(&Form, &V) + 'static) -> Self {
        self.set_callback(Some(Rc::new(callback)));
        self
    }

    pub fn source(&self) -> Vec<V> {
        self.options.source()
    }

    /// Replace the source; every segment record is recreated
    pub fn set_source(&self, source: impl IntoIterator<Item = V>) {
        self.options.set_source(source);
        self.notify("source");
        self.notify("options");
    }

    pub fn options(&self) -> Vec<OptionItem<V>> {
        self.options.options()
    }

    /// Formatter for segment titles and the item's formatted value
    pub fn set_option_formatter(&self, formatter: Option<Rc<dyn Fn(&V) -> String>>) {
        self.options.set_formatter(formatter.clone());
        self.set_formatter(formatter);
        self.notify("options");
    }

    /// Formatted title of `value`, if a formatter is set
    pub fn format(&self, value: &V) -> Option<String> {
        self.options.format(value)
    }

    pub fn is_picked(&self, option: &OptionItem<V>) -> bool {
        &self.value() == option.value()
    }

    /// Index of the selected segment, if the value is part of the source
    pub fn selected_index(&self) -> Option<usize> {
        self.options.position(&self.value())
    }

    /// Select the segment at `index`
    pub fn pick(&self, index: usize) -> Result<()> {
        let value = self
            .options
            .value_at(index)
            .ok_or(FormError::OptionOutOfRange {
                index,
                len: self.options.len(),
            })?;
        self.set_value(value);
        Ok(())
    }

    /// Select a segment by value; it must be part of `source`
    pub fn pick_value(&self, value: V) -> Result<()> {
        if self.options.position(&value).is_none() {
            return Err(FormError::UnknownOption);
        }
        self.set_value(value);
        Ok(())
    }
}

impl<V> Deref for SegmentsItem<V> {
    type Target = ValidatableFormItem<V>;

    fn deref(&self) -> &ValidatableFormItem<V> {
        &self.inner
    }
}

impl<V: Clone + PartialEq + Default + 'static> FormNode for SegmentsItem<V> {
    fn item(&self) -> &dyn AnyItem {
        self.inner.as_item()
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Segments
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn options(&self) -> Vec<OptionView> {
        let value = self.value();
        self.options
            .options()
            .into_iter()
            .enumerate()
            .map(|(index, option)| OptionView {
                index,
                is_picked: option.value() == &value,
                formatted_value: option.formatted_value().map(str::to_string),
            })
            .collect()
    }

    fn pick(&self, index: Option<usize>) -> Result<()> {
        let Some(index) = index else {
            return Err(FormError::NotClearable);
        };
        if self.is_read_only() {
            tracing::trace!(item = %self.id(), "Read-only segments, pick skipped");
            return Ok(());
        }
        SegmentsItem::pick(self, index)
    }
}

impl<V: Clone + PartialEq> fmt::Debug for SegmentsItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentsItem")
            .field("inner", &self.inner)
            .field("segments", &self.options.len())
            .finish()
    }
}
