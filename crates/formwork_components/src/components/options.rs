//! Formatted option records shared by picker-like items

use std::cell::RefCell;
use std::rc::Rc;

/// Formats one option value for display
pub type OptionFormatter<T> = Rc<dyn Fn(&T) -> String>;

/// One selectable value and its display string
#[derive(Clone, Debug, PartialEq)]
pub struct OptionItem<T> {
    value: T,
    formatted_value: Option<String>,
}

impl<T> OptionItem<T> {
    fn new(value: T, formatter: Option<&OptionFormatter<T>>) -> Self {
        let formatted_value = formatter.map(|format| format(&value));
        Self {
            value,
            formatted_value,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn formatted_value(&self) -> Option<&str> {
        self.formatted_value.as_deref()
    }
}

/// Source values and their option records, kept in step
pub(crate) struct OptionList<T> {
    options: RefCell<Vec<OptionItem<T>>>,
    formatter: RefCell<Option<OptionFormatter<T>>>,
}

impl<T> Default for OptionList<T> {
    fn default() -> Self {
        Self {
            options: RefCell::new(Vec::new()),
            formatter: RefCell::new(None),
        }
    }
}

impl<T: Clone + PartialEq> OptionList<T> {
    /// Replace the source; every option record is recreated
    pub(crate) fn set_source(&self, source: impl IntoIterator<Item = T>) {
        let formatter = self.formatter.borrow().clone();
        let options = source
            .into_iter()
            .map(|value| OptionItem::new(value, formatter.as_ref()))
            .collect();
        *self.options.borrow_mut() = options;
    }

    /// Swap the formatter and re-format the existing records in place
    pub(crate) fn set_formatter(&self, formatter: Option<OptionFormatter<T>>) {
        for option in self.options.borrow_mut().iter_mut() {
            option.formatted_value = formatter.as_ref().map(|format| format(&option.value));
        }
        *self.formatter.borrow_mut() = formatter;
    }

    pub(crate) fn format(&self, value: &T) -> Option<String> {
        let formatter = self.formatter.borrow().clone()?;
        Some(formatter(value))
    }

    pub(crate) fn source(&self) -> Vec<T> {
        self.options
            .borrow()
            .iter()
            .map(|option| option.value.clone())
            .collect()
    }

    pub(crate) fn options(&self) -> Vec<OptionItem<T>> {
        self.options.borrow().clone()
    }

    pub(crate) fn value_at(&self, index: usize) -> Option<T> {
        self.options
            .borrow()
            .get(index)
            .map(|option| option.value.clone())
    }

    pub(crate) fn position(&self, value: &T) -> Option<usize> {
        self.options
            .borrow()
            .iter()
            .position(|option| &option.value == value)
    }

    pub(crate) fn len(&self) -> usize {
        self.options.borrow().len()
    }
}
