//! Validation overlay
//!
//! Validation is an optional capability layered on top of [`FormItem`]. A
//! [`ValidatableFormItem`] dereferences to its item and turns on rule
//! evaluation: rules run in insertion order on every value-changed pass and
//! the first failing rule's message becomes the item's
//! `validation_error_message`.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::error::Result;
use crate::item::FormItem;
use crate::node::{AnyItem, FormNode, ItemKind};
use crate::property::PropertyPath;

/// A predicate over the current value producing an optional error message
pub struct ValidationRule<V> {
    check: Rc<dyn Fn(&V) -> Option<String>>,
}

impl<V> ValidationRule<V> {
    /// Rule from a function returning the error message on failure
    pub fn new(check: impl Fn(&V) -> Option<String> + 'static) -> Self {
        Self {
            check: Rc::new(check),
        }
    }

    /// Rule failing with `message` whenever `predicate` is false
    pub fn require(predicate: impl Fn(&V) -> bool + 'static, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |value| (!predicate(value)).then(|| message.clone()))
    }

    /// Run the rule; `Some(message)` on failure
    pub fn evaluate(&self, value: &V) -> Option<String> {
        (self.check)(value)
    }
}

impl<V> Clone for ValidationRule<V> {
    fn clone(&self) -> Self {
        Self {
            check: Rc::clone(&self.check),
        }
    }
}

impl<V> fmt::Debug for ValidationRule<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule").finish_non_exhaustive()
    }
}

/// Rules and last evaluation result of one item
pub(crate) struct Validation<V> {
    rules: Vec<ValidationRule<V>>,
    message: Option<String>,
}

impl<V> Default for Validation<V> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            message: None,
        }
    }
}

impl<V> Validation<V> {
    pub(crate) fn rules(&self) -> &[ValidationRule<V>] {
        &self.rules
    }

    pub(crate) fn rules_mut(&mut self) -> &mut Vec<ValidationRule<V>> {
        &mut self.rules
    }

    pub(crate) fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Store a new message; `true` when it differs from the previous one
    pub(crate) fn replace_message(&mut self, message: Option<String>) -> bool {
        if self.message == message {
            return false;
        }
        self.message = message;
        true
    }
}

/// A [`FormItem`] with validation turned on
///
/// Cloning yields another handle to the same item.
pub struct ValidatableFormItem<V> {
    item: FormItem<V>,
}

impl<V> Clone for ValidatableFormItem<V> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
        }
    }
}

impl<V: Clone + PartialEq + Default + 'static> ValidatableFormItem<V> {
    pub fn new(path: PropertyPath<V>) -> Self {
        Self::from_item(FormItem::new(path))
    }

    pub fn parse(expression: &str) -> Result<Self> {
        Ok(Self::from_item(FormItem::parse(expression)?))
    }

    pub fn constant(value: V) -> Self {
        Self::from_item(FormItem::constant(value))
    }

    /// Layer validation onto an existing item
    pub fn from_item(item: FormItem<V>) -> Self {
        item.enable_validation();
        Self { item }
    }

    /// Underlying item handle
    pub fn as_item(&self) -> &FormItem<V> {
        &self.item
    }

    pub fn into_item(self) -> FormItem<V> {
        self.item
    }

    pub fn with_rule(self, rule: ValidationRule<V>) -> Self {
        self.add_rule(rule);
        self
    }

    /// Append a rule requiring `predicate` to hold
    pub fn with_requirement(
        self,
        predicate: impl Fn(&V) -> bool + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.with_rule(ValidationRule::require(predicate, message))
    }

    /// Append a rule; re-validates when bound
    pub fn add_rule(&self, rule: ValidationRule<V>) {
        self.edit_rules(|rules| rules.push(rule));
    }

    /// Insert a rule at `index`, clamped to the rule count
    pub fn insert_rule(&self, index: usize, rule: ValidationRule<V>) {
        self.edit_rules(|rules| {
            let index = index.min(rules.len());
            rules.insert(index, rule);
        });
    }

    /// Remove the rule at `index`, if any
    pub fn remove_rule(&self, index: usize) -> Option<ValidationRule<V>> {
        let mut removed = None;
        self.edit_rules(|rules| {
            if index < rules.len() {
                removed = Some(rules.remove(index));
            }
        });
        removed
    }

    pub fn clear_rules(&self) {
        self.edit_rules(Vec::clear);
    }

    pub fn rule_count(&self) -> usize {
        self.item
            .with_validation(|validation| validation.rules().len())
            .unwrap_or(0)
    }

    fn edit_rules(&self, edit: impl FnOnce(&mut Vec<ValidationRule<V>>)) {
        self.item
            .with_validation(|validation| edit(validation.rules_mut()));

        if self.item.is_bound() {
            self.item.validate();
        }
    }
}

impl<V> Deref for ValidatableFormItem<V> {
    type Target = FormItem<V>;

    fn deref(&self) -> &FormItem<V> {
        &self.item
    }
}

impl<V: Clone + PartialEq + Default + 'static> FormNode for ValidatableFormItem<V> {
    fn item(&self) -> &dyn AnyItem {
        &self.item
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Custom("value")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<V> fmt::Debug for ValidatableFormItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValidatableFormItem").field(&self.item).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Form;
    use crate::property::BindingTarget;
    use crate::testing::Person;
    use std::cell::Cell;

    fn email_item() -> ValidatableFormItem<Option<String>> {
        ValidatableFormItem::new(PropertyPath::from_static("email"))
            .with_requirement(Option::is_some, "Email is required")
            .with_requirement(
                |email: &Option<String>| email.as_ref().map_or(true, |e| e.len() < 10),
                "Email is too long",
            )
    }

    fn bind<V: Clone + PartialEq + Default + 'static>(
        item: &FormItem<V>,
        target: &Rc<dyn BindingTarget>,
    ) -> Form {
        let form = Form::new(Rc::clone(target));
        item.initialize(&form, target);
        form
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let person = Person::new("Ada", 30);
        let target: Rc<dyn BindingTarget> = person.clone();
        let item = email_item();
        let _form = bind(&item, &target);

        assert!(!item.is_valid());
        assert_eq!(item.validation_error_message().as_deref(), Some("Email is required"));

        person.set_email(Some("ada@example.com".to_string()));
        assert_eq!(item.validation_error_message().as_deref(), Some("Email is too long"));

        item.set_value(Some("a@b.io".to_string()));
        assert!(item.is_valid());
        assert_eq!(item.validation_error_message(), None);
    }

    #[test]
    fn test_message_change_notifies_once() {
        let person = Person::new("Ada", 30);
        let target: Rc<dyn BindingTarget> = person.clone();
        let item = email_item();
        let _form = bind(&item, &target);

        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let _sub = item.property_changed().subscribe(move |e| {
            if e.name() == Some("validation_error_message") {
                hits_clone.set(hits_clone.get() + 1);
            }
        });

        // Still failing the same rule
        assert!(!item.validate());
        assert_eq!(hits.get(), 0);

        person.set_email(Some("x@y.z".to_string()));
        assert_eq!(hits.get(), 1);

        person.set_email(Some("q@r.s".to_string()));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_rules_can_change_while_bound() {
        let target: Rc<dyn BindingTarget> = Person::new("Ada", 30);
        let item = ValidatableFormItem::new(crate::property!(Person::age));
        let _form = bind(&item, &target);
        assert!(item.is_valid());

        item.add_rule(ValidationRule::require(|age: &i32| *age >= 40, "Too young"));
        assert_eq!(item.validation_error_message().as_deref(), Some("Too young"));

        item.insert_rule(0, ValidationRule::require(|age: &i32| *age < 18, "Too old"));
        assert_eq!(item.validation_error_message().as_deref(), Some("Too old"));
        assert_eq!(item.rule_count(), 2);

        assert!(item.remove_rule(0).is_some());
        assert!(item.remove_rule(5).is_none());
        assert_eq!(item.validation_error_message().as_deref(), Some("Too young"));

        item.clear_rules();
        assert!(item.is_valid());
    }

    #[test]
    fn test_plain_item_is_always_valid() {
        let target: Rc<dyn BindingTarget> = Person::new("Ada", 30);
        let item = FormItem::new(crate::property!(Person::age));
        let _form = bind(&item, &target);

        assert!(item.validate());
        assert!(item.is_valid());
    }
}
