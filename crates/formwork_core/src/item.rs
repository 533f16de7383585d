//! The binding node
//!
//! A [`FormItem<V>`] wraps either one property of a target object or a
//! constant value. While bound, the target is the single source of truth:
//! [`FormItem::value`] reads through the resolved getter on every call and
//! [`FormItem::set_value`] writes through the resolved setter.
//!
//! # Value-changed pass
//!
//! Whenever the value is judged to have changed, whatever the origin, the
//! item runs one pass:
//!
//! 1. re-validate (when the validation layer is enabled)
//! 2. raise property-changed for `value` and `formatted_value`
//! 3. raise [`ValueChanged`]
//! 4. invoke the value-changed callback, unless suppressed
//!
//! The pass is skipped entirely while the item is unbound.
//!
//! # Re-entrancy
//!
//! Writing through the setter makes the target raise its own notification,
//! which would re-enter the pass. Two scoped guards prevent that: one marks
//! the write in progress (target notifications for this property are
//! ignored, the write runs its own pass afterwards), the other suppresses the
//! callback. Both are released on every exit path, including a panicking
//! setter.

use smallvec::SmallVec;
use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{FormError, Result};
use crate::form::{Form, WeakForm};
use crate::node::{AnyItem, FormNode, ItemId, ItemKind, ValueChanged, VisibilityChanged};
use crate::notify::{ChangeNotifier, EventSource, NotifyPropertyChanged, PropertyChanged, Subscription};
use crate::property::{BindingTarget, PropertyAccessor, PropertyPath};
use crate::validation::{Validation, ValidationRule};

/// Formats a value for display
pub type Formatter<V> = Rc<dyn Fn(&V) -> String>;

/// Invoked after a successful write of the bound value
pub type ValueCallback<V> = Rc<dyn Fn(&Form, &V)>;

// =============================================================================
// SCOPED FLAG
// =============================================================================

/// Re-entrant flag raised for the lifetime of a guard
#[derive(Debug, Default)]
pub(crate) struct ScopedFlag {
    depth: Cell<u32>,
}

impl ScopedFlag {
    pub(crate) fn raise(&self) -> ScopedFlagGuard<'_> {
        self.depth.set(self.depth.get() + 1);
        ScopedFlagGuard { flag: self }
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.depth.get() > 0
    }
}

pub(crate) struct ScopedFlagGuard<'a> {
    flag: &'a ScopedFlag,
}

impl Drop for ScopedFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.depth.set(self.flag.depth.get().saturating_sub(1));
    }
}

// =============================================================================
// FORM ITEM
// =============================================================================

/// Binding to one concrete target
struct Binding<V> {
    target: Weak<dyn BindingTarget>,
    /// `None` when the target has no matching property
    accessor: Option<PropertyAccessor<V>>,
    _subscription: Option<Subscription>,
}

struct ItemState<V> {
    id: ItemId,
    path: Option<PropertyPath<V>>,
    binding: RefCell<Option<Binding<V>>>,
    local: RefCell<V>,
    form: RefCell<WeakForm>,
    label: RefCell<Option<String>>,
    formatter: RefCell<Option<Formatter<V>>>,
    callback: RefCell<Option<ValueCallback<V>>>,
    validation: RefCell<Option<Validation<V>>>,
    is_read_only: Cell<bool>,
    is_visible: Cell<bool>,
    is_value_changed: Cell<bool>,
    is_disposed: Cell<bool>,
    write_in_progress: ScopedFlag,
    skip_callback: ScopedFlag,
    property_changed: ChangeNotifier,
    value_changed: EventSource<ValueChanged>,
    visibility_changed: EventSource<VisibilityChanged>,
}

/// A bound (or constant) value node
///
/// Cloning yields another handle to the same item.
pub struct FormItem<V> {
    state: Rc<ItemState<V>>,
}

impl<V> Clone for FormItem<V> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<V: Clone + PartialEq + Default + 'static> FormItem<V> {
    /// Item bound to the property named by `path`
    ///
    /// The value stays at its default until the item is initialized.
    pub fn new(path: PropertyPath<V>) -> Self {
        Self::with_source(Some(path), V::default())
    }

    /// Item bound to the property named by accessor text
    pub fn parse(expression: &str) -> Result<Self> {
        Ok(Self::new(PropertyPath::parse(expression)?))
    }

    /// Item wrapping a constant value instead of a property
    pub fn constant(value: V) -> Self {
        Self::with_source(None, value)
    }

    fn with_source(path: Option<PropertyPath<V>>, local: V) -> Self {
        Self {
            state: Rc::new(ItemState {
                id: ItemId::next(),
                path,
                binding: RefCell::new(None),
                local: RefCell::new(local),
                form: RefCell::new(WeakForm::new()),
                label: RefCell::new(None),
                formatter: RefCell::new(None),
                callback: RefCell::new(None),
                validation: RefCell::new(None),
                is_read_only: Cell::new(false),
                is_visible: Cell::new(true),
                is_value_changed: Cell::new(false),
                is_disposed: Cell::new(false),
                write_in_progress: ScopedFlag::default(),
                skip_callback: ScopedFlag::default(),
                property_changed: ChangeNotifier::new(),
                value_changed: EventSource::new(),
                visibility_changed: EventSource::new(),
            }),
        }
    }

    // =========================================================================
    // BUILDER
    // =========================================================================

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.set_label(Some(label.into()));
        self
    }

    pub fn with_read_only(self, is_read_only: bool) -> Self {
        self.set_read_only(is_read_only);
        self
    }

    pub fn with_visible(self, is_visible: bool) -> Self {
        self.set_visible(is_visible);
        self
    }

    pub fn with_formatter(self, formatter: impl Fn(&V) -> String + 'static) -> Self {
        self.set_formatter(Some(Rc::new(formatter)));
        self
    }

    /// Format values with their `Display` implementation
    pub fn with_display(self) -> Self
    where
        V: fmt::Display,
    {
        self.with_formatter(|value| value.to_string())
    }

    pub fn with_callback(self, callback: impl Fn(&Form, &V) + 'static) -> Self {
        self.set_callback(Some(Rc::new(callback)));
        self
    }

    // =========================================================================
    // VALUE
    // =========================================================================

    /// Current value
    ///
    /// Property-bound items read through the target on every call; an
    /// unbound or unresolved item reads as the default value.
    pub fn value(&self) -> V {
        if self.state.path.is_none() {
            return self.state.local.borrow().clone();
        }

        self.accessor()
            .and_then(|accessor| accessor.get())
            .unwrap_or_default()
    }

    /// Write a new value
    ///
    /// A no-op while the item has no target, when the property could not be
    /// resolved or is read-only, and when `value` equals the current value.
    pub fn set_value(&self, value: V) {
        if !self.has_target() {
            tracing::trace!(item = %self.id(), "Write ignored: item has no target");
            return;
        }

        let accessor = self.accessor();
        if self.state.path.is_some() {
            match &accessor {
                Some(accessor) if accessor.is_writable() => {}
                _ => {
                    tracing::trace!(
                        item = %self.id(),
                        property = self.property_name(),
                        "Write ignored: property unresolved or read-only"
                    );
                    return;
                }
            }
        }

        if self.value() == value {
            return;
        }

        self.state.is_value_changed.set(true);

        {
            let _writing = self.state.write_in_progress.raise();
            let _no_callback = self.state.skip_callback.raise();

            match accessor {
                Some(accessor) => {
                    accessor.set(value);
                }
                None => *self.state.local.borrow_mut() = value,
            }
        }

        self.run_value_changed_pass();
    }

    /// Whether a write has ever changed the value
    pub fn is_value_changed(&self) -> bool {
        self.state.is_value_changed.get()
    }

    /// Clear the dirty flag, e.g. after the target was saved
    pub fn reset_value_changed(&self) {
        self.state.is_value_changed.set(false);
    }

    /// Display string for the current value, if a formatter is set
    pub fn formatted_value(&self) -> Option<String> {
        let formatter = self.state.formatter.borrow().clone()?;
        Some(formatter(&self.value()))
    }

    // =========================================================================
    // METADATA
    // =========================================================================

    pub fn id(&self) -> ItemId {
        self.state.id
    }

    pub fn property_name(&self) -> Option<&str> {
        self.state.path.as_ref().map(PropertyPath::name)
    }

    pub fn label(&self) -> Option<String> {
        self.state.label.borrow().clone()
    }

    pub fn set_label(&self, label: Option<String>) {
        *self.state.label.borrow_mut() = label;
        self.notify("label");
    }

    pub fn is_read_only(&self) -> bool {
        self.state.is_read_only.get()
    }

    pub fn set_read_only(&self, is_read_only: bool) {
        self.state.is_read_only.set(is_read_only);
        self.notify("is_read_only");
    }

    pub fn is_visible(&self) -> bool {
        self.state.is_visible.get()
    }

    /// Change visibility; events are raised only on an actual transition
    pub fn set_visible(&self, is_visible: bool) {
        if self.state.is_visible.replace(is_visible) == is_visible {
            return;
        }

        if !self.is_bound() {
            return;
        }

        self.state.property_changed.notify("is_visible");
        self.state.visibility_changed.emit(&VisibilityChanged {
            item: self.id(),
            is_visible,
        });
    }

    pub fn set_formatter(&self, formatter: Option<Formatter<V>>) {
        *self.state.formatter.borrow_mut() = formatter;
        self.notify("formatted_value");
    }

    pub fn set_callback(&self, callback: Option<ValueCallback<V>>) {
        *self.state.callback.borrow_mut() = callback;
    }

    // =========================================================================
    // VALIDATION LAYER
    // =========================================================================

    /// Turn on the validation layer; idempotent
    pub(crate) fn enable_validation(&self) {
        let mut validation = self.state.validation.borrow_mut();
        if validation.is_none() {
            *validation = Some(Validation::default());
        }
    }

    pub(crate) fn with_validation<R>(&self, f: impl FnOnce(&mut Validation<V>) -> R) -> Option<R> {
        self.state.validation.borrow_mut().as_mut().map(f)
    }

    /// First failing rule's message from the last evaluation
    pub fn validation_error_message(&self) -> Option<String> {
        self.state
            .validation
            .borrow()
            .as_ref()
            .and_then(|validation| validation.message().map(str::to_string))
    }

    pub fn is_valid(&self) -> bool {
        self.validation_error_message().is_none()
    }

    /// Evaluate the rules against the current value
    ///
    /// Stores the first failing message and raises property-changed for
    /// `validation_error_message` only when it changes. Items without the
    /// validation layer are always valid.
    pub fn validate(&self) -> bool {
        let rules: SmallVec<[ValidationRule<V>; 4]> = match self.state.validation.borrow().as_ref() {
            Some(validation) => validation.rules().iter().cloned().collect(),
            None => return true,
        };

        let value = self.value();
        let message = rules.iter().find_map(|rule| rule.evaluate(&value));
        let is_valid = message.is_none();

        let changed = self
            .with_validation(|validation| validation.replace_message(message))
            .unwrap_or(false);

        if changed {
            self.notify("validation_error_message");
        }

        is_valid
    }

    // =========================================================================
    // BINDING LIFECYCLE
    // =========================================================================

    /// Bind (or re-bind) to `target` on behalf of `form`
    ///
    /// Drops the previous target's subscription first, resolves the property
    /// against the runtime type of `target`, subscribes to its notifications
    /// and runs an initial pass with the callback suppressed.
    pub fn initialize(&self, form: &Form, target: &Rc<dyn BindingTarget>) {
        if self.state.is_disposed.get() {
            tracing::warn!(item = %self.id(), "Ignoring initialize on a disposed item");
            return;
        }

        // Unsubscribe before subscribing to the new target
        let previous = self.state.binding.borrow_mut().take();
        let rebinding = previous.is_some();
        drop(previous);

        *self.state.form.borrow_mut() = form.downgrade();

        let accessor = self
            .state
            .path
            .as_ref()
            .and_then(|path| PropertyAccessor::resolve(path, target));

        let subscription = match (&self.state.path, target.notifier()) {
            (Some(_), Some(notifier)) => {
                let weak_state = Rc::downgrade(&self.state);
                Some(notifier.subscribe(move |event| {
                    if let Some(state) = weak_state.upgrade() {
                        FormItem { state }.on_target_property_changed(event);
                    }
                }))
            }
            _ => None,
        };

        tracing::debug!(
            item = %self.id(),
            property = self.property_name(),
            target_type = target.properties().target_type(),
            resolved = accessor.is_some(),
            rebinding,
            "Item bound"
        );

        *self.state.binding.borrow_mut() = Some(Binding {
            target: Rc::downgrade(target),
            accessor,
            _subscription: subscription,
        });

        let _initial_sync = self.state.skip_callback.raise();
        self.run_value_changed_pass();
    }

    /// Unbind from the target and the form; the item can be bound again
    pub fn detach(&self) {
        let previous = self.state.binding.borrow_mut().take();
        drop(previous);
        *self.state.form.borrow_mut() = WeakForm::new();
    }

    /// Release the binding for good
    ///
    /// Unsubscribes from the target, drops the resolved accessor and resets
    /// the local value. Idempotent.
    pub fn dispose(&self) {
        if self.state.is_disposed.replace(true) {
            return;
        }

        self.detach();
        *self.state.local.borrow_mut() = V::default();

        tracing::debug!(item = %self.id(), "Item disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed.get()
    }

    /// Whether the item is attached to a live form
    pub fn is_bound(&self) -> bool {
        self.form().is_some()
    }

    /// Owning form, while bound
    pub fn form(&self) -> Option<Form> {
        self.state.form.borrow().upgrade()
    }

    /// Current target, while bound and alive
    pub fn target(&self) -> Option<Rc<dyn BindingTarget>> {
        self.state
            .binding
            .borrow()
            .as_ref()
            .and_then(|binding| binding.target.upgrade())
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub fn property_changed(&self) -> &ChangeNotifier {
        &self.state.property_changed
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_value_changed(&self, listener: impl Fn(&ValueChanged) + 'static) -> Subscription {
        self.state.value_changed.subscribe(listener)
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_visibility_changed(
        &self,
        listener: impl Fn(&VisibilityChanged) + 'static,
    ) -> Subscription {
        self.state.visibility_changed.subscribe(listener)
    }

    /// Raise property-changed for an item-defined property while bound
    ///
    /// Used by item kinds layered on top of `FormItem` for their own
    /// metadata (options, placeholder, input type, ...).
    pub fn notify(&self, property: &'static str) {
        if self.is_bound() {
            self.state.property_changed.notify(property);
        }
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn has_target(&self) -> bool {
        self.state.binding.borrow().is_some()
    }

    fn accessor(&self) -> Option<PropertyAccessor<V>> {
        self.state
            .binding
            .borrow()
            .as_ref()
            .and_then(|binding| binding.accessor.clone())
    }

    fn on_target_property_changed(&self, event: &PropertyChanged) {
        let Some(property) = self.property_name() else {
            return;
        };
        if !event.affects(property) {
            return;
        }

        if self.state.write_in_progress.is_raised() {
            tracing::trace!(item = %self.id(), property, "Own write echoed by target, skipped");
            return;
        }

        self.run_value_changed_pass();
    }

    fn run_value_changed_pass(&self) {
        let Some(form) = self.form() else {
            tracing::trace!(item = %self.id(), "Item unbound, value-changed pass skipped");
            return;
        };

        tracing::trace!(item = %self.id(), property = self.property_name(), "Value-changed pass");

        self.validate();

        self.state.property_changed.notify("value");
        self.state.property_changed.notify("formatted_value");
        self.state.value_changed.emit(&ValueChanged {
            item: self.id(),
            property: self.property_name().map(str::to_string),
        });

        if self.state.skip_callback.is_raised() {
            return;
        }

        let callback = self.state.callback.borrow().clone();
        if let Some(callback) = callback {
            callback(&form, &self.value());
        }
    }
}

impl<V: Clone + PartialEq + Default + 'static> AnyItem for FormItem<V> {
    fn id(&self) -> ItemId {
        FormItem::id(self)
    }

    fn property_name(&self) -> Option<&str> {
        FormItem::property_name(self)
    }

    fn label(&self) -> Option<String> {
        FormItem::label(self)
    }

    fn is_read_only(&self) -> bool {
        FormItem::is_read_only(self)
    }

    fn is_visible(&self) -> bool {
        FormItem::is_visible(self)
    }

    fn is_value_changed(&self) -> bool {
        FormItem::is_value_changed(self)
    }

    fn formatted_value(&self) -> Option<String> {
        FormItem::formatted_value(self)
    }

    fn validation_error_message(&self) -> Option<String> {
        FormItem::validation_error_message(self)
    }

    fn validate(&self) -> bool {
        FormItem::validate(self)
    }

    fn value_any(&self) -> Box<dyn Any> {
        Box::new(self.value())
    }

    fn set_value_any(&self, value: Box<dyn Any>) -> Result<()> {
        match value.downcast::<V>() {
            Ok(value) => {
                self.set_value(*value);
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    item = %self.id(),
                    expected = type_name::<V>(),
                    "Untyped write with a value of the wrong type"
                );
                Err(FormError::ValueTypeMismatch {
                    expected: type_name::<V>(),
                })
            }
        }
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<V>()
    }

    fn is_bound(&self) -> bool {
        FormItem::is_bound(self)
    }

    fn initialize(&self, form: &Form, target: &Rc<dyn BindingTarget>) {
        FormItem::initialize(self, form, target);
    }

    fn detach(&self) {
        FormItem::detach(self);
    }

    fn dispose(&self) {
        FormItem::dispose(self);
    }

    fn property_changed(&self) -> &ChangeNotifier {
        FormItem::property_changed(self)
    }

    fn subscribe_value_changed(&self, listener: Box<dyn Fn(&ValueChanged)>) -> Subscription {
        self.on_value_changed(listener)
    }

    fn subscribe_visibility_changed(
        &self,
        listener: Box<dyn Fn(&VisibilityChanged)>,
    ) -> Subscription {
        self.on_visibility_changed(listener)
    }
}

impl<V: Clone + PartialEq + Default + 'static> FormNode for FormItem<V> {
    fn item(&self) -> &dyn AnyItem {
        self
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Custom("value")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<V> NotifyPropertyChanged for FormItem<V> {
    fn property_changed(&self) -> &ChangeNotifier {
        &self.state.property_changed
    }
}

impl<V> fmt::Debug for FormItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormItem")
            .field("id", &self.state.id)
            .field("property", &self.state.path.as_ref().map(PropertyPath::name))
            .field("is_visible", &self.state.is_visible.get())
            .field("is_read_only", &self.state.is_read_only.get())
            .field("is_disposed", &self.state.is_disposed.get())
            .finish()
    }
}
