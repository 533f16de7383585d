//! Formwork Core
//!
//! This crate provides the reactive binding engine behind declarative forms:
//!
//! - **Property Paths**: Names of bindable properties, validated at construction
//! - **Binding Targets**: Runtime property tables resolved against the target's type
//! - **Form Items**: Bound value nodes with visibility, read-only and validation state
//! - **Groups and Forms**: Ordered sections and the binding session that owns them
//! - **Notifications**: Listener registries with scoped subscription tokens
//!
//! Everything is single-threaded: items, groups and forms are `Rc` handles
//! driven from the thread that owns the presentation layer.
//!
//! # Example
//!
//! ```rust
//! use formwork_core::{property, BindingTarget, ChangeNotifier, Form, FormGroup, FormItem, PropertyTable};
//! use std::any::Any;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::sync::OnceLock;
//!
//! #[derive(Default)]
//! struct Person {
//!     age: Cell<i32>,
//!     notifier: ChangeNotifier,
//! }
//!
//! impl Person {
//!     fn age(&self) -> i32 {
//!         self.age.get()
//!     }
//!
//!     fn set_age(&self, age: i32) {
//!         self.age.set(age);
//!         self.notifier.notify("age");
//!     }
//! }
//!
//! impl BindingTarget for Person {
//!     fn properties(&self) -> &PropertyTable {
//!         static TABLE: OnceLock<PropertyTable> = OnceLock::new();
//!         TABLE.get_or_init(|| {
//!             PropertyTable::builder::<Person>()
//!                 .property("age", Person::age, Person::set_age)
//!                 .build()
//!         })
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//!
//!     fn notifier(&self) -> Option<&ChangeNotifier> {
//!         Some(&self.notifier)
//!     }
//! }
//!
//! let person = Rc::new(Person::default());
//! person.set_age(30);
//!
//! let age = FormItem::new(property!(Person::age)).with_label("Age");
//! let form = Form::new(person.clone()).with_group(FormGroup::new().with_item(age.clone()));
//!
//! assert_eq!(age.value(), 30);
//!
//! // Writes go straight to the target
//! age.set_value(31);
//! assert_eq!(person.age(), 31);
//!
//! // And target changes are visible on the next read
//! person.set_age(40);
//! assert_eq!(age.value(), 40);
//!
//! form.dispose();
//! ```

pub mod error;
pub mod form;
pub mod group;
pub mod item;
pub mod node;
pub mod notify;
pub mod property;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{FormError, Result};
pub use form::{Form, WeakForm};
pub use group::{CollectionChanged, FormGroup, GroupVisibilityChanged};
pub use item::{FormItem, Formatter, ValueCallback};
pub use node::{
    AnyItem, FormNode, GroupId, ItemId, ItemKind, OptionView, ValueChanged, VisibilityChanged,
};
pub use notify::{
    ChangeNotifier, EventSource, ListenerKey, NotifyPropertyChanged, PropertyChanged,
    Subscription,
};
pub use property::{
    BindingTarget, PropertyAccessor, PropertyInfo, PropertyPath, PropertyTable,
    PropertyTableBuilder,
};
pub use validation::{ValidatableFormItem, ValidationRule};
