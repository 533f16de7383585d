//! Property paths and runtime property resolution
//!
//! A [`PropertyPath`] is the name token a form item is built with. It is
//! validated once, at construction. The getter/setter pair is resolved later,
//! against the runtime type of whichever target the item is bound to, through
//! the target's [`PropertyTable`]. The same item can therefore be re-bound to
//! targets of different concrete types as long as they expose a property with
//! the same name and value type.
//!
//! ```rust
//! use formwork_core::property::{BindingTarget, PropertyTable};
//! use formwork_core::notify::ChangeNotifier;
//! use formwork_core::property;
//! use std::any::Any;
//! use std::cell::Cell;
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
//! let path = property!(Person::age);
//! assert_eq!(path.name(), "age");
//! ```

use rustc_hash::FxHashMap;
use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::error::{FormError, Result};
use crate::notify::ChangeNotifier;

// =============================================================================
// PROPERTY PATH
// =============================================================================

/// Validated name of a bindable property with value type `V`
pub struct PropertyPath<V> {
    name: Cow<'static, str>,
    _marker: PhantomData<fn() -> V>,
}

impl<V> PropertyPath<V> {
    /// Parse accessor text of the form `name` or `receiver.name`
    ///
    /// Anything other than a direct member reference (calls, operators,
    /// nested chains, indexing) is rejected.
    pub fn parse(expression: &str) -> Result<Self> {
        let invalid = || FormError::InvalidPropertyExpression(expression.to_string());

        let trimmed = expression.trim();
        let member = match trimmed.split_once('.') {
            Some((receiver, member)) => {
                if !is_identifier(receiver) {
                    return Err(invalid());
                }
                member
            }
            None => trimmed,
        };

        if !is_identifier(member) {
            return Err(invalid());
        }

        Ok(Self {
            name: Cow::Owned(member.to_string()),
            _marker: PhantomData,
        })
    }

    /// Path from a name already known to be an identifier
    ///
    /// Used by the [`property!`](crate::property!) macro, which only
    /// accepts identifier tokens.
    pub const fn from_static(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _marker: PhantomData,
        }
    }

    /// Path checked against a getter of the target type
    ///
    /// The getter is only used to pin `V` and prove the member exists.
    pub fn from_getter<T>(_getter: fn(&T) -> V, name: &'static str) -> Self {
        Self::from_static(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<V> Clone for PropertyPath<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V> fmt::Debug for PropertyPath<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyPath").field(&self.name).finish()
    }
}

impl<V> PartialEq for PropertyPath<V> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Build a [`PropertyPath`]
///
/// - `property!(Type::getter)` checks the getter exists on `Type` and infers
///   the value type from its return type.
/// - `property!(name)` builds an unchecked path from an identifier.
#[macro_export]
macro_rules! property {
    ($target:ident :: $name:ident) => {
        $crate::property::PropertyPath::from_getter(<$target>::$name, stringify!($name))
    };
    ($name:ident) => {
        $crate::property::PropertyPath::from_static(stringify!($name))
    };
}

// =============================================================================
// PROPERTY TABLE
// =============================================================================

type ErasedGetter = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn Any>> + Send + Sync>;
type ErasedSetter = Arc<dyn Fn(&dyn Any, Box<dyn Any>) -> bool + Send + Sync>;

/// Type-erased description of one property of a target type
#[derive(Clone)]
pub struct PropertyInfo {
    name: &'static str,
    value_type: TypeId,
    value_type_name: &'static str,
    getter: ErasedGetter,
    setter: Option<ErasedSetter>,
}

impl PropertyInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    fn holds<V: 'static>(&self) -> bool {
        self.value_type == TypeId::of::<V>()
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("value_type", &self.value_type_name)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// Runtime property lookup table for one target type
#[derive(Debug)]
pub struct PropertyTable {
    target_type: &'static str,
    properties: FxHashMap<&'static str, PropertyInfo>,
}

impl PropertyTable {
    /// Start describing the properties of `T`
    pub fn builder<T: Any>() -> PropertyTableBuilder<T> {
        PropertyTableBuilder {
            table: PropertyTable {
                target_type: type_name::<T>(),
                properties: FxHashMap::default(),
            },
            _marker: PhantomData,
        }
    }

    /// Name of the described target type
    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    pub fn get(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Builder for [`PropertyTable`]
pub struct PropertyTableBuilder<T> {
    table: PropertyTable,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any> PropertyTableBuilder<T> {
    /// Describe a readable and writable property
    pub fn property<V, G, S>(mut self, name: &'static str, get: G, set: S) -> Self
    where
        V: 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&T, V) + Send + Sync + 'static,
    {
        let setter: ErasedSetter = Arc::new(move |target: &dyn Any, value: Box<dyn Any>| {
            match (target.downcast_ref::<T>(), value.downcast::<V>()) {
                (Some(target), Ok(value)) => {
                    set(target, *value);
                    true
                }
                _ => false,
            }
        });
        self.insert::<V, G>(name, get, Some(setter));
        self
    }

    /// Describe a property that can be read but not written
    pub fn read_only<V, G>(mut self, name: &'static str, get: G) -> Self
    where
        V: 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.insert::<V, G>(name, get, None);
        self
    }

    fn insert<V, G>(&mut self, name: &'static str, get: G, setter: Option<ErasedSetter>)
    where
        V: 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        let getter: ErasedGetter = Arc::new(move |target: &dyn Any| {
            target
                .downcast_ref::<T>()
                .map(|target| Box::new(get(target)) as Box<dyn Any>)
        });

        self.table.properties.insert(
            name,
            PropertyInfo {
                name,
                value_type: TypeId::of::<V>(),
                value_type_name: type_name::<V>(),
                getter,
                setter,
            },
        );
    }

    pub fn build(self) -> PropertyTable {
        self.table
    }
}

// =============================================================================
// BINDING TARGET
// =============================================================================

/// An externally owned object whose properties form items bind to
///
/// Implementors keep their state behind interior mutability and raise
/// change events through [`BindingTarget::notifier`] *after* releasing any
/// internal borrow, so observers can read the new value from the handler.
pub trait BindingTarget: Any {
    /// Property table for this object's runtime type
    fn properties(&self) -> &PropertyTable;

    fn as_any(&self) -> &dyn Any;

    /// Change notifications raised by this object, if it has any
    fn notifier(&self) -> Option<&ChangeNotifier> {
        None
    }
}

// =============================================================================
// RESOLVED ACCESSOR
// =============================================================================

/// Getter/setter pair resolved against one concrete target
///
/// Holds only a weak reference to the target: a dropped target reads as
/// `None` and rejects writes.
pub struct PropertyAccessor<V> {
    target: Weak<dyn BindingTarget>,
    info: PropertyInfo,
    _marker: PhantomData<fn() -> V>,
}

impl<V: 'static> PropertyAccessor<V> {
    /// Resolve `path` against the runtime type of `target`
    ///
    /// Returns `None` when the target has no property of that name, or the
    /// property holds a different value type.
    pub fn resolve(path: &PropertyPath<V>, target: &Rc<dyn BindingTarget>) -> Option<Self> {
        let table = target.properties();
        let Some(info) = table.get(path.name()) else {
            tracing::debug!(
                property = path.name(),
                target_type = table.target_type(),
                "Property not found on target"
            );
            return None;
        };

        if !info.holds::<V>() {
            tracing::debug!(
                property = path.name(),
                target_type = table.target_type(),
                expected = type_name::<V>(),
                actual = info.value_type_name(),
                "Property value type does not match"
            );
            return None;
        }

        Some(Self {
            target: Rc::downgrade(target),
            info: info.clone(),
            _marker: PhantomData,
        })
    }

    /// Read the current value from the target
    pub fn get(&self) -> Option<V> {
        let target = self.target.upgrade()?;
        let boxed = (self.info.getter)(target.as_any())?;
        boxed.downcast::<V>().ok().map(|value| *value)
    }

    /// Write a value to the target; `false` if the write was not performed
    pub fn set(&self, value: V) -> bool {
        let Some(setter) = self.info.setter.as_ref() else {
            tracing::debug!(property = self.info.name(), "Property is read-only");
            return false;
        };
        match self.target.upgrade() {
            Some(target) => setter(target.as_any(), Box::new(value)),
            None => false,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.info.is_writable()
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    pub fn info(&self) -> &PropertyInfo {
        &self.info
    }
}

impl<V> Clone for PropertyAccessor<V> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
            info: self.info.clone(),
            _marker: PhantomData,
        }
    }
}
