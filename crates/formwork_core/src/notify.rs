//! Change notification primitives
//!
//! Every observable entity in a form (targets, items, groups, the form
//! itself) raises events through an [`EventSource`]. Subscribing returns a
//! [`Subscription`] token; dropping the token removes the listener, so a
//! handler can never outlive the scope that registered it.
//!
//! ```rust
//! use formwork_core::notify::{ChangeNotifier, PropertyChanged};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let notifier = ChangeNotifier::new();
//! let hits = Rc::new(Cell::new(0));
//!
//! let hits_clone = hits.clone();
//! let subscription = notifier.subscribe(move |event: &PropertyChanged| {
//!     if event.affects("age") {
//!         hits_clone.set(hits_clone.get() + 1);
//!     }
//! });
//!
//! notifier.notify("age");
//! notifier.notify("name");
//! assert_eq!(hits.get(), 1);
//!
//! drop(subscription);
//! notifier.notify("age");
//! assert_eq!(hits.get(), 1);
//! ```
//!
//! Dispatch snapshots the listener list before invoking anything, so a
//! handler may subscribe, unsubscribe or raise further events without
//! tripping a `RefCell` borrow. A listener removed during dispatch is not
//! invoked for the remainder of that dispatch.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Unique identifier for a registered listener
    pub struct ListenerKey;
}

type Listener<E> = Rc<dyn Fn(&E)>;
type Registry<E> = RefCell<SlotMap<ListenerKey, Listener<E>>>;

// =============================================================================
// EVENT SOURCE
// =============================================================================

/// A typed listener registry
pub struct EventSource<E> {
    listeners: Rc<Registry<E>>,
}

impl<E: 'static> EventSource<E> {
    /// Create an event source with no listeners
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(SlotMap::with_key())),
        }
    }

    /// Register a listener
    ///
    /// The listener stays registered for as long as the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + 'static,
    {
        let key = self.listeners.borrow_mut().insert(Rc::new(listener));
        let registry: Weak<Registry<E>> = Rc::downgrade(&self.listeners);

        Subscription {
            key,
            release: Some(Box::new(move |key| {
                if let Some(registry) = registry.upgrade() {
                    registry.borrow_mut().remove(key);
                }
            })),
        }
    }

    /// Invoke every registered listener in registration order
    pub fn emit(&self, event: &E) {
        let snapshot: SmallVec<[(ListenerKey, Listener<E>); 4]> = self
            .listeners
            .borrow()
            .iter()
            .map(|(key, listener)| (key, Rc::clone(listener)))
            .collect();

        for (key, listener) in snapshot {
            // Skip listeners released by an earlier handler in this dispatch
            if !self.listeners.borrow().contains_key(key) {
                continue;
            }
            listener(event);
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Drop every listener; outstanding subscriptions become inert
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<E: 'static> Default for EventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Scoped listener registration
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// removes the listener. The token only holds a weak reference to the
/// registry, so it never keeps the observed object alive.
pub struct Subscription {
    key: ListenerKey,
    release: Option<Box<dyn FnOnce(ListenerKey)>>,
}

impl Subscription {
    /// Key of the registered listener
    pub fn key(&self) -> ListenerKey {
        self.key
    }

    /// Remove the listener now
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.release.is_some())
            .finish()
    }
}

// =============================================================================
// PROPERTY CHANGE NOTIFICATION
// =============================================================================

/// "Property changed" event payload
///
/// A `None` (or blank) name means "something changed"; observers must treat
/// it as affecting every property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyChanged {
    name: Option<Cow<'static, str>>,
}

impl PropertyChanged {
    /// A change to one named property
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// An unqualified change affecting every property
    pub fn all() -> Self {
        Self { name: None }
    }

    /// Name of the changed property, if qualified
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }

    /// Whether an observer of `property` should react to this event
    pub fn affects(&self, property: &str) -> bool {
        match self.name() {
            Some(name) => name == property,
            None => true,
        }
    }
}

/// Observable-property capability
///
/// Any entity can own a `ChangeNotifier` and raise property-changed events
/// through it; other entities subscribe and keep the returned token.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    source: EventSource<PropertyChanged>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to property-changed events
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PropertyChanged) + 'static,
    {
        self.source.subscribe(listener)
    }

    /// Raise a change for one named property
    pub fn notify(&self, name: impl Into<Cow<'static, str>>) {
        self.source.emit(&PropertyChanged::named(name));
    }

    /// Raise an unqualified "something changed" event
    pub fn notify_all(&self) {
        self.source.emit(&PropertyChanged::all());
    }

    /// Raise a prepared event
    pub fn emit(&self, event: &PropertyChanged) {
        self.source.emit(event);
    }

    pub fn listener_count(&self) -> usize {
        self.source.listener_count()
    }
}

/// Implemented by entities that raise property-changed events
pub trait NotifyPropertyChanged {
    fn property_changed(&self) -> &ChangeNotifier;
}
