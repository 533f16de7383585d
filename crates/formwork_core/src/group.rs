//! Ordered item containers
//!
//! A [`FormGroup`] is one section of a form: an ordered list of item nodes
//! plus optional header and footer text. Its visibility is derived, not
//! stored: a group is visible when its own flag is set *and* at least one
//! member item is visible, so an empty or fully hidden section never renders.

use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::form::{Form, WeakForm};
use crate::node::{FormNode, GroupId, ItemId, ValueChanged};
use crate::notify::{ChangeNotifier, EventSource, NotifyPropertyChanged, Subscription};
use crate::property::BindingTarget;

/// Structural change of an ordered collection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionChanged<K> {
    Inserted { index: usize, id: K },
    Removed { index: usize, id: K },
}

/// Raised when a group's derived visibility flips
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupVisibilityChanged {
    pub group: GroupId,
    pub is_visible: bool,
}

struct Entry {
    node: Rc<dyn FormNode>,
    _subscriptions: SmallVec<[Subscription; 2]>,
}

struct GroupState {
    id: GroupId,
    entries: RefCell<Vec<Entry>>,
    header: RefCell<Option<String>>,
    footer: RefCell<Option<String>>,
    is_visible: Cell<bool>,
    /// Last derived visibility, for flip detection
    last_visible: Cell<bool>,
    is_disposed: Cell<bool>,
    form: RefCell<WeakForm>,
    property_changed: ChangeNotifier,
    visibility_changed: EventSource<GroupVisibilityChanged>,
    value_changed: EventSource<ValueChanged>,
    items_changed: EventSource<CollectionChanged<ItemId>>,
}

/// An ordered section of items
///
/// Cloning yields another handle to the same group.
#[derive(Clone)]
pub struct FormGroup {
    state: Rc<GroupState>,
}

impl Default for FormGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl FormGroup {
    pub fn new() -> Self {
        Self {
            state: Rc::new(GroupState {
                id: GroupId::next(),
                entries: RefCell::new(Vec::new()),
                header: RefCell::new(None),
                footer: RefCell::new(None),
                is_visible: Cell::new(true),
                last_visible: Cell::new(false),
                is_disposed: Cell::new(false),
                form: RefCell::new(WeakForm::new()),
                property_changed: ChangeNotifier::new(),
                visibility_changed: EventSource::new(),
                value_changed: EventSource::new(),
                items_changed: EventSource::new(),
            }),
        }
    }

    pub fn with_header(self, header: impl Into<String>) -> Self {
        self.set_header(Some(header.into()));
        self
    }

    pub fn with_footer(self, footer: impl Into<String>) -> Self {
        self.set_footer(Some(footer.into()));
        self
    }

    pub fn with_visible(self, is_visible: bool) -> Self {
        self.set_visible(is_visible);
        self
    }

    pub fn with_item(self, node: impl FormNode) -> Self {
        self.push(node);
        self
    }

    pub fn with_items<I>(self, nodes: I) -> Self
    where
        I: IntoIterator<Item = Rc<dyn FormNode>>,
    {
        for node in nodes {
            self.push_node(node);
        }
        self
    }

    pub fn id(&self) -> GroupId {
        self.state.id
    }

    // =========================================================================
    // ITEMS
    // =========================================================================

    /// Append an item; returns the shared node handle
    pub fn push(&self, node: impl FormNode) -> Rc<dyn FormNode> {
        let node: Rc<dyn FormNode> = Rc::new(node);
        self.push_node(Rc::clone(&node));
        node
    }

    pub fn push_node(&self, node: Rc<dyn FormNode>) {
        let index = self.len();
        self.insert_node(index, node);
    }

    /// Insert at `index`, clamped to the item count
    ///
    /// The item is initialized right away when the group belongs to a bound
    /// form.
    pub fn insert_node(&self, index: usize, node: Rc<dyn FormNode>) {
        let entry = self.entry_for(Rc::clone(&node));

        let index = {
            let mut entries = self.state.entries.borrow_mut();
            let index = index.min(entries.len());
            entries.insert(index, entry);
            index
        };

        if let Some((form, target)) = self.binding() {
            node.initialize(&form, &target);
        }

        let id = node.item().id();
        self.emit_items_changed(CollectionChanged::Inserted { index, id });
        self.refresh_visibility();
    }

    /// Remove the first occurrence of the item with `id`
    pub fn remove(&self, id: ItemId) -> Option<Rc<dyn FormNode>> {
        let index = self
            .state
            .entries
            .borrow()
            .iter()
            .position(|entry| entry.node.item().id() == id)?;
        self.remove_at(index)
    }

    /// Remove the item at `index`
    ///
    /// The item is detached, not disposed, unless another occurrence of it is
    /// still listed in this group or elsewhere in the form.
    pub fn remove_at(&self, index: usize) -> Option<Rc<dyn FormNode>> {
        let entry = {
            let mut entries = self.state.entries.borrow_mut();
            if index >= entries.len() {
                return None;
            }
            entries.remove(index)
        };

        let Entry { node, .. } = entry;
        let id = node.item().id();
        if self.is_listed(id) {
            tracing::trace!(item = %id, "Removed one occurrence, item stays bound");
        } else {
            node.detach();
        }

        self.emit_items_changed(CollectionChanged::Removed { index, id });
        self.refresh_visibility();
        Some(node)
    }

    /// Remove every item, last to first
    pub fn clear(&self) {
        while self.remove_at(self.len().saturating_sub(1)).is_some() {}
    }

    /// Whether an occurrence of the item with `id` is in this group
    pub fn contains(&self, id: ItemId) -> bool {
        self.state
            .entries
            .borrow()
            .iter()
            .any(|entry| entry.node.item().id() == id)
    }

    pub fn get(&self, index: usize) -> Option<Rc<dyn FormNode>> {
        self.state
            .entries
            .borrow()
            .get(index)
            .map(|entry| Rc::clone(&entry.node))
    }

    /// Snapshot of the items in display order
    pub fn items(&self) -> Vec<Rc<dyn FormNode>> {
        self.state
            .entries
            .borrow()
            .iter()
            .map(|entry| Rc::clone(&entry.node))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // METADATA
    // =========================================================================

    pub fn header(&self) -> Option<String> {
        self.state.header.borrow().clone()
    }

    pub fn set_header(&self, header: Option<String>) {
        *self.state.header.borrow_mut() = header;
        self.notify("header");
    }

    pub fn footer(&self) -> Option<String> {
        self.state.footer.borrow().clone()
    }

    pub fn set_footer(&self, footer: Option<String>) {
        *self.state.footer.borrow_mut() = footer;
        self.notify("footer");
    }

    /// Own flag AND at least one visible item
    pub fn is_visible(&self) -> bool {
        self.state.is_visible.get()
            && self
                .state
                .entries
                .borrow()
                .iter()
                .any(|entry| entry.node.item().is_visible())
    }

    pub fn set_visible(&self, is_visible: bool) {
        self.state.is_visible.set(is_visible);
        self.refresh_visibility();
    }

    pub fn is_bound(&self) -> bool {
        self.form().is_some()
    }

    pub fn form(&self) -> Option<Form> {
        self.state.form.borrow().upgrade()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub fn property_changed(&self) -> &ChangeNotifier {
        &self.state.property_changed
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_visibility_changed(
        &self,
        listener: impl Fn(&GroupVisibilityChanged) + 'static,
    ) -> Subscription {
        self.state.visibility_changed.subscribe(listener)
    }

    /// Value changes of any member item
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_value_changed(&self, listener: impl Fn(&ValueChanged) + 'static) -> Subscription {
        self.state.value_changed.subscribe(listener)
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_items_changed(
        &self,
        listener: impl Fn(&CollectionChanged<ItemId>) + 'static,
    ) -> Subscription {
        self.state.items_changed.subscribe(listener)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Bind every item to `target` on behalf of `form`
    pub(crate) fn attach(&self, form: &Form, target: Option<&Rc<dyn BindingTarget>>) {
        if self.state.is_disposed.get() {
            tracing::warn!(group = %self.id(), "Ignoring attach of a disposed group");
            return;
        }

        *self.state.form.borrow_mut() = form.downgrade();

        if let Some(target) = target {
            for node in self.items() {
                node.initialize(form, target);
            }
        }

        self.state.last_visible.set(self.is_visible());
    }

    /// Leave the form, detaching items the form no longer lists
    ///
    /// Called after the form dropped this group from its sections.
    pub(crate) fn detach(&self) {
        let form = self.form();
        for node in self.items() {
            let still_listed = form
                .as_ref()
                .is_some_and(|form| form.find(node.item().id()).is_some());
            if !still_listed {
                node.detach();
            }
        }
        *self.state.form.borrow_mut() = WeakForm::new();
    }

    /// Dispose every item in order; the group is unusable afterwards
    pub fn dispose(&self) {
        if self.state.is_disposed.replace(true) {
            return;
        }

        let entries = std::mem::take(&mut *self.state.entries.borrow_mut());
        for entry in &entries {
            entry.node.dispose();
        }
        drop(entries);

        *self.state.form.borrow_mut() = WeakForm::new();
        tracing::debug!(group = %self.id(), "Group disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed.get()
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    /// Whether the item with `id` is still listed here or in the bound form
    fn is_listed(&self, id: ItemId) -> bool {
        self.contains(id) || self.form().is_some_and(|form| form.find(id).is_some())
    }

    fn binding(&self) -> Option<(Form, Rc<dyn BindingTarget>)> {
        let form = self.form()?;
        let target = form.target()?;
        Some((form, target))
    }

    fn entry_for(&self, node: Rc<dyn FormNode>) -> Entry {
        let mut subscriptions = SmallVec::new();

        let weak = Rc::downgrade(&self.state);
        subscriptions.push(node.item().subscribe_visibility_changed(Box::new(move |_| {
            if let Some(state) = weak.upgrade() {
                FormGroup { state }.refresh_visibility();
            }
        })));

        let weak: Weak<GroupState> = Rc::downgrade(&self.state);
        subscriptions.push(node.item().subscribe_value_changed(Box::new(move |event| {
            if let Some(state) = weak.upgrade() {
                state.value_changed.emit(event);
            }
        })));

        Entry {
            node,
            _subscriptions: subscriptions,
        }
    }

    /// Recompute derived visibility and raise events on a flip
    fn refresh_visibility(&self) {
        let is_visible = self.is_visible();
        if self.state.last_visible.replace(is_visible) == is_visible {
            return;
        }

        if !self.is_bound() {
            return;
        }

        tracing::trace!(group = %self.id(), is_visible, "Group visibility flipped");
        self.state.property_changed.notify("is_visible");
        self.state.visibility_changed.emit(&GroupVisibilityChanged {
            group: self.id(),
            is_visible,
        });
    }

    fn notify(&self, property: &'static str) {
        if self.is_bound() {
            self.state.property_changed.notify(property);
        }
    }

    fn emit_items_changed(&self, event: CollectionChanged<ItemId>) {
        if self.is_bound() {
            self.state.items_changed.emit(&event);
        }
    }
}

impl NotifyPropertyChanged for FormGroup {
    fn property_changed(&self) -> &ChangeNotifier {
        &self.state.property_changed
    }
}

impl fmt::Debug for FormGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormGroup")
            .field("id", &self.state.id)
            .field("header", &self.state.header.borrow())
            .field("len", &self.len())
            .field("is_visible", &self.is_visible())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FormItem;
    use crate::property;
    use crate::testing::Person;

    fn age_item() -> FormItem<i32> {
        FormItem::new(property!(Person::age))
    }

    #[test]
    fn test_empty_group_is_hidden() {
        let group = FormGroup::new();
        assert!(!group.is_visible());

        group.push(age_item());
        assert!(group.is_visible());
    }

    #[test]
    fn test_all_hidden_items_hide_group() {
        let person = Person::new("Ada", 30);
        let hidden = age_item().with_visible(false);
        let group = FormGroup::new()
            .with_item(hidden.clone())
            .with_item(FormItem::constant(1).with_visible(false));
        let _form = Form::new(person).with_group(group.clone());

        assert!(!group.is_visible());

        let flips = Rc::new(RefCell::new(Vec::new()));
        let flips_clone = flips.clone();
        let _sub = group.on_visibility_changed(move |e| flips_clone.borrow_mut().push(e.is_visible));

        hidden.set_visible(true);
        assert!(group.is_visible());

        hidden.set_visible(false);
        assert!(!group.is_visible());

        assert_eq!(*flips.borrow(), vec![true, false]);
    }

    #[test]
    fn test_explicit_flag_gates_visibility() {
        let person = Person::new("Ada", 30);
        let group = FormGroup::new().with_item(age_item());
        let _form = Form::new(person).with_group(group.clone());

        let flips = Rc::new(Cell::new(0));
        let flips_clone = flips.clone();
        let _sub = group.on_visibility_changed(move |_| flips_clone.set(flips_clone.get() + 1));

        group.set_visible(false);
        group.set_visible(false);
        assert!(!group.is_visible());
        assert_eq!(flips.get(), 1);
    }

    #[test]
    fn test_items_added_to_bound_group_are_initialized() {
        let person = Person::new("Ada", 30);
        let group = FormGroup::new();
        let _form = Form::new(person.clone()).with_group(group.clone());

        let events = Rc::new(RefCell::new(Vec::new()));
        let events_clone = events.clone();
        let _sub = group.on_items_changed(move |e| events_clone.borrow_mut().push(*e));

        let item = age_item();
        group.push(item.clone());
        assert!(item.is_bound());
        assert_eq!(item.value(), 30);
        assert_eq!(person.listener_count(), 1);

        let removed = group.remove(item.id()).unwrap();
        assert_eq!(removed.item().id(), item.id());
        assert!(!item.is_bound());
        assert!(!item.is_disposed());
        assert_eq!(person.listener_count(), 0);

        assert_eq!(
            *events.borrow(),
            vec![
                CollectionChanged::Inserted { index: 0, id: item.id() },
                CollectionChanged::Removed { index: 0, id: item.id() },
            ]
        );
    }

    #[test]
    fn test_insertion_order_and_duplicates() {
        let first = age_item();
        let second = FormItem::constant(2);
        let group = FormGroup::new();

        group.push(first.clone());
        group.insert_node(0, Rc::new(second.clone()));
        group.push(first.clone());

        let ids: Vec<ItemId> = group.items().iter().map(|n| n.item().id()).collect();
        assert_eq!(ids, vec![second.id(), first.id(), first.id()]);

        // Out of range insert lands at the end
        group.insert_node(99, Rc::new(FormItem::constant(3)));
        assert_eq!(group.len(), 4);

        assert!(group.remove_at(10).is_none());
        group.clear();
        assert!(group.is_empty());
    }

    #[test]
    fn test_removing_one_occurrence_keeps_item_bound() {
        let person = Person::new("Ada", 30);
        let item = age_item();
        let group = FormGroup::new();
        let _form = Form::new(person.clone()).with_group(group.clone());

        group.push(item.clone());
        group.push(item.clone());
        assert_eq!(person.listener_count(), 1);

        group.remove(item.id()).unwrap();
        assert_eq!(group.len(), 1);
        assert!(item.is_bound());
        assert_eq!(person.listener_count(), 1);

        item.set_value(55);
        assert_eq!(person.age(), 55);
        assert_eq!(item.value(), 55);

        // Last occurrence gone: now the item is detached
        group.remove(item.id()).unwrap();
        assert!(!item.is_bound());
        assert_eq!(person.listener_count(), 0);
    }

    #[test]
    fn test_item_listed_in_another_group_stays_bound() {
        let person = Person::new("Ada", 30);
        let item = age_item();
        let first = FormGroup::new().with_item(item.clone());
        let second = FormGroup::new().with_item(item.clone());
        let _form = Form::new(person.clone()).with_groups([first.clone(), second]);

        first.remove(item.id()).unwrap();
        assert!(item.is_bound());

        person.set_age(41);
        assert_eq!(item.value(), 41);
    }

    #[test]
    fn test_item_value_changes_are_forwarded() {
        let person = Person::new("Ada", 30);
        let item = age_item();
        let group = FormGroup::new().with_item(item.clone());
        let _form = Form::new(person.clone()).with_group(group.clone());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = group.on_value_changed(move |e| seen_clone.borrow_mut().push(e.item));

        person.set_age(31);
        assert_eq!(*seen.borrow(), vec![item.id()]);
    }

    #[test]
    fn test_header_changes_notify_while_bound() {
        let person = Person::new("Ada", 30);
        let group = FormGroup::new().with_header("Details");
        assert_eq!(group.header().as_deref(), Some("Details"));

        let _form = Form::new(person).with_group(group.clone());

        let names = Rc::new(RefCell::new(Vec::new()));
        let names_clone = names.clone();
        let _sub = group
            .property_changed()
            .subscribe(move |e| names_clone.borrow_mut().push(e.name().map(str::to_string)));

        group.set_footer(Some("All fields are required".to_string()));
        assert_eq!(*names.borrow(), vec![Some("footer".to_string())]);
    }

    #[test]
    fn test_dispose_is_transitive() {
        let person = Person::new("Ada", 30);
        let item = age_item();
        let group = FormGroup::new().with_item(item.clone());
        let _form = Form::new(person.clone()).with_group(group.clone());

        group.dispose();
        assert!(item.is_disposed());
        assert!(group.is_empty());
        assert_eq!(person.listener_count(), 0);
    }
}
