//! The binding session
//!
//! A [`Form`] is an ordered list of [`FormGroup`]s bound to one target
//! object. It observes the target through a weak reference only: the
//! view-model that owns the target also owns the form, and dropping the
//! target never has to wait for the form.
//!
//! Items and groups point back to their form with a [`WeakForm`], so the form
//! is never kept alive by its own members.

use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::group::{CollectionChanged, FormGroup, GroupVisibilityChanged};
use crate::node::{FormNode, GroupId, ItemId, ValueChanged};
use crate::notify::{EventSource, Subscription};
use crate::property::BindingTarget;

struct Section {
    group: FormGroup,
    _subscriptions: SmallVec<[Subscription; 2]>,
}

struct FormState {
    target: RefCell<Weak<dyn BindingTarget>>,
    sections: RefCell<Vec<Section>>,
    is_disposed: Cell<bool>,
    value_changed: EventSource<ValueChanged>,
    visibility_changed: EventSource<GroupVisibilityChanged>,
    groups_changed: EventSource<CollectionChanged<GroupId>>,
}

/// Root of a form: ordered groups bound to one target
///
/// Cloning yields another handle to the same form.
#[derive(Clone)]
pub struct Form {
    state: Rc<FormState>,
}

/// Non-owning handle to a [`Form`]
#[derive(Clone, Default)]
pub struct WeakForm {
    state: Weak<FormState>,
}

impl WeakForm {
    /// A handle that never upgrades
    pub fn new() -> Self {
        Self { state: Weak::new() }
    }

    pub fn upgrade(&self) -> Option<Form> {
        let state = self.state.upgrade()?;
        if state.is_disposed.get() {
            return None;
        }
        Some(Form { state })
    }
}

impl fmt::Debug for WeakForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakForm")
            .field("alive", &(self.state.strong_count() > 0))
            .finish()
    }
}

impl Form {
    /// Create a form observing `target`
    pub fn new(target: Rc<dyn BindingTarget>) -> Self {
        tracing::debug!(target_type = target.properties().target_type(), "Form created");
        Self {
            state: Rc::new(FormState {
                target: RefCell::new(Rc::downgrade(&target)),
                sections: RefCell::new(Vec::new()),
                is_disposed: Cell::new(false),
                value_changed: EventSource::new(),
                visibility_changed: EventSource::new(),
                groups_changed: EventSource::new(),
            }),
        }
    }

    pub fn with_group(self, group: FormGroup) -> Self {
        self.push_group(group);
        self
    }

    pub fn with_groups<I>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = FormGroup>,
    {
        for group in groups {
            self.push_group(group);
        }
        self
    }

    pub fn downgrade(&self) -> WeakForm {
        WeakForm {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Whether both handles refer to the same form
    pub fn ptr_eq(&self, other: &Form) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Current target, while it is alive
    pub fn target(&self) -> Option<Rc<dyn BindingTarget>> {
        self.state.target.borrow().upgrade()
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    pub fn push_group(&self, group: FormGroup) {
        let index = self.len();
        self.insert_group(index, group);
    }

    /// Insert a group at `index`, clamped to the group count; binds it at once
    ///
    /// A group still listed in another live form is moved: the other form
    /// drops it first.
    pub fn insert_group(&self, index: usize, group: FormGroup) {
        if self.is_disposed() {
            tracing::warn!(group = %group.id(), "Ignoring group added to a disposed form");
            return;
        }

        if let Some(previous) = group.form().filter(|previous| !previous.ptr_eq(self)) {
            tracing::debug!(group = %group.id(), "Moving group from another form");
            while previous.remove_group(group.id()).is_some() {}
        }

        let section = self.section_for(group.clone());
        let index = {
            let mut sections = self.state.sections.borrow_mut();
            let index = index.min(sections.len());
            sections.insert(index, section);
            index
        };

        let target = self.target();
        group.attach(self, target.as_ref());

        self.state.groups_changed.emit(&CollectionChanged::Inserted {
            index,
            id: group.id(),
        });
    }

    /// Remove the first occurrence of a group
    ///
    /// Its items are detached, not disposed. A group listed more than once
    /// stays bound until its last occurrence is removed.
    pub fn remove_group(&self, id: GroupId) -> Option<FormGroup> {
        let (index, section, still_listed) = {
            let mut sections = self.state.sections.borrow_mut();
            let index = sections.iter().position(|s| s.group.id() == id)?;
            let section = sections.remove(index);
            let still_listed = sections.iter().any(|s| s.group.id() == id);
            (index, section, still_listed)
        };

        let Section { group, .. } = section;
        if !still_listed {
            group.detach();
        }

        self.state
            .groups_changed
            .emit(&CollectionChanged::Removed { index, id });
        Some(group)
    }

    pub fn group(&self, index: usize) -> Option<FormGroup> {
        self.state
            .sections
            .borrow()
            .get(index)
            .map(|section| section.group.clone())
    }

    /// Snapshot of the groups in display order
    pub fn groups(&self) -> Vec<FormGroup> {
        self.state
            .sections
            .borrow()
            .iter()
            .map(|section| section.group.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.sections.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every item of every group, in display order
    pub fn items(&self) -> Vec<Rc<dyn FormNode>> {
        self.groups()
            .iter()
            .flat_map(|group| group.items())
            .collect()
    }

    pub fn find(&self, id: ItemId) -> Option<Rc<dyn FormNode>> {
        self.items().into_iter().find(|node| node.item().id() == id)
    }

    // =========================================================================
    // BINDING SESSION
    // =========================================================================

    /// Point every item at `target`, unsubscribing from the previous one
    pub fn rebind(&self, target: Rc<dyn BindingTarget>) {
        if self.is_disposed() {
            tracing::warn!("Ignoring rebind of a disposed form");
            return;
        }

        *self.state.target.borrow_mut() = Rc::downgrade(&target);
        tracing::debug!(
            target_type = target.properties().target_type(),
            groups = self.len(),
            "Form rebound"
        );

        for group in self.groups() {
            group.attach(self, Some(&target));
        }
    }

    /// Whether every item is currently valid; computed on every call
    pub fn is_valid(&self) -> bool {
        self.items().iter().all(|node| node.item().is_valid())
    }

    /// Re-evaluate every item's rules; `true` when all pass
    pub fn validate(&self) -> bool {
        self.items()
            .iter()
            .fold(true, |valid, node| node.item().validate() && valid)
    }

    /// Dispose every group and item, in order
    ///
    /// Every item unsubscribes from the target. Idempotent.
    pub fn dispose(&self) {
        if self.state.is_disposed.replace(true) {
            return;
        }

        let sections = std::mem::take(&mut *self.state.sections.borrow_mut());
        for section in &sections {
            section.group.dispose();
        }
        drop(sections);

        tracing::debug!("Form disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed.get()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Value changes of any item in the form
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_value_changed(&self, listener: impl Fn(&ValueChanged) + 'static) -> Subscription {
        self.state.value_changed.subscribe(listener)
    }

    /// Derived visibility flips of any group in the form
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_group_visibility_changed(
        &self,
        listener: impl Fn(&GroupVisibilityChanged) + 'static,
    ) -> Subscription {
        self.state.visibility_changed.subscribe(listener)
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_groups_changed(
        &self,
        listener: impl Fn(&CollectionChanged<GroupId>) + 'static,
    ) -> Subscription {
        self.state.groups_changed.subscribe(listener)
    }

    fn section_for(&self, group: FormGroup) -> Section {
        let mut subscriptions = SmallVec::new();

        let weak = Rc::downgrade(&self.state);
        subscriptions.push(group.on_value_changed(move |event| {
            if let Some(state) = weak.upgrade() {
                state.value_changed.emit(event);
            }
        }));

        let weak = Rc::downgrade(&self.state);
        subscriptions.push(group.on_visibility_changed(move |event| {
            if let Some(state) = weak.upgrade() {
                state.visibility_changed.emit(event);
            }
        }));

        Section {
            group,
            _subscriptions: subscriptions,
        }
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("groups", &self.len())
            .field("target_alive", &(self.state.target.borrow().strong_count() > 0))
            .field("is_disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FormItem;
    use crate::property;
    use crate::property::PropertyPath;
    use crate::testing::{Employee, Person};
    use crate::validation::ValidatableFormItem;

    #[test]
    fn test_form_binds_groups_on_insert() {
        let person = Person::new("Ada", 30);
        let age = FormItem::new(property!(Person::age));
        let name = FormItem::new(property!(Person::name));

        let form = Form::new(person.clone()).with_groups([
            FormGroup::new().with_item(age.clone()),
            FormGroup::new().with_item(name.clone()),
        ]);

        assert_eq!(form.len(), 2);
        assert_eq!(age.value(), 30);
        assert_eq!(name.value(), "Ada");
        assert_eq!(person.listener_count(), 2);
        assert_eq!(form.items().len(), 2);
        assert_eq!(form.find(name.id()).map(|n| n.item().id()), Some(name.id()));
    }

    #[test]
    fn test_dispose_unsubscribes_everything() {
        let person = Person::new("Ada", 30);
        let age = FormItem::new(property!(Person::age));
        let form = Form::new(person.clone())
            .with_group(FormGroup::new().with_item(age.clone()).with_item(age.clone()));

        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let _sub = form.on_value_changed(move |_| hits_clone.set(hits_clone.get() + 1));
        let item_hits = Rc::new(Cell::new(0));
        let item_hits_clone = item_hits.clone();
        let _item_sub = age.on_value_changed(move |_| item_hits_clone.set(item_hits_clone.get() + 1));

        form.dispose();
        form.dispose();

        assert!(form.is_disposed());
        assert!(form.is_empty());
        assert_eq!(person.listener_count(), 0);
        assert!(!age.is_bound());

        person.set_age(99);
        assert_eq!(hits.get(), 0);
        assert_eq!(item_hits.get(), 0);
    }

    #[test]
    fn test_rebind_moves_every_item() {
        let first = Person::new("Ada", 30);
        let second = Employee::new(61);
        let age = FormItem::new(PropertyPath::<i32>::from_static("age"));
        let form = Form::new(first.clone()).with_group(FormGroup::new().with_item(age.clone()));

        form.rebind(second.clone());

        assert_eq!(age.value(), 61);
        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 1);

        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let _sub = form.on_value_changed(move |_| hits_clone.set(hits_clone.get() + 1));

        first.set_age(1);
        assert_eq!(hits.get(), 0);
        second.set_age(62);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_rebind_does_not_invoke_callbacks() {
        let first = Person::new("Ada", 30);
        let second = Person::new("Grace", 45);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let age = FormItem::new(property!(Person::age))
            .with_callback(move |_, _| calls_clone.set(calls_clone.get() + 1));
        let form = Form::new(first).with_group(FormGroup::new().with_item(age.clone()));

        form.rebind(second);
        assert_eq!(age.value(), 45);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_validity_is_recomputed_on_demand() {
        let person = Person::new("Ada", 30);
        let age = ValidatableFormItem::new(property!(Person::age))
            .with_requirement(|age: &i32| *age >= 18, "Must be an adult");
        let form = Form::new(person.clone())
            .with_group(FormGroup::new().with_item(age.clone()).with_item(FormItem::constant(0)));

        assert!(form.is_valid());

        person.set_age(12);
        assert!(!form.is_valid());
        assert!(!form.validate());

        age.set_value(21);
        assert!(form.is_valid());
        assert!(form.validate());
    }

    #[test]
    fn test_structural_mutation_while_bound() {
        let person = Person::new("Ada", 30);
        let form = Form::new(person.clone());

        let events = Rc::new(RefCell::new(Vec::new()));
        let events_clone = events.clone();
        let _sub = form.on_groups_changed(move |e| events_clone.borrow_mut().push(*e));

        let age = FormItem::new(property!(Person::age));
        let group = FormGroup::new().with_item(age.clone());
        let group_id = group.id();

        form.push_group(group);
        assert!(age.is_bound());
        assert_eq!(age.value(), 30);

        let removed = form.remove_group(group_id).unwrap();
        assert!(!removed.is_bound());
        assert!(!age.is_bound());
        assert!(!age.is_disposed());
        assert_eq!(person.listener_count(), 0);
        assert!(form.remove_group(group_id).is_none());

        assert_eq!(
            *events.borrow(),
            vec![
                CollectionChanged::Inserted { index: 0, id: group_id },
                CollectionChanged::Removed { index: 0, id: group_id },
            ]
        );

        // Re-adding binds again
        form.insert_group(5, removed);
        assert!(age.is_bound());
        assert_eq!(person.listener_count(), 1);
    }

    #[test]
    fn test_group_moves_between_forms() {
        let first = Person::new("Ada", 30);
        let second = Person::new("Grace", 50);
        let age = FormItem::new(property!(Person::age));
        let group = FormGroup::new().with_item(age.clone());

        let form_a = Form::new(first.clone()).with_group(group.clone());
        let form_b = Form::new(second.clone()).with_group(group.clone());

        assert!(form_a.is_empty());
        assert_eq!(form_b.len(), 1);
        assert!(group.form().is_some_and(|form| form.ptr_eq(&form_b)));
        assert_eq!(age.value(), 50);
        assert_eq!(first.listener_count(), 0);

        form_a.dispose();
        assert!(!age.is_disposed());
        assert!(age.is_bound());

        second.set_age(51);
        assert_eq!(age.value(), 51);
    }

    #[test]
    fn test_group_listed_twice_stays_bound() {
        let person = Person::new("Ada", 30);
        let age = FormItem::new(property!(Person::age));
        let group = FormGroup::new().with_item(age.clone());
        let form = Form::new(person.clone()).with_groups([group.clone(), group.clone()]);
        assert_eq!(form.len(), 2);

        form.remove_group(group.id()).unwrap();
        assert_eq!(form.len(), 1);
        assert!(group.is_bound());
        assert!(age.is_bound());
        assert_eq!(person.listener_count(), 1);

        form.remove_group(group.id()).unwrap();
        assert!(!group.is_bound());
        assert!(!age.is_bound());
        assert_eq!(person.listener_count(), 0);
    }

    #[test]
    fn test_group_visibility_is_forwarded() {
        let person = Person::new("Ada", 30);
        let age = FormItem::new(property!(Person::age));
        let form = Form::new(person).with_group(FormGroup::new().with_item(age.clone()));

        let flips = Rc::new(RefCell::new(Vec::new()));
        let flips_clone = flips.clone();
        let _sub = form.on_group_visibility_changed(move |e| flips_clone.borrow_mut().push(e.is_visible));

        age.set_visible(false);
        assert_eq!(*flips.borrow(), vec![false]);
    }

    #[test]
    fn test_form_does_not_keep_target_alive() {
        let person = Person::new("Ada", 30);
        let weak = Rc::downgrade(&person);
        let age = FormItem::new(property!(Person::age));
        let form = Form::new(person).with_group(FormGroup::new().with_item(age.clone()));

        assert!(weak.upgrade().is_none());
        assert!(form.target().is_none());
        assert_eq!(age.value(), 0);
    }

    #[test]
    fn test_form_dropped_leaves_items_unbound() {
        let person = Person::new("Ada", 30);
        let age = FormItem::new(property!(Person::age));
        let form = Form::new(person.clone()).with_group(FormGroup::new().with_item(age.clone()));
        assert!(age.is_bound());

        drop(form);
        assert!(!age.is_bound());
        assert!(age.form().is_none());
    }
}
