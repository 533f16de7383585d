//! Text presenter
//!
//! Stands in for a UI layer: renders a form as indented lines and logs the
//! events a real list view would react to.

use formwork_components::ButtonItem;
use formwork_core::{
    CollectionChanged, Form, FormGroup, FormNode, GroupId, ItemId, ItemKind, Subscription,
    WeakForm,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, info};

/// Observes one form for as long as it is alive
///
/// Sections and items inserted after attaching are observed as well.
pub struct LogPresenter {
    form: Form,
    events: Rc<Cell<usize>>,
    _watchers: Rc<Watchers>,
    _subscriptions: Vec<Subscription>,
}

/// Per-section and per-item subscriptions, kept in step with the layout
struct Watchers {
    form: WeakForm,
    events: Rc<Cell<usize>>,
    groups: RefCell<Vec<(GroupId, Subscription)>>,
    items: RefCell<Vec<(ItemId, Subscription)>>,
}

impl Watchers {
    fn count(&self) {
        self.events.set(self.events.get() + 1);
    }

    fn watch_group(self: &Rc<Self>, group: &FormGroup) {
        let id = group.id();
        if self.groups.borrow().iter().any(|(watched, _)| *watched == id) {
            return;
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let subscription = group.on_items_changed(move |event| {
            let Some(watchers) = weak.upgrade() else {
                return;
            };
            watchers.count();
            match *event {
                CollectionChanged::Inserted { index, id } => {
                    debug!(item = %id, index, "Item inserted");
                    if let Some(node) = watchers.form.upgrade().and_then(|form| form.find(id)) {
                        watchers.watch_item(node.as_ref());
                    }
                }
                CollectionChanged::Removed { index, id } => {
                    debug!(item = %id, index, "Item removed");
                    watchers.forget_unlisted_items();
                }
            }
        });
        self.groups.borrow_mut().push((id, subscription));

        for node in group.items() {
            self.watch_item(node.as_ref());
        }
    }

    fn watch_item(self: &Rc<Self>, node: &dyn FormNode) {
        let id = node.item().id();
        if self.items.borrow().iter().any(|(watched, _)| *watched == id) {
            return;
        }

        let weak: Weak<Self> = Rc::downgrade(self);
        let subscription = node.item().property_changed().subscribe(move |event| {
            let Some(name) = event.name() else {
                return;
            };
            if name == "value" || name == "formatted_value" {
                return;
            }
            if let Some(watchers) = weak.upgrade() {
                watchers.count();
                debug!(item = %id, property = name, "Item property changed");
            }
        });
        self.items.borrow_mut().push((id, subscription));
    }

    /// Drop subscriptions of sections and items the form no longer lists
    fn forget_unlisted_items(&self) {
        let Some(form) = self.form.upgrade() else {
            return;
        };
        let groups: Vec<GroupId> = form.groups().iter().map(FormGroup::id).collect();
        let items: Vec<ItemId> = form.items().iter().map(|node| node.item().id()).collect();

        self.groups.borrow_mut().retain(|(id, _)| groups.contains(id));
        self.items.borrow_mut().retain(|(id, _)| items.contains(id));
    }
}

impl LogPresenter {
    pub fn attach(form: &Form) -> Self {
        let events = Rc::new(Cell::new(0));
        let watchers = Rc::new(Watchers {
            form: form.downgrade(),
            events: events.clone(),
            groups: RefCell::new(Vec::new()),
            items: RefCell::new(Vec::new()),
        });
        let mut subscriptions = Vec::new();

        let weak = form.downgrade();
        let counter = events.clone();
        subscriptions.push(form.on_value_changed(move |event| {
            counter.set(counter.get() + 1);
            let Some(node) = weak.upgrade().and_then(|form| form.find(event.item)) else {
                return;
            };
            let item = node.item();
            info!(
                item = %event.item,
                property = event.property.as_deref(),
                value = item.formatted_value().as_deref(),
                error = item.validation_error_message().as_deref(),
                "Value changed"
            );
        }));

        let counter = events.clone();
        subscriptions.push(form.on_group_visibility_changed(move |event| {
            counter.set(counter.get() + 1);
            info!(group = %event.group, is_visible = event.is_visible, "Section visibility changed");
        }));

        let weak = Rc::downgrade(&watchers);
        subscriptions.push(form.on_groups_changed(move |event| {
            let Some(watchers) = weak.upgrade() else {
                return;
            };
            watchers.count();
            match *event {
                CollectionChanged::Inserted { index, id } => {
                    info!(%id, index, "Section inserted");
                    let group = watchers
                        .form
                        .upgrade()
                        .and_then(|form| form.groups().into_iter().find(|group| group.id() == id));
                    if let Some(group) = group {
                        watchers.watch_group(&group);
                    }
                }
                CollectionChanged::Removed { index, id } => {
                    info!(%id, index, "Section removed");
                    watchers.forget_unlisted_items();
                }
            }
        }));

        for group in form.groups() {
            watchers.watch_group(&group);
        }

        Self {
            form: form.clone(),
            events,
            _watchers: watchers,
            _subscriptions: subscriptions,
        }
    }

    /// Events observed since attaching
    pub fn events(&self) -> usize {
        self.events.get()
    }

    /// Render visible sections and items, one line each
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for group in self.form.groups() {
            if !group.is_visible() {
                continue;
            }
            lines.push(format!("[{}]", group.header().unwrap_or_default()));

            for node in group.items() {
                if node.item().is_visible() {
                    render_node(node.as_ref(), &mut lines);
                }
            }

            if let Some(footer) = group.footer() {
                lines.push(format!("  ({footer})"));
            }
        }

        lines
    }

    /// Render and log the form
    pub fn present(&self) {
        for line in self.render() {
            info!("{line}");
        }
    }
}

fn render_node(node: &dyn FormNode, lines: &mut Vec<String>) {
    let item = node.item();
    let label = item.label().unwrap_or_default();
    let marker = if item.is_read_only() { " (read-only)" } else { "" };

    match node.kind() {
        ItemKind::Button => {
            let prefix = node
                .as_any()
                .downcast_ref::<ButtonItem>()
                .and_then(ButtonItem::prefix)
                .map(|prefix| format!("{prefix} "))
                .unwrap_or_default();
            lines.push(format!("  <{prefix}{label}>{marker}"));
        }
        kind => {
            let value = item.formatted_value().unwrap_or_default();
            lines.push(format!("  {label}: {value}{marker}"));

            if matches!(
                kind,
                ItemKind::Picker | ItemKind::MultiValuePicker | ItemKind::Segments
            ) {
                for option in node.options() {
                    let mark = if option.is_picked { "x" } else { " " };
                    let title = option.formatted_value.unwrap_or_default();
                    lines.push(format!("    ({mark}) {title}"));
                }
            }
        }
    }

    if let Some(message) = item.validation_error_message() {
        lines.push(format!("    ! {message}"));
    }
}
