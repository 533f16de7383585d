//! Binding target shared by the component tests

use formwork_core::{BindingTarget, ChangeNotifier, FormGroup, Form, FormNode, PropertyTable};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::OnceLock;

#[derive(Default)]
pub struct Settings {
    name: RefCell<String>,
    theme: RefCell<Option<String>>,
    tags: RefCell<Vec<String>>,
    size: Cell<u8>,
    notifier: ChangeNotifier,
}

impl Settings {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: String) {
        *self.name.borrow_mut() = name;
        self.notifier.notify("name");
    }

    pub fn theme(&self) -> Option<String> {
        self.theme.borrow().clone()
    }

    pub fn set_theme(&self, theme: Option<String>) {
        *self.theme.borrow_mut() = theme;
        self.notifier.notify("theme");
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.borrow().clone()
    }

    pub fn set_tags(&self, tags: Vec<String>) {
        *self.tags.borrow_mut() = tags;
        self.notifier.notify("tags");
    }

    pub fn size(&self) -> u8 {
        self.size.get()
    }

    pub fn set_size(&self, size: u8) {
        self.size.set(size);
        self.notifier.notify("size");
    }
}

impl BindingTarget for Settings {
    fn properties(&self) -> &PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder::<Settings>()
                .property("name", Settings::name, Settings::set_name)
                .property("theme", Settings::theme, Settings::set_theme)
                .property("tags", Settings::tags, Settings::set_tags)
                .property("size", Settings::size, Settings::set_size)
                .build()
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn notifier(&self) -> Option<&ChangeNotifier> {
        Some(&self.notifier)
    }
}

/// Bind a single node to `settings` through a one-group form
pub fn bind(settings: &Rc<Settings>, node: impl FormNode) -> Form {
    Form::new(settings.clone()).with_group(FormGroup::new().with_item(node))
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
