//! Menu screen: navigation buttons and a random number

use formwork_components::{ButtonInputType, ButtonItem};
use formwork_core::{property, BindingTarget, ChangeNotifier, Form, FormGroup, PropertyTable};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::OnceLock;

use super::random::RandomNumberItem;

/// Screens the menu can navigate to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    Components,
    CreateConnection,
    CreateEvent,
}

#[derive(Default)]
pub struct MenuViewModel {
    random_number: Cell<i32>,
    navigation: RefCell<Vec<Destination>>,
    notifier: ChangeNotifier,
}

impl MenuViewModel {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn title(&self) -> String {
        "Menu".to_string()
    }

    pub fn random_number(&self) -> i32 {
        self.random_number.get()
    }

    pub fn set_random_number(&self, value: i32) {
        self.random_number.set(value);
        self.notifier.notify("random_number");
    }

    /// Destinations requested so far, oldest first
    pub fn navigation(&self) -> Vec<Destination> {
        self.navigation.borrow().clone()
    }

    fn navigate(&self, destination: Destination) {
        tracing::info!(?destination, "Navigation requested");
        self.navigation.borrow_mut().push(destination);
    }

    /// Build the menu form; `seed` makes the random number reproducible
    pub fn build_form(self: &Rc<Self>, seed: Option<u64>) -> Form {
        let path = property!(MenuViewModel::random_number);
        let random = match seed {
            Some(seed) => RandomNumberItem::seeded(path, seed),
            None => RandomNumberItem::new(path),
        }
        .with_label("Number");

        Form::new(self.clone()).with_groups([
            FormGroup::new().with_header(self.title()),
            FormGroup::new()
                .with_header("Gallery")
                .with_item(self.navigation_button("Show All Components", Destination::Components)),
            FormGroup::new().with_header("Random number").with_item(random),
            FormGroup::new()
                .with_header("Examples")
                .with_footer("Contains some real-life examples.")
                .with_item(
                    self.navigation_button("Setup New Connection", Destination::CreateConnection),
                )
                .with_item(self.navigation_button("Create New Event", Destination::CreateEvent))
                .with_item(
                    self.navigation_button("Label", Destination::Components)
                        .with_prefix("Prefix")
                        .with_input_type(ButtonInputType::Destructive),
                ),
        ])
    }

    fn navigation_button(self: &Rc<Self>, label: &str, destination: Destination) -> ButtonItem {
        let view_model: Weak<Self> = Rc::downgrade(self);
        ButtonItem::new(move || {
            if let Some(view_model) = view_model.upgrade() {
                view_model.navigate(destination);
            }
        })
        .with_label(label)
        .with_input_type(ButtonInputType::Done)
    }
}

impl BindingTarget for MenuViewModel {
    fn properties(&self) -> &PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder::<MenuViewModel>()
                .read_only("title", MenuViewModel::title)
                .property(
                    "random_number",
                    MenuViewModel::random_number,
                    MenuViewModel::set_random_number,
                )
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
