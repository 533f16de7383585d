//! Binding targets shared by the engine tests

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::OnceLock;

use crate::notify::ChangeNotifier;
use crate::property::{BindingTarget, PropertyTable};

/// Notifying target with a handful of properties
#[derive(Default)]
pub struct Person {
    name: RefCell<String>,
    age: Cell<i32>,
    email: RefCell<Option<String>>,
    notifier: ChangeNotifier,
}

impl Person {
    pub fn new(name: &str, age: i32) -> Rc<Self> {
        Rc::new(Self {
            name: RefCell::new(name.to_string()),
            age: Cell::new(age),
            ..Self::default()
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: String) {
        *self.name.borrow_mut() = name;
        self.notifier.notify("name");
    }

    pub fn age(&self) -> i32 {
        self.age.get()
    }

    pub fn set_age(&self, age: i32) {
        self.age.set(age);
        self.notifier.notify("age");
    }

    pub fn email(&self) -> Option<String> {
        self.email.borrow().clone()
    }

    pub fn set_email(&self, email: Option<String>) {
        *self.email.borrow_mut() = email;
        self.notifier.notify("email");
    }

    pub fn greeting(&self) -> String {
        format!("Hello, {}", self.name.borrow())
    }

    /// Change the age and raise an unqualified notification
    pub fn set_age_unqualified(&self, age: i32) {
        self.age.set(age);
        self.notifier.notify_all();
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.listener_count()
    }
}

impl BindingTarget for Person {
    fn properties(&self) -> &PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder::<Person>()
                .property("name", Person::name, Person::set_name)
                .property("age", Person::age, Person::set_age)
                .property("email", Person::email, Person::set_email)
                .read_only("greeting", Person::greeting)
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

/// A different concrete type exposing an `age` property
#[derive(Default)]
pub struct Employee {
    age: Cell<i32>,
    notifier: ChangeNotifier,
}

impl Employee {
    pub fn new(age: i32) -> Rc<Self> {
        Rc::new(Self {
            age: Cell::new(age),
            ..Self::default()
        })
    }

    pub fn age(&self) -> i32 {
        self.age.get()
    }

    pub fn set_age(&self, age: i32) {
        self.age.set(age);
        self.notifier.notify("age");
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.listener_count()
    }
}

impl BindingTarget for Employee {
    fn properties(&self) -> &PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder::<Employee>()
                .property("age", Employee::age, Employee::set_age)
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

/// Target without change notifications
pub struct Car {
    name: RefCell<String>,
}

impl Car {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: RefCell::new(name.to_string()),
        })
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: String) {
        *self.name.borrow_mut() = name;
    }
}

impl BindingTarget for Car {
    fn properties(&self) -> &PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder::<Car>()
                .property("name", Car::name, Car::set_name)
                .build()
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
