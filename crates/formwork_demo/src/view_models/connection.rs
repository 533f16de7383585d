//! "Setup new connection" screen
//!
//! Exercises every built-in item kind against one view-model: validated text
//! entry, a protocol picker whose callback fills in the default port, an
//! authentication segment that toggles the password field, and a save button
//! that stays read-only while the form is invalid.

use formwork_components::{
    ButtonInputType, ButtonItem, MultiValuePickerItem, PickerInputType, PickerItem, SegmentsItem,
    TextInputType, TextItem,
};
use formwork_core::{
    property, BindingTarget, ChangeNotifier, Form, FormGroup, PropertyTable, Subscription,
    ValidationRule,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::OnceLock;

use crate::config::ConnectionDefaults;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Ssh,
    Ftp,
    Telnet,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Ssh, Protocol::Ftp, Protocol::Telnet];

    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Ssh => 22,
            Protocol::Ftp => 21,
            Protocol::Telnet => 23,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Ssh => "SSH",
            Protocol::Ftp => "FTP",
            Protocol::Telnet => "Telnet",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMethod {
    #[default]
    Password,
    Key,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMethod::Password => "Password",
            AuthMethod::Key => "Key",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionOption {
    Compression,
    KeepAlive,
    AgentForwarding,
}

impl fmt::Display for ConnectionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionOption::Compression => "Compression",
            ConnectionOption::KeepAlive => "Keep-alive",
            ConnectionOption::AgentForwarding => "Agent forwarding",
        })
    }
}

#[derive(Default)]
pub struct ConnectionViewModel {
    host: RefCell<String>,
    port: Cell<u16>,
    user: RefCell<String>,
    password: RefCell<String>,
    protocol: Cell<Option<Protocol>>,
    auth: Cell<AuthMethod>,
    options: RefCell<Vec<ConnectionOption>>,
    saved: Cell<u32>,
    notifier: ChangeNotifier,
}

impl ConnectionViewModel {
    pub fn new(defaults: &ConnectionDefaults) -> Rc<Self> {
        let view_model = Self::default();
        *view_model.host.borrow_mut() = defaults.host.clone();
        view_model.port.set(defaults.port);
        *view_model.user.borrow_mut() = defaults.user.clone().unwrap_or_default();
        Rc::new(view_model)
    }

    pub fn host(&self) -> String {
        self.host.borrow().clone()
    }

    pub fn set_host(&self, host: String) {
        *self.host.borrow_mut() = host;
        self.notifier.notify("host");
    }

    pub fn port(&self) -> u16 {
        self.port.get()
    }

    pub fn set_port(&self, port: u16) {
        self.port.set(port);
        self.notifier.notify("port");
    }

    pub fn user(&self) -> String {
        self.user.borrow().clone()
    }

    pub fn set_user(&self, user: String) {
        *self.user.borrow_mut() = user;
        self.notifier.notify("user");
    }

    pub fn password(&self) -> String {
        self.password.borrow().clone()
    }

    pub fn set_password(&self, password: String) {
        *self.password.borrow_mut() = password;
        self.notifier.notify("password");
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol.get()
    }

    pub fn set_protocol(&self, protocol: Option<Protocol>) {
        self.protocol.set(protocol);
        self.notifier.notify("protocol");
    }

    pub fn auth(&self) -> AuthMethod {
        self.auth.get()
    }

    pub fn set_auth(&self, auth: AuthMethod) {
        self.auth.set(auth);
        self.notifier.notify("auth");
    }

    pub fn options(&self) -> Vec<ConnectionOption> {
        self.options.borrow().clone()
    }

    pub fn set_options(&self, options: Vec<ConnectionOption>) {
        *self.options.borrow_mut() = options;
        self.notifier.notify("options");
    }

    /// Number of successful saves
    pub fn saved(&self) -> u32 {
        self.saved.get()
    }

    pub fn save(&self) {
        self.saved.set(self.saved.get() + 1);
        tracing::info!(
            host = %self.host(),
            port = self.port(),
            protocol = ?self.protocol(),
            auth = %self.auth(),
            "Connection saved"
        );
    }
}

impl BindingTarget for ConnectionViewModel {
    fn properties(&self) -> &PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder::<ConnectionViewModel>()
                .property("host", Self::host, Self::set_host)
                .property("port", Self::port, Self::set_port)
                .property("user", Self::user, Self::set_user)
                .property("password", Self::password, Self::set_password)
                .property("protocol", Self::protocol, Self::set_protocol)
                .property("auth", Self::auth, Self::set_auth)
                .property("options", Self::options, Self::set_options)
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

/// The connection form plus typed handles to its items
///
/// Dropping the screen disposes the form.
pub struct ConnectionScreen {
    pub view_model: Rc<ConnectionViewModel>,
    pub form: Form,
    pub host: TextItem<String>,
    pub port: TextItem<u16>,
    pub protocol: PickerItem<Protocol>,
    pub auth: SegmentsItem<AuthMethod>,
    pub password: TextItem<String>,
    pub options: MultiValuePickerItem<ConnectionOption>,
    pub save: ButtonItem,
    _validity: Subscription,
}

impl ConnectionScreen {
    pub fn new(view_model: Rc<ConnectionViewModel>, picker_style: PickerInputType) -> Self {
        let weak_view_model = Rc::downgrade(&view_model);

        let host = TextItem::new(property!(ConnectionViewModel::host))
            .with_label("Host")
            .with_placeholder("example.com")
            .with_input_type(TextInputType::Url)
            .with_requirement(|host: &String| !host.trim().is_empty(), "Host is required")
            .with_requirement(
                |host: &String| !host.contains(char::is_whitespace),
                "Host must not contain spaces",
            );

        let port = TextItem::new(property!(ConnectionViewModel::port))
            .with_label("Port")
            .with_input_type(TextInputType::Number)
            .with_formatter(|port: &u16| port.to_string())
            .with_requirement(|port: &u16| *port != 0, "Port must be between 1 and 65535");

        let protocol = PickerItem::new(property!(ConnectionViewModel::protocol))
            .with_label("Protocol")
            .with_message("Choose a protocol")
            .with_input_type(picker_style)
            .with_source(Protocol::ALL)
            .with_formatter(Protocol::to_string)
            .with_requirement(|protocol: &Option<Protocol>| protocol.is_some(), "Pick a protocol")
            .with_callback({
                let view_model = weak_view_model.clone();
                move |_, protocol: &Option<Protocol>| {
                    if let (Some(view_model), Some(protocol)) = (view_model.upgrade(), protocol) {
                        view_model.set_port(protocol.default_port());
                    }
                }
            });

        let user = TextItem::new(property!(ConnectionViewModel::user))
            .with_label("User")
            .with_placeholder("root");

        let password = TextItem::new(property!(ConnectionViewModel::password))
            .with_label("Password")
            .with_input_type(TextInputType::Password)
            .with_rule(password_rule(weak_view_model.clone()));

        let auth = {
            let password = password.clone();
            SegmentsItem::new(property!(ConnectionViewModel::auth))
                .with_label("Authentication")
                .with_source([AuthMethod::Password, AuthMethod::Key])
                .with_formatter(AuthMethod::to_string)
                .with_callback(move |_, auth: &AuthMethod| {
                    password.set_visible(*auth == AuthMethod::Password);
                })
        };
        password.set_visible(view_model.auth() == AuthMethod::Password);

        let options = MultiValuePickerItem::new(property!(ConnectionViewModel::options))
            .with_label("Options")
            .with_input_type(picker_style)
            .with_source([
                ConnectionOption::Compression,
                ConnectionOption::KeepAlive,
                ConnectionOption::AgentForwarding,
            ])
            .with_formatter(ConnectionOption::to_string);

        let save = ButtonItem::new({
            let view_model = weak_view_model.clone();
            move || {
                if let Some(view_model) = view_model.upgrade() {
                    view_model.save();
                }
            }
        })
        .with_label("Save")
        .with_input_type(ButtonInputType::Done);

        let form = Form::new(view_model.clone()).with_groups([
            FormGroup::new()
                .with_header("Server")
                .with_item(host.clone())
                .with_item(port.clone())
                .with_item(protocol.clone()),
            FormGroup::new()
                .with_header("Authentication")
                .with_item(user)
                .with_item(auth.clone())
                .with_item(password.clone()),
            FormGroup::new()
                .with_header("Options")
                .with_footer("Options apply to new sessions only.")
                .with_item(options.clone()),
            FormGroup::new().with_item(save.clone()),
        ]);

        save.set_read_only(!form.validate());
        let validity = {
            let form_ref = form.downgrade();
            let save = save.clone();
            form.on_value_changed(move |_| {
                if let Some(form) = form_ref.upgrade() {
                    let is_valid = form.validate();
                    if save.is_read_only() == is_valid {
                        tracing::debug!(is_valid, "Save availability changed");
                        save.set_read_only(!is_valid);
                    }
                }
            })
        };

        Self {
            view_model,
            form,
            host,
            port,
            protocol,
            auth,
            password,
            options,
            save,
            _validity: validity,
        }
    }
}

impl Drop for ConnectionScreen {
    fn drop(&mut self) {
        self.form.dispose();
    }
}

/// Password is only required for password authentication
fn password_rule(view_model: Weak<ConnectionViewModel>) -> ValidationRule<String> {
    ValidationRule::require(
        move |password: &String| {
            view_model.upgrade().map_or(true, |view_model| {
                view_model.auth() != AuthMethod::Password || !password.is_empty()
            })
        },
        "Password is required",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_core::FormNode;

    fn screen() -> ConnectionScreen {
        let view_model = ConnectionViewModel::new(&ConnectionDefaults::default());
        ConnectionScreen::new(view_model, PickerInputType::PopUp)
    }

    #[test]
    fn test_starts_from_defaults_and_invalid() {
        let screen = screen();

        assert_eq!(screen.host.value(), "localhost");
        assert_eq!(screen.port.formatted_value().as_deref(), Some("22"));
        assert_eq!(screen.protocol.input_type(), PickerInputType::PopUp);
        assert!(!screen.form.is_valid());
        assert_eq!(
            screen.protocol.validation_error_message().as_deref(),
            Some("Pick a protocol")
        );
        assert!(screen.save.is_read_only());

        // Read-only button ignores invocations
        screen.save.invoke().unwrap();
        assert_eq!(screen.view_model.saved(), 0);
    }

    #[test]
    fn test_protocol_callback_sets_default_port() {
        let screen = screen();

        screen.protocol.pick(Some(1)).unwrap();
        assert_eq!(screen.view_model.protocol(), Some(Protocol::Ftp));
        assert_eq!(screen.view_model.port(), 21);
        assert_eq!(screen.port.value(), 21);
        assert_eq!(screen.protocol.formatted_value().as_deref(), Some("FTP"));
    }

    #[test]
    fn test_save_enabled_once_valid() {
        let screen = screen();

        screen.protocol.pick(Some(0)).unwrap();
        assert!(screen.save.is_read_only());

        screen.password.set_value("secret".to_string());
        assert!(screen.form.is_valid());
        assert!(!screen.save.is_read_only());

        screen.save.invoke().unwrap();
        assert_eq!(screen.view_model.saved(), 1);

        // Target-side edits flow through the same gate
        screen.view_model.set_host(String::new());
        assert_eq!(
            screen.host.validation_error_message().as_deref(),
            Some("Host is required")
        );
        assert!(screen.save.is_read_only());
    }

    #[test]
    fn test_key_auth_hides_password() {
        let screen = screen();
        screen.protocol.pick(Some(0)).unwrap();
        assert!(screen.password.is_visible());

        screen.auth.pick(1).unwrap();
        assert_eq!(screen.view_model.auth(), AuthMethod::Key);
        assert!(!screen.password.is_visible());
        assert!(screen.password.is_valid());
        assert!(!screen.save.is_read_only());
    }

    #[test]
    fn test_host_rules_in_order() {
        let screen = screen();

        screen.host.set_value("my host".to_string());
        assert_eq!(
            screen.host.validation_error_message().as_deref(),
            Some("Host must not contain spaces")
        );

        screen.host.set_value("  ".to_string());
        assert_eq!(
            screen.host.validation_error_message().as_deref(),
            Some("Host is required")
        );
    }

    #[test]
    fn test_options_toggle() {
        let screen = screen();

        screen.options.pick(Some(1)).unwrap();
        screen.options.pick(Some(0)).unwrap();
        assert_eq!(
            screen.view_model.options(),
            vec![ConnectionOption::Compression, ConnectionOption::KeepAlive]
        );
        assert_eq!(
            screen.options.formatted_value().as_deref(),
            Some("Compression, Keep-alive")
        );
    }

    #[test]
    fn test_drop_disposes_form() {
        let view_model = ConnectionViewModel::new(&ConnectionDefaults::default());
        let screen = ConnectionScreen::new(view_model.clone(), PickerInputType::Default);
        let form = screen.form.clone();
        assert!(view_model.notifier.listener_count() > 0);

        drop(screen);
        assert!(form.is_disposed());
        assert_eq!(view_model.notifier.listener_count(), 0);
    }
}
