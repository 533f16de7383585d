//! Sample view-models and the forms built over them

pub mod connection;
pub mod menu;
pub mod random;

pub use connection::{AuthMethod, ConnectionScreen, ConnectionViewModel};
pub use menu::MenuViewModel;
