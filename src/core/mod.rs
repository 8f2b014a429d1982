pub mod address;
pub mod notify;

pub use address::{canonical, is_address_shaped, parse_address, short};
pub use notify::{LogNotifier, Notifier, NotifyLevel, NullNotifier};
