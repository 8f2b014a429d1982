pub mod controller;
pub mod state;

pub use controller::{ConnectionController, SessionClosed, SessionCommand, SessionHandle};
pub use state::{ConnectFailure, ConnectionState};
