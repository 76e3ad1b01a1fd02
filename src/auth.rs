//! Auth-domain identifiers, session tokens, and token-change listeners.

pub mod id;
pub mod listener;
pub mod secret;
pub mod session;

pub use id::*;
pub use listener::*;
pub use secret::*;
pub use session::*;
