//! Connection dispatch: the accept loop and its admission strategies.

pub mod admission;
pub mod listener;

pub use admission::{Admission, Gate};
pub use listener::{Listener, Server, ServerHandle};
