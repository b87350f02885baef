//! Render/poll engine: sliding windows, grid planning, panel bindings, the
//! session state machine and its cancel token.

pub mod cancel;
pub mod layout;
pub mod registry;
pub mod session;
pub mod window;
