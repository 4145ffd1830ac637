//! Bearer credential supply for the remote console services.
//!
//! The session is process-scoped: constructed once at startup, read by value
//! on each operation and replaced wholesale on login/logout.

mod session;
mod traits;
mod types;

pub use session::*;
pub use traits::*;
pub use types::*;
