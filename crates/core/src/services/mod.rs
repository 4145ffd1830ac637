//! Remote collaborators of the orchestrator.
//!
//! The console backend splits combined documents, protects artifacts and
//! sends messages. Every call is made with the session credential; bytes for
//! registered artifacts are retrieved separately through a [`Fetcher`].

mod error;
mod http;
mod traits;
mod types;

pub use error::ServiceError;
pub use http::{ConsoleClient, HttpFetcher};
pub use traits::{Dispatcher, Fetcher, Protector, Splitter};
pub use types::{DispatchReceipt, DispatchRequest};
