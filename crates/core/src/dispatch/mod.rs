//! Sequential dispatch of a batch of distribution items.
//!
//! Items are processed strictly one at a time, in input order:
//! - **Retrieval**: registered artifacts are fetched from their location
//! - **Dispatch**: one message per item, with the shared batch template
//! - **Progress**: exactly one update per item, after its real work is done
//!
//! A failing item is recorded and the batch moves on; only a missing
//! credential stops the batch, and it does so before the first item.

mod config;
mod pipeline;
mod types;

pub use config::DispatchConfig;
pub use pipeline::DispatchPipeline;
pub use types::{DispatchError, DispatchOutcome, DispatchProgress, FailureReason, ItemFailure};
