//! Streaming layer: inbound message checks, rolling windows and the shared
//! state observers resynchronize from.

pub mod message;
pub mod store;
pub mod window;

pub use message::{AcceptedBatch, MessageValidator, Rejection};
pub use store::{SharedStateStore, Snapshot};
pub use window::{SeriesWindow, StreamError};
