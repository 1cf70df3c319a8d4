//! Data models for ftsend
//!
//! Requests come in from the host as JSON, results go back out through the
//! callback bridge as JSON.

pub mod receiver;
pub mod request;
pub mod result;

// Re-export commonly used types for convenience
pub use receiver::{parse_receivers, Receiver, MAX_RECEIVERS};
pub use request::{Credential, Network, TransferRequest};
pub use result::{CallbackPayload, TransferResult};
