pub mod encryption;
pub mod errors;
pub mod ratelimit;

pub use encryption::{encrypt_credential, resolve_credential};
pub use errors::TransferError;
