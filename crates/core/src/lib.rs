//! `storeops-core` — shared primitives for the store-operations back office.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
