//! Entity services
//!
//! `EntityService` wraps a `QueryBackend` and broadcasts a notification after
//! every successful mutation.

mod base;
mod config;
mod error;
mod memory;
pub mod models;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use base::EntityService;
pub use config::{NotificationConfig, PayloadBuilder};
pub use error::{Result, ServiceError};
pub use memory::MemoryBackend;
pub use models::*;
pub use traits::{Entity, QueryBackend};
