//! Core types and traits for the shortlinks service.
//!
//! This crate provides the entity model, the storage contract every
//! backend implements, and the serving-side helpers (path resolution and
//! suggestion ranking) that only depend on that contract.

pub mod clock;
pub mod error;
pub mod model;
pub mod path;
pub mod service;
pub mod storage;
pub mod suggest;

pub use clock::{Clock, MonotonicClock, SystemClock};
pub use error::{DeleteStep, Result, StorageError};
pub use model::{History, Shortlink, Tombstone, DELETED_SENTINEL};
pub use service::{LinkService, Resolution};
pub use storage::{DeletedLinks, ReadStorage, Storage};
