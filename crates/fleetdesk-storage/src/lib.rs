//! Fleetdesk Durable Client Storage
//!
//! This crate provides the key-value persistence the console keeps on the
//! client side:
//! - `StateStore` trait
//! - File-backed store with atomic writes
//! - In-memory store used when durable storage is unavailable
//! - Fixed storage keys

mod atomic_writer;
pub mod keys;
pub mod memory;
pub mod state;
pub mod traits;

pub use atomic_writer::AtomicWriter;
pub use memory::MemoryStateStore;
pub use state::FileStateStore;
pub use traits::{StateStore, StorageError, StorageResult};
