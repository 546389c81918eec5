//! Persistent store abstraction for the bridge.
//!
//! Everything the bridge remembers lives in one ordered text key→value map
//! with point lookups. The production backend is sled; an in-memory backend
//! backs tests in the crates layered above.

pub mod errors;
pub mod kv;
pub mod mem;
pub mod sled_kv;

pub use errors::{DbError, DbResult};
pub use kv::{KvStore, KvStoreExt};
pub use mem::MemKvStore;
pub use sled_kv::SledKvStore;
