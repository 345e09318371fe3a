//! murmur-threads — durable conversation state.
//!
//! The storage engine is opaque behind [`KeyValStore`] (get/put/has_key/
//! remove); everything above it is explicit, versioned JSON. [`ThreadStore`]
//! owns the per-room chat threads, [`KnownUsers`] the user directory.

pub mod error;
pub mod keyval;
pub mod store;
pub mod thread;
pub mod users;

pub use error::{Result, StorageError};
pub use keyval::{KeyValStore, SqliteKeyValStore};
pub use store::ThreadStore;
pub use thread::{ChatThread, CHAT_THREAD_VERSION};
pub use users::{KnownUser, KnownUsers, KNOWN_USERS_KEY};
