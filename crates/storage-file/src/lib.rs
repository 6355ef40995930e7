//! Encrypted single-file persistence for scorekeep state.
//!
//! [`EncryptedFileStore`] implements the core `StateStore` port: the whole
//! [`scorekeep_core::sync::PersistedState`] is serialized to JSON, sealed with
//! ChaCha20-Poly1305 and atomically swapped into place on every save.

mod crypto;
mod encrypted_store;
pub mod errors;

pub use encrypted_store::EncryptedFileStore;
pub use errors::{Result, StorageError};
