//! # chunktx Storage
//!
//! Document backend trait and implementations for chunktx.
//!
//! A document backend is the only view the transaction engine has of the
//! storage medium. It offers four operations: create a private temporary
//! document, open a write channel to it, rename it into place, delete it.
//!
//! ## Design Principles
//!
//! - Backends know nothing about transactions, headers or payloads
//! - Temporary documents are invisible under their final name until renamed
//! - Must be `Send + Sync` so one backend can serve many transactions
//!
//! ## Available Backends
//!
//! - [`FileDocumentBackend`] - Local filesystem using OS file APIs
//! - [`InMemoryDocumentBackend`] - For testing, with fault injection
//!
//! ## Example
//!
//! ```rust
//! use chunktx_storage::{DocumentBackend, InMemoryDocumentBackend};
//! use std::path::Path;
//!
//! let backend = InMemoryDocumentBackend::new();
//! let doc = backend.create_temporary(Path::new("/root"), "hello.txt").unwrap();
//! let mut channel = backend.open_write(&doc).unwrap();
//! channel.write_at(0, b"hello world").unwrap();
//! channel.close().unwrap();
//! assert!(backend.delete(&doc).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{temporary_name, DocumentBackend, TempDocument, WriteChannel, TEMP_SUFFIX};
pub use error::{StorageError, StorageResult};
pub use file::FileDocumentBackend;
pub use memory::{Faults, InMemoryDocumentBackend};
