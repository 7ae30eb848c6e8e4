//! # chunktx Core
//!
//! Transaction processing engine for chunktx.
//!
//! This crate provides:
//! - The [`Transaction`] contract: `init`, `process`, `commit`, `abort`
//! - A [`TransactionProcessor`] that drives transactions by id through a
//!   pluggable [`Registry`]
//! - The chunked file [`upload`] transaction and its payload iterator
//! - A CBOR [`codec`] for moving headers and payloads over a transport
//!
//! Every transaction ends in exactly one of `commit` or `abort`, and any
//! failure along the way aborts the transaction before the error reaches the
//! caller.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod config;
mod context;
mod error;
mod processor;
mod transaction;
mod types;
pub mod upload;

pub use config::{Config, DEFAULT_CHUNK_SIZE};
pub use context::{ContextProvider, ExecutionContext, FixedContext};
pub use error::{CoreError, CoreResult};
pub use processor::{
    InFlight, InitResult, MapRegistry, ProcessResult, Registry, SerialRegistry, Slot,
    TransactionProcessor,
};
pub use transaction::{Outcome, Reply, Transaction, TransactionFactory, TransactionState};
pub use types::TransactionId;
pub use upload::{
    PayloadIterator, UploadHeader, UploadPayload, UploadProcessor, UploadReport,
    UploadTransaction, UploadTransactionFactory,
};

/// Version of the chunktx core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
