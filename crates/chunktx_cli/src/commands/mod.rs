//! CLI command implementations.

pub mod upload;
