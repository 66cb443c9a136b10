//! Storage capability for muxd.
//!
//! This module provides the trait-based interface storage backends
//! implement to be mounted in the storage multiplexer, plus two backends:
//! the local filesystem and an in-memory store.
//!
//! # Design Principles
//! - Provider isolation: no backend-specific logic above this crate
//! - Async operations: all I/O operations are async
//! - Unified error semantics: consistent error types across providers

pub mod local;
pub mod memory;
pub mod provider;

pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use provider::{Metadata, StorageProvider};
