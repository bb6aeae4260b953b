//! semvault-core
//!
//! Domain types, trait seams and the pure building blocks of a semantic vault:
//! identifiers, chunking, metadata assembly, path containment, text extraction
//! and the persisted vault registry.

pub mod chunker;
pub mod config;
pub mod error;
pub mod extract;
pub mod guard;
pub mod ids;
pub mod metadata;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
