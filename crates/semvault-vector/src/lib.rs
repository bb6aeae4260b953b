//! semvault-vector
//!
//! Vector store backends: LanceDB tables inside each vault's index directory,
//! an in-memory store for tests, and the per-vault cache handing them out.
pub mod cache;
pub mod filter;
pub mod lance;
pub mod memory;
pub mod schema;

pub use cache::StoreCache;
pub use lance::LanceVectorStore;
pub use memory::MemoryStore;
