//! hashbin-store
//!
//! Persistence backends for signed metadata documents:
//! - [`FsStore`]: one `<role>.json` file per document in a directory
//! - [`MemoryStore`]: in-process map, for tests and dry runs
//!
//! Both implement [`hashbin_core::store::MetadataStore`].

pub mod error;
pub mod fs;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use memory::MemoryStore;
