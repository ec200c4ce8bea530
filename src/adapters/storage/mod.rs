//! Content storage adapters.

mod file_content_storage;
mod in_memory_content_storage;

pub use file_content_storage::FileContentStorage;
pub use in_memory_content_storage::InMemoryContentStorage;
