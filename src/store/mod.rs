//! License persistence.

pub mod file;
pub mod format;

pub use file::FileStore;
pub use format::{StoredFormat, StoredLicense};
