//! Directory dictionary loading.
//!
//! A `CategoryDescriptor` names a directory, a filename filter, a depth limit
//! and whether the directory must exist; `DictionaryBuilder` walks it and
//! returns the matched files keyed by their relative path.

pub mod builder;
pub mod descriptor;

pub use builder::DictionaryBuilder;
pub use descriptor::{CategoryDescriptor, LoadMode, extension_filter};
