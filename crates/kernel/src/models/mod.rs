//! Content models.

pub mod resource;

pub use resource::{RawRecord, Resource, normalize_path, parent_path};
