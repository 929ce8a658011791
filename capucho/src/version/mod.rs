//! Version metadata

pub mod manifest;
pub mod syncer;

pub use syncer::{VersionSnapshot, VersionSyncer};
