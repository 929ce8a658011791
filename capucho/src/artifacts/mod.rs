//! Build artifacts

pub mod locator;

pub use locator::{ArtifactKind, ArtifactLocator};
