//! Configuration resolution

pub mod keys;
pub mod resolver;

pub use keys::ConfigMap;
pub use resolver::{ConfigResolver, EffectiveConfig};
