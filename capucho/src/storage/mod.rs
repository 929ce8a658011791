//! Persistent storage: path layout and the project descriptor

pub mod layout;
pub mod project;
