//! Caches

pub mod cloud;
