//! Domain models

pub mod job;
