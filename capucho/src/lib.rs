//! Capucho Library
//!
//! Packages app builds (native binaries or OTA bundles) and publishes them to
//! the update service.

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod init;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
pub mod version;
