//! HTTP access to the update service

pub mod client;
pub mod project;
pub mod upload;
