//! Integration tests

mod support;

mod test_cli;
mod test_cloud_cache;
mod test_config;
mod test_project;
mod test_upload;
mod test_version;
