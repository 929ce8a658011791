//! Deploy pipeline and its collaborators

pub mod commands;
pub mod fsm;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod runner;

pub use pipeline::{DeployFailure, DeployPipeline, DeploySummary};
