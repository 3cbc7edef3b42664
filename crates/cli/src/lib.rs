//! DevHub E2E CLI
//!
//! Command-line interface for plugin metadata inspection, dynamic plugin
//! generation, layered configuration merging and test deployments.

pub mod commands;
pub mod output;
