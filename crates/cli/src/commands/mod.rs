//! CLI Commands

pub mod config;
pub mod deploy;
pub mod metadata;
pub mod plugins;
