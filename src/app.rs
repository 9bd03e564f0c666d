//! Application plumbing: CLI definitions and log setup.

pub mod cli;
pub mod logging;
