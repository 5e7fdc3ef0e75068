//! Adapters Layer - concrete implementations of ports and the command line
//!
//! - `files`: CSV price history source and result exporters
//! - `cli`: clap-based command line

pub mod cli;
pub mod files;
