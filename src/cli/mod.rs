//! Command line interface module
//!
//! This module provides argument parsing and the runner used by the binary.

pub mod args;
pub mod runner;

pub use args::{Args, OutputFormat};
pub use runner::Runner;
