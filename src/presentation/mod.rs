//! Presentation layer
//!
//! Command-line interface over the application layer.

pub mod cli;
