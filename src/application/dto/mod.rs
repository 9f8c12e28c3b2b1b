//! Data Transfer Objects

mod session_options;

pub use session_options::{ConfigError, SessionOptions};
