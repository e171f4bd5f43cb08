//! Configuration management
//!
//! Node address, log level and the mining switch, read from built-in
//! defaults, an optional TOML file and the environment.

pub mod settings;

pub use settings::{Config, CONFIG_FILE_ENV, GLOBAL_CONFIG};
