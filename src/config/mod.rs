//! Configuration — `openterm.toml` settings and data directory resolution.

pub mod settings;

pub use settings::{KdfChoice, Settings, DATA_DIR_ENV};
