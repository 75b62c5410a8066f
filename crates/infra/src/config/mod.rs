//! Configuration loading
//!
//! Reads [`duesync_domain::Config`] from `DUESYNC_*` environment variables
//! or a JSON/TOML file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
