//! Project configuration (`.trustvault.toml`).

pub mod settings;

pub use settings::Settings;
