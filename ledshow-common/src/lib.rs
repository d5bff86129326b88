//! # ledshow common library
//!
//! Shared code for the ledshow workspace:
//! - Bootstrap configuration loading (TOML + command-line overrides)
//! - Hardware target selection (board generation → GPIO base address)
//! - Tuning parameters (periods, buffer depths, caps, RT priorities)

pub mod config;
pub mod params;

pub use config::{Board, Config, ConfigError};
