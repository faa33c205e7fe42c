//! Hub configuration
//!
//! Board-agnostic roster configuration, parsed from the TOML the firmware
//! embeds at build time.

pub mod parser;
pub mod types;

pub use parser::parse_hub_config;
pub use types::*;
