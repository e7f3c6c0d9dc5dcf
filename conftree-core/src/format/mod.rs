//! Text and JSON renderings of configuration trees.

pub mod config;
pub mod json;

pub use config::{format_config, format_formal, format_patch};
pub use json::{from_json, to_json};
