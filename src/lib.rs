/// The current version of testdigest, sourced from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod commands;
pub mod compressor;
pub mod config;
pub mod detection;
pub mod digest;
pub mod error;
pub mod models;
pub mod parsers;
pub mod tokens;
pub mod types;
