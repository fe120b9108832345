pub mod config;
pub mod core;
pub mod error;
pub mod simulators;
pub mod strategies;
pub mod tui;
pub mod types;
pub mod utils;
