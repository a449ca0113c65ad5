//! demodeck - Terminal dashboard for GitHub demo environments
//!
//! This library crate exposes internal modules for integration testing.

pub mod config;
pub mod data;
pub mod engine;
pub mod github;
pub mod store;
pub mod tui;
pub mod util;
