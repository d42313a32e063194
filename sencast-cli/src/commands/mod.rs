//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (check, path)
//! - [`run`] - Full hindcast run
//! - [`search`] - Catalog search with local availability

pub mod config;
pub mod run;
pub mod search;
