//! # Bastion Development Tools
//!
//! Command-line tooling around the simulation core:
//! - Data validators for catalog and balance files
//! - Export of the built-in data as editable RON
//! - Headless scenario runner with JSON reports and replay recording
//! - Offline progress estimates for saved games

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod data_dir;
pub mod error;
pub mod offline;
pub mod scenario;
pub mod validate;

pub use error::{Result, ToolError};
