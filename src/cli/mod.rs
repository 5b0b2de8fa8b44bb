//! CLI module for projektflow
//!
//! This module provides:
//! - Command implementations (show, team, offer, approve, click, reset, ...)
//! - Output handlers (console, JSON, quiet)

pub mod commands;
pub mod output;

pub use commands::OfferChoice;
pub use output::{OutputMode, create_handler};
