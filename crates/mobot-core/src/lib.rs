//! Core of the olympiad problems bot.
//!
//! Command normalization, category lookup, random selection, and requester
//! tracking live here. Telegram lives behind the messaging port, implemented in
//! the adapter crate.

pub mod catalog;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod identity;
pub mod logging;
pub mod messaging;
pub mod selector;

pub use errors::{Error, Result};
