//! Common utilities for rawhid
//!
//! This crate provides shared functionality between the library and the
//! command-line tool: error handling, logging setup, and the hex helpers used
//! to read and print raw packets.

pub mod error;
pub mod hex;
pub mod logging;

pub use error::{Error, Result};
pub use self::hex::{format_hex, hex_dump, parse_hex};
pub use logging::setup_logging;
