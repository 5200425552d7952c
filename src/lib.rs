//! Layered configuration resolution library.
//!
//! This module exports the core components for embedding and testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
