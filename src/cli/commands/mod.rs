//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod annotate;
pub mod run;
pub mod validate;
