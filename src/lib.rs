//! clipgen library crate.
//!
//! This module exposes the generation engine for integration testing.

pub mod config;
pub mod engine;
