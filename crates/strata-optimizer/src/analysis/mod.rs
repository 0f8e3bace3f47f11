//! Analysis utilities for the optimizer
//!
//! This module provides the whole-program and per-function facts the
//! rewriting passes base their decisions on.

pub mod captures;
pub mod usage;

pub use captures::{direct_captures, Captures};
pub use usage::{address_taken, is_pure};
