//! Shared utilities for the Carton dependency resolver.
//!
//! This crate provides the cross-cutting concerns used by all other Carton
//! crates: the unified error type and result alias.

pub mod errors;
