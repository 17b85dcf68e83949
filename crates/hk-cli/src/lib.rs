//! hkube CLI library
//!
//! Command implementations for the `hkube` binary.

pub mod commands;
