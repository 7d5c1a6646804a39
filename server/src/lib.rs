//! Doodle fight relay server library.
//!
//! This module exposes the relay components for use in tests and binaries.

pub mod config;
pub mod peer;
pub mod registry;
pub mod relay_loop;
pub mod ws;
