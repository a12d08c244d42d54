//! CLI command implementations.

pub mod push;
pub mod version;
