//! # GeoSync Testkit
//!
//! Test utilities for GeoSync.
//!
//! This crate provides:
//! - Commit graph fixtures over in-memory and directory repositories
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use geosync_testkit::prelude::*;
//!
//! let mut graph = GraphBuilder::in_memory();
//! let commits = graph.linear(None, 3, "edit");
//! graph.set_ref("refs/heads/main", commits[2]);
//! assert_eq!(reachable_from(graph.repo(), commits[2]).len(), 12);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::{reachable_from, ForkedHistory, GraphBuilder, TestRepo};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}
