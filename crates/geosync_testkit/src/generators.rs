//! Property-based test generators using proptest.
//!
//! Provides strategies for generating commit graph shapes and push
//! arguments.

use proptest::prelude::*;

/// Shape of a forked history: a base line with two branches on its tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkShape {
    /// Commits on the shared line (at least one is always built).
    pub base: usize,
    /// Commits on our branch.
    pub ours: usize,
    /// Commits on their branch.
    pub theirs: usize,
}

/// Strategy for forks where both sides have moved.
pub fn diverged_fork_strategy() -> impl Strategy<Value = ForkShape> {
    (1usize..5, 1usize..5, 1usize..5).prop_map(|(base, ours, theirs)| ForkShape {
        base,
        ours,
        theirs,
    })
}

/// Strategy for forks where only our side has moved (a fast-forward).
pub fn fast_forward_strategy() -> impl Strategy<Value = ForkShape> {
    (1usize..6, 1usize..6).prop_map(|(base, ours)| ForkShape {
        base,
        ours,
        theirs: 0,
    })
}

/// Strategy for any fork shape, including empty branches.
pub fn fork_shape_strategy() -> impl Strategy<Value = ForkShape> {
    (1usize..5, 0usize..5, 0usize..5).prop_map(|(base, ours, theirs)| ForkShape {
        base,
        ours,
        theirs,
    })
}

/// Strategy for valid branch short names.
pub fn branch_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,15}").expect("Invalid regex")
}

/// Strategy for feature payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for malformed refspecs the resolver must reject.
pub fn malformed_refspec_strategy() -> impl Strategy<Value = String> {
    branch_name_strategy().prop_flat_map(|name| {
        prop_oneof![
            Just(format!(":{}", name)),
            Just(format!("+{}", name)),
            Just(format!("{}:{}:{}", name, name, name)),
            Just(format!("{}:", name)),
        ]
    })
}
