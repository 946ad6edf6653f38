//! Flamegraph generation using the inferno library.
//!
//! This module folds a graph frame into collapsed stacks and renders them
//! as interactive SVG flamegraphs.

pub mod generator;
pub mod stack_builder;

// Re-export main types
pub use generator::{generate_flamegraph, FlamegraphConfig};
pub use stack_builder::{build_collapsed_stacks, CollapsedStack};
