//! Click-driven discovery of dynamic single-page-application content.

pub mod dynamic;
pub mod fingerprint;
pub mod tree;

pub use dynamic::{DynamicNavPlugin, SelectorLevel, parse_selector_levels};
pub use tree::{NavNode, NavTree, NodeId};
