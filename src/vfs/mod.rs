//! Filesystem snapshots
//!
//! Every pass of the engine works from a fresh snapshot of the tree rather
//! than from another pass's in-memory state. Traversal is depth-first with
//! each directory's entries sorted by file name, so the order of records is
//! deterministic for a given tree.

mod node;
mod scanner;

pub use node::*;
pub use scanner::*;
