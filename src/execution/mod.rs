//! File moves with explicit collision handling
//!
//! Every relocation the engine performs (organizing, quarantining) goes
//! through `move_file`, so what happens when the target already exists is
//! always the configured `ConflictPolicy`, never an accident of the platform.

pub mod mover;

pub use mover::*;
