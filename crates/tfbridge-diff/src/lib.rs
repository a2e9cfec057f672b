//! Diff engine for tfbridge.
//!
//! Compares a resource's prior state with its planned state and reports
//! which top-level attributes changed, which changes force replacement, and
//! a path-indexed detailed diff of additions, removals, and updates.
//!
//! # Key Types
//!
//! - [`diff`] -- Prior + planned state -> [`DiffResult`]
//! - [`DiffEntry`] -- Nested per-path diff tree
//! - [`DiffKind`] -- Host-facing add/delete/update kinds, with replace variants
//! - [`DiffOptions`] / [`UnknownDiffMode`] -- Tunable comparison semantics

pub mod differ;
pub mod edit;
pub mod options;
pub mod replace;
pub mod result;

pub use differ::diff;
pub use edit::{edit_script, Edit};
pub use options::{DiffOptions, UnknownDiffMode};
pub use replace::{path_triggers_replacement, value_triggers_replacement};
pub use result::{DiffEntry, DiffKind, DiffResult, META_KEY};
