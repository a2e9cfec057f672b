//! Proposed-new-state engine for tfbridge.
//!
//! Merges a resource's prior state with its new configuration, honoring each
//! attribute's Optional/Computed semantics and carrying computed values
//! across correlated collection elements.
//!
//! # Key Items
//!
//! - [`propose`] -- Prior state + configuration -> proposed state
//! - [`apply_defaults`] / [`DefaultEnv`] -- Fill unset optional attributes from schema defaults

pub mod defaults;
pub mod propose;

pub use defaults::{apply_defaults, DefaultEnv};
pub use propose::{propose, propose_node};
