//! Schema walker for tfbridge.
//!
//! Both the proposed-new-state engine and the diff engine stay structurally
//! in sync with the schema by going through this crate rather than
//! re-implementing traversal. `maxItemsOne` collections are resolved here:
//! a collapsed list or set of one object is walked as if it were the object.
//!
//! # Key Items
//!
//! - [`walk`] / [`Walk`] -- Pre-order iterator over `(path, schema node, N values)`
//! - [`visit`] / [`Visit`] -- Callback form with subtree skipping
//! - [`lookup`] / [`lookup_value_path`] -- Resolve a path to its schema node
//! - [`check_conforms`] -- Verify a value is shaped by its schema

pub mod conform;
pub mod lookup;
pub mod walker;

pub use conform::check_conforms;
pub use lookup::{lookup, lookup_chain, lookup_value_path};
pub use walker::{visit, walk, walk_at, Visit, Walk, WalkItem};
