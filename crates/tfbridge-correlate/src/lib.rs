//! Collection correlator for tfbridge.
//!
//! Pairs the elements of a prior and a next instance of the same list, set,
//! or map so that the merge and diff engines can recurse element by element.
//!
//! # Key Types
//!
//! - [`correlate`] -- Pair two collection values under their schema node
//! - [`Pair`] / [`Element`] -- One pairing, with either side possibly absent
//! - [`set_key`] -- The identity key used to match set elements

pub mod pair;
pub mod set;

pub use pair::{correlate, Element, Pair};
pub use set::set_key;
