//! Foundation types for tfbridge.
//!
//! This crate provides the schema, value, and path types shared by every
//! other tfbridge crate. The merge and diff engines consume these types
//! read-only; every transformation produces a new tree.
//!
//! # Key Types
//!
//! - [`Schema`] / [`SchemaNode`] -- Attribute and block positions with Optional/Computed/ForceNew flags
//! - [`Value`] -- Tri-state (Null / Unknown / Known) value tree shaped by a schema node
//! - [`Scalar`] -- Leaf payload of a known value
//! - [`ValuePath`] / [`PathStep`] -- Location of a value inside a resource
//! - [`SchemaPath`] -- Location of a schema node, with element steps erased
//! - [`EngineError`] -- The three integration error kinds

pub mod error;
pub mod path;
pub mod schema;
pub mod value;

pub use error::{EngineError, EngineResult};
pub use path::{PathStep, SchemaPath, SchemaStep, ValuePath};
pub use schema::{DefaultValue, Mode, ScalarType, Schema, SchemaKind, SchemaNode};
pub use value::{Scalar, Value, NULL, UNKNOWN};
