//! High-level API for tfbridge.
//!
//! Ties the codec, propose, and diff crates together behind a single
//! configurable [`Engine`]. This is the entry point for tools that plan
//! resource changes.
//!
//! # Quick Start
//!
//! ```rust
//! use tfbridge_engine::{Engine, EngineConfig, Schema, SchemaNode, Value};
//!
//! let schema = Schema::new([
//!     ("name", SchemaNode::string().required().force_new()),
//!     ("size", SchemaNode::number().optional()),
//! ]);
//! let prior = Value::object([("name", Value::string("db")), ("size", Value::int(1))]);
//! let config = Value::object([("name", Value::string("db")), ("size", Value::int(2))]);
//!
//! let engine = Engine::new(EngineConfig::default());
//! let plan = engine.plan(&schema, &prior, &config).unwrap();
//! assert!(plan.diff.changed_keys.contains("size"));
//! assert!(!plan.requires_replace());
//! ```

pub mod config;
pub mod engine;
pub mod error;

#[cfg(test)]
mod properties;

pub use config::EngineConfig;
pub use engine::{BatchOutcome, Engine, Plan, PlanRequest};
pub use error::{BridgeError, BridgeResult};

// Re-export key types
pub use tfbridge_codec::{HostCodec, MsgpackCodec, WireCodec};
pub use tfbridge_diff::{DiffEntry, DiffKind, DiffResult, UnknownDiffMode};
pub use tfbridge_propose::DefaultEnv;
pub use tfbridge_types::{EngineError, Schema, SchemaNode, Value};
