//! Wire codecs for tfbridge.
//!
//! State crosses two boundaries: the host, which speaks JSON property trees
//! with sentinel unknowns and secret envelopes, and the upstream provider,
//! which speaks msgpack dynamic values. Both map onto the same [`Value`]
//! model, guided by the schema node at each position.
//!
//! # Key Types
//!
//! - [`WireCodec`] -- Schema-driven decode/encode between a wire form and `Value`
//! - [`HostCodec`] -- Host JSON property codec
//! - [`MsgpackCodec`] -- Upstream msgpack codec
//! - [`tfjson::parse_schema`] -- Adapter from the upstream JSON schema format
//! - [`CodecError`] -- Codec failures, wrapping engine shape errors
//!
//! [`Value`]: tfbridge_types::Value

pub mod codec;
pub mod error;
pub mod host;
pub mod msgpack;
pub mod tfjson;

pub use codec::WireCodec;
pub use error::{CodecError, CodecResult};
pub use host::{HostCodec, SECRET_SIG, SECRET_SIG_KEY, UNKNOWN_SENTINEL};
pub use msgpack::{MsgpackCodec, UNKNOWN_EXT};
