//! Host property codec.
//!
//! The host exchanges resource state as JSON property trees. Unknowns travel
//! as a fixed sentinel string, secrets as a signed envelope object, and a
//! `maxItemsOne` block is presented as its single object rather than a
//! one-element array.

use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Value as Json};
use tfbridge_types::{EngineError, Scalar, ScalarType, SchemaKind, SchemaNode, Value, ValuePath};

use crate::codec::WireCodec;
use crate::error::CodecResult;

/// Wire form of an unknown value.
pub const UNKNOWN_SENTINEL: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";

/// Key marking an object as a secret envelope.
pub const SECRET_SIG_KEY: &str = "4dabf18193072939515e22adb298388d";

/// Value of [`SECRET_SIG_KEY`] in a secret envelope.
pub const SECRET_SIG: &str = "1b47061264138c4ac30d75fd1eb44270";

static JSON_NULL: Json = Json::Null;

/// Codec between [`Value`] trees and host JSON property trees.
#[derive(Clone, Copy, Debug)]
pub struct HostCodec {
    mark_sensitive: bool,
}

impl Default for HostCodec {
    fn default() -> Self {
        Self {
            mark_sensitive: true,
        }
    }
}

impl HostCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether known values of `sensitive` nodes are wrapped in the secret
    /// envelope on encode. Decoding always unwraps envelopes.
    pub fn mark_sensitive(mut self, on: bool) -> Self {
        self.mark_sensitive = on;
        self
    }

    fn decode_node(&self, path: &ValuePath, schema: &SchemaNode, wire: &Json) -> CodecResult<Value> {
        let wire = unwrap_secret(wire);
        match wire {
            Json::Null => return Ok(Value::Null),
            Json::String(s) if s == UNKNOWN_SENTINEL => return Ok(Value::Unknown),
            _ => {}
        }
        match &schema.kind {
            SchemaKind::Scalar { ty } => decode_scalar(path, *ty, wire).map(Value::Scalar),
            SchemaKind::Object { fields } => {
                let obj = wire
                    .as_object()
                    .ok_or_else(|| EngineError::mismatch(path, "object", json_kind(wire)))?;
                if let Some(extra) = obj.keys().find(|k| !fields.contains_key(*k)) {
                    return Err(EngineError::mismatch(
                        &path.attr(extra.as_str()),
                        "no attribute",
                        "attribute",
                    )
                    .into());
                }
                fields
                    .iter()
                    .map(|(name, field)| {
                        let child = obj.get(name).unwrap_or(&JSON_NULL);
                        Ok((name.clone(), self.decode_node(&path.attr(name.as_str()), field, child)?))
                    })
                    .collect::<CodecResult<BTreeMap<_, _>>>()
                    .map(Value::Object)
            }
            SchemaKind::List { elem } | SchemaKind::Set { elem } => {
                let elems = match wire {
                    Json::Array(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| self.decode_node(&path.index(i), elem, item))
                        .collect::<CodecResult<Vec<_>>>()?,
                    Json::Object(_) if schema.collapses() => {
                        vec![self.decode_node(&path.index(0), elem, wire)?]
                    }
                    _ => {
                        return Err(
                            EngineError::mismatch(path, schema.shape_name(), json_kind(wire)).into()
                        )
                    }
                };
                Ok(match schema.kind {
                    SchemaKind::Set { .. } => Value::Set(elems),
                    _ => Value::List(elems),
                })
            }
            SchemaKind::Map { elem } => {
                let obj = wire
                    .as_object()
                    .ok_or_else(|| EngineError::mismatch(path, "map", json_kind(wire)))?;
                obj.iter()
                    .map(|(key, item)| {
                        Ok((key.clone(), self.decode_node(&path.key(key.as_str()), elem, item)?))
                    })
                    .collect::<CodecResult<BTreeMap<_, _>>>()
                    .map(Value::Map)
            }
        }
    }

    fn encode_node(&self, path: &ValuePath, schema: &SchemaNode, value: &Value) -> CodecResult<Json> {
        let wire = match (&schema.kind, value) {
            (_, Value::Null) => return Ok(Json::Null),
            (_, Value::Unknown) => return Ok(Json::String(UNKNOWN_SENTINEL.into())),
            (SchemaKind::Scalar { ty }, Value::Scalar(s)) if ty.name() == s.type_name() => {
                scalar_to_json(s)
            }
            (SchemaKind::Object { fields }, Value::Object(obj)) => {
                if let Some(extra) = obj.keys().find(|k| !fields.contains_key(*k)) {
                    return Err(EngineError::mismatch(
                        &path.attr(extra.as_str()),
                        "no attribute",
                        "attribute",
                    )
                    .into());
                }
                let mut out = JsonMap::new();
                for (name, field) in fields {
                    let child = value.get(name);
                    if !child.is_null() {
                        out.insert(
                            name.clone(),
                            self.encode_node(&path.attr(name.as_str()), field, child)?,
                        );
                    }
                }
                Json::Object(out)
            }
            (SchemaKind::List { elem }, Value::List(elems))
            | (SchemaKind::Set { elem }, Value::Set(elems)) => match elems.as_slice() {
                [only @ Value::Object(_)] if schema.collapses() => {
                    self.encode_node(&path.index(0), elem, only)?
                }
                _ => Json::Array(
                    elems
                        .iter()
                        .enumerate()
                        .map(|(i, e)| self.encode_node(&path.index(i), elem, e))
                        .collect::<CodecResult<_>>()?,
                ),
            },
            (SchemaKind::Map { elem }, Value::Map(entries)) => Json::Object(
                entries
                    .iter()
                    .map(|(key, e)| {
                        Ok((key.clone(), self.encode_node(&path.key(key.as_str()), elem, e)?))
                    })
                    .collect::<CodecResult<_>>()?,
            ),
            _ => {
                return Err(EngineError::mismatch(path, schema.shape_name(), value.kind_name()).into())
            }
        };
        Ok(if self.mark_sensitive && schema.sensitive {
            wrap_secret(wire)
        } else {
            wire
        })
    }
}

impl WireCodec for HostCodec {
    type Wire = Json;

    fn decode(&self, wire: &Json, schema: &SchemaNode) -> CodecResult<Value> {
        self.decode_node(&ValuePath::root(), schema, wire)
    }

    fn encode(&self, value: &Value, schema: &SchemaNode) -> CodecResult<Json> {
        self.encode_node(&ValuePath::root(), schema, value)
    }
}

fn secret_payload(wire: &Json) -> Option<&Json> {
    let obj = wire.as_object()?;
    if obj.get(SECRET_SIG_KEY)?.as_str()? != SECRET_SIG {
        return None;
    }
    Some(obj.get("value").unwrap_or(&JSON_NULL))
}

fn unwrap_secret(mut wire: &Json) -> &Json {
    while let Some(inner) = secret_payload(wire) {
        wire = inner;
    }
    wire
}

fn wrap_secret(wire: Json) -> Json {
    let mut envelope = JsonMap::new();
    envelope.insert(SECRET_SIG_KEY.into(), Json::String(SECRET_SIG.into()));
    envelope.insert("value".into(), wire);
    Json::Object(envelope)
}

fn decode_scalar(path: &ValuePath, ty: ScalarType, wire: &Json) -> CodecResult<Scalar> {
    match (ty, wire) {
        (ScalarType::Bool, Json::Bool(b)) => Ok(Scalar::Bool(*b)),
        (ScalarType::Number, Json::Number(n)) => Ok(Scalar::Number(n.clone())),
        (ScalarType::String, Json::String(s)) => Ok(Scalar::String(s.clone())),
        _ => Err(EngineError::mismatch(path, ty.name(), json_kind(wire)).into()),
    }
}

fn scalar_to_json(scalar: &Scalar) -> Json {
    match scalar {
        Scalar::Bool(b) => Json::Bool(*b),
        Scalar::Number(n) => Json::Number(n.clone()),
        Scalar::String(s) => Json::String(s.clone()),
    }
}

fn json_kind(wire: &Json) -> &'static str {
    match wire {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
