//! Upstream dynamic-value msgpack codec.
//!
//! Objects are maps keyed by attribute name carrying every schema
//! attribute, nil is null, and an unknown is extension type 0. Numbers that
//! do not fit a msgpack number may arrive as decimal strings.

use std::collections::BTreeMap;

use rmp::decode::read_marker;
use rmp::encode::{
    write_array_len, write_bool, write_ext_meta, write_f64, write_map_len, write_nil, write_sint,
    write_str, write_uint,
};
use rmp::Marker;
use serde_json::Number;
use tfbridge_types::{EngineError, Scalar, ScalarType, SchemaKind, SchemaNode, Value, ValuePath};

use crate::codec::WireCodec;
use crate::error::{CodecError, CodecResult};

/// Extension type carrying an unknown value.
pub const UNKNOWN_EXT: i8 = 0;

/// Codec between [`Value`] trees and the upstream msgpack encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct MsgpackCodec;

impl WireCodec for MsgpackCodec {
    type Wire = Vec<u8>;

    fn decode(&self, wire: &Vec<u8>, schema: &SchemaNode) -> CodecResult<Value> {
        let mut rd: &[u8] = wire;
        let value = decode_node(&mut rd, &ValuePath::root(), schema)?;
        if !rd.is_empty() {
            return Err(CodecError::MsgpackDecode(format!("{} trailing bytes", rd.len())));
        }
        Ok(value)
    }

    fn encode(&self, value: &Value, schema: &SchemaNode) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        encode_node(&mut buf, &ValuePath::root(), schema, value)?;
        Ok(buf)
    }
}

fn len32(len: usize) -> CodecResult<u32> {
    u32::try_from(len).map_err(CodecError::encode)
}

fn encode_node(
    buf: &mut Vec<u8>,
    path: &ValuePath,
    schema: &SchemaNode,
    value: &Value,
) -> CodecResult<()> {
    match (&schema.kind, value) {
        (_, Value::Null) => write_nil(buf).map_err(CodecError::encode)?,
        (_, Value::Unknown) => {
            write_ext_meta(buf, 1, UNKNOWN_EXT).map_err(CodecError::encode)?;
            buf.push(0);
        }
        (SchemaKind::Scalar { ty }, Value::Scalar(s)) if ty.name() == s.type_name() => {
            encode_scalar(buf, s)?
        }
        (SchemaKind::Object { fields }, Value::Object(obj)) => {
            if let Some(extra) = obj.keys().find(|k| !fields.contains_key(*k)) {
                return Err(
                    EngineError::mismatch(&path.attr(extra.as_str()), "no attribute", "attribute")
                        .into(),
                );
            }
            write_map_len(buf, len32(fields.len())?).map_err(CodecError::encode)?;
            for (name, field) in fields {
                write_str(buf, name).map_err(CodecError::encode)?;
                encode_node(buf, &path.attr(name.as_str()), field, value.get(name))?;
            }
        }
        (SchemaKind::List { elem }, Value::List(elems))
        | (SchemaKind::Set { elem }, Value::Set(elems)) => {
            write_array_len(buf, len32(elems.len())?).map_err(CodecError::encode)?;
            for (i, e) in elems.iter().enumerate() {
                encode_node(buf, &path.index(i), elem, e)?;
            }
        }
        (SchemaKind::Map { elem }, Value::Map(entries)) => {
            write_map_len(buf, len32(entries.len())?).map_err(CodecError::encode)?;
            for (key, e) in entries {
                write_str(buf, key).map_err(CodecError::encode)?;
                encode_node(buf, &path.key(key.as_str()), elem, e)?;
            }
        }
        _ => return Err(EngineError::mismatch(path, schema.shape_name(), value.kind_name()).into()),
    }
    Ok(())
}

fn encode_scalar(buf: &mut Vec<u8>, scalar: &Scalar) -> CodecResult<()> {
    match scalar {
        Scalar::Bool(b) => write_bool(buf, *b).map_err(CodecError::encode)?,
        Scalar::String(s) => write_str(buf, s).map_err(CodecError::encode)?,
        Scalar::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => {
                write_sint(buf, i).map_err(CodecError::encode)?;
            }
            (None, Some(u), _) => {
                write_uint(buf, u).map_err(CodecError::encode)?;
            }
            (None, None, Some(f)) => write_f64(buf, f).map_err(CodecError::encode)?,
            (None, None, None) => {
                return Err(CodecError::MsgpackEncode(format!("unrepresentable number {n}")))
            }
        },
    }
    Ok(())
}

fn decode_node(rd: &mut &[u8], path: &ValuePath, schema: &SchemaNode) -> CodecResult<Value> {
    let marker = read_marker(rd).map_err(|e| CodecError::decode(e.0))?;
    if matches!(marker, Marker::Null) {
        return Ok(Value::Null);
    }
    if let Some(len) = ext_len(rd, marker)? {
        let ty = i8::from_be_bytes(read_array(rd)?);
        take(rd, len)?;
        if ty != UNKNOWN_EXT {
            return Err(CodecError::MsgpackDecode(format!(
                "unexpected extension type {ty} at {path}"
            )));
        }
        return Ok(Value::Unknown);
    }
    match &schema.kind {
        SchemaKind::Scalar { ty } => decode_scalar(rd, path, *ty, marker).map(Value::Scalar),
        SchemaKind::Object { fields } => {
            let len = map_len(rd, marker)?
                .ok_or_else(|| EngineError::mismatch(path, "object", marker_kind(marker)))?;
            let mut obj: BTreeMap<String, Value> =
                fields.keys().map(|name| (name.clone(), Value::Null)).collect();
            for _ in 0..len {
                let name = read_string(rd, path)?;
                let child = path.attr(name.as_str());
                let field = fields
                    .get(&name)
                    .ok_or_else(|| EngineError::mismatch(&child, "no attribute", "attribute"))?;
                let value = decode_node(rd, &child, field)?;
                obj.insert(name, value);
            }
            Ok(Value::Object(obj))
        }
        SchemaKind::List { elem } | SchemaKind::Set { elem } => {
            let len = array_len(rd, marker)?.ok_or_else(|| {
                EngineError::mismatch(path, schema.shape_name(), marker_kind(marker))
            })?;
            let elems = (0..len)
                .map(|i| decode_node(rd, &path.index(i), elem))
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(match schema.kind {
                SchemaKind::Set { .. } => Value::Set(elems),
                _ => Value::List(elems),
            })
        }
        SchemaKind::Map { elem } => {
            let len = map_len(rd, marker)?
                .ok_or_else(|| EngineError::mismatch(path, "map", marker_kind(marker)))?;
            let mut entries = BTreeMap::new();
            for _ in 0..len {
                let key = read_string(rd, path)?;
                let value = decode_node(rd, &path.key(key.as_str()), elem)?;
                entries.insert(key, value);
            }
            Ok(Value::Map(entries))
        }
    }
}

fn decode_scalar(
    rd: &mut &[u8],
    path: &ValuePath,
    ty: ScalarType,
    marker: Marker,
) -> CodecResult<Scalar> {
    let scalar = match marker {
        Marker::True => Scalar::Bool(true),
        Marker::False => Scalar::Bool(false),
        _ => {
            if let Some(len) = str_len(rd, marker)? {
                let s = utf8(take(rd, len)?)?;
                if ty == ScalarType::Number {
                    let n = s.parse::<Number>().map_err(|_| {
                        EngineError::mismatch(path, "number", format!("string {s:?}"))
                    })?;
                    Scalar::Number(n)
                } else {
                    Scalar::String(s)
                }
            } else if let Some(n) = read_number(rd, marker)? {
                Scalar::Number(n)
            } else {
                return Err(EngineError::mismatch(path, ty.name(), marker_kind(marker)).into());
            }
        }
    };
    if scalar.type_name() != ty.name() {
        return Err(EngineError::mismatch(path, ty.name(), scalar.type_name()).into());
    }
    Ok(scalar)
}

fn read_number(rd: &mut &[u8], marker: Marker) -> CodecResult<Option<Number>> {
    let n = match marker {
        Marker::FixPos(n) => Number::from(n),
        Marker::FixNeg(n) => Number::from(n),
        Marker::U8 => Number::from(u8::from_be_bytes(read_array(rd)?)),
        Marker::U16 => Number::from(u16::from_be_bytes(read_array(rd)?)),
        Marker::U32 => Number::from(u32::from_be_bytes(read_array(rd)?)),
        Marker::U64 => Number::from(u64::from_be_bytes(read_array(rd)?)),
        Marker::I8 => Number::from(i8::from_be_bytes(read_array(rd)?)),
        Marker::I16 => Number::from(i16::from_be_bytes(read_array(rd)?)),
        Marker::I32 => Number::from(i32::from_be_bytes(read_array(rd)?)),
        Marker::I64 => Number::from(i64::from_be_bytes(read_array(rd)?)),
        Marker::F32 => float(f32::from_be_bytes(read_array(rd)?).into())?,
        Marker::F64 => float(f64::from_be_bytes(read_array(rd)?))?,
        _ => return Ok(None),
    };
    Ok(Some(n))
}

fn float(f: f64) -> CodecResult<Number> {
    Number::from_f64(f).ok_or_else(|| CodecError::MsgpackDecode(format!("non-finite number {f}")))
}

fn read_string(rd: &mut &[u8], path: &ValuePath) -> CodecResult<String> {
    let marker = read_marker(rd).map_err(|e| CodecError::decode(e.0))?;
    let len = str_len(rd, marker)?
        .ok_or_else(|| EngineError::mismatch(path, "string key", marker_kind(marker)))?;
    utf8(take(rd, len)?)
}

fn utf8(bytes: &[u8]) -> CodecResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(CodecError::decode)
}

fn take<'a>(rd: &mut &'a [u8], len: usize) -> CodecResult<&'a [u8]> {
    if rd.len() < len {
        return Err(CodecError::MsgpackDecode(format!(
            "unexpected end of input: need {len} bytes, have {}",
            rd.len()
        )));
    }
    let (head, tail) = rd.split_at(len);
    *rd = tail;
    Ok(head)
}

fn read_array<const N: usize>(rd: &mut &[u8]) -> CodecResult<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(rd, N)?);
    Ok(out)
}

/// Length that follows an 8/16/32-bit length marker.
fn sized_len(rd: &mut &[u8], width: usize) -> CodecResult<usize> {
    Ok(match width {
        1 => u8::from_be_bytes(read_array(rd)?) as usize,
        2 => u16::from_be_bytes(read_array(rd)?) as usize,
        _ => u32::from_be_bytes(read_array(rd)?) as usize,
    })
}

fn str_len(rd: &mut &[u8], marker: Marker) -> CodecResult<Option<usize>> {
    Ok(Some(match marker {
        Marker::FixStr(n) => n as usize,
        Marker::Str8 => sized_len(rd, 1)?,
        Marker::Str16 => sized_len(rd, 2)?,
        Marker::Str32 => sized_len(rd, 4)?,
        _ => return Ok(None),
    }))
}

fn array_len(rd: &mut &[u8], marker: Marker) -> CodecResult<Option<usize>> {
    Ok(Some(match marker {
        Marker::FixArray(n) => n as usize,
        Marker::Array16 => sized_len(rd, 2)?,
        Marker::Array32 => sized_len(rd, 4)?,
        _ => return Ok(None),
    }))
}

fn map_len(rd: &mut &[u8], marker: Marker) -> CodecResult<Option<usize>> {
    Ok(Some(match marker {
        Marker::FixMap(n) => n as usize,
        Marker::Map16 => sized_len(rd, 2)?,
        Marker::Map32 => sized_len(rd, 4)?,
        _ => return Ok(None),
    }))
}

/// Payload length of an extension marker; the type byte is still unread.
fn ext_len(rd: &mut &[u8], marker: Marker) -> CodecResult<Option<usize>> {
    Ok(Some(match marker {
        Marker::FixExt1 => 1,
        Marker::FixExt2 => 2,
        Marker::FixExt4 => 4,
        Marker::FixExt8 => 8,
        Marker::FixExt16 => 16,
        Marker::Ext8 => sized_len(rd, 1)?,
        Marker::Ext16 => sized_len(rd, 2)?,
        Marker::Ext32 => sized_len(rd, 4)?,
        _ => return Ok(None),
    }))
}

fn marker_kind(marker: Marker) -> &'static str {
    match marker {
        Marker::Null => "null",
        Marker::True | Marker::False => "bool",
        Marker::FixPos(_)
        | Marker::FixNeg(_)
        | Marker::U8
        | Marker::U16
        | Marker::U32
        | Marker::U64
        | Marker::I8
        | Marker::I16
        | Marker::I32
        | Marker::I64
        | Marker::F32
        | Marker::F64 => "number",
        Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => "string",
        Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => "binary",
        Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => "array",
        Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => "map",
        Marker::Reserved => "reserved",
        _ => "extension",
    }
}
