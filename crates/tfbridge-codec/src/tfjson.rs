//! Adapter from the upstream JSON schema format.
//!
//! Attribute types are cty type expressions (`"string"`,
//! `["list", "string"]`, `["object", {"a": "number"}]`); nested blocks carry
//! a nesting mode and item bounds. The upstream format has no notion of
//! `force_new`, which the provider reports per plan instead.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;
use tfbridge_types::{ScalarType, Schema, SchemaNode, SchemaPath};
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// A resource schema as emitted by `terraform providers schema -json`.
#[derive(Debug, Clone, Deserialize)]
pub struct TfSchema {
    #[serde(default)]
    pub version: i64,
    pub block: TfBlock,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TfBlock {
    #[serde(default)]
    pub attributes: BTreeMap<String, TfAttribute>,
    #[serde(default)]
    pub block_types: BTreeMap<String, TfNestedBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TfAttribute {
    #[serde(rename = "type")]
    pub ty: Option<Json>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TfNestedBlock {
    pub nesting_mode: NestingMode,
    #[serde(default)]
    pub block: TfBlock,
    #[serde(default)]
    pub min_items: u64,
    #[serde(default)]
    pub max_items: u64,
}

/// How instances of a nested block are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    Single,
    Group,
    List,
    Set,
    Map,
}

/// Parse and adapt an upstream JSON resource schema.
pub fn parse_schema(json: &str) -> CodecResult<Schema> {
    let tf: TfSchema = serde_json::from_str(json)?;
    block_to_schema(&tf)
}

/// Convert an upstream resource schema into a [`Schema`], rejecting flag
/// combinations the engines cannot honour.
pub fn block_to_schema(tf: &TfSchema) -> CodecResult<Schema> {
    let fields = convert_block(&SchemaPath::root(), &tf.block)?;
    let schema = Schema::new(fields).with_version(tf.version);
    if let Some((path, reason)) = schema.root().problems().into_iter().next() {
        return Err(invalid(&path, reason));
    }
    debug!(
        version = tf.version,
        attributes = schema.attribute_names().count(),
        "adapted upstream schema"
    );
    Ok(schema)
}

fn invalid(path: &SchemaPath, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidSchema {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn convert_block(path: &SchemaPath, block: &TfBlock) -> CodecResult<BTreeMap<String, SchemaNode>> {
    let mut fields = BTreeMap::new();
    for (name, attr) in &block.attributes {
        let at = path.attr(name.as_str());
        let ty = attr
            .ty
            .as_ref()
            .ok_or_else(|| invalid(&at, "attribute has no type"))?;
        let mut node = type_node(&at, ty)?;
        node.required = attr.required;
        node.optional = attr.optional;
        node.computed = attr.computed;
        node.sensitive = attr.sensitive;
        fields.insert(name.clone(), node);
    }
    for (name, nested) in &block.block_types {
        let at = path.attr(name.as_str());
        if fields.contains_key(name) {
            return Err(invalid(&at, "block shares its name with an attribute"));
        }
        fields.insert(name.clone(), nested_node(&at, nested)?);
    }
    Ok(fields)
}

fn nested_node(path: &SchemaPath, nested: &TfNestedBlock) -> CodecResult<SchemaNode> {
    let inner = match nested.nesting_mode {
        NestingMode::Single | NestingMode::Group => path.clone(),
        _ => path.element(),
    };
    let object = SchemaNode::object(convert_block(&inner, &nested.block)?);
    let node = match nested.nesting_mode {
        NestingMode::Single | NestingMode::Group => object,
        NestingMode::List => SchemaNode::list(object),
        NestingMode::Set => SchemaNode::set(object),
        NestingMode::Map => SchemaNode::map(object),
    };
    let node = if nested.min_items > 0 {
        node.required()
    } else {
        node.optional()
    };
    Ok(
        if nested.max_items == 1
            && matches!(nested.nesting_mode, NestingMode::List | NestingMode::Set)
        {
            node.max_items_one()
        } else {
            node
        },
    )
}

/// Translate a cty type expression.
fn type_node(path: &SchemaPath, ty: &Json) -> CodecResult<SchemaNode> {
    match ty {
        Json::String(name) => match name.as_str() {
            "string" => Ok(SchemaNode::scalar(ScalarType::String)),
            "number" => Ok(SchemaNode::scalar(ScalarType::Number)),
            "bool" => Ok(SchemaNode::scalar(ScalarType::Bool)),
            other => Err(invalid(path, format!("unsupported type {other:?}"))),
        },
        Json::Array(parts) => match parts.as_slice() {
            [Json::String(kind), elem] if kind == "list" => {
                Ok(SchemaNode::list(type_node(&path.element(), elem)?))
            }
            [Json::String(kind), elem] if kind == "set" => {
                Ok(SchemaNode::set(type_node(&path.element(), elem)?))
            }
            [Json::String(kind), elem] if kind == "map" => {
                Ok(SchemaNode::map(type_node(&path.element(), elem)?))
            }
            [Json::String(kind), Json::Object(attrs), ..] if kind == "object" => attrs
                .iter()
                .map(|(name, t)| Ok((name.clone(), type_node(&path.attr(name.as_str()), t)?)))
                .collect::<CodecResult<BTreeMap<_, _>>>()
                .map(SchemaNode::object),
            _ => Err(invalid(path, format!("unsupported type expression {ty}"))),
        },
        _ => Err(invalid(path, format!("unsupported type expression {ty}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfbridge_types::{Mode, SchemaKind};

    const INSTANCE: &str = r#"{
        "version": 2,
        "block": {
            "attributes": {
                "id": {"type": "string", "computed": true},
                "ami": {"type": "string", "required": true},
                "tags": {"type": ["map", "string"], "optional": true},
                "zones": {"type": ["set", "string"], "optional": true, "computed": true},
                "limits": {"type": ["object", {"cpu": "number", "burst": "bool"}], "optional": true},
                "token": {"type": "string", "optional": true, "sensitive": true}
            },
            "block_types": {
                "root_device": {
                    "nesting_mode": "list",
                    "max_items": 1,
                    "block": {"attributes": {"size": {"type": "number", "optional": true}}}
                },
                "ingress": {
                    "nesting_mode": "set",
                    "min_items": 1,
                    "block": {"attributes": {"port": {"type": "number", "required": true}}}
                },
                "timeouts": {
                    "nesting_mode": "single",
                    "block": {"attributes": {"create": {"type": "string", "optional": true}}}
                }
            }
        }
    }"#;

    #[test]
    fn attributes_keep_their_flags() {
        let schema = parse_schema(INSTANCE).unwrap();
        assert_eq!(schema.version, 2);
        assert_eq!(schema.attribute("id").unwrap().mode(), Mode::Computed);
        assert_eq!(schema.attribute("ami").unwrap().mode(), Mode::Required);
        assert_eq!(schema.attribute("zones").unwrap().mode(), Mode::OptionalComputed);
        assert!(schema.attribute("token").unwrap().sensitive);
        assert_eq!(schema.attribute("tags").unwrap().shape_name(), "map");
        let limits = schema.attribute("limits").unwrap();
        assert_eq!(limits.field("cpu").unwrap().shape_name(), "number");
    }

    #[test]
    fn nested_blocks_follow_nesting_mode() {
        let schema = parse_schema(INSTANCE).unwrap();
        let root_device = schema.attribute("root_device").unwrap();
        assert!(root_device.collapses());
        assert_eq!(root_device.mode(), Mode::Optional);

        let ingress = schema.attribute("ingress").unwrap();
        assert!(matches!(ingress.kind, SchemaKind::Set { .. }));
        assert!(!ingress.max_items_one);
        assert_eq!(ingress.mode(), Mode::Required);

        let timeouts = schema.attribute("timeouts").unwrap();
        assert!(timeouts.is_object());
        assert!(timeouts.field("create").is_some());
    }

    #[test]
    fn unsupported_types_are_rejected_with_their_path() {
        let json = r#"{"block": {"attributes": {"x": {"type": ["list", "dynamic"], "optional": true}}}}"#;
        match parse_schema(json).unwrap_err() {
            CodecError::InvalidSchema { path, .. } => assert_eq!(path, "x.$"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn contradictory_flags_are_rejected() {
        let json = r#"{"block": {"attributes": {"x": {"type": "string", "required": true, "computed": true}}}}"#;
        assert!(matches!(
            parse_schema(json).unwrap_err(),
            CodecError::InvalidSchema { .. }
        ));
    }
}
