//! Merging prior state with configuration into a proposed new state.
//!
//! The proposal is schema-directed. At every node:
//!
//! 1. An unknown configuration value is absorbing: the result is unknown.
//! 2. An unknown prior value short-circuits the subtree to unknown.
//! 3. Pure computed positions keep the prior value; configuration may not
//!    set them.
//! 4. Optional+computed positions take the configuration when it is set and
//!    otherwise keep the prior value.
//! 5. Everything else follows the configuration, recursing into blocks and
//!    collections so that nested computed values survive.

use std::collections::BTreeMap;

use tfbridge_correlate::correlate;
use tfbridge_types::{
    EngineError, EngineResult, Mode, PathStep, Schema, SchemaKind, SchemaNode, Value, ValuePath,
};
use tfbridge_walk::check_conforms;
use tracing::debug;

/// Compute the proposed new state of a resource.
///
/// A null configuration proposes a null state (the resource is being
/// removed). Both inputs must conform to the schema.
pub fn propose(schema: &Schema, prior: &Value, config: &Value) -> EngineResult<Value> {
    check_conforms(schema.root(), prior)?;
    check_conforms(schema.root(), config)?;
    debug!(
        attributes = schema.attribute_names().count(),
        prior_null = prior.is_null(),
        "proposing new state"
    );
    if config.is_null() {
        return Ok(Value::Null);
    }
    propose_node(&ValuePath::root(), schema.root(), prior, config)
}

/// Propose the value at a single schema position.
pub fn propose_node(
    path: &ValuePath,
    schema: &SchemaNode,
    prior: &Value,
    config: &Value,
) -> EngineResult<Value> {
    if config.is_unknown() || prior.is_unknown() {
        return Ok(Value::Unknown);
    }
    match schema.mode() {
        Mode::Computed if config.is_null() => Ok(prior.clone()),
        Mode::Computed => Err(EngineError::violation(
            path,
            "computed-only attribute cannot be set by configuration",
        )),
        Mode::OptionalComputed if config.is_null() => Ok(prior.clone()),
        Mode::OptionalComputed if !schema.is_block() => Ok(config.clone()),
        _ => propose_configured(path, schema, prior, config),
    }
}

fn propose_configured(
    path: &ValuePath,
    schema: &SchemaNode,
    prior: &Value,
    config: &Value,
) -> EngineResult<Value> {
    match &schema.kind {
        SchemaKind::Scalar { .. } => Ok(config.clone()),
        SchemaKind::Object { .. } if config.is_null() && !schema.required => Ok(Value::Null),
        SchemaKind::Object { fields } => fields
            .iter()
            .map(|(name, field)| {
                let child = path.attr(name.as_str());
                let value = propose_node(&child, field, prior.get(name), config.get(name))?;
                Ok((name.clone(), value))
            })
            .collect::<EngineResult<BTreeMap<_, _>>>()
            .map(Value::Object),
        SchemaKind::List { .. } | SchemaKind::Set { .. } | SchemaKind::Map { .. }
            if config.is_null() =>
        {
            Ok(Value::Null)
        }
        SchemaKind::List { elem } | SchemaKind::Set { elem } | SchemaKind::Map { elem } => {
            propose_collection(path, schema, elem, prior, config)
        }
    }
}

/// Recurse through correlated element pairs. Elements only in the prior
/// collection are dropped; elements only in the configuration are proposed
/// against a null prior.
fn propose_collection(
    path: &ValuePath,
    schema: &SchemaNode,
    elem: &SchemaNode,
    prior: &Value,
    config: &Value,
) -> EngineResult<Value> {
    let pairs = correlate(path, schema, prior, config)?;
    let mut elems = Vec::with_capacity(pairs.len());
    let mut entries = BTreeMap::new();
    for pair in &pairs {
        let Some(next) = &pair.next else { continue };
        let child = path.with(next.at.clone());
        let value = propose_node(&child, elem, pair.prior_value(), next.value)?;
        match &next.at {
            PathStep::Key(key) => {
                entries.insert(key.clone(), value);
            }
            PathStep::Index(_) | PathStep::Attr(_) => elems.push(value),
        }
    }
    Ok(match schema.kind {
        SchemaKind::Map { .. } => Value::Map(entries),
        SchemaKind::Set { .. } => Value::Set(elems),
        _ => Value::List(elems),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new([
            ("name", SchemaNode::string().required()),
            ("description", SchemaNode::string().optional()),
            ("id", SchemaNode::string().computed()),
            ("arn", SchemaNode::string().optional().computed()),
            (
                "rule",
                SchemaNode::set(SchemaNode::object([
                    ("cidr", SchemaNode::string().required()),
                    ("rule_id", SchemaNode::string().computed()),
                ]))
                .optional(),
            ),
            (
                "disk",
                SchemaNode::list(SchemaNode::object([
                    ("size", SchemaNode::number().required()),
                    ("serial", SchemaNode::string().computed()),
                ]))
                .optional(),
            ),
            (
                "logging",
                SchemaNode::list(SchemaNode::object([
                    ("bucket", SchemaNode::string().optional()),
                ]))
                .optional()
                .max_items_one(),
            ),
            ("tags", SchemaNode::map(SchemaNode::string()).optional()),
        ])
    }

    fn rule(cidr: &str, id: Value) -> Value {
        Value::object([("cidr", Value::string(cidr)), ("rule_id", id)])
    }

    #[test]
    fn computed_fields_keep_prior() {
        let s = schema();
        let prior = Value::object([
            ("name", Value::string("a")),
            ("id", Value::string("i-123")),
            ("arn", Value::string("arn:1")),
        ]);
        let config = Value::object([("name", Value::string("b"))]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert_eq!(proposed.get("name"), &Value::string("b"));
        assert_eq!(proposed.get("id"), &Value::string("i-123"));
        assert_eq!(proposed.get("arn"), &Value::string("arn:1"));
    }

    #[test]
    fn optional_computed_prefers_config() {
        let s = schema();
        let prior = Value::object([("arn", Value::string("arn:1"))]);
        let config = Value::object([("arn", Value::string("arn:2"))]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert_eq!(proposed.get("arn"), &Value::string("arn:2"));
    }

    #[test]
    fn plain_optional_follows_config_even_when_unset() {
        let s = schema();
        let prior = Value::object([("description", Value::string("old"))]);
        let config = Value::object([("name", Value::string("a"))]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert!(proposed.get("description").is_null());
    }

    #[test]
    fn computed_stays_null_without_prior() {
        let s = schema();
        let config = Value::object([("name", Value::string("a"))]);
        let proposed = propose(&s, &Value::Null, &config).unwrap();
        assert!(proposed.get("id").is_null());
    }

    #[test]
    fn setting_computed_only_is_a_violation() {
        let s = schema();
        let config = Value::object([("id", Value::string("mine"))]);
        let err = propose(&s, &Value::Null, &config).unwrap_err();
        assert_eq!(
            err,
            EngineError::SchemaViolation {
                path: ValuePath::root().attr("id"),
                reason: "computed-only attribute cannot be set by configuration".into(),
            }
        );
    }

    #[test]
    fn unknown_config_is_absorbing() {
        let s = schema();
        let prior = Value::object([("id", Value::string("i-1")), ("arn", Value::string("a"))]);
        let config = Value::object([("id", Value::Unknown), ("arn", Value::Unknown)]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert!(proposed.get("id").is_unknown());
        assert!(proposed.get("arn").is_unknown());
    }

    #[test]
    fn unknown_prior_short_circuits() {
        let s = schema();
        let prior = Value::object([("tags", Value::Unknown)]);
        let config = Value::object([("tags", Value::map([("a", Value::string("b"))]))]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert!(proposed.get("tags").is_unknown());
    }

    #[test]
    fn absent_block_stays_absent() {
        let s = schema();
        let prior = Value::object([(
            "logging",
            Value::list([Value::object([("bucket", Value::string("logs"))])]),
        )]);
        let config = Value::object([("name", Value::string("a"))]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert!(proposed.get("logging").is_null());
    }

    #[test]
    fn matched_set_elements_keep_computed_fields() {
        let s = schema();
        let prior = Value::object([(
            "rule",
            Value::set([
                rule("10.0.0.0/8", Value::string("r-1")),
                rule("0.0.0.0/0", Value::string("r-2")),
            ]),
        )]);
        let config = Value::object([(
            "rule",
            Value::set([
                rule("192.168.0.0/16", Value::Null),
                rule("10.0.0.0/8", Value::Null),
            ]),
        )]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert_eq!(
            proposed.get("rule"),
            &Value::set([
                rule("192.168.0.0/16", Value::Null),
                rule("10.0.0.0/8", Value::string("r-1")),
            ])
        );
    }

    #[test]
    fn list_elements_pair_by_position() {
        let s = schema();
        let disk = |size: i64, serial: Value| {
            Value::object([("size", Value::int(size)), ("serial", serial)])
        };
        let prior = Value::object([(
            "disk",
            Value::list([disk(10, Value::string("s-1")), disk(20, Value::string("s-2"))]),
        )]);
        let config = Value::object([("disk", Value::list([disk(15, Value::Null)]))]);
        let proposed = propose(&s, &prior, &config).unwrap();
        assert_eq!(proposed.get("disk"), &Value::list([disk(15, Value::string("s-1"))]));
    }

    #[test]
    fn null_config_proposes_deletion() {
        let s = schema();
        let prior = Value::object([("name", Value::string("a"))]);
        assert!(propose(&s, &prior, &Value::Null).unwrap().is_null());
    }

    #[test]
    fn ill_shaped_input_is_rejected() {
        let s = schema();
        let config = Value::object([("tags", Value::list([]))]);
        let err = propose(&s, &Value::Null, &config).unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch { .. }));
    }
}
