//! Schema defaults for unset optional attributes.
//!
//! Defaults are resolved against an explicit [`DefaultEnv`] rather than the
//! process environment, so that the same configuration always proposes the
//! same state for a given environment snapshot.

use std::collections::BTreeMap;

use serde_json::Number;
use tfbridge_types::{
    DefaultValue, EngineError, EngineResult, Mode, Scalar, ScalarType, Schema, SchemaKind,
    SchemaNode, Value, ValuePath,
};
use tracing::trace;

/// Environment variables visible to `DefaultValue::Env` defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultEnv {
    vars: BTreeMap<String, String>,
}

impl DefaultEnv {
    /// An environment with no variables set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for DefaultEnv {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// Fill unset optional attributes of `config` from their schema defaults.
///
/// Unknown values are left alone, and absent optional blocks are not
/// materialised to receive defaults.
pub fn apply_defaults(schema: &Schema, config: &Value, env: &DefaultEnv) -> EngineResult<Value> {
    apply_node(&ValuePath::root(), schema.root(), config, env)
}

fn apply_node(
    path: &ValuePath,
    schema: &SchemaNode,
    config: &Value,
    env: &DefaultEnv,
) -> EngineResult<Value> {
    match (&schema.kind, config) {
        (SchemaKind::Scalar { ty }, Value::Null) => match &schema.default {
            Some(default) if schema.mode() == Mode::Optional => resolve(path, *ty, default, env),
            _ => Ok(Value::Null),
        },
        (SchemaKind::Object { fields }, Value::Object(_)) => fields
            .iter()
            .map(|(name, field)| {
                let child = path.attr(name.as_str());
                Ok((name.clone(), apply_node(&child, field, config.get(name), env)?))
            })
            .collect::<EngineResult<BTreeMap<_, _>>>()
            .map(Value::Object),
        (SchemaKind::List { elem }, Value::List(elems)) => {
            apply_elements(path, elem, elems, env).map(Value::List)
        }
        (SchemaKind::Set { elem }, Value::Set(elems)) => {
            apply_elements(path, elem, elems, env).map(Value::Set)
        }
        (SchemaKind::Map { elem }, Value::Map(entries)) => entries
            .iter()
            .map(|(key, v)| {
                let child = path.key(key.as_str());
                Ok((key.clone(), apply_node(&child, elem, v, env)?))
            })
            .collect::<EngineResult<BTreeMap<_, _>>>()
            .map(Value::Map),
        _ => Ok(config.clone()),
    }
}

fn apply_elements(
    path: &ValuePath,
    elem: &SchemaNode,
    elems: &[Value],
    env: &DefaultEnv,
) -> EngineResult<Vec<Value>> {
    elems
        .iter()
        .enumerate()
        .map(|(i, v)| apply_node(&path.index(i), elem, v, env))
        .collect()
}

fn resolve(
    path: &ValuePath,
    ty: ScalarType,
    default: &DefaultValue,
    env: &DefaultEnv,
) -> EngineResult<Value> {
    let scalar = match default {
        DefaultValue::Value(literal) => Some(literal.clone()),
        DefaultValue::Env { vars, fallback } => {
            match vars.iter().find_map(|name| env.get(name).map(|raw| (name, raw))) {
                Some((name, raw)) => {
                    trace!(path = %path, var = %name, "default from environment");
                    Some(parse_scalar(ty, raw).ok_or_else(|| {
                        EngineError::violation(
                            path,
                            format!("environment variable {name} is not a valid {}", ty.name()),
                        )
                    })?)
                }
                None => fallback.clone(),
            }
        }
    };
    Ok(scalar.map_or(Value::Null, Value::Scalar))
}

fn parse_scalar(ty: ScalarType, raw: &str) -> Option<Scalar> {
    match ty {
        ScalarType::String => Some(Scalar::String(raw.to_string())),
        ScalarType::Bool => match raw {
            "true" | "1" => Some(Scalar::Bool(true)),
            "false" | "0" => Some(Scalar::Bool(false)),
            _ => None,
        },
        ScalarType::Number => {
            if let Ok(n) = raw.parse::<i64>() {
                return Some(Scalar::Number(Number::from(n)));
            }
            raw.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Scalar::Number)
        }
    }
}
