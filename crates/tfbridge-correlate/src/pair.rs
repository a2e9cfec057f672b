//! Element pairing for lists, sets, and maps.

use std::collections::{BTreeMap, BTreeSet};

use tfbridge_types::{
    EngineError, EngineResult, PathStep, SchemaKind, SchemaNode, Value, ValuePath, NULL,
};
use tracing::trace;

use crate::set::match_elements;

/// One element of a collection, with its position in that collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element<'a> {
    /// `Index` for lists and sets, `Key` for maps.
    pub at: PathStep,
    pub value: &'a Value,
}

/// A pairing of a prior element with a next element. At least one side is
/// present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pair<'a> {
    pub prior: Option<Element<'a>>,
    pub next: Option<Element<'a>>,
}

impl<'a> Pair<'a> {
    fn new(prior: Option<Element<'a>>, next: Option<Element<'a>>) -> Self {
        Self { prior, next }
    }

    /// The prior element, or null when unpaired.
    pub fn prior_value(&self) -> &'a Value {
        self.prior.as_ref().map_or(&NULL, |e| e.value)
    }

    /// The next element, or null when unpaired.
    pub fn next_value(&self) -> &'a Value {
        self.next.as_ref().map_or(&NULL, |e| e.value)
    }

    pub fn is_matched(&self) -> bool {
        self.prior.is_some() && self.next.is_some()
    }
}

fn indexed(elems: &[Value], index: usize) -> Option<Element<'_>> {
    elems.get(index).map(|value| Element {
        at: PathStep::Index(index),
        value,
    })
}

/// Elements of `value` if it is a known collection of the schema's kind.
/// Null and unknown collections have no elements.
fn elements<'a>(path: &ValuePath, schema: &SchemaNode, value: &'a Value) -> EngineResult<&'a [Value]> {
    match (&schema.kind, value) {
        (_, Value::Null | Value::Unknown) => Ok(&[]),
        (SchemaKind::List { .. }, Value::List(elems)) | (SchemaKind::Set { .. }, Value::Set(elems)) => {
            Ok(elems)
        }
        _ => Err(EngineError::mismatch(path, schema.shape_name(), value.kind_name())),
    }
}

/// Pair the elements of two instances of the collection at `path`.
///
/// - Lists pair by index; the shorter side pairs with `None`.
/// - Maps pair by key, in key order.
/// - Sets pair by [`set_key`](crate::set_key) equality. The result lists
///   every next element in its own order, followed by unmatched prior
///   elements in theirs.
///
/// A null or unknown collection contributes no elements.
pub fn correlate<'a>(
    path: &ValuePath,
    schema: &SchemaNode,
    prior: &'a Value,
    next: &'a Value,
) -> EngineResult<Vec<Pair<'a>>> {
    let pairs = match &schema.kind {
        SchemaKind::List { .. } => {
            let (p, n) = (elements(path, schema, prior)?, elements(path, schema, next)?);
            (0..p.len().max(n.len()))
                .map(|i| Pair::new(indexed(p, i), indexed(n, i)))
                .collect()
        }
        SchemaKind::Set { elem } => {
            let (p, n) = (elements(path, schema, prior)?, elements(path, schema, next)?);
            correlate_set(elem, p, n)
        }
        SchemaKind::Map { .. } => correlate_map(path, schema, prior, next)?,
        SchemaKind::Scalar { .. } | SchemaKind::Object { .. } => {
            return Err(EngineError::mismatch(path, "collection", schema.shape_name()));
        }
    };
    trace!(path = %path, pairs = pairs.len(), "correlated collection");
    Ok(pairs)
}

fn correlate_set<'a>(elem: &SchemaNode, prior: &'a [Value], next: &'a [Value]) -> Vec<Pair<'a>> {
    let matches = match_elements(elem, prior, next);
    let mut used = vec![false; prior.len()];
    let mut pairs: Vec<Pair<'a>> = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let prior = m.and_then(|j| {
                used[j] = true;
                indexed(prior, j)
            });
            Pair::new(prior, indexed(next, i))
        })
        .collect();
    pairs.extend(
        (0..prior.len())
            .filter(|j| !used[*j])
            .map(|j| Pair::new(indexed(prior, j), None)),
    );
    pairs
}

fn correlate_map<'a>(
    path: &ValuePath,
    schema: &SchemaNode,
    prior: &'a Value,
    next: &'a Value,
) -> EngineResult<Vec<Pair<'a>>> {
    let entries = |value: &'a Value| match value {
        Value::Null | Value::Unknown => Ok(None),
        Value::Map(m) => Ok(Some(m)),
        other => Err(EngineError::mismatch(path, schema.shape_name(), other.kind_name())),
    };
    let (p, n) = (entries(prior)?, entries(next)?);
    let keys: BTreeSet<&'a String> = p.into_iter().chain(n).flat_map(|m| m.keys()).collect();
    let keyed = |m: Option<&'a BTreeMap<String, Value>>, key: &String| {
        m.and_then(|m| m.get(key)).map(|value| Element {
            at: PathStep::Key(key.clone()),
            value,
        })
    };
    Ok(keys
        .into_iter()
        .map(|key| Pair::new(keyed(p, key), keyed(n, key)))
        .collect())
}
