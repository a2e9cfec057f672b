//! Heuristic matching of set elements.
//!
//! Set elements carry no positional identity. Two elements match when their
//! keys are equal, where the key is the element with every computed field
//! nulled out: only what the user can set identifies an element. Identical
//! elements are paired before the rest match first-available in encounter
//! order. Matching costs O(n·m) comparisons per set.

use std::collections::BTreeMap;

use tfbridge_types::{SchemaKind, SchemaNode, Value};
use tracing::debug;

/// The identity key of a set element: `value` with computed fields nulled.
pub fn set_key(schema: &SchemaNode, value: &Value) -> Value {
    match (&schema.kind, value) {
        // Fields are read through the schema so that an absent field and an
        // explicit null produce the same key.
        (SchemaKind::Object { fields }, Value::Object(_)) => Value::Object(
            fields
                .iter()
                .map(|(name, field)| {
                    let key = if field.computed {
                        Value::Null
                    } else {
                        set_key(field, value.get(name))
                    };
                    (name.clone(), key)
                })
                .collect(),
        ),
        (SchemaKind::List { elem }, Value::List(elems)) => {
            Value::List(elems.iter().map(|e| set_key(elem, e)).collect())
        }
        (SchemaKind::Set { elem }, Value::Set(elems)) => {
            Value::Set(elems.iter().map(|e| set_key(elem, e)).collect())
        }
        (SchemaKind::Map { elem }, Value::Map(entries)) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), set_key(elem, v)))
                .collect::<BTreeMap<_, _>>(),
        ),
        _ => value.clone(),
    }
}

/// Match `next` elements to `prior` elements.
///
/// Returns, for each next element in order, the index of its prior partner.
/// Identical elements pair up first, so equal sets always match fully; the
/// rest pair by key. Elements whose key contains an unknown never match.
pub(crate) fn match_elements(
    elem: &SchemaNode,
    prior: &[Value],
    next: &[Value],
) -> Vec<Option<usize>> {
    let prior_keys: Vec<Option<Value>> = prior
        .iter()
        .map(|v| Some(set_key(elem, v)).filter(|k| !k.contains_unknown()))
        .collect();
    let next_keys: Vec<Option<Value>> = next
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let key = set_key(elem, v);
            if key.contains_unknown() {
                debug!(element = i, "set element key is not fully known; treating as added");
                return None;
            }
            Some(key)
        })
        .collect();
    let mut used = vec![false; prior.len()];
    let mut matched: Vec<Option<usize>> = vec![None; next.len()];

    for (i, v) in next.iter().enumerate() {
        if next_keys[i].is_none() {
            continue;
        }
        let found = (0..prior.len())
            .find(|&j| !used[j] && prior_keys[j].is_some() && prior[j] == *v);
        if let Some(j) = found {
            used[j] = true;
            matched[i] = Some(j);
        }
    }

    for (i, key) in next_keys.iter().enumerate() {
        let Some(key) = key else { continue };
        if matched[i].is_some() {
            continue;
        }
        let mut candidates = (0..prior.len())
            .filter(|&j| !used[j] && prior_keys[j].as_ref() == Some(key));
        let found = candidates.next();
        if found.is_some() && candidates.next().is_some() {
            debug!(element = i, "ambiguous set element key; pairing first available");
        }
        if let Some(j) = found {
            used[j] = true;
            matched[i] = Some(j);
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_schema() -> SchemaNode {
        SchemaNode::object([
            ("cidr", SchemaNode::string().required()),
            ("id", SchemaNode::string().computed()),
            ("port", SchemaNode::number().optional().computed()),
        ])
    }

    fn rule(cidr: &str, id: Value, port: Value) -> Value {
        Value::object([("cidr", Value::string(cidr)), ("id", id), ("port", port)])
    }

    #[test]
    fn key_ignores_computed_fields() {
        let s = rule_schema();
        let a = rule("10.0.0.0/8", Value::string("r-1"), Value::int(22));
        let b = rule("10.0.0.0/8", Value::Null, Value::Null);
        assert_eq!(set_key(&s, &a), set_key(&s, &b));
    }

    #[test]
    fn matches_first_available() {
        let s = rule_schema();
        let prior = vec![
            rule("a", Value::string("r-1"), Value::Null),
            rule("a", Value::string("r-2"), Value::Null),
        ];
        let next = vec![
            rule("a", Value::Null, Value::Null),
            rule("a", Value::Null, Value::Null),
            rule("a", Value::Null, Value::Null),
        ];
        assert_eq!(match_elements(&s, &prior, &next), vec![Some(0), Some(1), None]);
    }

    #[test]
    fn identical_elements_pair_before_key_matches() {
        let s = rule_schema();
        let prior = vec![
            rule("a", Value::string("r-1"), Value::Null),
            rule("a", Value::string("r-2"), Value::Null),
        ];
        let next = vec![
            rule("a", Value::string("r-2"), Value::Null),
            rule("a", Value::string("r-1"), Value::Null),
        ];
        assert_eq!(match_elements(&s, &prior, &next), vec![Some(1), Some(0)]);
    }

    #[test]
    fn unknown_key_never_matches() {
        let s = rule_schema();
        let prior = vec![rule("a", Value::Null, Value::Null)];
        let next = vec![Value::object([("cidr", Value::Unknown)])];
        assert_eq!(match_elements(&s, &prior, &next), vec![None]);
    }

    #[test]
    fn unknown_in_computed_field_still_matches() {
        let s = rule_schema();
        let prior = vec![rule("a", Value::string("r-1"), Value::int(1))];
        let next = vec![rule("a", Value::Unknown, Value::Unknown)];
        assert_eq!(match_elements(&s, &prior, &next), vec![Some(0)]);
    }

    #[test]
    fn scalar_sets_match_by_value() {
        let s = SchemaNode::string();
        let prior = ["x", "y"].map(Value::from).to_vec();
        let next = ["y", "z", "x"].map(Value::from).to_vec();
        assert_eq!(match_elements(&s, &prior, &next), vec![Some(1), None, Some(0)]);
    }
}
