//! Tri-state value trees.
//!
//! A [`Value`] is `Null` (explicitly absent), `Unknown` (known only after a
//! remote step completes), or a known scalar/object/collection. Null and
//! Unknown are distinct everywhere: they drive different merge and diff
//! outcomes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Payload of a known leaf.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    String(String),
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => numbers_equal(a, b),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Self::Number(Number::from(n))
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Number(Number::from(n))
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        Self::Number(Number::from(n))
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A value tree shaped by a schema node.
///
/// Equality treats sets as multisets: two sets are equal when they hold the
/// same elements regardless of order, and an object field that is absent
/// equals one that is explicitly null. `Unknown == Unknown` holds structurally;
/// the diff engine decides separately whether two unknowns count as a change.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Unknown,
    Scalar(Scalar),
    Object(BTreeMap<String, Value>),
    List(Vec<Value>),
    /// Unordered, but iteration order is preserved for stable diff output.
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Shared null, returned for absent children.
pub static NULL: Value = Value::Null;

/// Shared unknown, returned for children of unknown containers.
pub static UNKNOWN: Value = Value::Unknown;

fn multiset_eq(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    'outer: for x in a {
        for (i, y) in b.iter().enumerate() {
            if !used[i] && x == y {
                used[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

/// Object fields compare with an absent field equal to an explicit null.
fn fields_eq(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> bool {
    let same = |x: &BTreeMap<String, Value>, y: &BTreeMap<String, Value>| {
        x.iter()
            .all(|(k, v)| y.get(k).map_or(v.is_null(), |w| v == w))
    };
    same(a, b) && same(b, a)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Unknown, Self::Unknown) => true,
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => fields_eq(a, b),
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => multiset_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(s.into()))
    }

    pub fn int(n: i64) -> Self {
        Self::Scalar(Scalar::Number(Number::from(n)))
    }

    /// A float value; non-finite floats have no representation and become null.
    pub fn float(n: f64) -> Self {
        match Number::from_f64(n) {
            Some(n) => Self::Scalar(Scalar::Number(n)),
            None => Self::Null,
        }
    }

    pub fn bool(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(elems: impl IntoIterator<Item = Value>) -> Self {
        Self::List(elems.into_iter().collect())
    }

    pub fn set(elems: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(elems.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Neither null nor unknown at this node (children may still be).
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Null | Self::Unknown)
    }

    /// Whether an `Unknown` appears anywhere in this tree.
    pub fn contains_unknown(&self) -> bool {
        match self {
            Self::Unknown => true,
            Self::Null | Self::Scalar(_) => false,
            Self::Object(m) | Self::Map(m) => m.values().any(Value::contains_unknown),
            Self::List(v) | Self::Set(v) => v.iter().any(Value::contains_unknown),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Elements of a list or set.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) | Self::Set(v) => Some(v),
            _ => None,
        }
    }

    /// An object attribute, or null when absent (or when this is not an object).
    pub fn get(&self, name: &str) -> &Value {
        match self {
            Self::Object(m) => m.get(name).unwrap_or(&NULL),
            Self::Unknown => &UNKNOWN,
            _ => &NULL,
        }
    }

    /// A known list, set, or map with no elements.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Self::List(v) | Self::Set(v) => v.is_empty(),
            Self::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::Scalar(s) => s.type_name(),
            Self::Object(_) => "object",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::int(n)
    }
}

fn write_entries(
    f: &mut fmt::Formatter<'_>,
    entries: &BTreeMap<String, Value>,
) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (k, v)) in entries.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{k:?}: {v}")?;
    }
    write!(f, "}}")
}

fn write_elements(f: &mut fmt::Formatter<'_>, elems: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in elems.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Unknown => write!(f, "<unknown>"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Object(m) | Self::Map(m) => write_entries(f, m),
            Self::List(v) | Self::Set(v) => write_elements(f, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_unknown_are_distinct() {
        assert_ne!(Value::Null, Value::Unknown);
        assert!(!Value::Null.is_known());
        assert!(!Value::Unknown.is_known());
        assert!(Value::string("x").is_known());
    }

    #[test]
    fn sets_compare_as_multisets() {
        let a = Value::set(["a", "b", "c"].map(Value::from));
        let b = Value::set(["c", "a", "b"].map(Value::from));
        assert_eq!(a, b);

        let dup = Value::set(["a", "a", "b"].map(Value::from));
        let nodup = Value::set(["a", "b", "b"].map(Value::from));
        assert_ne!(dup, nodup);
    }

    #[test]
    fn absent_object_field_equals_null() {
        let sparse = Value::object([("a", Value::int(1))]);
        let full = Value::object([("a", Value::int(1)), ("b", Value::Null)]);
        assert_eq!(sparse, full);
        assert_ne!(sparse, Value::object([("b", Value::int(2))]));
        assert_ne!(Value::map([("a", Value::Null)]), Value::map(Vec::<(String, Value)>::new()));
    }

    #[test]
    fn lists_compare_in_order() {
        let a = Value::list(["a", "b"].map(Value::from));
        let b = Value::list(["b", "a"].map(Value::from));
        assert_ne!(a, b);
    }

    #[test]
    fn numbers_compare_numerically() {
        let from_int = Value::int(5);
        let parsed: Scalar = serde_json::from_str("5").unwrap();
        assert_eq!(from_int, Value::Scalar(parsed));
        assert_eq!(Value::float(1.5), Value::float(1.5));
        assert_ne!(Value::int(1), Value::float(1.5));
    }

    #[test]
    fn contains_unknown_is_deep() {
        let v = Value::object([(
            "rules",
            Value::list([Value::object([("port", Value::Unknown)])]),
        )]);
        assert!(v.contains_unknown());
        assert!(!Value::object([("a", Value::Null)]).contains_unknown());
    }

    #[test]
    fn get_on_non_objects() {
        let obj = Value::object([("a", Value::int(1))]);
        assert_eq!(obj.get("a"), &Value::int(1));
        assert!(obj.get("missing").is_null());
        assert!(Value::Unknown.get("a").is_unknown());
        assert!(Value::Null.get("a").is_null());
    }

    #[test]
    fn display_is_compact() {
        let v = Value::object([
            ("id", Value::Unknown),
            ("tags", Value::list([Value::string("a"), Value::Null])),
        ]);
        assert_eq!(v.to_string(), r#"{"id": <unknown>, "tags": ["a", null]}"#);
    }

    #[test]
    fn non_finite_float_is_null() {
        assert!(Value::float(f64::NAN).is_null());
    }
}
