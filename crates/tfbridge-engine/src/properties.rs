//! Property tests over the full propose/diff/codec stack.

use proptest::prelude::*;
use tfbridge_codec::{HostCodec, MsgpackCodec, WireCodec};
use tfbridge_diff::{diff, DiffOptions};
use tfbridge_propose::propose;
use tfbridge_types::{Schema, SchemaKind, SchemaNode, Value};

fn schema() -> Schema {
    Schema::new([
        ("id", SchemaNode::string().computed()),
        ("name", SchemaNode::string().required()),
        ("size", SchemaNode::number().optional()),
        ("zone", SchemaNode::string().optional().computed()),
        ("tags", SchemaNode::set(SchemaNode::string()).optional()),
        ("labels", SchemaNode::map(SchemaNode::string()).optional()),
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
    ])
}

fn text(unknowns: bool) -> BoxedStrategy<Value> {
    let known = "[a-d]{1,3}".prop_map(Value::string);
    if unknowns {
        prop_oneof![3 => known, 1 => Just(Value::Unknown)].boxed()
    } else {
        known.boxed()
    }
}

fn number(unknowns: bool) -> BoxedStrategy<Value> {
    let known = (0i64..100).prop_map(Value::int);
    if unknowns {
        prop_oneof![3 => known, 1 => Just(Value::Unknown)].boxed()
    } else {
        known.boxed()
    }
}

fn nullable(inner: BoxedStrategy<Value>) -> BoxedStrategy<Value> {
    prop_oneof![1 => Just(Value::Null), 3 => inner].boxed()
}

/// A collection element, occasionally null.
fn element(inner: BoxedStrategy<Value>) -> BoxedStrategy<Value> {
    prop_oneof![1 => Just(Value::Null), 5 => inner].boxed()
}

fn state(unknowns: bool) -> impl Strategy<Value = Value> {
    let rule = (text(unknowns), text(unknowns))
        .prop_map(|(cidr, id)| Value::object([("cidr", cidr), ("rule_id", id)]))
        .boxed();
    let disk = (number(unknowns), text(unknowns))
        .prop_map(|(size, serial)| Value::object([("size", size), ("serial", serial)]))
        .boxed();
    (
        (text(unknowns), text(unknowns), nullable(number(unknowns)), nullable(text(unknowns))),
        nullable(
            prop::collection::vec(element(text(unknowns)), 0..4)
                .prop_map(Value::set)
                .boxed(),
        ),
        nullable(
            prop::collection::btree_map("[a-z]{1,3}", element(text(unknowns)), 0..3)
                .prop_map(Value::Map)
                .boxed(),
        ),
        nullable(prop::collection::vec(element(rule), 0..3).prop_map(Value::set).boxed()),
        nullable(prop::collection::vec(element(disk), 0..4).prop_map(Value::list).boxed()),
    )
        .prop_map(|((id, name, size, zone), tags, labels, rule, disk)| {
            Value::object([
                ("id", id),
                ("name", name),
                ("size", size),
                ("zone", zone),
                ("tags", tags),
                ("labels", labels),
                ("rule", rule),
                ("disk", disk),
            ])
        })
}

/// The configuration a user would write to reproduce `value`: every
/// computed-only position is left unset.
fn user_config(schema: &SchemaNode, value: &Value) -> Value {
    if schema.is_pure_computed() {
        return Value::Null;
    }
    match (&schema.kind, value) {
        (SchemaKind::Object { fields }, Value::Object(_)) => Value::Object(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), user_config(field, value.get(name))))
                .collect(),
        ),
        (SchemaKind::List { elem }, Value::List(elems)) => {
            Value::List(elems.iter().map(|e| user_config(elem, e)).collect())
        }
        (SchemaKind::Set { elem }, Value::Set(elems)) => {
            Value::Set(elems.iter().map(|e| user_config(elem, e)).collect())
        }
        (SchemaKind::Map { elem }, Value::Map(entries)) => Value::Map(
            entries
                .iter()
                .map(|(k, e)| (k.clone(), user_config(elem, e)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn with_field(value: &Value, name: &str, field: Value) -> Value {
    let mut value = value.clone();
    if let Value::Object(fields) = &mut value {
        fields.insert(name.to_string(), field);
    }
    value
}

proptest! {
    #[test]
    fn propose_is_idempotent_on_noop_update(s in state(false)) {
        let schema = schema();
        let config = user_config(schema.root(), &s);
        prop_assert_eq!(propose(&schema, &s, &config).unwrap(), s);
    }

    #[test]
    fn unknown_config_leaf_proposes_unknown(
        s in state(false),
        leaf in prop::sample::select(vec!["id", "name", "size", "zone", "tags", "labels"]),
    ) {
        let schema = schema();
        let config = with_field(&user_config(schema.root(), &s), leaf, Value::Unknown);
        let proposed = propose(&schema, &s, &config).unwrap();
        prop_assert!(proposed.get(leaf).is_unknown());
    }

    #[test]
    fn diff_of_equal_states_is_empty(s in state(false)) {
        let result = diff(&schema(), &s, &s, &DiffOptions::default()).unwrap();
        prop_assert!(result.changed_keys.is_empty());
        prop_assert!(result.replace_keys.is_empty());
        prop_assert!(result.detailed_diff.is_empty());
        prop_assert!(result.property_diffs.is_empty());
    }

    #[test]
    fn set_order_does_not_matter(
        (s, shuffled) in state(false).prop_flat_map(|s| {
            let tags = s.get("tags").elements().map(<[Value]>::to_vec).unwrap_or_default();
            (Just(s), Just(tags).prop_shuffle())
        }),
    ) {
        let reordered = if s.get("tags").is_null() {
            s.clone()
        } else {
            with_field(&s, "tags", Value::set(shuffled))
        };
        let result = diff(&schema(), &s, &reordered, &DiffOptions::default()).unwrap();
        prop_assert!(!result.has_changes());
    }

    #[test]
    fn diff_reports_changes_exactly_when_states_differ(a in state(false), b in state(false)) {
        let options = DiffOptions {
            null_equals_empty: false,
            ..DiffOptions::default()
        };
        let result = diff(&schema(), &a, &b, &options).unwrap();
        prop_assert_eq!(result.has_changes(), a != b);
    }

    #[test]
    fn reordered_lists_diff_exactly_when_order_matters(
        (s, shuffled) in state(false).prop_flat_map(|s| {
            let disks = s.get("disk").elements().map(<[Value]>::to_vec).unwrap_or_default();
            (Just(s), Just(disks).prop_shuffle())
        }),
    ) {
        let reordered = if s.get("disk").is_null() {
            s.clone()
        } else {
            with_field(&s, "disk", Value::list(shuffled))
        };
        let options = DiffOptions {
            null_equals_empty: false,
            ..DiffOptions::default()
        };
        let result = diff(&schema(), &s, &reordered, &options).unwrap();
        prop_assert_eq!(result.has_changes(), s != reordered);
        prop_assert_eq!(result.changed_keys.contains("disk"), s != reordered);
    }

    #[test]
    fn codecs_round_trip_null_and_unknown(s in state(true)) {
        let schema = schema();
        let host = HostCodec::new();
        let wire = host.encode_resource(&s, &schema).unwrap();
        prop_assert_eq!(&host.decode_resource(&wire, &schema).unwrap(), &s);

        let bytes = MsgpackCodec.encode_resource(&s, &schema).unwrap();
        prop_assert_eq!(&MsgpackCodec.decode_resource(&bytes, &schema).unwrap(), &s);
    }
}

#[test]
fn replacing_one_set_element_is_one_removal_and_one_addition() {
    let schema = schema();
    let tags = |items: [&str; 3]| Value::set(items.map(Value::string));
    let prior = Value::object([("name", Value::string("n")), ("tags", tags(["a", "b", "c"]))]);
    let planned = with_field(&prior, "tags", tags(["a", "b", "d"]));
    let result = diff(&schema, &prior, &planned, &DiffOptions::default()).unwrap();
    let kinds: Vec<_> = result.property_diffs.values().map(|k| k.as_str()).collect();
    assert_eq!(result.property_diffs.len(), 2);
    assert!(kinds.contains(&"add"));
    assert!(kinds.contains(&"delete"));
}
