//! Schema nodes describing attribute and block positions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::SchemaPath;
use crate::value::Scalar;

/// Primitive type of a scalar attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Number,
    String,
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
        }
    }
}

/// Shape of a schema node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaKind {
    Scalar {
        #[serde(rename = "type")]
        ty: ScalarType,
    },
    Object {
        fields: BTreeMap<String, SchemaNode>,
    },
    List {
        elem: Box<SchemaNode>,
    },
    Set {
        elem: Box<SchemaNode>,
    },
    Map {
        elem: Box<SchemaNode>,
    },
}

/// Default applied to an optional attribute the configuration leaves unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// A literal value.
    Value(Scalar),
    /// The first environment variable that is set, else the fallback.
    Env {
        vars: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<Scalar>,
    },
}

/// Who may set a value at a schema position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Must be supplied by configuration.
    Required,
    /// May be supplied by configuration; absent means null.
    Optional,
    /// Supplied only by the provider (`computed && !optional`).
    Computed,
    /// May be supplied by configuration, otherwise by the provider.
    OptionalComputed,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One attribute or block position in a resource schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(flatten)]
    pub kind: SchemaKind,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_new: bool,
    /// A list or set of at most one object, presented to the host as the
    /// object itself.
    #[serde(default, skip_serializing_if = "is_false")]
    pub max_items_one: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            required: false,
            computed: false,
            sensitive: false,
            force_new: false,
            max_items_one: false,
            default: None,
        }
    }

    pub fn scalar(ty: ScalarType) -> Self {
        Self::new(SchemaKind::Scalar { ty })
    }

    pub fn string() -> Self {
        Self::scalar(ScalarType::String)
    }

    pub fn number() -> Self {
        Self::scalar(ScalarType::Number)
    }

    pub fn bool() -> Self {
        Self::scalar(ScalarType::Bool)
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        Self::new(SchemaKind::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    pub fn list(elem: SchemaNode) -> Self {
        Self::new(SchemaKind::List {
            elem: Box::new(elem),
        })
    }

    pub fn set(elem: SchemaNode) -> Self {
        Self::new(SchemaKind::Set {
            elem: Box::new(elem),
        })
    }

    pub fn map(elem: SchemaNode) -> Self {
        Self::new(SchemaKind::Map {
            elem: Box::new(elem),
        })
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn max_items_one(mut self) -> Self {
        self.max_items_one = true;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn mode(&self) -> Mode {
        match (self.required, self.optional, self.computed) {
            (_, false, true) => Mode::Computed,
            (_, true, true) => Mode::OptionalComputed,
            (true, _, false) => Mode::Required,
            _ => Mode::Optional,
        }
    }

    /// `computed && !optional`: never settable by configuration.
    pub fn is_pure_computed(&self) -> bool {
        self.mode() == Mode::Computed
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, SchemaKind::Scalar { .. })
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object { .. })
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self.kind,
            SchemaKind::List { .. } | SchemaKind::Set { .. } | SchemaKind::Map { .. }
        )
    }

    /// Element schema of a list, set, or map.
    pub fn elem(&self) -> Option<&SchemaNode> {
        match &self.kind {
            SchemaKind::List { elem } | SchemaKind::Set { elem } | SchemaKind::Map { elem } => {
                Some(elem)
            }
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, SchemaNode>> {
        match &self.kind {
            SchemaKind::Object { fields } => Some(fields),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields().and_then(|fields| fields.get(name))
    }

    /// A `maxItemsOne` list or set of objects, walked as a plain object.
    pub fn collapses(&self) -> bool {
        self.max_items_one
            && matches!(self.kind, SchemaKind::List { .. } | SchemaKind::Set { .. })
            && self.elem().is_some_and(SchemaNode::is_object)
    }

    /// An object, or a collection whose elements are objects.
    pub fn is_block(&self) -> bool {
        match &self.kind {
            SchemaKind::Object { .. } => true,
            SchemaKind::List { elem } | SchemaKind::Set { elem } | SchemaKind::Map { elem } => {
                elem.is_block()
            }
            SchemaKind::Scalar { .. } => false,
        }
    }

    /// Short human-readable description of the node's shape.
    pub fn shape_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::Scalar { ty } => ty.name(),
            SchemaKind::Object { .. } => "object",
            SchemaKind::List { .. } => "list",
            SchemaKind::Set { .. } => "set",
            SchemaKind::Map { .. } => "map",
        }
    }

    /// Flag combinations that make this schema unusable, with their paths.
    pub fn problems(&self) -> Vec<(SchemaPath, String)> {
        let mut out = Vec::new();
        self.collect_problems(&SchemaPath::root(), &mut out);
        out
    }

    fn collect_problems(&self, path: &SchemaPath, out: &mut Vec<(SchemaPath, String)>) {
        if self.required && (self.optional || self.computed) {
            out.push((
                path.clone(),
                "required cannot be combined with optional or computed".into(),
            ));
        }
        if self.max_items_one && !matches!(self.kind, SchemaKind::List { .. } | SchemaKind::Set { .. }) {
            out.push((path.clone(), "max_items_one applies only to lists and sets".into()));
        }
        if self.default.is_some() && (self.required || self.computed) {
            out.push((path.clone(), "defaults apply only to optional attributes".into()));
        }
        if self.default.is_some() && !self.is_scalar() {
            out.push((path.clone(), "defaults apply only to scalar attributes".into()));
        }
        match &self.kind {
            SchemaKind::Scalar { .. } => {}
            SchemaKind::Object { fields } => {
                for (name, field) in fields {
                    field.collect_problems(&path.attr(name), out);
                }
            }
            SchemaKind::List { elem } | SchemaKind::Set { elem } | SchemaKind::Map { elem } => {
                elem.collect_problems(&path.element(), out);
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SchemaRepr {
    #[serde(default)]
    version: i64,
    attributes: BTreeMap<String, SchemaNode>,
}

/// Schema of one resource type: its top-level attributes and blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "SchemaRepr", into = "SchemaRepr")]
pub struct Schema {
    pub version: i64,
    root: SchemaNode,
}

impl From<SchemaRepr> for Schema {
    fn from(repr: SchemaRepr) -> Self {
        Self {
            version: repr.version,
            root: SchemaNode::object(repr.attributes).required(),
        }
    }
}

impl From<Schema> for SchemaRepr {
    fn from(schema: Schema) -> Self {
        let attributes = match schema.root.kind {
            SchemaKind::Object { fields } => fields,
            _ => BTreeMap::new(),
        };
        Self {
            version: schema.version,
            attributes,
        }
    }
}

impl Schema {
    pub fn new<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        Self {
            version: 0,
            root: SchemaNode::object(attributes).required(),
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// The resource as a single required object node.
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    pub fn attribute(&self, name: &str) -> Option<&SchemaNode> {
        self.root.field(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.root
            .fields()
            .into_iter()
            .flat_map(|fields| fields.keys().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_flags() {
        assert_eq!(SchemaNode::string().required().mode(), Mode::Required);
        assert_eq!(SchemaNode::string().optional().mode(), Mode::Optional);
        assert_eq!(SchemaNode::string().computed().mode(), Mode::Computed);
        assert_eq!(
            SchemaNode::string().optional().computed().mode(),
            Mode::OptionalComputed
        );
        // Element schemas carry no flags; they behave as optional.
        assert_eq!(SchemaNode::string().mode(), Mode::Optional);
    }

    #[test]
    fn collapses_only_object_singletons() {
        let block = SchemaNode::list(SchemaNode::object([("a", SchemaNode::string().optional())]))
            .optional()
            .max_items_one();
        assert!(block.collapses());

        let scalars = SchemaNode::list(SchemaNode::string()).max_items_one();
        assert!(!scalars.collapses());
    }

    #[test]
    fn is_block_sees_through_collections() {
        let block = SchemaNode::set(SchemaNode::object([("a", SchemaNode::string())]));
        assert!(block.is_block());
        assert!(!SchemaNode::map(SchemaNode::string()).is_block());
    }

    #[test]
    fn problems_report_conflicting_flags() {
        let node = SchemaNode::object([
            ("a", SchemaNode::string().required().computed()),
            ("b", SchemaNode::string().max_items_one()),
            (
                "c",
                SchemaNode::string()
                    .computed()
                    .with_default(DefaultValue::Value(Scalar::from("x"))),
            ),
        ]);
        let problems = node.problems();
        assert_eq!(problems.len(), 3);
        assert_eq!(problems[0].0.to_string(), "a");
        assert_eq!(problems[1].0.to_string(), "b");
        assert_eq!(problems[2].0.to_string(), "c");
    }

    #[test]
    fn schema_serde_roundtrip() {
        let schema = Schema::new([
            ("name", SchemaNode::string().required().force_new()),
            ("id", SchemaNode::string().computed()),
            (
                "tags",
                SchemaNode::map(SchemaNode::string()).optional(),
            ),
        ])
        .with_version(2);

        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn schema_parses_native_json() {
        let json = r#"{
            "attributes": {
                "port": {"kind": "scalar", "type": "number", "optional": true,
                         "default": {"value": 8080}},
                "rule": {"kind": "list", "max_items_one": true, "optional": true,
                         "elem": {"kind": "object", "fields": {
                             "cidr": {"kind": "scalar", "type": "string", "required": true}
                         }}}
            }
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.version, 0);
        assert!(schema.attribute("rule").unwrap().collapses());
        assert_eq!(
            schema.attribute("port").unwrap().default,
            Some(DefaultValue::Value(Scalar::from(8080)))
        );
        let names: Vec<&str> = schema.attribute_names().collect();
        assert_eq!(names, vec!["port", "rule"]);
    }
}
