//! Paths into value trees and schema trees.
//!
//! A [`ValuePath`] locates a concrete value (`rules[2].port`, `tags.env`).
//! A [`SchemaPath`] locates a schema node; it erases list indices and map
//! keys into a single element step because every element shares one schema.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a [`ValuePath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
    /// Object attribute (or nested block) by name.
    Attr(String),
    /// List or set element by position.
    Index(usize),
    /// Map element by key.
    Key(String),
}

impl PathStep {
    /// The schema step this value step resolves through.
    pub fn schema_step(&self) -> SchemaStep {
        match self {
            Self::Attr(name) => SchemaStep::Attr(name.clone()),
            Self::Index(_) | Self::Key(_) => SchemaStep::Element,
        }
    }
}

/// Location of a value inside a resource's state tree.
///
/// Paths are immutable by convention: the builder methods return a new path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValuePath(Vec<PathStep>);

impl ValuePath {
    /// The empty path (the resource itself).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        self.with(PathStep::Attr(name.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(PathStep::Index(index))
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(PathStep::Key(key.into()))
    }

    pub fn with(&self, step: PathStep) -> Self {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(step);
        Self(steps)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    /// The path without its last step, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The top-level attribute this path lives under.
    pub fn root_attr(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathStep::Attr(name)) => Some(name),
            _ => None,
        }
    }

    /// Every prefix of this path, shortest first, including the path itself
    /// but excluding the root.
    pub fn prefixes(&self) -> impl Iterator<Item = ValuePath> + '_ {
        (1..=self.0.len()).map(|n| Self(self.0[..n].to_vec()))
    }

    pub fn schema_path(&self) -> SchemaPath {
        SchemaPath(self.0.iter().map(PathStep::schema_step).collect())
    }
}

impl From<Vec<PathStep>> for ValuePath {
    fn from(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }
}

impl FromIterator<PathStep> for ValuePath {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, step) in self.0.iter().enumerate() {
            match step {
                PathStep::Attr(name) | PathStep::Key(name) if is_identifier(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathStep::Attr(name) | PathStep::Key(name) => write!(f, "[{name:?}]")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// One step of a [`SchemaPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SchemaStep {
    Attr(String),
    /// Into the element schema of a list, set, or map.
    Element,
}

/// Location of a schema node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath(Vec<SchemaStep>);

impl SchemaPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        let mut steps = self.0.clone();
        steps.push(SchemaStep::Attr(name.into()));
        Self(steps)
    }

    pub fn element(&self) -> Self {
        let mut steps = self.0.clone();
        steps.push(SchemaStep::Element);
        Self(steps)
    }

    pub fn steps(&self) -> &[SchemaStep] {
        &self.0
    }

    /// A value path equivalent to this schema path, using index 0 for
    /// element steps. Only used for error reporting.
    pub fn to_value_path(&self) -> ValuePath {
        self.0
            .iter()
            .map(|step| match step {
                SchemaStep::Attr(name) => PathStep::Attr(name.clone()),
                SchemaStep::Element => PathStep::Index(0),
            })
            .collect()
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self
            .0
            .iter()
            .map(|step| match step {
                SchemaStep::Attr(name) => name.as_str(),
                SchemaStep::Element => "$",
            })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_host_notation() {
        let path = ValuePath::root()
            .attr("rules")
            .index(0)
            .attr("cidr_blocks")
            .index(3);
        assert_eq!(path.to_string(), "rules[0].cidr_blocks[3]");

        let path = ValuePath::root().attr("tags").key("env");
        assert_eq!(path.to_string(), "tags.env");

        let path = ValuePath::root().attr("tags").key("kubernetes.io/name");
        assert_eq!(path.to_string(), "tags[\"kubernetes.io/name\"]");
    }

    #[test]
    fn root_display() {
        assert_eq!(ValuePath::root().to_string(), "<root>");
    }

    #[test]
    fn builders_do_not_mutate() {
        let base = ValuePath::root().attr("a");
        let child = base.attr("b");
        assert_eq!(base.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.parent(), Some(base));
    }

    #[test]
    fn root_attr_and_prefixes() {
        let path = ValuePath::root().attr("x").index(1).attr("y");
        assert_eq!(path.root_attr(), Some("x"));
        let prefixes: Vec<String> = path.prefixes().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, vec!["x", "x[1]", "x[1].y"]);
    }

    #[test]
    fn schema_path_erases_elements() {
        let path = ValuePath::root().attr("tags").key("env");
        assert_eq!(path.schema_path(), SchemaPath::root().attr("tags").element());
        assert_eq!(path.schema_path().to_string(), "tags.$");
    }

    #[test]
    fn steps_order_for_map_keys() {
        let mut steps = vec![PathStep::Index(2), PathStep::Index(0), PathStep::Index(10)];
        steps.sort();
        assert_eq!(steps, vec![PathStep::Index(0), PathStep::Index(2), PathStep::Index(10)]);
    }
}
