//! Diff entries and the per-resource diff result.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tfbridge_types::{PathStep, Value};

/// Result of comparing two values at one path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffEntry {
    Unchanged,
    Added {
        new: Value,
    },
    Removed {
        old: Value,
    },
    /// A changed value. On containers, `children` holds only the differing
    /// fields, indices, or keys; it is empty for scalars and for wholesale
    /// changes (one side null or unknown).
    Updated {
        old: Value,
        new: Value,
        children: BTreeMap<PathStep, DiffEntry>,
    },
}

impl DiffEntry {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    /// A scalar or wholesale update with no nested entries.
    pub fn updated(old: &Value, new: &Value) -> Self {
        Self::Updated {
            old: old.clone(),
            new: new.clone(),
            children: BTreeMap::new(),
        }
    }

    /// An update described by its children, or `Unchanged` when none differ.
    pub fn from_children(old: &Value, new: &Value, children: BTreeMap<PathStep, DiffEntry>) -> Self {
        if children.is_empty() {
            Self::Unchanged
        } else {
            Self::Updated {
                old: old.clone(),
                new: new.clone(),
                children,
            }
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<PathStep, DiffEntry>> {
        match self {
            Self::Updated { children, .. } if !children.is_empty() => Some(children),
            _ => None,
        }
    }
}

/// Kind of a flattened, host-facing property diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Add,
    AddReplace,
    Delete,
    DeleteReplace,
    Update,
    UpdateReplace,
}

impl DiffKind {
    pub fn is_replace(self) -> bool {
        matches!(self, Self::AddReplace | Self::DeleteReplace | Self::UpdateReplace)
    }

    pub fn promote(self) -> Self {
        match self {
            Self::Add => Self::AddReplace,
            Self::Delete => Self::DeleteReplace,
            Self::Update => Self::UpdateReplace,
            other => other,
        }
    }

    pub fn demote(self) -> Self {
        match self {
            Self::AddReplace => Self::Add,
            Self::DeleteReplace => Self::Delete,
            Self::UpdateReplace => Self::Update,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::AddReplace => "add-replace",
            Self::Delete => "delete",
            Self::DeleteReplace => "delete-replace",
            Self::Update => "update",
            Self::UpdateReplace => "update-replace",
        }
    }
}

/// Synthetic property used to force a replacement when no real property
/// diff carries one.
pub const META_KEY: &str = "__meta";

/// The diff of one resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Top-level attributes with any change beneath them.
    pub changed_keys: BTreeSet<String>,
    /// Top-level attributes whose change forces replacement.
    pub replace_keys: BTreeSet<String>,
    /// Nested diff per changed top-level attribute.
    pub detailed_diff: BTreeMap<String, DiffEntry>,
    /// Host view: one entry per changed leaf path (`rules[0].port`,
    /// `tags.env`), with replacement folded into the kind.
    pub property_diffs: BTreeMap<String, DiffKind>,
}

impl DiffResult {
    pub fn has_changes(&self) -> bool {
        !self.changed_keys.is_empty() || !self.property_diffs.is_empty()
    }

    pub fn requires_replace(&self) -> bool {
        !self.replace_keys.is_empty() || self.property_diffs.values().any(|k| k.is_replace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_and_demote_are_inverse() {
        for kind in [DiffKind::Add, DiffKind::Delete, DiffKind::Update] {
            assert!(kind.promote().is_replace());
            assert_eq!(kind.promote().demote(), kind);
        }
        assert_eq!(DiffKind::UpdateReplace.promote(), DiffKind::UpdateReplace);
    }

    #[test]
    fn from_children_collapses_to_unchanged() {
        let v = Value::int(1);
        assert!(DiffEntry::from_children(&v, &v, BTreeMap::new()).is_unchanged());
        assert!(DiffEntry::updated(&v, &v).children().is_none());
    }

    #[test]
    fn empty_result_has_no_changes() {
        let result = DiffResult::default();
        assert!(!result.has_changes());
        assert!(!result.requires_replace());
    }
}
