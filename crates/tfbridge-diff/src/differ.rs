//! Schema-directed comparison of a prior state with a planned state.

use std::collections::BTreeMap;

use tfbridge_correlate::correlate;
use tfbridge_types::{
    EngineResult, PathStep, Schema, SchemaKind, SchemaNode, Value, ValuePath, NULL,
};
use tfbridge_walk::check_conforms;
use tracing::debug;

use crate::edit::{edit_script, Edit};
use crate::options::{DiffOptions, UnknownDiffMode};
use crate::replace::{path_triggers_replacement, value_triggers_replacement};
use crate::result::{DiffEntry, DiffKind, DiffResult, META_KEY};

/// Compare `prior` with `planned` under `schema`.
///
/// Both values must conform to the schema. Fails only with the engine's
/// integration errors; a successful result is always complete.
pub fn diff(
    schema: &Schema,
    prior: &Value,
    planned: &Value,
    options: &DiffOptions,
) -> EngineResult<DiffResult> {
    check_conforms(schema.root(), prior)?;
    check_conforms(schema.root(), planned)?;

    let differ = Differ {
        root: schema.root(),
        options,
    };
    let mut result = DiffResult::default();
    if let Some(fields) = schema.root().fields() {
        for (name, field) in fields {
            let path = ValuePath::root().attr(name.as_str());
            let entry = differ.diff_node(&path, field, prior.get(name), planned.get(name))?;
            if entry.is_unchanged() {
                continue;
            }
            if differ.flatten(&path, &entry, &mut result.property_diffs)? {
                result.replace_keys.insert(name.clone());
            }
            result.changed_keys.insert(name.clone());
            result.detailed_diff.insert(name.clone(), entry);
        }
    }
    apply_replace_override(&mut result, options.replace_override);

    debug!(
        changed = result.changed_keys.len(),
        replace = result.replace_keys.len(),
        properties = result.property_diffs.len(),
        "computed diff"
    );
    Ok(result)
}

fn apply_replace_override(result: &mut DiffResult, replace_override: Option<bool>) {
    match replace_override {
        Some(true) if !result.requires_replace() => {
            result
                .property_diffs
                .insert(META_KEY.to_string(), DiffKind::UpdateReplace);
        }
        Some(false) => {
            for kind in result.property_diffs.values_mut() {
                *kind = kind.demote();
            }
            result.replace_keys.clear();
        }
        _ => {}
    }
}

/// The single element of a collapsed collection, or null.
fn first_element(value: &Value) -> &Value {
    value.elements().and_then(<[Value]>::first).unwrap_or(&NULL)
}

/// Report an element-level entry of a collapsed collection against the
/// collection values themselves.
fn rewrap(entry: DiffEntry, old: &Value, new: &Value) -> DiffEntry {
    match entry {
        DiffEntry::Unchanged => DiffEntry::Unchanged,
        DiffEntry::Added { .. } => DiffEntry::Added { new: new.clone() },
        DiffEntry::Removed { .. } => DiffEntry::Removed { old: old.clone() },
        DiffEntry::Updated { .. } => DiffEntry::updated(old, new),
    }
}

struct Differ<'s> {
    root: &'s SchemaNode,
    options: &'s DiffOptions,
}

impl Differ<'_> {
    /// Null stand-in for empty collections when they compare equal to null.
    fn normalize<'v>(&self, value: &'v Value) -> &'v Value {
        if self.options.null_equals_empty && value.is_empty_collection() {
            &NULL
        } else {
            value
        }
    }

    fn diff_node(
        &self,
        path: &ValuePath,
        schema: &SchemaNode,
        old: &Value,
        new: &Value,
    ) -> EngineResult<DiffEntry> {
        let (old, new) = (self.normalize(old), self.normalize(new));
        if !old.is_known() || !new.is_known() {
            return Ok(self.short_circuit(old, new));
        }
        match &schema.kind {
            SchemaKind::Scalar { .. } if old == new => Ok(DiffEntry::Unchanged),
            SchemaKind::Scalar { .. } => Ok(DiffEntry::updated(old, new)),
            SchemaKind::Object { fields } => self.diff_fields(path, fields, old, new, old, new),
            SchemaKind::List { elem } | SchemaKind::Set { elem } if schema.collapses() => {
                let old_elem = self.normalize(first_element(old));
                let new_elem = self.normalize(first_element(new));
                if !old_elem.is_known() || !new_elem.is_known() {
                    return Ok(rewrap(self.short_circuit(old_elem, new_elem), old, new));
                }
                match elem.fields() {
                    Some(fields) => self.diff_fields(path, fields, old_elem, new_elem, old, new),
                    None => Ok(DiffEntry::Unchanged),
                }
            }
            SchemaKind::List { elem } => self.diff_list(path, schema, elem, old, new),
            SchemaKind::Set { elem } | SchemaKind::Map { elem } => {
                self.diff_correlated(path, schema, elem, old, new)
            }
        }
    }

    /// Diff where at least one side is null or unknown: one entry for the
    /// whole value.
    fn short_circuit(&self, old: &Value, new: &Value) -> DiffEntry {
        match (old, new) {
            (Value::Null, Value::Null) => DiffEntry::Unchanged,
            (Value::Null, _) => DiffEntry::Added { new: new.clone() },
            (_, Value::Null) => DiffEntry::Removed { old: old.clone() },
            (Value::Unknown, Value::Unknown)
                if self.options.unknown_diff == UnknownDiffMode::Unchanged =>
            {
                DiffEntry::Unchanged
            }
            _ => DiffEntry::updated(old, new),
        }
    }

    /// Compare object fields, reporting the resulting update against the
    /// container values `old_whole` and `new_whole`.
    fn diff_fields(
        &self,
        path: &ValuePath,
        fields: &BTreeMap<String, SchemaNode>,
        old: &Value,
        new: &Value,
        old_whole: &Value,
        new_whole: &Value,
    ) -> EngineResult<DiffEntry> {
        let mut children = BTreeMap::new();
        for (name, field) in fields {
            let child = path.attr(name.as_str());
            let entry = self.diff_node(&child, field, old.get(name), new.get(name))?;
            if !entry.is_unchanged() {
                children.insert(PathStep::Attr(name.clone()), entry);
            }
        }
        Ok(DiffEntry::from_children(old_whole, new_whole, children))
    }

    fn diff_list(
        &self,
        path: &ValuePath,
        schema: &SchemaNode,
        elem: &SchemaNode,
        old: &Value,
        new: &Value,
    ) -> EngineResult<DiffEntry> {
        let (Some(old_elems), Some(new_elems)) = (old.elements(), new.elements()) else {
            return Ok(DiffEntry::updated(old, new));
        };
        let limit = self.options.list_edit_script_limit;
        if old_elems.len() > limit || new_elems.len() > limit {
            debug!(
                path = %path,
                old = old_elems.len(),
                new = new_elems.len(),
                "list too long for edit script; comparing by position"
            );
            return self.diff_correlated(path, schema, elem, old, new);
        }

        let unknowns_differ = self.options.unknown_diff == UnknownDiffMode::Updated;
        let mut children = BTreeMap::new();
        for (index, edit) in edit_script(old_elems, new_elems, unknowns_differ) {
            let old_elem = old_elems.get(index).unwrap_or(&NULL);
            let new_elem = new_elems.get(index).unwrap_or(&NULL);
            let entry = match edit {
                Edit::Removed => DiffEntry::Removed {
                    old: old_elem.clone(),
                },
                Edit::Inserted => DiffEntry::Added {
                    new: new_elem.clone(),
                },
                // The removed and inserted elements are unrelated, so the
                // index changed even when they happen to be equal.
                Edit::Replaced => {
                    match self.diff_node(&path.index(index), elem, old_elem, new_elem)? {
                        DiffEntry::Unchanged => DiffEntry::updated(old_elem, new_elem),
                        entry => entry,
                    }
                }
            };
            if !entry.is_unchanged() {
                children.insert(PathStep::Index(index), entry);
            }
        }
        Ok(DiffEntry::from_children(old, new, children))
    }

    /// Pair elements with the correlator and diff each pair. Set children
    /// are keyed by pairing position.
    fn diff_correlated(
        &self,
        path: &ValuePath,
        schema: &SchemaNode,
        elem: &SchemaNode,
        old: &Value,
        new: &Value,
    ) -> EngineResult<DiffEntry> {
        let is_set = matches!(schema.kind, SchemaKind::Set { .. });
        let mut children = BTreeMap::new();
        for (position, pair) in correlate(path, schema, old, new)?.iter().enumerate() {
            let step = match (&pair.next, &pair.prior) {
                _ if is_set => PathStep::Index(position),
                (Some(e), _) | (None, Some(e)) => e.at.clone(),
                (None, None) => continue,
            };
            let entry = match (&pair.prior, &pair.next) {
                (Some(prior), Some(next)) => {
                    self.diff_node(&path.with(step.clone()), elem, prior.value, next.value)?
                }
                (Some(prior), None) => DiffEntry::Removed {
                    old: prior.value.clone(),
                },
                (None, Some(next)) => DiffEntry::Added {
                    new: next.value.clone(),
                },
                (None, None) => continue,
            };
            if !entry.is_unchanged() {
                children.insert(step, entry);
            }
        }
        Ok(DiffEntry::from_children(old, new, children))
    }

    /// Fold an entry tree into host property diffs, one per changed leaf.
    /// Returns whether any of them forces replacement.
    fn flatten(
        &self,
        path: &ValuePath,
        entry: &DiffEntry,
        out: &mut BTreeMap<String, DiffKind>,
    ) -> EngineResult<bool> {
        if let Some(children) = entry.children() {
            let mut replace = false;
            for (step, child) in children {
                replace |= self.flatten(&path.with(step.clone()), child, out)?;
            }
            return Ok(replace);
        }
        let (kind, touched) = match entry {
            DiffEntry::Unchanged => return Ok(false),
            DiffEntry::Added { new } => (DiffKind::Add, vec![new]),
            DiffEntry::Removed { old } => (DiffKind::Delete, vec![old]),
            // An unknown replacement may or may not touch flagged leaves;
            // only the path itself decides.
            DiffEntry::Updated { new, .. } if new.is_unknown() => (DiffKind::Update, vec![]),
            DiffEntry::Updated { old, new, .. } => (DiffKind::Update, vec![old, new]),
        };
        let mut replace = path_triggers_replacement(self.root, path)?;
        for value in touched {
            if replace {
                break;
            }
            replace = value_triggers_replacement(self.root, path, value)?;
        }
        out.insert(path.to_string(), if replace { kind.promote() } else { kind });
        Ok(replace)
    }
}
