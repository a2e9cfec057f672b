//! Minimal edit scripts over list elements.
//!
//! Elements are interned to integer ids by structural equality and the id
//! sequences are diffed with Myers' algorithm, so that inserting or removing
//! one element in the middle of a list reports one change instead of
//! shifting every later index.

use std::collections::BTreeMap;

use similar::{capture_diff_slices, Algorithm, DiffOp};
use tfbridge_types::Value;

/// One index-level edit. Removals are indexed in the old list, insertions
/// in the new list. A removal and an insertion at the same index collide
/// into `Replaced`; the two elements need not be related or even differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    Removed,
    Inserted,
    Replaced,
}

/// Assign equal ids to structurally equal elements across both lists.
/// Elements holding unknowns get fresh ids when `unknowns_differ`, so that
/// they never align with each other.
fn intern<'a>(old: &'a [Value], new: &'a [Value], unknowns_differ: bool) -> (Vec<usize>, Vec<usize>) {
    let mut reps: Vec<Option<&'a Value>> = Vec::new();
    let mut ids = |values: &'a [Value]| -> Vec<usize> {
        values
            .iter()
            .map(|v| {
                let fresh = unknowns_differ && v.contains_unknown();
                if !fresh {
                    if let Some(id) = reps.iter().position(|r| *r == Some(v)) {
                        return id;
                    }
                }
                reps.push(if fresh { None } else { Some(v) });
                reps.len() - 1
            })
            .collect()
    };
    let old_ids = ids(old);
    let new_ids = ids(new);
    (old_ids, new_ids)
}

/// The edits turning `old` into `new`, keyed by element index.
pub fn edit_script(old: &[Value], new: &[Value], unknowns_differ: bool) -> BTreeMap<usize, Edit> {
    let (old_ids, new_ids) = intern(old, new, unknowns_differ);
    let mut edits = BTreeMap::new();
    let mut mark = |index: usize, edit: Edit| {
        edits
            .entry(index)
            .and_modify(|e| {
                if *e != edit {
                    *e = Edit::Replaced;
                }
            })
            .or_insert(edit);
    };
    for op in capture_diff_slices(Algorithm::Myers, &old_ids, &new_ids) {
        match op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index, old_len, ..
            } => (old_index..old_index + old_len).for_each(|i| mark(i, Edit::Removed)),
            DiffOp::Insert {
                new_index, new_len, ..
            } => (new_index..new_index + new_len).for_each(|i| mark(i, Edit::Inserted)),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                (old_index..old_index + old_len).for_each(|i| mark(i, Edit::Removed));
                (new_index..new_index + new_len).for_each(|i| mark(i, Edit::Inserted));
            }
        }
    }
    edits
}
