//! Knobs controlling diff semantics.

use serde::{Deserialize, Serialize};

/// How two unknown values at the same position compare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDiffMode {
    /// Either unknown may resolve to anything, so report a possible change.
    #[default]
    Updated,
    /// Treat two unknowns as the same pending value.
    Unchanged,
}

/// Options for [`diff`](crate::diff).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffOptions {
    pub unknown_diff: UnknownDiffMode,
    /// A null collection and an empty known collection compare equal.
    pub null_equals_empty: bool,
    /// Lists longer than this on either side are compared by position
    /// instead of by minimal edit script.
    pub list_edit_script_limit: usize,
    /// `Some(true)` forces a replacement, `Some(false)` suppresses every
    /// replacement, `None` leaves the computed diff alone.
    pub replace_override: Option<bool>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            unknown_diff: UnknownDiffMode::Updated,
            null_equals_empty: true,
            list_edit_script_limit: 1000,
            replace_override: None,
        }
    }
}
