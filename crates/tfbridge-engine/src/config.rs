use std::path::Path;

use serde::{Deserialize, Serialize};
use tfbridge_codec::HostCodec;
use tfbridge_diff::{DiffOptions, UnknownDiffMode};

use crate::error::BridgeResult;

/// Configuration for an [`Engine`](crate::Engine).
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// How two unknowns at the same position diff.
    pub unknown_diff: UnknownDiffMode,
    /// Whether a null collection and an empty one compare equal.
    pub null_equals_empty: bool,
    /// Lists longer than this are diffed by position.
    pub list_edit_script_limit: usize,
    /// Whether the host codec wraps sensitive values in secret envelopes.
    pub mark_sensitive: bool,
    /// Threads used by batch planning; 1 plans on the calling thread.
    pub batch_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let diff = DiffOptions::default();
        Self {
            unknown_diff: diff.unknown_diff,
            null_equals_empty: diff.null_equals_empty,
            list_edit_script_limit: diff.list_edit_script_limit,
            mark_sensitive: true,
            batch_workers: 1,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> BridgeResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> BridgeResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            unknown_diff: self.unknown_diff,
            null_equals_empty: self.null_equals_empty,
            list_edit_script_limit: self.list_edit_script_limit,
            replace_override: None,
        }
    }

    pub fn host_codec(&self) -> HostCodec {
        HostCodec::new().mark_sensitive(self.mark_sensitive)
    }
}
