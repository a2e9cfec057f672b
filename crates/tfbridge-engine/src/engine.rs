use std::thread;

use serde_json::Value as Json;
use tfbridge_codec::{HostCodec, WireCodec};
use tfbridge_diff::{diff, DiffOptions, DiffResult};
use tfbridge_propose::{apply_defaults, propose, DefaultEnv};
use tfbridge_types::{EngineResult, Schema, Value};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::BridgeResult;

/// Outcome of planning one resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub proposed: Value,
    pub diff: DiffResult,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.diff.has_changes()
    }

    pub fn requires_replace(&self) -> bool {
        self.diff.requires_replace()
    }
}

/// One resource submitted to [`Engine::plan_batch`].
#[derive(Clone, Debug)]
pub struct PlanRequest<'a> {
    pub name: String,
    pub schema: &'a Schema,
    pub prior: Value,
    pub config: Value,
}

/// Result of one resource in a batch, in submission order.
pub type BatchOutcome = (String, EngineResult<Plan>);

/// Entry point for proposing and diffing resource states.
///
/// An engine holds only configuration; every call works on its own inputs,
/// so one engine can serve many threads.
#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
    options: DiffOptions,
    env: DefaultEnv,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let options = config.diff_options();
        Self {
            config,
            options,
            env: DefaultEnv::new(),
        }
    }

    /// Resolve environment-backed defaults against `env`.
    pub fn with_env(mut self, env: DefaultEnv) -> Self {
        self.env = env;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn codec(&self) -> HostCodec {
        self.config.host_codec()
    }

    /// Merge prior state with configuration. Defaults are not applied.
    pub fn propose(&self, schema: &Schema, prior: &Value, config: &Value) -> EngineResult<Value> {
        propose(schema, prior, config)
    }

    pub fn diff(&self, schema: &Schema, prior: &Value, planned: &Value) -> EngineResult<DiffResult> {
        diff(schema, prior, planned, &self.options)
    }

    /// Diff with an explicit replacement override.
    pub fn diff_with_override(
        &self,
        schema: &Schema,
        prior: &Value,
        planned: &Value,
        replace: bool,
    ) -> EngineResult<DiffResult> {
        let options = DiffOptions {
            replace_override: Some(replace),
            ..self.options.clone()
        };
        diff(schema, prior, planned, &options)
    }

    /// Apply defaults to `config`, propose the new state, and diff it
    /// against `prior`.
    pub fn plan(&self, schema: &Schema, prior: &Value, config: &Value) -> EngineResult<Plan> {
        let config = apply_defaults(schema, config, &self.env)?;
        let proposed = propose(schema, prior, &config)?;
        let diff = diff(schema, prior, &proposed, &self.options)?;
        Ok(Plan { proposed, diff })
    }

    /// [`plan`](Self::plan) over host JSON property trees.
    pub fn plan_host(&self, schema: &Schema, prior: &Json, config: &Json) -> BridgeResult<Plan> {
        let codec = self.codec();
        let prior = codec.decode_resource(prior, schema)?;
        let config = codec.decode_resource(config, schema)?;
        Ok(self.plan(schema, &prior, &config)?)
    }

    /// Plan independent resources. A failing resource is logged and
    /// reported in its slot; the others still complete.
    pub fn plan_batch(&self, requests: Vec<PlanRequest<'_>>) -> Vec<BatchOutcome> {
        let workers = self.config.batch_workers.max(1);
        debug!(resources = requests.len(), workers, "planning batch");
        if workers == 1 || requests.len() < 2 {
            return requests.iter().map(|r| self.plan_one(r)).collect();
        }
        let chunk = requests.len().div_ceil(workers);
        thread::scope(|scope| {
            let handles: Vec<_> = requests
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || part.iter().map(|r| self.plan_one(r)).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .zip(requests.chunks(chunk))
                .flat_map(|(handle, part)| match handle.join() {
                    Ok(outcomes) => outcomes,
                    // Replan a panicked worker's slice on this thread.
                    Err(_) => part.iter().map(|r| self.plan_one(r)).collect(),
                })
                .collect()
        })
    }

    fn plan_one(&self, request: &PlanRequest<'_>) -> BatchOutcome {
        let result = self.plan(request.schema, &request.prior, &request.config);
        if let Err(err) = &result {
            warn!(resource = %request.name, error = %err, "planning failed");
        }
        (request.name.clone(), result)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
