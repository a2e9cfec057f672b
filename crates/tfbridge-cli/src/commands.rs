use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value as Json;
use tfbridge_codec::{tfjson, WireCodec};
use tfbridge_diff::{DiffKind, DiffResult};
use tfbridge_engine::{Engine, EngineConfig};
use tfbridge_types::{Schema, Value};
use tracing::debug;

use crate::cli::{Cli, Command, DiffArgs, OutputFormat, ProposeArgs, SchemaArgs, SchemaSource};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        format,
        engine_config,
        ..
    } = cli;
    let engine = load_engine(engine_config.as_deref())?;
    let output = match command {
        Command::Propose(args) => cmd_propose(&engine, args)?,
        Command::Diff(args) => cmd_diff(&engine, args, format)?,
        Command::Plan(args) => cmd_plan(&engine, args, format)?,
        Command::Schema(args) => cmd_schema(args)?,
    };
    println!("{output}");
    Ok(())
}

fn load_engine(path: Option<&Path>) -> anyhow::Result<Engine> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!(?config, "engine configured");
    Ok(Engine::new(config))
}

fn read_json(path: &Path) -> anyhow::Result<Json> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_schema(source: &SchemaSource) -> anyhow::Result<Schema> {
    let path = &source.schema;
    if source.tfjson {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return tfjson::parse_schema(&text)
            .with_context(|| format!("adapting upstream schema {}", path.display()));
    }
    let schema: Schema = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("parsing schema {}", path.display()))?;
    if let Some((at, reason)) = schema.root().problems().into_iter().next() {
        anyhow::bail!("invalid schema {}: {at}: {reason}", path.display());
    }
    Ok(schema)
}

/// Decode a host state file; no file means a null state.
fn load_state(engine: &Engine, schema: &Schema, path: Option<&Path>) -> anyhow::Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    engine
        .codec()
        .decode_resource(&read_json(path)?, schema)
        .with_context(|| format!("decoding {}", path.display()))
}

fn encode_state(engine: &Engine, schema: &Schema, value: &Value) -> anyhow::Result<Json> {
    Ok(engine.codec().encode_resource(value, schema)?)
}

fn cmd_propose(engine: &Engine, args: ProposeArgs) -> anyhow::Result<String> {
    let schema = load_schema(&args.schema)?;
    let prior = load_state(engine, &schema, args.prior.as_deref())?;
    let config = load_state(engine, &schema, Some(args.config.as_path()))?;
    let proposed = engine.propose(&schema, &prior, &config)?;
    Ok(serde_json::to_string_pretty(&encode_state(engine, &schema, &proposed)?)?)
}

fn cmd_diff(engine: &Engine, args: DiffArgs, format: OutputFormat) -> anyhow::Result<String> {
    let schema = load_schema(&args.schema)?;
    let prior = load_state(engine, &schema, args.prior.as_deref())?;
    let planned = load_state(engine, &schema, Some(args.planned.as_path()))?;
    let result = match args.replace_override {
        Some(replace) => engine.diff_with_override(&schema, &prior, &planned, replace)?,
        None => engine.diff(&schema, &prior, &planned)?,
    };
    render_diff(&result, None, format)
}

fn cmd_plan(engine: &Engine, args: ProposeArgs, format: OutputFormat) -> anyhow::Result<String> {
    let schema = load_schema(&args.schema)?;
    let prior = load_state(engine, &schema, args.prior.as_deref())?;
    let config = load_state(engine, &schema, Some(args.config.as_path()))?;
    let plan = engine.plan(&schema, &prior, &config)?;
    let proposed = encode_state(engine, &schema, &plan.proposed)?;
    render_diff(&plan.diff, Some(proposed), format)
}

fn cmd_schema(args: SchemaArgs) -> anyhow::Result<String> {
    let schema = load_schema(&SchemaSource {
        schema: args.tfjson,
        tfjson: true,
    })?;
    Ok(serde_json::to_string_pretty(&schema)?)
}

#[derive(Serialize)]
struct DiffReport<'a> {
    changed_keys: &'a BTreeSet<String>,
    replace_keys: &'a BTreeSet<String>,
    requires_replace: bool,
    property_diffs: &'a BTreeMap<String, DiffKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proposed: Option<Json>,
}

fn render_diff(
    result: &DiffResult,
    proposed: Option<Json>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        let report = DiffReport {
            changed_keys: &result.changed_keys,
            replace_keys: &result.replace_keys,
            requires_replace: result.requires_replace(),
            property_diffs: &result.property_diffs,
            proposed,
        };
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = String::new();
    if !result.has_changes() {
        out.push_str("No changes.");
        return Ok(out);
    }
    for (path, kind) in &result.property_diffs {
        let line = match kind.demote() {
            DiffKind::Add => format!("  {} {path}", "+".green().bold()),
            DiffKind::Delete => format!("  {} {path}", "-".red().bold()),
            _ => format!("  {} {path}", "~".yellow().bold()),
        };
        if kind.is_replace() {
            writeln!(out, "{line} {}", "(forces replacement)".red())?;
        } else {
            writeln!(out, "{line}")?;
        }
    }
    let verdict = if result.requires_replace() {
        "must be replaced".red().bold()
    } else {
        "will be updated in place".yellow().bold()
    };
    write!(
        out,
        "{} changed attribute(s); resource {verdict}",
        result.changed_keys.len()
    )?;
    Ok(out)
}
