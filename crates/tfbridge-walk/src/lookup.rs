//! Path-to-schema resolution.
//!
//! A missing path is a programmer error on the caller's side and surfaces as
//! [`EngineError::PathNotFound`].

use tfbridge_types::{EngineError, EngineResult, SchemaNode, SchemaPath, SchemaStep, ValuePath};

fn step<'a>(node: &'a SchemaNode, step: &SchemaStep) -> Option<&'a SchemaNode> {
    match step {
        // Attribute steps pass straight through a collapsed singleton.
        SchemaStep::Attr(name) if node.collapses() => node.elem()?.field(name),
        SchemaStep::Attr(name) => node.field(name),
        SchemaStep::Element => node.elem(),
    }
}

/// Resolve a schema path starting at `root`.
pub fn lookup<'a>(root: &'a SchemaNode, path: &SchemaPath) -> EngineResult<&'a SchemaNode> {
    let mut node = root;
    for s in path.steps() {
        node = step(node, s).ok_or_else(|| EngineError::not_found(&path.to_value_path()))?;
    }
    Ok(node)
}

/// Resolve a value path starting at `root`, reporting errors against the
/// value path itself.
pub fn lookup_value_path<'a>(root: &'a SchemaNode, path: &ValuePath) -> EngineResult<&'a SchemaNode> {
    let mut node = root;
    for s in path.steps() {
        node = step(node, &s.schema_step()).ok_or_else(|| EngineError::not_found(path))?;
    }
    Ok(node)
}

/// The schema node of every non-root prefix of `path`, outermost first.
///
/// An index step into a collapsed collection resolves to the element object,
/// which shares its path prefix with the collection in host notation.
pub fn lookup_chain<'a>(
    root: &'a SchemaNode,
    path: &ValuePath,
) -> EngineResult<Vec<(ValuePath, &'a SchemaNode)>> {
    let mut node = root;
    let mut prefix = ValuePath::root();
    let mut chain = Vec::with_capacity(path.len());
    for s in path.steps() {
        node = step(node, &s.schema_step()).ok_or_else(|| EngineError::not_found(path))?;
        prefix = prefix.with(s.clone());
        chain.push((prefix.clone(), node));
    }
    Ok(chain)
}
