//! Conformance checking of a value tree against a schema.

use tfbridge_types::{EngineResult, SchemaNode, Value};
use tracing::trace;

use crate::walker::walk;

/// Check that every node of `value` has the shape its schema position
/// demands. Null and Unknown conform at any position.
pub fn check_conforms(schema: &SchemaNode, value: &Value) -> EngineResult<()> {
    let mut visited = 0usize;
    for item in walk(schema, [value]) {
        item?;
        visited += 1;
    }
    trace!(visited, "value conforms to schema");
    Ok(())
}
