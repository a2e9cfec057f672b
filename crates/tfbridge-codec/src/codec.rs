use tfbridge_types::{Schema, SchemaNode, Value};

use crate::error::CodecResult;

/// A bidirectional mapping between a wire representation and [`Value`],
/// driven by the schema node at the value's position.
pub trait WireCodec {
    type Wire;

    fn decode(&self, wire: &Self::Wire, schema: &SchemaNode) -> CodecResult<Value>;

    fn encode(&self, value: &Value, schema: &SchemaNode) -> CodecResult<Self::Wire>;

    /// Decode a whole resource state against its root block.
    fn decode_resource(&self, wire: &Self::Wire, schema: &Schema) -> CodecResult<Value> {
        self.decode(wire, schema.root())
    }

    fn encode_resource(&self, value: &Value, schema: &Schema) -> CodecResult<Self::Wire> {
        self.encode(value, schema.root())
    }
}
