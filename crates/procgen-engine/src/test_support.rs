//! Test generator shared by the unit tests of this crate

use crate::codec::{ByteReader, ByteWriter};
use crate::collection::{DecoratedCollection, DecoratedEntry, Placement};
use crate::descriptor::{ModuleMetadata, PortMetadata};
use crate::error::Result;
use crate::evaluation::GenerationContext;
use crate::module::Generator;
use crate::registry::ModuleRegistry;
use crate::types::{ModuleCategory, PortDataType};

/// Emits `count` level-0 entries at random X positions
///
/// `size_y` of every entry records how many entries arrived on the
/// connected inputs, so tests can observe upstream pulls.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    inputs: usize,
    outputs: usize,
    count: usize,
}

impl FixedGenerator {
    pub const TYPE_NAME: &'static str = "fixed";

    pub fn new(inputs: usize, outputs: usize, count: usize) -> Self {
        Self { inputs, outputs, count }
    }

    pub fn metadata() -> ModuleMetadata {
        ModuleMetadata {
            type_name: Self::TYPE_NAME.to_string(),
            category: ModuleCategory::Source,
            label: "Fixed".to_string(),
            description: "Fixed number of entries".to_string(),
            inputs: vec![PortMetadata::new("in", "In", PortDataType::Objects)],
            outputs: vec![PortMetadata::new("out", "Out", PortDataType::Objects)],
        }
    }

    pub fn create() -> Box<dyn Generator> {
        Box::new(Self::new(1, 1, 1))
    }

    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Box<dyn Generator>> {
        let inputs = reader.read_len()?;
        let outputs = reader.read_len()?;
        let count = reader.read_len()?;
        Ok(Box::new(Self::new(inputs, outputs, count)))
    }
}

impl Generator for FixedGenerator {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn num_inputs(&self) -> usize {
        self.inputs
    }

    fn num_outputs(&self) -> usize {
        self.outputs
    }

    fn evaluate(&self, ctx: &GenerationContext<'_>) -> Result<DecoratedCollection> {
        let mut upstream = 0;
        for port in 0..self.inputs {
            if let Some(input) = ctx.input(port)? {
                upstream += input.len();
            }
        }
        let mut rng = ctx.rng();
        let mut out = DecoratedCollection::new();
        for i in 0..self.count {
            out.append(
                DecoratedEntry::new(format!("{}.{}", ctx.module_name(), i), 0)
                    .with_placement(Placement::at([rng.uniform(), 0.0, 0.0]))
                    .with_size(1.0, upstream as f64),
            );
        }
        Ok(out)
    }

    fn duplicate(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }

    fn write_params(&self, writer: &mut ByteWriter) {
        writer.write_len(self.inputs);
        writer.write_len(self.outputs);
        writer.write_len(self.count);
    }
}

pub fn test_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register(FixedGenerator::metadata(), FixedGenerator::create, FixedGenerator::decode);
    registry
}
