//! Merge Generator
//!
//! Concatenates the entries of every connected input, in port order. The
//! sources are found through the back-link resolver, so they may sit
//! anywhere in the graph, not only on the path from the main entry.

use procgen_engine::{
    ByteReader, ByteWriter, DecoratedCollection, GenerationContext, Generator, ModuleCategory,
    ModuleDescriptor, ModuleMetadata, PortDataType, PortMetadata, ProcEngineError, Result,
};

const PARAMS_VERSION: u16 = 1;

/// Most inputs a merge module may declare
pub const MAX_MERGE_INPUTS: usize = 16;

/// Merge Generator
///
/// # Inputs
/// - `in0` .. `inN` - entries to concatenate
///
/// # Outputs
/// - `merged` - all connected inputs, levels unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct MergeGenerator {
    inputs: usize,
}

impl MergeGenerator {
    pub const TYPE_NAME: &'static str = "merge";
    pub const PORT_MERGED: &'static str = "merged";

    /// Create a merge with `inputs` ports (clamped to `1..=MAX_MERGE_INPUTS`)
    pub fn new(inputs: usize) -> Self {
        Self {
            inputs: inputs.clamp(1, MAX_MERGE_INPUTS),
        }
    }

    pub fn create() -> Box<dyn Generator> {
        Box::new(Self::new(2))
    }

    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Box<dyn Generator>> {
        reader.read_version("merge parameters", PARAMS_VERSION)?;
        let inputs = reader.read_len()?;
        if !(1..=MAX_MERGE_INPUTS).contains(&inputs) {
            return Err(ProcEngineError::decode(format!("merge with {} inputs", inputs)));
        }
        Ok(Box::new(Self { inputs }))
    }
}

impl ModuleDescriptor for MergeGenerator {
    fn descriptor() -> ModuleMetadata {
        // Default port layout; saved modules may declare more inputs
        ModuleMetadata {
            type_name: Self::TYPE_NAME.to_string(),
            category: ModuleCategory::Combine,
            label: "Merge".to_string(),
            description: "Concatenates the entries of all connected inputs".to_string(),
            inputs: vec![
                PortMetadata::new("in0", "Input 1", PortDataType::Objects),
                PortMetadata::new("in1", "Input 2", PortDataType::Objects),
            ],
            outputs: vec![PortMetadata::new(Self::PORT_MERGED, "Merged", PortDataType::Objects)],
        }
    }
}

inventory::submit!(procgen_engine::GeneratorRegistration {
    descriptor: MergeGenerator::descriptor,
    create: MergeGenerator::create,
    decode: MergeGenerator::decode,
});

impl Generator for MergeGenerator {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn num_inputs(&self) -> usize {
        self.inputs
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn evaluate(&self, ctx: &GenerationContext<'_>) -> Result<DecoratedCollection> {
        let index = ctx.module_index();
        let mut out = DecoratedCollection::new();
        for port in 0..self.inputs {
            let Some(source) = ctx.resolver().source_of(index, port) else {
                continue;
            };
            if let Some(input) = ctx.input(port)? {
                log::trace!("MergeGenerator '{}': {} entries from {}", ctx.module_name(), input.len(), source);
                out.merge_all(&input, 0);
            }
        }

        log::debug!(
            "MergeGenerator '{}': merged {} of {} inputs into {} entries",
            ctx.module_name(),
            ctx.resolver().connected_inputs(index),
            self.inputs,
            out.len()
        );
        Ok(out)
    }

    fn duplicate(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }

    fn write_params(&self, writer: &mut ByteWriter) {
        writer.write_u16(PARAMS_VERSION);
        writer.write_len(self.inputs);
    }
}
