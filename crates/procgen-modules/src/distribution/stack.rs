//! Stack Generator
//!
//! Stacks copies of a geometry on top of every parent entry. Stacks fed
//! from the same output port are spread along X by their position in that
//! port's fan-out, so siblings stand side by side instead of overlapping.

use procgen_engine::{
    ByteReader, ByteWriter, DecoratedCollection, DecoratedEntry, GenerationContext, Generator,
    ModuleCategory, ModuleDescriptor, ModuleMetadata, PortDataType, PortMetadata, Result,
};

use super::{checked_count, MAX_COPIES};
use crate::common::{lookup_geometry, parent_placements};

const PARAMS_VERSION: u16 = 1;

/// Stack Generator
///
/// # Inputs
/// - `base` - entries to stack on (optional)
///
/// # Outputs
/// - `stack` - `count` level-0 entries per parent
#[derive(Debug, Clone, PartialEq)]
pub struct StackGenerator {
    geometry: String,
    count: u32,
    /// Vertical distance between copies
    spacing: f64,
    /// X shift per sibling ordinal
    sibling_offset: f64,
    /// Half range of the random rotation of each copy
    twist: f64,
}

impl StackGenerator {
    pub const TYPE_NAME: &'static str = "stack";
    pub const PORT_BASE: &'static str = "base";
    pub const PORT_STACK: &'static str = "stack";

    /// Create a stack of `count` copies (at most [`MAX_COPIES`])
    pub fn new(geometry: impl Into<String>, count: u32) -> Self {
        Self {
            geometry: geometry.into(),
            count: count.min(MAX_COPIES),
            spacing: 1.0,
            sibling_offset: 1.5,
            twist: 0.0,
        }
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_sibling_offset(mut self, sibling_offset: f64) -> Self {
        self.sibling_offset = sibling_offset;
        self
    }

    pub fn with_twist(mut self, twist: f64) -> Self {
        self.twist = twist.max(0.0);
        self
    }

    pub fn create() -> Box<dyn Generator> {
        Box::new(Self::new("", 3))
    }

    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Box<dyn Generator>> {
        reader.read_version("stack parameters", PARAMS_VERSION)?;
        Ok(Box::new(Self {
            geometry: reader.read_str()?,
            count: checked_count("stack", reader.read_u32()?)?,
            spacing: reader.read_f64()?,
            sibling_offset: reader.read_f64()?,
            twist: reader.read_f64()?,
        }))
    }
}

impl ModuleDescriptor for StackGenerator {
    fn descriptor() -> ModuleMetadata {
        ModuleMetadata {
            type_name: Self::TYPE_NAME.to_string(),
            category: ModuleCategory::Distribution,
            label: "Stack".to_string(),
            description: "Stacks copies vertically on each parent".to_string(),
            inputs: vec![PortMetadata::new(Self::PORT_BASE, "Base", PortDataType::Objects)],
            outputs: vec![PortMetadata::new(Self::PORT_STACK, "Stack", PortDataType::Objects)],
        }
    }
}

inventory::submit!(procgen_engine::GeneratorRegistration {
    descriptor: StackGenerator::descriptor,
    create: StackGenerator::create,
    decode: StackGenerator::decode,
});

impl Generator for StackGenerator {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn evaluate(&self, ctx: &GenerationContext<'_>) -> Result<DecoratedCollection> {
        let parents = parent_placements(ctx)?;
        let geometry = lookup_geometry(ctx, &self.geometry);
        let ordinal = ctx.sibling_index(0).unwrap_or(0);
        let shift = ordinal as f64 * self.sibling_offset;
        let mut rng = ctx.rng();

        let mut out = DecoratedCollection::new();
        for (p, parent) in parents.iter().enumerate() {
            for i in 0..self.count {
                let mut placement = parent.translated([shift, f64::from(i) * self.spacing, 0.0]);
                placement.rotation += rng.uniform_range(0.0, self.twist);
                out.append(
                    DecoratedEntry::new(format!("{}.{}.{}", ctx.module_name(), p, i), 0)
                        .with_geometry(geometry.clone())
                        .with_placement(placement),
                );
            }
        }

        log::debug!(
            "StackGenerator '{}': sibling {} of {}, {} entries",
            ctx.module_name(),
            ordinal,
            ctx.sibling_count(0),
            out.len()
        );
        Ok(out)
    }

    fn duplicate(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }

    fn write_params(&self, writer: &mut ByteWriter) {
        writer.write_u16(PARAMS_VERSION);
        writer.write_str(&self.geometry);
        writer.write_u32(self.count);
        writer.write_f64(self.spacing);
        writer.write_f64(self.sibling_offset);
        writer.write_f64(self.twist);
    }
}
