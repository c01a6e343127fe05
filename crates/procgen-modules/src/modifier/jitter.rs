//! Jitter Modifier
//!
//! Re-emits the entries of its upstream module with Gaussian noise on
//! position and size. Decoration levels are kept, so the perturbed copy has
//! the same shape in the generation tree as its source.

use procgen_engine::{
    ByteReader, ByteWriter, DecoratedCollection, GenerationContext, Generator, ModuleCategory,
    ModuleDescriptor, ModuleMetadata, PortDataType, PortMetadata, Result,
};

const PARAMS_VERSION: u16 = 1;

/// Jitter Modifier
///
/// # Inputs
/// - `source` - entries to perturb
///
/// # Outputs
/// - `jittered` - perturbed copies; empty when the input is unlinked
#[derive(Debug, Clone, PartialEq)]
pub struct JitterGenerator {
    /// Standard deviation of the X/Z offset
    amount: f64,
    /// Standard deviation of the relative size factor
    size_amount: f64,
}

impl JitterGenerator {
    pub const TYPE_NAME: &'static str = "jitter";
    pub const PORT_SOURCE: &'static str = "source";
    pub const PORT_JITTERED: &'static str = "jittered";

    pub fn new(amount: f64, size_amount: f64) -> Self {
        Self {
            amount: amount.max(0.0),
            size_amount: size_amount.max(0.0),
        }
    }

    pub fn create() -> Box<dyn Generator> {
        Box::new(Self::new(0.25, 0.1))
    }

    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Box<dyn Generator>> {
        reader.read_version("jitter parameters", PARAMS_VERSION)?;
        let amount = reader.read_f64()?;
        let size_amount = reader.read_f64()?;
        Ok(Box::new(Self { amount, size_amount }))
    }
}

impl ModuleDescriptor for JitterGenerator {
    fn descriptor() -> ModuleMetadata {
        ModuleMetadata {
            type_name: Self::TYPE_NAME.to_string(),
            category: ModuleCategory::Modifier,
            label: "Jitter".to_string(),
            description: "Adds Gaussian noise to upstream positions and sizes".to_string(),
            inputs: vec![PortMetadata::new(Self::PORT_SOURCE, "Source", PortDataType::Objects)],
            outputs: vec![PortMetadata::new(
                Self::PORT_JITTERED,
                "Jittered",
                PortDataType::Objects,
            )],
        }
    }
}

inventory::submit!(procgen_engine::GeneratorRegistration {
    descriptor: JitterGenerator::descriptor,
    create: JitterGenerator::create,
    decode: JitterGenerator::decode,
});

impl Generator for JitterGenerator {
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
        let mut out = DecoratedCollection::new();
        let Some(input) = ctx.input(0)? else {
            log::debug!("JitterGenerator '{}': input unlinked", ctx.module_name());
            return Ok(out);
        };

        let mut rng = ctx.rng();
        for entry in input.iter() {
            let mut entry = entry.clone();
            entry.placement.position[0] += rng.gaussian(0.0, self.amount);
            entry.placement.position[2] += rng.gaussian(0.0, self.amount);
            let factor = rng.gaussian(1.0, self.size_amount).max(0.0);
            entry.size_r *= factor;
            entry.size_y *= factor;
            out.append(entry);
        }

        log::debug!("JitterGenerator '{}': perturbed {} entries", ctx.module_name(), out.len());
        Ok(out)
    }

    fn duplicate(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }

    fn write_params(&self, writer: &mut ByteWriter) {
        writer.write_u16(PARAMS_VERSION);
        writer.write_f64(self.amount);
        writer.write_f64(self.size_amount);
    }
}
