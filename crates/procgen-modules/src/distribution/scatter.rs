//! Scatter Generator
//!
//! Scatters copies of a geometry around every parent entry. Each parent gets
//! a level-0 group entry with the instances one level below it, so lowering
//! the view level hides the instances but keeps the groups.

use std::f64::consts::TAU;

use procgen_engine::{
    ByteReader, ByteWriter, DecoratedCollection, DecoratedEntry, Distribution, GenerationContext,
    Generator, ModuleCategory, ModuleDescriptor, ModuleMetadata, PortDataType, PortMetadata,
    ProcEngineError, Result,
};

use super::{checked_count, MAX_COPIES};
use crate::common::{lookup_geometry, parent_placements};

const PARAMS_VERSION: u16 = 1;

/// Scatter Generator
///
/// # Inputs
/// - `parent` - entries to scatter around (optional)
///
/// # Outputs
/// - `instances` - a group entry plus `count` instances per parent
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterGenerator {
    geometry: String,
    count: u32,
    radius: f64,
    distribution: Distribution,
    random_rotation: bool,
}

impl ScatterGenerator {
    pub const TYPE_NAME: &'static str = "scatter";
    pub const PORT_PARENT: &'static str = "parent";
    pub const PORT_INSTANCES: &'static str = "instances";

    /// Create a scatter of `count` copies (at most [`MAX_COPIES`])
    pub fn new(geometry: impl Into<String>, count: u32) -> Self {
        Self {
            geometry: geometry.into(),
            count: count.min(MAX_COPIES),
            radius: 1.0,
            distribution: Distribution::Uniform,
            random_rotation: true,
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_random_rotation(mut self, random_rotation: bool) -> Self {
        self.random_rotation = random_rotation;
        self
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn create() -> Box<dyn Generator> {
        Box::new(Self::new("", 8))
    }

    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Box<dyn Generator>> {
        reader.read_version("scatter parameters", PARAMS_VERSION)?;
        let geometry = reader.read_str()?;
        let count = checked_count("scatter", reader.read_u32()?)?;
        let radius = reader.read_f64()?;
        let tag = reader.read_u8()?;
        let distribution = Distribution::from_u8(tag)
            .ok_or_else(|| ProcEngineError::decode(format!("unknown distribution tag {}", tag)))?;
        let random_rotation = reader.read_bool()?;
        Ok(Box::new(Self {
            geometry,
            count,
            radius,
            distribution,
            random_rotation,
        }))
    }
}

impl ModuleDescriptor for ScatterGenerator {
    fn descriptor() -> ModuleMetadata {
        ModuleMetadata {
            type_name: Self::TYPE_NAME.to_string(),
            category: ModuleCategory::Distribution,
            label: "Scatter".to_string(),
            description: "Scatters copies around each parent".to_string(),
            inputs: vec![PortMetadata::new(Self::PORT_PARENT, "Parent", PortDataType::Objects)],
            outputs: vec![PortMetadata::new(
                Self::PORT_INSTANCES,
                "Instances",
                PortDataType::Objects,
            )],
        }
    }
}

inventory::submit!(procgen_engine::GeneratorRegistration {
    descriptor: ScatterGenerator::descriptor,
    create: ScatterGenerator::create,
    decode: ScatterGenerator::decode,
});

impl Generator for ScatterGenerator {
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
        let mut rng = ctx.rng();
        let name = ctx.module_name();

        let mut out = DecoratedCollection::new();
        for (p, parent) in parents.iter().enumerate() {
            out.append(DecoratedEntry::new(format!("{}.group{}", name, p), 0).with_placement(*parent));
            for i in 0..self.count {
                let dx = rng.sample(self.distribution, 0.0, self.radius);
                let dz = rng.sample(self.distribution, 0.0, self.radius);
                let mut placement = parent.translated([dx, 0.0, dz]);
                if self.random_rotation {
                    placement.rotation = rng.uniform() * TAU;
                }
                out.append(
                    DecoratedEntry::new(format!("{}.{}.{}", name, p, i), 1)
                        .with_geometry(geometry.clone())
                        .with_placement(placement),
                );
            }
        }

        log::debug!(
            "ScatterGenerator '{}': {} instances around {} parents",
            name,
            self.count as usize * parents.len(),
            parents.len()
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
        writer.write_f64(self.radius);
        writer.write_u8(self.distribution.to_u8());
        writer.write_bool(self.random_rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen_engine::ProcedureBuilder;

    #[test]
    fn test_descriptor() {
        let meta = ScatterGenerator::descriptor();
        assert_eq!(meta.type_name, "scatter");
        assert_eq!(meta.category, ModuleCategory::Distribution);
    }

    #[test]
    fn test_group_then_instances_per_parent() {
        let mut procedure = ProcedureBuilder::new()
            .module("bed", ScatterGenerator::new("", 2))
            .main_entry()
            .module("flowers", ScatterGenerator::new("", 3))
            .link("bed", 0, "flowers", 0)
            .build();
        let object = procedure.object().unwrap();
        // bed: 1 + 2; flowers: (1 + 3) for each of the 3 bed entries
        assert_eq!(object.len(), 3 + 12);
        let counts = object.entry_count_by_level();
        assert_eq!(counts.get(&0), Some(&1));
        assert_eq!(counts.get(&1), Some(&(2 + 3)));
        assert_eq!(counts.get(&2), Some(&9));
    }

    #[test]
    fn test_instances_stay_within_uniform_radius() {
        let mut procedure = ProcedureBuilder::new()
            .seed(9)
            .module("s", ScatterGenerator::new("", 50).with_radius(2.0))
            .build();
        let object = procedure.object().unwrap();
        for entry in object.iter().skip(1) {
            assert!(entry.placement.position[0].abs() <= 2.0);
            assert!(entry.placement.position[2].abs() <= 2.0);
            assert!((0.0..TAU).contains(&entry.placement.rotation));
        }
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        assert_eq!(ScatterGenerator::new("", u32::MAX).count(), MAX_COPIES);

        let mut writer = ByteWriter::new();
        writer.write_u16(PARAMS_VERSION);
        writer.write_str("");
        writer.write_u32(u32::MAX);
        writer.write_f64(1.0);
        writer.write_u8(Distribution::Uniform.to_u8());
        writer.write_bool(false);
        let err = ScatterGenerator::decode(&mut ByteReader::new(writer.as_slice())).unwrap_err();
        assert!(matches!(err, ProcEngineError::Decode(_)));
    }

    #[test]
    fn test_bad_distribution_tag() {
        let mut writer = ByteWriter::new();
        ScatterGenerator::new("", 1).write_params(&mut writer);
        let mut bytes = writer.into_bytes();
        // tag sits before the trailing rotation flag
        let tag = bytes.len() - 2;
        bytes[tag] = 9;
        let err = ScatterGenerator::decode(&mut ByteReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, ProcEngineError::Decode(_)));
    }
}
