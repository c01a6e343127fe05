//! Object Generator
//!
//! Places one object per parent entry. Used on its own it places a single
//! object at the origin, which makes it the usual root of a procedure.

use procgen_engine::{
    ByteReader, ByteWriter, DecoratedCollection, DecoratedEntry, GenerationContext, Generator,
    ModuleCategory, ModuleDescriptor, ModuleMetadata, PortDataType, PortMetadata, Result,
};

use crate::common::{lookup_geometry, parent_placements};

const PARAMS_VERSION: u16 = 1;

/// Object Generator
///
/// # Inputs
/// - `parent` - entries to attach the object to (optional)
///
/// # Outputs
/// - `object` - one level-0 entry per parent entry
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGenerator {
    /// Geometry resource name; empty places bare anchors
    geometry: String,
    /// Half range of the uniform offset on X and Z
    jitter: f64,
    /// Radial size of the placed object
    size: f64,
}

impl ObjectGenerator {
    pub const TYPE_NAME: &'static str = "object";
    /// Port ID for the parent input
    pub const PORT_PARENT: &'static str = "parent";
    /// Port ID for the object output
    pub const PORT_OBJECT: &'static str = "object";

    /// Create an object generator for a geometry resource
    pub fn new(geometry: impl Into<String>) -> Self {
        Self {
            geometry: geometry.into(),
            jitter: 0.0,
            size: 1.0,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn geometry(&self) -> &str {
        &self.geometry
    }

    pub fn create() -> Box<dyn Generator> {
        Box::new(Self::new(""))
    }

    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Box<dyn Generator>> {
        reader.read_version("object parameters", PARAMS_VERSION)?;
        let geometry = reader.read_str()?;
        let jitter = reader.read_f64()?;
        let size = reader.read_f64()?;
        Ok(Box::new(Self { geometry, jitter, size }))
    }
}

impl ModuleDescriptor for ObjectGenerator {
    fn descriptor() -> ModuleMetadata {
        ModuleMetadata {
            type_name: Self::TYPE_NAME.to_string(),
            category: ModuleCategory::Source,
            label: "Object".to_string(),
            description: "Places one object per parent entry".to_string(),
            inputs: vec![PortMetadata::new(Self::PORT_PARENT, "Parent", PortDataType::Objects)],
            outputs: vec![PortMetadata::new(Self::PORT_OBJECT, "Object", PortDataType::Objects)],
        }
    }
}

inventory::submit!(procgen_engine::GeneratorRegistration {
    descriptor: ObjectGenerator::descriptor,
    create: ObjectGenerator::create,
    decode: ObjectGenerator::decode,
});

impl Generator for ObjectGenerator {
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

        let mut out = DecoratedCollection::new();
        for (i, parent) in parents.iter().enumerate() {
            let dx = rng.uniform_range(0.0, self.jitter);
            let dz = rng.uniform_range(0.0, self.jitter);
            out.append(
                DecoratedEntry::new(format!("{}.{}", ctx.module_name(), i), 0)
                    .with_geometry(geometry.clone())
                    .with_placement(parent.translated([dx, 0.0, dz]))
                    .with_size(self.size, self.size),
            );
        }

        log::debug!("ObjectGenerator '{}': placed {} objects", ctx.module_name(), out.len());
        Ok(out)
    }

    fn duplicate(&self) -> Box<dyn Generator> {
        Box::new(self.clone())
    }

    fn write_params(&self, writer: &mut ByteWriter) {
        writer.write_u16(PARAMS_VERSION);
        writer.write_str(&self.geometry);
        writer.write_f64(self.jitter);
        writer.write_f64(self.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen_engine::{ProcedureBuilder, Resource};

    #[test]
    fn test_descriptor() {
        let meta = ObjectGenerator::descriptor();
        assert_eq!(meta.type_name, "object");
        assert_eq!(meta.category, ModuleCategory::Source);
        assert_eq!(meta.inputs.len(), 1);
        assert_eq!(meta.outputs.len(), 1);
    }

    #[test]
    fn test_root_object_sits_at_origin() {
        let mut procedure = ProcedureBuilder::new()
            .resource(Resource::geometry("cube", vec![1, 2, 3]))
            .module("box", ObjectGenerator::new("cube"))
            .build();
        let object = procedure.object().unwrap();
        assert_eq!(object.len(), 1);
        let entry = object.entry(0).unwrap();
        assert_eq!(entry.name, "box.0");
        assert_eq!(entry.placement.position, [0.0, 0.0, 0.0]);
        assert_eq!(entry.geometry.as_ref().map(|g| g.name()), Some("cube"));
    }

    #[test]
    fn test_one_object_per_parent() {
        let mut procedure = ProcedureBuilder::new()
            .module("base", crate::ScatterGenerator::new("", 4))
            .main_entry()
            .module("top", ObjectGenerator::new("cube").with_jitter(0.5))
            .link("base", 0, "top", 0)
            .build();
        let object = procedure.object().unwrap();
        // 5 scatter entries, then one object per scatter entry
        assert_eq!(object.len(), 10);
        for (parent, child) in object.entries()[..5].iter().zip(&object.entries()[5..]) {
            let dx = child.placement.position[0] - parent.placement.position[0];
            assert!(dx.abs() <= 0.5);
            assert_eq!(child.decoration_level, 1);
        }
    }

    #[test]
    fn test_missing_geometry_yields_bare_entry() {
        let mut procedure = ProcedureBuilder::new()
            .module("ghost", ObjectGenerator::new("missing"))
            .build();
        let object = procedure.object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.entry(0).unwrap().geometry.is_none());
    }

    #[test]
    fn test_params_survive_decode() {
        let generator = ObjectGenerator::new("rock").with_jitter(2.0).with_size(0.5);
        let mut writer = ByteWriter::new();
        generator.write_params(&mut writer);

        let decoded = ObjectGenerator::decode(&mut ByteReader::new(writer.as_slice())).unwrap();
        let mut again = ByteWriter::new();
        decoded.write_params(&mut again);
        assert_eq!(again.as_slice(), writer.as_slice());
    }
}
