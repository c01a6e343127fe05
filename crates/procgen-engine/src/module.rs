//! Modules: generator behaviour plus link bookkeeping
//!
//! A `Module` is one node of the graph. Its behaviour and parameters live in
//! a boxed [`Generator`]; the module itself only carries the display name,
//! the link tables and the main-entry flag. Link tables are written by
//! [`ModuleGraph`](crate::graph::ModuleGraph), which keeps the output side
//! (fan-out targets) and the input side (single source) in agreement.

use std::fmt;

use crate::codec::{ByteReader, ByteWriter};
use crate::collection::DecoratedCollection;
use crate::error::{ProcEngineError, Result};
use crate::evaluation::GenerationContext;
use crate::registry::ModuleRegistry;
use crate::types::{Orientation, PortRef};

/// Version tag of a module payload
pub const MODULE_RECORD_VERSION: u16 = 1;

/// Behaviour of one module type
///
/// Implementations hold only their parameters. Anything that depends on the
/// graph (upstream values, sibling counts, sub-seeds) is reached through the
/// [`GenerationContext`] handed to `evaluate`.
pub trait Generator: fmt::Debug + Send + Sync {
    /// Registry key of this type
    fn type_name(&self) -> &'static str;

    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    /// Produce this module's own entries.
    ///
    /// Modules linked to the outputs are evaluated by the pass afterwards
    /// and merged below these entries.
    fn evaluate(&self, ctx: &GenerationContext<'_>) -> Result<DecoratedCollection>;

    /// Level offset applied to children attached on `port`
    fn child_level_offset(&self, _port: usize) -> i32 {
        1
    }

    fn duplicate(&self) -> Box<dyn Generator>;

    /// Append the parameter block that the registered decoder reads back
    fn write_params(&self, writer: &mut ByteWriter);
}

/// A node of the module graph
#[derive(Debug)]
pub struct Module {
    name: String,
    generator: Box<dyn Generator>,
    inputs: Vec<Option<PortRef>>,
    outputs: Vec<Vec<PortRef>>,
    main_entry: bool,
    orientation: Orientation,
}

impl Module {
    /// Create an unlinked module sized to the generator's ports
    pub fn new(name: impl Into<String>, generator: Box<dyn Generator>) -> Self {
        let inputs = vec![None; generator.num_inputs()];
        let outputs = vec![Vec::new(); generator.num_outputs()];
        Self {
            name: name.into(),
            generator,
            inputs,
            outputs,
            main_entry: false,
            orientation: Orientation::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn type_name(&self) -> &'static str {
        self.generator.type_name()
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Fan-out of an output port, in insertion order
    pub fn links_out(&self, port: usize) -> &[PortRef] {
        self.outputs.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Source feeding an input port
    pub fn link_in(&self, port: usize) -> Option<PortRef> {
        self.inputs.get(port).copied().flatten()
    }

    pub fn is_main_entry(&self) -> bool {
        self.main_entry
    }

    pub fn set_main_entry(&mut self, main_entry: bool) {
        self.main_entry = main_entry;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Whether any link touches this module
    pub fn has_links(&self) -> bool {
        self.inputs.iter().any(Option::is_some) || self.outputs.iter().any(|o| !o.is_empty())
    }

    /// Structural copy with independent link tables
    pub fn duplicate(&self) -> Module {
        Module {
            name: self.name.clone(),
            generator: self.generator.duplicate(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            main_entry: self.main_entry,
            orientation: self.orientation,
        }
    }

    /// Remap every link endpoint through `table` (old index → new index)
    ///
    /// Endpoints mapped to a negative value, or missing from the table, are
    /// dropped.
    pub fn apply_index_translation(&mut self, table: &[i64]) {
        let translate = |r: PortRef| -> Option<PortRef> {
            let mapped = *table.get(r.module)?;
            usize::try_from(mapped).ok().map(|module| PortRef::new(module, r.port))
        };
        for input in &mut self.inputs {
            *input = input.and_then(translate);
        }
        for output in &mut self.outputs {
            *output = output.iter().filter_map(|&r| translate(r)).collect();
        }
    }

    pub(crate) fn clear_links(&mut self) {
        self.inputs.iter_mut().for_each(|i| *i = None);
        self.outputs.iter_mut().for_each(Vec::clear);
    }

    pub(crate) fn input_slot_mut(&mut self, port: usize) -> Option<&mut Option<PortRef>> {
        self.inputs.get_mut(port)
    }

    pub(crate) fn output_mut(&mut self, port: usize) -> Option<&mut Vec<PortRef>> {
        self.outputs.get_mut(port)
    }

    #[cfg(test)]
    pub(crate) fn inputs_mut(&mut self) -> &mut Vec<Option<PortRef>> {
        &mut self.inputs
    }

    #[cfg(test)]
    pub(crate) fn outputs_mut(&mut self) -> &mut Vec<Vec<PortRef>> {
        &mut self.outputs
    }

    /// Swap the generator, resizing the link tables to its port counts.
    ///
    /// Callers must already have unlinked ports that disappear.
    pub(crate) fn replace_generator(&mut self, generator: Box<dyn Generator>) {
        self.inputs.resize(generator.num_inputs(), None);
        self.outputs.resize(generator.num_outputs(), Vec::new());
        self.generator = generator;
    }

    /// Encode the module payload (links, flags, generator parameters)
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_u16(MODULE_RECORD_VERSION);
        w.write_str(&self.name);
        w.write_u8(self.orientation.to_u8());
        w.write_bool(self.main_entry);
        w.write_len(self.inputs.len());
        for input in &self.inputs {
            match input {
                Some(src) => {
                    w.write_bool(true);
                    w.write_len(src.module);
                    w.write_len(src.port);
                }
                None => w.write_bool(false),
            }
        }
        w.write_len(self.outputs.len());
        for output in &self.outputs {
            w.write_len(output.len());
            for target in output {
                w.write_len(target.module);
                w.write_len(target.port);
            }
        }
        self.generator.write_params(&mut w);
        w.into_bytes()
    }

    /// Rebuild a module from its type name and payload
    pub fn deserialize(type_name: &str, payload: &[u8], registry: &ModuleRegistry) -> Result<Module> {
        let mut r = ByteReader::new(payload);
        r.read_version("module", MODULE_RECORD_VERSION)?;
        let name = r.read_str()?;
        let orientation_tag = r.read_u8()?;
        let orientation = Orientation::from_u8(orientation_tag).ok_or_else(|| {
            ProcEngineError::decode(format!("invalid orientation {} on '{}'", orientation_tag, name))
        })?;
        let main_entry = r.read_bool()?;

        let input_count = r.read_count(1)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            if r.read_bool()? {
                inputs.push(Some(PortRef::new(r.read_len()?, r.read_len()?)));
            } else {
                inputs.push(None);
            }
        }

        let output_count = r.read_count(4)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let fan_out = r.read_count(8)?;
            let mut targets = Vec::with_capacity(fan_out);
            for _ in 0..fan_out {
                targets.push(PortRef::new(r.read_len()?, r.read_len()?));
            }
            outputs.push(targets);
        }

        let generator = registry.decode(type_name, &mut r)?;
        if !r.is_exhausted() {
            return Err(ProcEngineError::decode(format!(
                "{} trailing bytes after '{}' parameters",
                r.remaining(),
                name
            )));
        }
        if generator.num_inputs() != inputs.len() || generator.num_outputs() != outputs.len() {
            return Err(ProcEngineError::PortMismatch {
                module: name,
                expected_inputs: generator.num_inputs(),
                expected_outputs: generator.num_outputs(),
                found_inputs: inputs.len(),
                found_outputs: outputs.len(),
            });
        }

        Ok(Module {
            name,
            generator,
            inputs,
            outputs,
            main_entry,
            orientation,
        })
    }
}
