//! Binary procedure records
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! u16 version
//! i64 seed, i32 view level, i32 rendering level
//! resource store blob
//! u32 module count, then per module: str type name, u32 length, payload
//! v2+: u32 undo capacity
//! v3+: u8 flag [+ window bounds], u8 flag [+ layout tree]
//! ```
//!
//! Older records are read with defaults for the fields they lack. Anything
//! newer than [`FORMAT_VERSION`] is rejected outright.

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{ProcEngineError, Result};
use crate::graph::ModuleGraph;
use crate::layout::{LayoutNode, WindowBounds};
use crate::module::Module;
use crate::registry::ModuleRegistry;
use crate::resources::ResourceStore;
use crate::undo::DEFAULT_UNDO_CAPACITY;
use crate::validation::validate_links;

/// Version written by this build
pub const FORMAT_VERSION: u16 = 3;

/// First version carrying the undo capacity
const UNDO_CAPACITY_SINCE: u16 = 2;
/// First version carrying window bounds and layout
const LAYOUT_SINCE: u16 = 3;

/// Everything a procedure record holds
#[derive(Debug)]
pub(crate) struct ProcedureRecord {
    pub seed: i64,
    pub view_level: i32,
    pub rendering_level: i32,
    pub resources: ResourceStore,
    pub graph: ModuleGraph,
    pub undo_capacity: usize,
    pub window_bounds: Option<WindowBounds>,
    pub layout: Option<LayoutNode>,
}

/// Borrowed view of the same fields, for writing
pub(crate) struct ProcedureRecordRef<'a> {
    pub seed: i64,
    pub view_level: i32,
    pub rendering_level: i32,
    pub resources: &'a ResourceStore,
    pub graph: &'a ModuleGraph,
    pub undo_capacity: usize,
    pub window_bounds: Option<&'a WindowBounds>,
    pub layout: Option<&'a LayoutNode>,
}

pub(crate) fn encode(record: &ProcedureRecordRef<'_>) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u16(FORMAT_VERSION);
    w.write_i64(record.seed);
    w.write_i32(record.view_level);
    w.write_i32(record.rendering_level);
    record.resources.encode(&mut w);

    w.write_len(record.graph.len());
    for module in record.graph.iter() {
        w.write_str(module.type_name());
        w.write_bytes(&module.serialize());
    }

    w.write_len(record.undo_capacity);
    match record.window_bounds {
        Some(bounds) => {
            w.write_bool(true);
            bounds.encode(&mut w);
        }
        None => w.write_bool(false),
    }
    match record.layout {
        Some(layout) => {
            w.write_bool(true);
            layout.encode(&mut w);
        }
        None => w.write_bool(false),
    }
    w.into_bytes()
}

pub(crate) fn decode(bytes: &[u8], registry: &ModuleRegistry) -> Result<ProcedureRecord> {
    let mut r = ByteReader::new(bytes);
    let version = r.read_version("procedure", FORMAT_VERSION)?;
    let seed = r.read_i64()?;
    let view_level = r.read_i32()?;
    let rendering_level = r.read_i32()?;
    let resources = ResourceStore::decode(&mut r)?;

    let count = r.read_count(8)?;
    let mut modules = Vec::with_capacity(count);
    for _ in 0..count {
        let type_name = r.read_str()?;
        let payload = r.read_bytes()?;
        modules.push(Module::deserialize(&type_name, &payload, registry)?);
    }
    let graph = ModuleGraph::from_modules(modules);

    let undo_capacity = if version >= UNDO_CAPACITY_SINCE {
        r.read_len()?
    } else {
        DEFAULT_UNDO_CAPACITY
    };

    let (window_bounds, layout) = if version >= LAYOUT_SINCE {
        let bounds = if r.read_bool()? { Some(WindowBounds::decode(&mut r)?) } else { None };
        let layout = if r.read_bool()? { Some(LayoutNode::decode(&mut r)?) } else { None };
        (bounds, layout)
    } else {
        (None, None)
    };

    if !r.is_exhausted() {
        return Err(ProcEngineError::decode(format!(
            "{} trailing bytes after procedure record",
            r.remaining()
        )));
    }

    let problems = validate_links(&graph);
    if let Some(first) = problems.first() {
        return Err(ProcEngineError::decode(format!(
            "inconsistent link tables ({} problems, first: {})",
            problems.len(),
            first
        )));
    }

    log::debug!(
        "Decoded procedure v{}: {} modules, {} resources",
        version,
        graph.len(),
        resources.len()
    );

    Ok(ProcedureRecord {
        seed,
        view_level,
        rendering_level,
        resources,
        graph,
        undo_capacity,
        window_bounds,
        layout,
    })
}
