//! Procgen Engine - deterministic procedural generation from module graphs
//!
//! A procedure is an ordered list of generator modules joined by
//! index-addressed links. Evaluating it from a single seed produces a
//! hierarchical collection of generated entries, each tagged with a
//! decoration level used for partial preview and rendering. It supports:
//!
//! - Seeded, reproducible evaluation with per-module sub-seeds
//! - Back-link queries so a module can inspect what feeds it
//! - Level-filtered view and render lists over the generated entries
//! - Compressed snapshot-based undo/redo
//! - A versioned binary format with a name-keyed module registry
//!
//! # Architecture
//!
//! - `ModuleGraph`: modules and their two-sided link tables
//! - `EvaluationPass`: downstream expansion from the main entry
//! - `Procedure`: graph, seed, resources and the cached object
//! - `UndoRing` / `ProcedureSession`: edit history around a procedure
//! - `ModuleRegistry`: generator types collected through `inventory`
//!
//! # Example
//!
//! ```ignore
//! use procgen_engine::{ModuleRegistry, Procedure};
//!
//! let registry = ModuleRegistry::with_builtins();
//! let mut procedure = Procedure::load("garden.proc", &registry)?;
//! procedure.set_seed(42);
//! let object = procedure.object()?;
//! println!("{} entries", object.len());
//! ```

pub mod backlink;
pub mod builder;
pub mod codec;
pub mod collection;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod graph;
pub mod layout;
pub mod module;
pub mod persistence;
pub mod procedure;
pub mod registry;
pub mod resources;
pub mod rng;
pub mod session;
pub mod types;
pub mod undo;
pub mod validation;

#[cfg(test)]
mod test_support;

// Re-export key types
pub use backlink::BackLinkResolver;
pub use builder::ProcedureBuilder;
pub use codec::{ByteReader, ByteWriter};
pub use collection::{DecoratedCollection, DecoratedEntry, ExportNode, Placement};
pub use config::EngineConfig;
pub use descriptor::{ModuleDescriptor, ModuleMetadata, PortMetadata};
pub use error::{ProcEngineError, Result};
pub use evaluation::{EvaluationPass, GenerationContext, Stop};
pub use events::{EventError, EventSink, NullEventSink, ProcedureEvent, VecEventSink};
pub use graph::ModuleGraph;
pub use layout::{LayoutNode, WindowBounds};
pub use module::{Generator, Module};
pub use persistence::FORMAT_VERSION;
pub use procedure::{EvaluationState, Procedure};
pub use registry::{GeneratorRegistration, ModuleRegistry};
pub use resources::{Resource, ResourceHandle, ResourceKind, ResourceStore};
pub use rng::{Distribution, ProcRng};
pub use session::ProcedureSession;
pub use types::{ModuleCategory, Orientation, PortDataType, PortRef};
pub use undo::UndoRing;

// Generator crates submit registrations through this re-export
pub use inventory;
