//! Procedure: module graph, seed and resources plus the evaluation cache
//!
//! A `Procedure` is what a host edits and asks for output. It tracks whether
//! its cached object is still valid:
//!
//! - `Clean`: the cached object matches the graph.
//! - `DirtyStructural`: modules, links, parameters or the seed changed; the
//!   cache is gone and the next request re-evaluates.
//! - `DirtyCosmetic`: a name or display setting changed; the cache stays
//!   valid, views only need a refresh.
//!
//! Edits with invalid indices are logged and leave the procedure untouched.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collection::DecoratedCollection;
use crate::config::EngineConfig;
use crate::error::{ProcEngineError, Result};
use crate::evaluation::{EvaluationPass, Stop, DEFAULT_MAX_DEPTH};
use crate::events::{emit, EventSink, NullEventSink, ProcedureEvent};
use crate::graph::ModuleGraph;
use crate::layout::{LayoutNode, WindowBounds};
use crate::module::{Generator, Module};
use crate::persistence::{self, ProcedureRecordRef};
use crate::registry::ModuleRegistry;
use crate::resources::{Resource, ResourceKind, ResourceStore};
use crate::types::{Orientation, PortRef};
use crate::undo::DEFAULT_UNDO_CAPACITY;

/// Validity of the cached object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationState {
    Clean,
    DirtyStructural,
    DirtyCosmetic,
}

/// A generation graph with its evaluation cache
pub struct Procedure {
    graph: ModuleGraph,
    seed: i64,
    resources: ResourceStore,
    current: Option<DecoratedCollection>,
    temp: Option<DecoratedCollection>,
    view_level: i32,
    rendering_level: i32,
    undo_capacity: usize,
    max_evaluation_depth: usize,
    state: EvaluationState,
    window_bounds: Option<WindowBounds>,
    layout: Option<LayoutNode>,
    events: Arc<dyn EventSink>,
}

impl Procedure {
    /// Create an empty procedure
    pub fn new() -> Self {
        Self {
            graph: ModuleGraph::new(),
            seed: 0,
            resources: ResourceStore::new(),
            current: None,
            temp: None,
            view_level: 0,
            rendering_level: 0,
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            max_evaluation_depth: DEFAULT_MAX_DEPTH,
            state: EvaluationState::DirtyStructural,
            window_bounds: None,
            layout: None,
            events: Arc::new(NullEventSink),
        }
    }

    /// Create an empty procedure over an initial resource set
    pub fn with_resources(resources: ResourceStore) -> Self {
        Self {
            resources,
            ..Self::new()
        }
    }

    /// Take thresholds, history size and depth limit from a config
    pub fn apply_config(&mut self, config: &EngineConfig) {
        self.undo_capacity = config.undo_capacity;
        self.max_evaluation_depth = config.max_evaluation_depth;
        self.set_view_level(config.view_level);
        self.set_rendering_level(config.rendering_level);
    }

    pub fn set_event_sink(&mut self, events: Arc<dyn EventSink>) {
        self.events = events;
    }

    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.events)
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.graph.module(index)
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn view_level(&self) -> i32 {
        self.view_level
    }

    pub fn rendering_level(&self) -> i32 {
        self.rendering_level
    }

    pub fn undo_capacity(&self) -> usize {
        self.undo_capacity
    }

    pub fn max_evaluation_depth(&self) -> usize {
        self.max_evaluation_depth
    }

    pub fn state(&self) -> EvaluationState {
        self.state
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn window_bounds(&self) -> Option<&WindowBounds> {
        self.window_bounds.as_ref()
    }

    pub fn layout(&self) -> Option<&LayoutNode> {
        self.layout.as_ref()
    }

    // --- state transitions ---

    fn invalidate(&mut self) {
        self.current = None;
        self.temp = None;
        self.state = EvaluationState::DirtyStructural;
        emit(self.events.as_ref(), ProcedureEvent::ObjectInvalidated);
    }

    /// Structural edit: drop the cache and make sure there is a root
    fn structural_change(&mut self) {
        self.invalidate();
        self.ensure_main_entry();
    }

    /// Record a cosmetic change; a pending structural change wins
    pub fn notify_minor_change(&mut self) {
        if self.state != EvaluationState::DirtyStructural {
            self.state = EvaluationState::DirtyCosmetic;
        }
        emit(self.events.as_ref(), ProcedureEvent::ObjectChanged);
    }

    /// Make sure exactly one module is the main entry
    ///
    /// With none flagged, the most recently added module is chosen and the
    /// host is told the object is valid again. With several flagged, the
    /// first one is kept. Returns the main entry, if the graph is not empty.
    pub fn ensure_main_entry(&mut self) -> Option<usize> {
        match self.graph.main_entry_count() {
            0 => {
                let last = self.graph.len().checked_sub(1)?;
                self.graph.set_main_entry(last);
                log::info!(
                    "No main entry flagged; using '{}' ({})",
                    self.graph.module(last).map(Module::name).unwrap_or_default(),
                    last
                );
                self.current = None;
                self.state = EvaluationState::DirtyStructural;
                emit(self.events.as_ref(), ProcedureEvent::MainEntryRepaired { module: last });
                emit(self.events.as_ref(), ProcedureEvent::ObjectValid);
                Some(last)
            }
            1 => self.graph.main_entry(),
            count => {
                let first = self.graph.main_entry()?;
                log::warn!("{} main entries flagged; keeping module {}", count, first);
                self.graph.set_main_entry(first);
                Some(first)
            }
        }
    }

    // --- structural edits ---

    /// Append a module; returns its index
    pub fn add_module(&mut self, module: Module) -> usize {
        let index = self.graph.add_module(module);
        self.structural_change();
        index
    }

    pub fn remove_module(&mut self, index: usize) -> Option<Module> {
        let removed = self.graph.remove_module(index)?;
        self.structural_change();
        Some(removed)
    }

    pub fn duplicate_module(&mut self, index: usize) -> Option<usize> {
        let copy = self.graph.duplicate_module(index)?;
        self.structural_change();
        Some(copy)
    }

    pub fn set_link(&mut self, from: usize, from_port: usize, to: usize, to_port: usize) -> bool {
        let linked = self.graph.set_link(from, from_port, to, to_port);
        if linked {
            self.structural_change();
        }
        linked
    }

    pub fn delete_link(&mut self, from: usize, from_port: usize, ordinal: usize) -> Option<PortRef> {
        let target = self.graph.delete_link(from, from_port, ordinal)?;
        self.structural_change();
        Some(target)
    }

    pub fn delete_input_link(&mut self, to: usize, to_port: usize) -> Option<PortRef> {
        let source = self.graph.delete_input_link(to, to_port)?;
        self.structural_change();
        Some(source)
    }

    /// Swap a module's generator, e.g. after a parameter edit
    pub fn replace_generator(&mut self, index: usize, generator: Box<dyn Generator>) -> bool {
        let replaced = self.graph.replace_generator(index, generator);
        if replaced {
            self.structural_change();
        }
        replaced
    }

    /// Copy modules for a later [`paste_modules`](Self::paste_modules)
    pub fn copy_modules(&self, indices: &[usize]) -> Vec<Module> {
        self.graph.copy_subset(indices)
    }

    /// Append copied modules; returns the index of the first one
    pub fn paste_modules(&mut self, modules: Vec<Module>) -> Option<usize> {
        if modules.is_empty() {
            return None;
        }
        let first = self.graph.append_modules(modules);
        self.structural_change();
        Some(first)
    }

    pub fn set_main_entry(&mut self, index: usize) -> bool {
        let set = self.graph.set_main_entry(index);
        if set {
            self.structural_change();
        }
        set
    }

    pub fn set_seed(&mut self, seed: i64) {
        if seed != self.seed {
            self.seed = seed;
            self.invalidate();
        }
    }

    /// Mutable access to the resource store
    ///
    /// Resources shared with duplicates are copied before they change.
    pub fn resources_mut(&mut self) -> &mut ResourceStore {
        self.invalidate();
        &mut self.resources
    }

    // --- cosmetic edits ---

    pub fn rename_module(&mut self, index: usize, name: impl Into<String>) -> bool {
        let Some(module) = self.graph.module_mut(index) else {
            log::warn!("rename_module: module {} out of range ({} modules)", index, self.graph.len());
            return false;
        };
        module.set_name(name);
        self.notify_minor_change();
        true
    }

    pub fn set_orientation(&mut self, index: usize, orientation: Orientation) -> bool {
        let Some(module) = self.graph.module_mut(index) else {
            log::warn!("set_orientation: module {} out of range ({} modules)", index, self.graph.len());
            return false;
        };
        module.set_orientation(orientation);
        self.notify_minor_change();
        true
    }

    /// Change the preview threshold; cached collections are re-filtered
    pub fn set_view_level(&mut self, level: i32) {
        self.view_level = level;
        for c in self.current.iter_mut().chain(self.temp.iter_mut()) {
            c.set_view_level(level);
        }
        self.notify_minor_change();
    }

    /// Change the render threshold; cached collections are re-filtered
    pub fn set_rendering_level(&mut self, level: i32) {
        self.rendering_level = level;
        for c in self.current.iter_mut().chain(self.temp.iter_mut()) {
            c.set_rendering_level(level);
        }
        self.notify_minor_change();
    }

    pub fn set_undo_capacity(&mut self, capacity: usize) {
        self.undo_capacity = capacity;
        self.notify_minor_change();
    }

    pub fn set_window_bounds(&mut self, bounds: Option<WindowBounds>) {
        self.window_bounds = bounds;
        self.notify_minor_change();
    }

    pub fn set_layout(&mut self, layout: Option<LayoutNode>) {
        self.layout = layout;
        self.notify_minor_change();
    }

    // --- evaluation ---

    fn evaluate(&mut self, stop: Option<Stop>) -> Result<DecoratedCollection> {
        let Some(root) = self.ensure_main_entry() else {
            if self.graph.is_empty() {
                return Ok(DecoratedCollection::with_levels(self.view_level, self.rendering_level));
            }
            return Err(ProcEngineError::MissingMainEntry);
        };
        EvaluationPass::new(self.graph.modules(), self.seed, &self.resources)
            .with_stop(stop)
            .with_max_depth(self.max_evaluation_depth)
            .with_levels(self.view_level, self.rendering_level)
            .run(root)
    }

    /// The full generated object, evaluated on demand and cached
    pub fn object(&mut self) -> Result<&DecoratedCollection> {
        if self.state == EvaluationState::DirtyStructural || self.current.is_none() {
            let out = self.evaluate(None)?;
            log::debug!("Procedure evaluated: {} entries (seed {})", out.len(), self.seed);
            emit(self.events.as_ref(), ProcedureEvent::EvaluationCompleted { entries: out.len() });
            self.state = EvaluationState::Clean;
            return Ok(&*self.current.insert(out));
        }
        self.state = EvaluationState::Clean;
        self.current.as_ref().ok_or(ProcEngineError::MissingMainEntry)
    }

    /// The cached object, if still valid
    pub fn cached_object(&self) -> Option<&DecoratedCollection> {
        self.current.as_ref()
    }

    /// Evaluate up to `stop` without touching the cached object
    ///
    /// The result lives in the temporary slot until the next edit or
    /// partial evaluation.
    pub fn partial_object(&mut self, stop: Stop) -> Result<&DecoratedCollection> {
        let out = self.evaluate(Some(stop))?;
        Ok(&*self.temp.insert(out))
    }

    /// Preview around one module: up to and including it, or everything
    /// except it and what hangs below it
    pub fn temp_object(&mut self, module: usize, up_to: bool) -> Result<&DecoratedCollection> {
        let stop = if up_to { Stop::After(module) } else { Stop::Before(module) };
        self.partial_object(stop)
    }

    pub fn temp(&self) -> Option<&DecoratedCollection> {
        self.temp.as_ref()
    }

    pub fn clear_temp(&mut self) {
        self.temp = None;
    }

    // --- copies and persistence ---

    /// Deep copy for undo snapshots and background previews
    ///
    /// Resources are shared until either side modifies them. The copy has
    /// no event sink and re-evaluates on first use.
    pub fn duplicate(&self) -> Procedure {
        Procedure {
            graph: self.graph.duplicate(),
            seed: self.seed,
            resources: self.resources.clone(),
            current: None,
            temp: None,
            view_level: self.view_level,
            rendering_level: self.rendering_level,
            undo_capacity: self.undo_capacity,
            max_evaluation_depth: self.max_evaluation_depth,
            state: EvaluationState::DirtyStructural,
            window_bounds: self.window_bounds,
            layout: self.layout.clone(),
            events: Arc::new(NullEventSink),
        }
    }

    /// Binary record of this procedure
    pub fn to_bytes(&self) -> Vec<u8> {
        persistence::encode(&ProcedureRecordRef {
            seed: self.seed,
            view_level: self.view_level,
            rendering_level: self.rendering_level,
            resources: &self.resources,
            graph: &self.graph,
            undo_capacity: self.undo_capacity,
            window_bounds: self.window_bounds.as_ref(),
            layout: self.layout.as_ref(),
        })
    }

    /// Rebuild a procedure from a binary record
    pub fn from_bytes(bytes: &[u8], registry: &ModuleRegistry) -> Result<Procedure> {
        let record = persistence::decode(bytes, registry)?;
        Ok(Procedure {
            graph: record.graph,
            seed: record.seed,
            resources: record.resources,
            view_level: record.view_level,
            rendering_level: record.rendering_level,
            undo_capacity: record.undo_capacity,
            window_bounds: record.window_bounds,
            layout: record.layout,
            ..Procedure::new()
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes())?;
        log::info!("Saved procedure ({} modules) to {}", self.graph.len(), path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, registry: &ModuleRegistry) -> Result<Procedure> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let procedure = Self::from_bytes(&bytes, registry)?;
        log::info!("Loaded procedure ({} modules) from {}", procedure.graph.len(), path.display());
        Ok(procedure)
    }

    /// Names of the geometry resources, in store order
    pub fn geometry_names(&self) -> Vec<&str> {
        self.resources.names_of_kind(ResourceKind::Geometry)
    }

    /// Add or replace a resource
    pub fn insert_resource(&mut self, resource: Resource) {
        self.resources_mut().insert(resource);
    }
}

impl Default for Procedure {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("modules", &self.graph.len())
            .field("seed", &self.seed)
            .field("resources", &self.resources.len())
            .field("view_level", &self.view_level)
            .field("rendering_level", &self.rendering_level)
            .field("state", &self.state)
            .finish()
    }
}
