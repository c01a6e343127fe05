//! Editing session: a live procedure plus its undo history
//!
//! Every structural edit goes through [`ProcedureSession::edit`], which
//! records the pre-edit state in the ring before applying the change.
//! Cosmetic changes go straight to the procedure and are not recorded.

use std::path::Path;
use std::sync::Arc;

use crate::collection::DecoratedCollection;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::{emit, EventSink, NullEventSink, ProcedureEvent};
use crate::module::{Generator, Module};
use crate::procedure::Procedure;
use crate::registry::ModuleRegistry;
use crate::types::PortRef;
use crate::undo::UndoRing;

/// A procedure being edited
pub struct ProcedureSession {
    procedure: Procedure,
    history: UndoRing,
    registry: Arc<ModuleRegistry>,
    events: Arc<dyn EventSink>,
}

impl ProcedureSession {
    /// Start a session on an empty procedure
    pub fn new(registry: Arc<ModuleRegistry>, config: &EngineConfig) -> Self {
        let mut procedure = Procedure::new();
        procedure.apply_config(config);
        Self::open(procedure, registry, config)
    }

    /// Start a session on an existing procedure
    ///
    /// The history size comes from the procedure itself.
    pub fn open(procedure: Procedure, registry: Arc<ModuleRegistry>, config: &EngineConfig) -> Self {
        let history = UndoRing::new(procedure.undo_capacity(), Arc::clone(&registry))
            .with_compression_level(config.snapshot_compression_level);
        let events = procedure.event_sink();
        Self {
            procedure,
            history,
            registry,
            events,
        }
    }

    /// Load a saved procedure and start a session on it
    pub fn load(path: impl AsRef<Path>, registry: Arc<ModuleRegistry>, config: &EngineConfig) -> Result<Self> {
        let procedure = Procedure::load(path, &registry)?;
        Ok(Self::open(procedure, registry, config))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.procedure.save(path)
    }

    pub fn set_event_sink(&mut self, events: Arc<dyn EventSink>) {
        self.procedure.set_event_sink(Arc::clone(&events));
        self.events = events;
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    /// Direct access for cosmetic changes that are not recorded
    pub fn procedure_mut(&mut self) -> &mut Procedure {
        &mut self.procedure
    }

    pub fn history(&self) -> &UndoRing {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn history_changed(&self) {
        emit(
            self.events.as_ref(),
            ProcedureEvent::HistoryChanged {
                can_undo: self.history.can_undo(),
                can_redo: self.history.can_redo(),
            },
        );
    }

    /// Apply a structural edit, recording the previous state
    ///
    /// Edits that leave the saved form unchanged (rejected links, the same
    /// seed again) are not recorded.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Procedure) -> R) -> Result<R> {
        let before = self.procedure.to_bytes();
        let snapshot = self.history.compress_record(&before)?;
        let result = f(&mut self.procedure);
        if self.procedure.to_bytes() == before {
            log::debug!("Edit left the procedure unchanged, not recorded");
            return Ok(result);
        }
        self.history.push_compressed(snapshot);
        self.history_changed();
        Ok(result)
    }

    pub fn add_module(&mut self, module: Module) -> Result<usize> {
        self.edit(|p| p.add_module(module))
    }

    pub fn remove_module(&mut self, index: usize) -> Result<Option<Module>> {
        self.edit(|p| p.remove_module(index))
    }

    pub fn set_link(&mut self, from: usize, from_port: usize, to: usize, to_port: usize) -> Result<bool> {
        self.edit(|p| p.set_link(from, from_port, to, to_port))
    }

    pub fn delete_link(&mut self, from: usize, from_port: usize, ordinal: usize) -> Result<Option<PortRef>> {
        self.edit(|p| p.delete_link(from, from_port, ordinal))
    }

    pub fn replace_generator(&mut self, index: usize, generator: Box<dyn Generator>) -> Result<bool> {
        self.edit(|p| p.replace_generator(index, generator))
    }

    pub fn set_seed(&mut self, seed: i64) -> Result<()> {
        self.edit(|p| p.set_seed(seed))
    }

    pub fn paste_modules(&mut self, modules: Vec<Module>) -> Result<Option<usize>> {
        self.edit(|p| p.paste_modules(modules))
    }

    /// Resize the history; this forgets every snapshot
    pub fn set_undo_capacity(&mut self, capacity: usize) {
        self.history.set_capacity(capacity);
        self.procedure.set_undo_capacity(self.history.capacity());
        self.history_changed();
    }

    fn replace_live(&mut self, mut procedure: Procedure) {
        procedure.set_event_sink(Arc::clone(&self.events));
        self.procedure = procedure;
        emit(self.events.as_ref(), ProcedureEvent::ObjectInvalidated);
    }

    /// Revert the last structural edit; `false` when there is nothing to undo
    pub fn undo(&mut self) -> Result<bool> {
        let Some(restored) = self.history.undo(&self.procedure) else {
            return Ok(false);
        };
        self.replace_live(restored?);
        log::debug!("Undo: {:?}", self.history);
        self.history_changed();
        Ok(true)
    }

    /// Re-apply an undone edit; `false` when there is nothing to redo
    pub fn redo(&mut self) -> Result<bool> {
        let Some(restored) = self.history.redo() else {
            return Ok(false);
        };
        self.replace_live(restored?);
        log::debug!("Redo: {:?}", self.history);
        self.history_changed();
        Ok(true)
    }

    pub fn object(&mut self) -> Result<&DecoratedCollection> {
        self.procedure.object()
    }

    /// Give up the session, keeping the procedure
    pub fn into_procedure(mut self) -> Procedure {
        self.procedure.set_event_sink(Arc::new(NullEventSink));
        self.procedure
    }
}

impl std::fmt::Debug for ProcedureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureSession")
            .field("procedure", &self.procedure)
            .field("history", &self.history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::test_support::{test_registry, FixedGenerator};

    fn session() -> (ProcedureSession, Arc<VecEventSink>) {
        let mut s = ProcedureSession::new(Arc::new(test_registry()), &EngineConfig::default());
        let sink = Arc::new(VecEventSink::new());
        s.set_event_sink(sink.clone());
        (s, sink)
    }

    fn fixed(name: &str, inputs: usize) -> Module {
        Module::new(name, Box::new(FixedGenerator::new(inputs, 1, 2)))
    }

    #[test]
    fn test_undo_redo_through_session() {
        let (mut s, sink) = session();
        s.add_module(fixed("a", 0)).unwrap();
        s.add_module(fixed("b", 1)).unwrap();
        assert!(s.set_link(0, 0, 1, 0).unwrap());
        assert_eq!(s.object().unwrap().len(), 4);

        let before_undo = s.procedure().to_bytes();
        assert!(s.undo().unwrap());
        assert_eq!(s.procedure().graph().module(1).unwrap().link_in(0), None);
        assert_eq!(s.object().unwrap().len(), 2);

        assert!(s.redo().unwrap());
        assert_eq!(s.procedure().to_bytes(), before_undo);
        assert!(!s.redo().unwrap());

        let history: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, ProcedureEvent::HistoryChanged { .. }))
            .collect();
        assert_eq!(
            history.last(),
            Some(&ProcedureEvent::HistoryChanged {
                can_undo: true,
                can_redo: false
            })
        );
    }

    #[test]
    fn test_undo_everything() {
        let (mut s, _) = session();
        s.add_module(fixed("a", 0)).unwrap();
        s.set_seed(7).unwrap();
        s.set_seed(8).unwrap();

        let mut steps = 0;
        while s.undo().unwrap() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert!(s.procedure().graph().is_empty());
        assert!(s.can_redo());
    }

    fn module_names(s: &ProcedureSession) -> Vec<String> {
        s.procedure().graph().iter().map(|m| m.name().to_string()).collect()
    }

    #[test]
    fn test_edit_after_undo_steps_back_once() {
        let (mut s, _) = session();
        s.add_module(fixed("a", 0)).unwrap();
        s.add_module(fixed("b", 0)).unwrap();
        s.add_module(fixed("c", 0)).unwrap();
        assert!(s.undo().unwrap());
        s.add_module(fixed("d", 0)).unwrap();

        assert!(s.undo().unwrap());
        assert_eq!(module_names(&s), vec!["a", "b"]);
        assert!(s.undo().unwrap());
        assert_eq!(module_names(&s), vec!["a"]);
        assert!(s.undo().unwrap());
        assert!(module_names(&s).is_empty());
        assert!(!s.undo().unwrap());
    }

    #[test]
    fn test_rejected_edits_are_not_recorded() {
        let (mut s, sink) = session();
        s.add_module(fixed("a", 0)).unwrap();
        s.add_module(fixed("b", 0)).unwrap();
        let recorded = s.history().len();
        sink.clear();

        assert!(!s.set_link(9, 0, 0, 0).unwrap());
        s.set_seed(s.procedure().seed()).unwrap();
        assert_eq!(s.history().len(), recorded);
        assert!(sink.events().is_empty());

        assert!(s.undo().unwrap());
        assert_eq!(module_names(&s), vec!["a"]);
    }

    #[test]
    fn test_restored_procedure_keeps_sink() {
        let (mut s, sink) = session();
        s.add_module(fixed("a", 0)).unwrap();
        s.undo().unwrap();
        sink.clear();

        s.procedure_mut().rename_module(0, "x");
        s.redo().unwrap();
        s.procedure_mut().rename_module(0, "renamed");
        assert!(sink.events().contains(&ProcedureEvent::ObjectChanged));
    }

    #[test]
    fn test_capacity_change_resets_history() {
        let (mut s, _) = session();
        s.add_module(fixed("a", 0)).unwrap();
        s.set_undo_capacity(4);
        assert!(!s.can_undo());
        assert_eq!(s.procedure().undo_capacity(), 4);
    }
}
