//! Event types for procedure state changes
//!
//! Events are sent from a procedure to the host (editor panels, previews,
//! a CLI) to report invalidation, repairs and history changes.

use serde::{Deserialize, Serialize};

/// Trait for sending procedure events
///
/// This abstracts over the transport mechanism (channel, UI callback, log)
/// so the engine can be embedded in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: ProcedureEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted by a procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProcedureEvent {
    /// A structural edit cleared the cached object
    ObjectInvalidated,

    /// A cosmetic edit; views should refresh but the object is still valid
    ObjectChanged,

    /// No main entry was flagged; `module` was chosen instead
    #[serde(rename_all = "camelCase")]
    MainEntryRepaired { module: usize },

    /// The procedure has a usable main entry again
    ObjectValid,

    /// A full evaluation finished and was cached
    #[serde(rename_all = "camelCase")]
    EvaluationCompleted { entries: usize },

    /// Undo/redo availability changed
    #[serde(rename_all = "camelCase")]
    HistoryChanged { can_undo: bool, can_redo: bool },
}

/// Deliver an event, logging (and otherwise ignoring) sink failures
pub(crate) fn emit(sink: &dyn EventSink, event: ProcedureEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropped procedure event: {}", e);
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing, duplicates and batch hosts.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: ProcedureEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Debug)]
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<ProcedureEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<ProcedureEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Clear all collected events
    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: ProcedureEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError {
                message: "event buffer poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}
