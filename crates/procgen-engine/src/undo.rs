//! Undo/redo ring buffer of compressed procedure snapshots
//!
//! Hosts record the procedure *before* every structural edit. Right after
//! such a record the newest slot already equals the state preceding the
//! edit, so the first undo also stores the live state (to make it
//! redoable) and then returns the slot below it. The `record_added` flag
//! tracks that situation.
//!
//! Snapshots are binary procedure records compressed with zstd.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{ProcEngineError, Result};
use crate::procedure::Procedure;
use crate::registry::ModuleRegistry;

/// Capacity used when nothing else is configured
pub const DEFAULT_UNDO_CAPACITY: usize = 32;

/// Smallest usable capacity
pub const MIN_UNDO_CAPACITY: usize = 2;

/// Default zstd level for snapshots
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Fixed-capacity snapshot history
pub struct UndoRing {
    /// Compressed procedure records, oldest first
    snapshots: VecDeque<Vec<u8>>,
    /// Slot holding the state currently shown
    position: usize,
    /// The newest slot was recorded by the edit that would be undone next
    record_added: bool,
    capacity: usize,
    compression_level: i32,
    registry: Arc<ModuleRegistry>,
}

impl UndoRing {
    /// Create a ring with the given capacity (at least 2)
    pub fn new(capacity: usize, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            snapshots: VecDeque::new(),
            position: 0,
            record_added: false,
            capacity: capacity.max(MIN_UNDO_CAPACITY),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            registry,
        }
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity; this drops all history
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(MIN_UNDO_CAPACITY);
        self.clear();
    }

    /// Record the state about to be edited
    ///
    /// Truncates any redo history and evicts the oldest snapshot when full.
    pub fn add_record(&mut self, procedure: &Procedure) -> Result<()> {
        let compressed = self.compress_record(&procedure.to_bytes())?;
        self.push_compressed(compressed);
        Ok(())
    }

    /// Compress a procedure record without storing it
    pub(crate) fn compress_record(&self, record: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(record, self.compression_level).map_err(|e| ProcEngineError::Compression(e.to_string()))
    }

    /// Store a snapshot made by [`compress_record`](Self::compress_record)
    ///
    /// After an undo or redo the slot at `position` holds the live state,
    /// which the caller is recording again, so that slot is replaced.
    pub(crate) fn push_compressed(&mut self, compressed: Vec<u8>) {
        let keep = if self.record_added {
            self.snapshots.len()
        } else {
            self.position.min(self.snapshots.len())
        };
        self.snapshots.truncate(keep);

        self.snapshots.push_back(compressed);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.position = self.snapshots.len() - 1;
        self.record_added = true;
    }

    /// Step back one edit
    ///
    /// `current` is the live state; it is stored first when the newest slot
    /// was recorded by the edit being undone. Returns `None` when there is
    /// nothing to undo.
    pub fn undo(&mut self, current: &Procedure) -> Option<Result<Procedure>> {
        if self.record_added {
            if self.snapshots.is_empty() {
                return None;
            }
            let compressed = match self.compress_record(&current.to_bytes()) {
                Ok(c) => c,
                Err(e) => return Some(Err(e)),
            };
            self.snapshots.push_back(compressed);
            if self.snapshots.len() > self.capacity {
                self.snapshots.pop_front();
            }
            self.position = self.snapshots.len() - 1;
            self.record_added = false;
        }

        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        Some(self.decompress(self.position))
    }

    /// Step forward one edit; `None` at the newest snapshot
    pub fn redo(&mut self) -> Option<Result<Procedure>> {
        if !self.can_redo() {
            return None;
        }
        self.position += 1;
        Some(self.decompress(self.position))
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        if self.record_added {
            !self.snapshots.is_empty()
        } else {
            self.position > 0
        }
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.record_added && self.position + 1 < self.snapshots.len()
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the ring is empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Clear all snapshots
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.position = 0;
        self.record_added = false;
    }

    /// Get the total compressed size of all snapshots
    pub fn compressed_size(&self) -> usize {
        self.snapshots.iter().map(|s| s.len()).sum()
    }

    /// Decompress a snapshot at the given index
    fn decompress(&self, index: usize) -> Result<Procedure> {
        let compressed = self
            .snapshots
            .get(index)
            .ok_or_else(|| ProcEngineError::failed(format!("no undo snapshot at {}", index)))?;
        let record = zstd::decode_all(&compressed[..]).map_err(|e| ProcEngineError::Compression(e.to_string()))?;
        Procedure::from_bytes(&record, &self.registry)
    }
}

impl std::fmt::Debug for UndoRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoRing")
            .field("len", &self.snapshots.len())
            .field("position", &self.position)
            .field("record_added", &self.record_added)
            .field("capacity", &self.capacity)
            .finish()
    }
}
