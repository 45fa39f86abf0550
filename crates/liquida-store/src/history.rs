//! JSON-file history store.

use std::io::Write;
use std::path::{Path, PathBuf};

use liquida_core::{HistoryEntry, SettlementResult};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::StoreError;

/// Slot key the history list is stored under.
pub const DEFAULT_SLOT: &str = "calculo-history";

/// Ordered (most recent first) list of processed documents.
///
/// The backing file is a JSON object mapping slot keys to lists; this store
/// owns one slot and leaves the others untouched. The file is read once in
/// [`open`](Self::open) and rewritten after every mutation. There is no
/// locking: one writer per file is assumed.
///
/// Use [`in_memory`](Self::in_memory) for an ephemeral store that never
/// touches disk.
pub struct HistoryStore {
    path: Option<PathBuf>,
    slot: String,
    entries: Vec<HistoryEntry>,
    other_slots: Map<String, Value>,
}

impl HistoryStore {
    /// Ephemeral store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            slot: DEFAULT_SLOT.to_string(),
            entries: Vec::new(),
            other_slots: Map::new(),
        }
    }

    /// Open the default slot of the history file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_slot(path, DEFAULT_SLOT)
    }

    /// Open a named slot of the history file at `path`.
    ///
    /// A missing file is an empty history. A malformed file or slot is
    /// logged and treated as empty; it is overwritten on the next mutation.
    pub fn open_slot(path: &Path, slot: &str) -> Result<Self, StoreError> {
        let mut store = Self {
            path: Some(path.to_path_buf()),
            slot: slot.to_string(),
            entries: Vec::new(),
            other_slots: Map::new(),
        };

        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => return Err(e.into()),
        };

        let mut root = match serde_json::from_slice::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(path = %path.display(), "history file is not a JSON object, starting empty");
                return Ok(store);
            }
        };

        if let Some(value) = root.remove(slot) {
            match serde_json::from_value::<Vec<HistoryEntry>>(value) {
                Ok(entries) => store.entries = entries,
                Err(e) => warn!(slot, error = %e, "malformed history slot, starting empty"),
            }
        }
        store.other_slots = root;

        info!(path = %path.display(), count = store.entries.len(), "loaded history");
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All entries, most recent first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a new entry at the front.
    pub fn prepend(&mut self, entry: HistoryEntry) -> Result<(), StoreError> {
        info!(id = %entry.id, file = %entry.file_name, "adding history entry");
        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.push(entry);
        next.extend(self.entries.iter().cloned());
        self.commit(next)
    }

    /// Replace the result of the entry with `id`, keeping its position,
    /// file name and timestamp.
    pub fn replace_result(&mut self, id: &str, result: SettlementResult) -> Result<(), StoreError> {
        let mut next = self.entries.clone();
        let entry = next
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.result = result;
        info!(id, "updated history entry");
        self.commit(next)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        info!(count = self.entries.len(), "clearing history");
        self.commit(Vec::new())
    }

    /// Persist `next`, then adopt it. On a failed write the in-memory list
    /// keeps matching the file.
    fn commit(&mut self, next: Vec<HistoryEntry>) -> Result<(), StoreError> {
        self.persist(&next)?;
        self.entries = next;
        Ok(())
    }

    /// Write the whole file back via a temp file in the same directory.
    fn persist(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut root = self.other_slots.clone();
        root.insert(self.slot.clone(), serde_json::to_value(entries)?);
        let json = serde_json::to_vec_pretty(&Value::Object(root))?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(path)?;
        Ok(())
    }
}
