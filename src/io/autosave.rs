use std::time::{Duration, Instant};

use crate::io::board_io::BoardPersistence;
use crate::store::BoardStore;

/// Debounced saving keyed on the store's revision counter.
///
/// Each committed mutation calls `note`; `tick` saves once the board has
/// been quiet for the debounce window. A save always writes the board as it
/// is at that moment, so an older revision can never land after a newer one.
#[derive(Debug)]
pub struct Autosave {
    debounce: Duration,
    due: Option<Instant>,
    saved_revision: u64,
}

impl Autosave {
    /// `saved_revision` is the store revision already on disk
    pub fn new(debounce: Duration, saved_revision: u64) -> Self {
        Autosave {
            debounce,
            due: None,
            saved_revision,
        }
    }

    /// Record a mutation. Restarts the debounce window.
    pub fn note(&mut self, now: Instant) {
        self.due = Some(now + self.debounce);
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn saved_revision(&self) -> u64 {
        self.saved_revision
    }

    /// Save if the debounce window has passed. Returns true if a save
    /// happened. Failed saves stay pending and are retried on a later tick.
    pub fn tick(
        &mut self,
        store: &BoardStore,
        persistence: &mut impl BoardPersistence,
        now: Instant,
    ) -> bool {
        match self.due {
            Some(due) if now >= due => self.save(store, persistence, now),
            _ => false,
        }
    }

    /// Save right away if anything is unsaved
    pub fn flush(&mut self, store: &BoardStore, persistence: &mut impl BoardPersistence) -> bool {
        if self.due.is_none() && store.revision() == self.saved_revision {
            return false;
        }
        self.save(store, persistence, Instant::now())
    }

    fn save(
        &mut self,
        store: &BoardStore,
        persistence: &mut impl BoardPersistence,
        now: Instant,
    ) -> bool {
        if store.is_previewing() {
            // Mid-drag boards are provisional; wait for the drop.
            self.due = Some(now + self.debounce);
            return false;
        }
        let revision = store.revision();
        if revision == self.saved_revision {
            self.due = None;
            return false;
        }
        match persistence.save(store.board()) {
            Ok(()) => {
                self.saved_revision = revision;
                self.due = None;
                true
            }
            Err(e) => {
                tracing::warn!(revision, error = %e, "board save failed, will retry");
                self.due = Some(now + self.debounce);
                false
            }
        }
    }
}
