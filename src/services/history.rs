use crate::models::image_types::{HistoryEntry, ImageRef};
use std::collections::VecDeque;

/// Most-recent-first record of every selection. Unbounded, never deduplicated.
#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    next_seq: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, image: ImageRef) -> &HistoryEntry {
        let entry = HistoryEntry {
            image,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.push_front(entry);
        &self.entries[0]
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}
