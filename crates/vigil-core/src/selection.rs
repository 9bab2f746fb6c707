//! Multi-record selection for batch acknowledgment.

use std::collections::BTreeSet;

use crate::record::ClassifiedRecord;

/// The set of record ids picked for a batch, plus whether selection mode is on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active: bool,
    ids: BTreeSet<u64>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn selection mode on, optionally starting from a single id.
    pub fn enter(&mut self, initial: Option<u64>) {
        self.active = true;
        if let Some(id) = initial {
            self.ids = BTreeSet::from([id]);
        }
    }

    /// Turn selection mode off and forget every selected id.
    pub fn exit(&mut self) {
        self.active = false;
        self.ids.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self, id: u64) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn select_all(&mut self, ids: impl IntoIterator<Item = u64>) {
        self.ids.extend(ids);
    }

    pub fn deselect_all(&mut self, ids: impl IntoIterator<Item = u64>) {
        for id in ids {
            self.ids.remove(&id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Selected ids in ascending order.
    pub fn ids(&self) -> Vec<u64> {
        self.ids.iter().copied().collect()
    }

    /// The records of `view` that are currently selected, in `view` order.
    pub fn selected_records<'a>(&self, view: &'a [ClassifiedRecord]) -> Vec<&'a ClassifiedRecord> {
        view.iter().filter(|r| self.contains(r.id())).collect()
    }
}
