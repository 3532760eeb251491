use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

/// Named choices made by the operator, e.g. which domain to farm.
///
/// Cloning yields a handle to the same board. An unset slot means the
/// operator has not chosen yet.
#[derive(Debug, Clone, Default)]
pub struct SelectionBoard {
    slots: Arc<RwLock<IndexMap<String, String>>>,
}

impl SelectionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<String> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slot)
            .cloned()
    }

    pub fn set(&self, slot: impl Into<String>, value: impl Into<String>) {
        let (slot, value) = (slot.into(), value.into());
        tracing::info!("Selected {} = {}", slot, value);
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, value);
    }

    pub fn clear(&self, slot: &str) -> Option<String> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(slot)
    }

    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
