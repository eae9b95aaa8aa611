//! Hotkey id to action binding table.
//!
//! The keyboard hook lives in the host; this table only turns the id it
//! reports into a [`HotkeyPressed`] for the action registry.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::hotkey::{HotkeyBinding, HotkeyId, HotkeyPressed};

#[derive(Debug, Default)]
pub struct HotkeyManager {
    bindings: RwLock<HashMap<HotkeyId, HotkeyBinding>>,
}

impl HotkeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a hotkey, returning the binding it replaced.
    pub fn bind(&self, binding: HotkeyBinding) -> Option<HotkeyBinding> {
        log::debug!("Hotkey {} -> '{}'", binding.id, binding.action);
        self.bindings.write().insert(binding.id, binding)
    }

    pub fn unbind(&self, id: HotkeyId) -> Option<HotkeyBinding> {
        self.bindings.write().remove(&id)
    }

    pub fn binding(&self, id: HotkeyId) -> Option<HotkeyBinding> {
        self.bindings.read().get(&id).cloned()
    }

    /// All bindings, ordered by hotkey id.
    pub fn bindings(&self) -> Vec<HotkeyBinding> {
        let mut all: Vec<HotkeyBinding> = self.bindings.read().values().cloned().collect();
        all.sort_by_key(|b| b.id);
        all
    }

    /// Replace the whole table. Later entries win over earlier ones with the
    /// same id.
    pub fn load(&self, bindings: Vec<HotkeyBinding>) {
        let table: HashMap<HotkeyId, HotkeyBinding> =
            bindings.into_iter().map(|b| (b.id, b)).collect();
        log::info!("Loaded {} hotkey bindings", table.len());
        *self.bindings.write() = table;
    }

    /// Event for a fired hotkey, or `None` when the id is not bound.
    pub fn event_for(&self, id: HotkeyId) -> Option<HotkeyPressed> {
        self.bindings.read().get(&id).map(HotkeyPressed::from_binding)
    }
}
