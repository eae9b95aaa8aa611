use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::error::ControlError;
use crate::models::target::{SelectionSnapshot, Subject};
use crate::registry::RefreshSummary;

/// Event delegate for registry, selection and action notifications.
///
/// Methods are called on whichever thread caused the event (refresh worker,
/// OS notification thread or the hotkey thread). Implementations should
/// marshal to the UI thread if needed.
pub trait AudioDelegate: Send + Sync {
    /// Called after a device refresh commits.
    fn on_refreshed(&self, summary: &RefreshSummary);

    /// Called when the selected device, session or lock state changes.
    fn on_selection_changed(&self, selection: &SelectionSnapshot);

    /// Called after an action handler returns successfully.
    fn on_action_completed(&self, name: &str, subject: Subject);

    /// Called when an action handler fails or panics.
    fn on_action_failed(&self, error: &ControlError);
}

/// Shared, replaceable delegate reference.
///
/// Cloned into the registry and the selector so one `set` reaches both.
#[derive(Clone, Default)]
pub struct DelegateSlot {
    inner: Arc<RwLock<Option<Arc<dyn AudioDelegate>>>>,
}

impl DelegateSlot {
    pub fn set(&self, delegate: Arc<dyn AudioDelegate>) {
        *self.inner.write() = Some(delegate);
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Run `f` against the current delegate, outside the slot lock.
    pub(crate) fn notify(&self, f: impl FnOnce(&dyn AudioDelegate)) {
        let delegate = self.inner.read().clone();
        if let Some(delegate) = delegate {
            f(delegate.as_ref());
        }
    }
}
