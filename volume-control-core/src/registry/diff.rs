//! Identifier-keyed diffing of native enumerations against cached entries.
//!
//! Unchanged entries keep their `Arc`, so references held by callers stay
//! pointer-equal across refreshes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::audio_models::{DeviceInfo, SessionInfo};
use crate::traits::native_gateway::{NativeDevice, NativeSession};

/// Outcome of a device refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl RefreshSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

pub(crate) fn diff_devices(
    current: &[Arc<DeviceInfo>],
    native: Vec<NativeDevice>,
) -> (Vec<Arc<DeviceInfo>>, RefreshSummary) {
    let existing: HashMap<&str, &Arc<DeviceInfo>> =
        current.iter().map(|d| (d.id.as_str(), d)).collect();
    let mut seen = HashSet::new();
    let mut devices = Vec::with_capacity(native.len());
    let mut summary = RefreshSummary::default();

    for device in native {
        if !seen.insert(device.id.clone()) {
            log::debug!("Ignoring duplicate endpoint {} in enumeration", device.id);
            continue;
        }
        let fresh = DeviceInfo::from_native(device);
        match existing.get(fresh.id.as_str()) {
            Some(old) if ***old == fresh => devices.push(Arc::clone(old)),
            Some(_) => {
                summary.changed.push(fresh.id.clone());
                devices.push(Arc::new(fresh));
            }
            None => {
                summary.added.push(fresh.id.clone());
                devices.push(Arc::new(fresh));
            }
        }
    }

    summary.removed = current
        .iter()
        .filter(|d| !seen.contains(&d.id))
        .map(|d| d.id.clone())
        .collect();

    (devices, summary)
}

pub(crate) fn diff_sessions(
    device_id: &str,
    current: &[Arc<SessionInfo>],
    native: Vec<NativeSession>,
) -> Vec<Arc<SessionInfo>> {
    let existing: HashMap<&str, &Arc<SessionInfo>> =
        current.iter().map(|s| (s.instance_id.as_str(), s)).collect();
    let mut seen = HashSet::new();

    native
        .into_iter()
        .filter(|s| seen.insert(s.instance_id.clone()))
        .map(|s| {
            let fresh = SessionInfo::from_native(device_id, s);
            match existing.get(fresh.instance_id.as_str()) {
                Some(old) if ***old == fresh => Arc::clone(old),
                _ => Arc::new(fresh),
            }
        })
        .collect()
}
