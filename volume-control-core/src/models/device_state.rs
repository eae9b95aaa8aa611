use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Endpoint state bit-set.
///
/// Bit values match the Windows `DEVICE_STATE_*` constants so persisted masks
/// and native values can be passed through unchanged. `ACCESS_ERROR` is
/// outside the Windows range and marks endpoints that enumerate but cannot
/// be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(u32);

impl DeviceState {
    pub const ACTIVE: Self = Self(0x1);
    pub const DISABLED: Self = Self(0x2);
    pub const NOT_PRESENT: Self = Self(0x4);
    pub const UNPLUGGED: Self = Self(0x8);
    pub const ACCESS_ERROR: Self = Self(0x10);

    /// Every state the native layer can report (`DEVICE_STATEMASK_ALL`).
    pub const ALL: Self = Self(0xF);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_active(self) -> bool {
        self.contains(Self::ACTIVE)
    }
}

impl BitOr for DeviceState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DeviceState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DeviceState {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(DeviceState, &str); 5] = [
            (DeviceState::ACTIVE, "Active"),
            (DeviceState::DISABLED, "Disabled"),
            (DeviceState::NOT_PRESENT, "NotPresent"),
            (DeviceState::UNPLUGGED, "Unplugged"),
            (DeviceState::ACCESS_ERROR, "AccessError"),
        ];

        if self.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_match_windows() {
        assert_eq!(DeviceState::ACTIVE.bits(), 1);
        assert_eq!(DeviceState::DISABLED.bits(), 2);
        assert_eq!(DeviceState::NOT_PRESENT.bits(), 4);
        assert_eq!(DeviceState::UNPLUGGED.bits(), 8);
        assert_eq!(DeviceState::ALL.bits(), 0xF);
    }

    #[test]
    fn mask_operations() {
        let mask = DeviceState::ACTIVE | DeviceState::DISABLED;
        assert!(mask.contains(DeviceState::ACTIVE));
        assert!(mask.intersects(DeviceState::DISABLED | DeviceState::UNPLUGGED));
        assert!(!mask.intersects(DeviceState::UNPLUGGED));
        assert_eq!(mask & DeviceState::DISABLED, DeviceState::DISABLED);
        assert!(DeviceState::ALL.contains(mask));
    }

    #[test]
    fn display_lists_flags() {
        assert_eq!(DeviceState::empty().to_string(), "None");
        assert_eq!(DeviceState::UNPLUGGED.to_string(), "Unplugged");
        assert_eq!(
            (DeviceState::ACTIVE | DeviceState::ACCESS_ERROR).to_string(),
            "Active|AccessError"
        );
    }

    #[test]
    fn serializes_as_raw_bits() {
        let json = serde_json::to_string(&(DeviceState::ACTIVE | DeviceState::DISABLED)).unwrap();
        assert_eq!(json, "3");
        let back: DeviceState = serde_json::from_str("8").unwrap();
        assert_eq!(back, DeviceState::UNPLUGGED);
    }
}
