//! Reserved key combinations and the read-only policy.
//!
//! A reserved combination is handled by the viewer itself and never reaches
//! the remote desktop, whatever the read-only flag says. Matching is strict:
//! `Ctrl+F8` does not match a reservation of plain `F8`.

use crate::keyboard::{KeyCombo, KeyComboError};
use rfb_session::{ReservedAction, ReservedShortcutConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Parsed reserved key combinations.
#[derive(Debug, Clone, Default)]
pub struct ReservedShortcuts {
    shortcuts: HashMap<KeyCombo, ReservedAction>,
}

impl ReservedShortcuts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every configured combination; the first bad one fails the lot.
    pub fn from_config(entries: &[ReservedShortcutConfig]) -> Result<Self, KeyComboError> {
        let mut shortcuts = Self::new();
        for entry in entries {
            let combo: KeyCombo = entry.keys.parse()?;
            shortcuts.add(combo, entry.action);
        }
        Ok(shortcuts)
    }

    /// Add or replace a reservation.
    pub fn add(&mut self, combo: KeyCombo, action: ReservedAction) {
        debug!("Reserving {} for {:?}", combo, action);
        self.shortcuts.insert(combo, action);
    }

    pub fn remove(&mut self, combo: &KeyCombo) -> Option<ReservedAction> {
        self.shortcuts.remove(combo)
    }

    pub fn lookup(&self, combo: &KeyCombo) -> Option<ReservedAction> {
        let found = self.shortcuts.get(combo).copied();
        if let Some(action) = found {
            trace!("{} is reserved for {:?}", combo, action);
        }
        found
    }

    /// Combinations bound to `action`, for menus and help text.
    pub fn combos_for(&self, action: ReservedAction) -> Vec<KeyCombo> {
        let mut combos: Vec<KeyCombo> = self
            .shortcuts
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|(c, _)| *c)
            .collect();
        combos.sort_by_key(|c| (c.modifiers.bits(), c.keysym));
        combos
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }
}

/// Shared read-only flag.
///
/// Clones observe the same value, so the host UI and the forwarder can hold
/// one each.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyFlag(Arc<AtomicBool>);

impl ReadOnlyFlag {
    pub fn new(read_only: bool) -> Self {
        Self(Arc::new(AtomicBool::new(read_only)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, read_only: bool) {
        self.0.store(read_only, Ordering::Release);
    }

    /// Flip the flag and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

/// Read-only flag plus the combinations that are never forwarded.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyPolicy {
    pub flag: ReadOnlyFlag,
    pub reserved: ReservedShortcuts,
}

impl ReadOnlyPolicy {
    pub fn new(flag: ReadOnlyFlag, reserved: ReservedShortcuts) -> Self {
        Self { flag, reserved }
    }

    /// Build from the input section of the viewer configuration.
    pub fn from_config(
        read_only: bool,
        reserved: &[ReservedShortcutConfig],
    ) -> Result<Self, KeyComboError> {
        Ok(Self::new(
            ReadOnlyFlag::new(read_only),
            ReservedShortcuts::from_config(reserved)?,
        ))
    }

    pub fn is_read_only(&self) -> bool {
        self.flag.get()
    }
}
