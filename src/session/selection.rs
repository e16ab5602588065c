//! Row selection keyed by stable vehicle identity.

use crate::api::{Vehicle, VehicleKey};
use std::collections::BTreeSet;

/// Set of selected vehicle keys.
///
/// Keys survive re-fetches: a selected vehicle absent from the current
/// snapshot stays selected and is reported as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: BTreeSet<VehicleKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key was newly selected.
    pub fn select(&mut self, key: VehicleKey) -> bool {
        self.keys.insert(key)
    }

    /// Returns true if the key was selected.
    pub fn deselect(&mut self, key: &VehicleKey) -> bool {
        self.keys.remove(key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn contains(&self, key: &VehicleKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Selected records present in `snapshot`, in snapshot order.
    pub fn resolve<'a>(&self, snapshot: &'a [Vehicle]) -> Vec<&'a Vehicle> {
        snapshot.iter().filter(|v| self.keys.contains(&v.key)).collect()
    }

    /// Number of selected keys with no record in `snapshot`.
    pub fn missing(&self, snapshot: &[Vehicle]) -> usize {
        self.keys.iter().filter(|key| !snapshot.iter().any(|v| &v.key == *key)).count()
    }
}
