//! Per-unit management flags and target speeds.
//!
//! The table is never shared on its own: the governor keeps it behind a single
//! mutex and every accessor here assumes the caller holds that lock.

use std::collections::HashMap;

use super::error::Error;
use super::policy::{UnitId, Window};

/// Governor-private state of one attached unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slot {
    /// True while the governor actively controls the unit.
    pub managed: bool,
    /// Last explicitly requested frequency in kHz, 0 while unmanaged.
    pub setspeed: u32,
    /// Limits the governor last acted on: read at start, refreshed by every limit event.
    pub window: Window,
}

/// Attached units keyed by id. Attach inserts a slot, detach removes it.
#[derive(Debug, Default)]
pub struct Units {
    slots: HashMap<UnitId, Slot>,
}

impl Units {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a zeroed slot. Reserving storage is fallible so that an
    /// exhausted allocator surfaces as an error instead of an abort.
    pub fn attach(&mut self, unit: UnitId) -> Result<(), Error> {
        if self.slots.contains_key(&unit) {
            return Err(Error::AlreadyAttached(unit));
        }
        self.slots
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory(unit))?;
        self.slots.insert(unit, Slot::default());
        Ok(())
    }

    pub fn detach(&mut self, unit: UnitId) -> Option<Slot> {
        self.slots.remove(&unit)
    }

    pub fn get(&self, unit: UnitId) -> Option<Slot> {
        self.slots.get(&unit).copied()
    }

    pub fn is_managed(&self, unit: UnitId) -> bool {
        self.slots.get(&unit).map_or(false, |slot| slot.managed)
    }

    /// Stored target of a managed unit, `None` otherwise.
    pub fn setspeed(&self, unit: UnitId) -> Option<u32> {
        self.slots
            .get(&unit)
            .filter(|slot| slot.managed)
            .map(|slot| slot.setspeed)
    }

    /// Marks the unit managed with the given baseline target and limits.
    pub fn manage(&mut self, unit: UnitId, setspeed: u32, window: Window) -> Result<(), Error> {
        let slot = self.slots.get_mut(&unit).ok_or(Error::NotAttached(unit))?;
        slot.managed = true;
        slot.setspeed = setspeed;
        slot.window = window;
        Ok(())
    }

    /// Records the limits a managed unit is being re-clamped against.
    pub fn observe(&mut self, unit: UnitId, window: Window) -> Result<(), Error> {
        match self.slots.get_mut(&unit) {
            Some(slot) if slot.managed => {
                slot.window = window;
                Ok(())
            }
            _ => Err(Error::NotManaged(unit)),
        }
    }

    /// Updates the target of a managed unit.
    pub fn store(&mut self, unit: UnitId, setspeed: u32) -> Result<(), Error> {
        match self.slots.get_mut(&unit) {
            Some(slot) if slot.managed => {
                slot.setspeed = setspeed;
                Ok(())
            }
            _ => Err(Error::NotManaged(unit)),
        }
    }

    /// Clears the flag, the target and the limits. Returns false if the unit is not attached.
    pub fn release(&mut self, unit: UnitId) -> bool {
        match self.slots.get_mut(&unit) {
            Some(slot) => {
                *slot = Slot::default();
                true
            }
            None => false,
        }
    }

    /// Snapshot of every attached unit, ordered by id.
    pub fn snapshot(&self) -> Vec<(UnitId, Slot)> {
        let mut out: Vec<(UnitId, Slot)> =
            self.slots.iter().map(|(id, slot)| (*id, *slot)).collect();
        out.sort_unstable_by_key(|(id, _)| *id);
        out
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
