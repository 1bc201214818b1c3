//! Structural hit-box of a section.  Every section carries a [`SlotLayout`] with one slot per point of maximum
//! structure, and equipment ([`MountedSystem`]) occupies contiguous runs of those slots.  Critical hits pick a slot and
//! degrade whatever sits there.
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SystemType {
  Engine = 0,
  Weapon,
  Reactor,
  Radiator,
  Sensor,
  Magazine,
  Turret,
  Bridge,
  FuelTank,
  LifeSupport,
}

/// Health of a mounted system.  Ordered so that a "worse" state compares greater.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SystemState {
  #[default]
  Operational,
  Damaged,
  Destroyed,
}

impl SystemState {
  /// The state one critical hit moves to, or `None` if there is nothing left to break.
  #[must_use]
  pub fn degraded(self) -> Option<SystemState> {
    match self {
      SystemState::Operational => Some(SystemState::Damaged),
      SystemState::Damaged => Some(SystemState::Destroyed),
      SystemState::Destroyed => None,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MountedSystem {
  system_type: SystemType,
  slot_start: u32,
  slot_end: u32,
  #[serde(default)]
  state: SystemState,
}

impl MountedSystem {
  /// Create an operational system covering the inclusive slot range `slot_start..=slot_end`.  Range validity is
  /// checked when the system is mounted into a [`SlotLayout`].
  #[must_use]
  pub fn new(system_type: SystemType, slot_start: u32, slot_end: u32) -> Self {
    MountedSystem {
      system_type,
      slot_start,
      slot_end,
      state: SystemState::Operational,
    }
  }

  /// Create an operational system of `size` slots starting at `slot_start`.
  #[must_use]
  pub fn with_size(system_type: SystemType, slot_start: u32, size: u32) -> Self {
    MountedSystem::new(system_type, slot_start, slot_start.saturating_add(size).saturating_sub(1))
  }

  #[must_use]
  pub fn system_type(&self) -> SystemType {
    self.system_type
  }

  #[must_use]
  pub fn slot_start(&self) -> u32 {
    self.slot_start
  }

  #[must_use]
  pub fn slot_end(&self) -> u32 {
    self.slot_end
  }

  #[must_use]
  pub fn size(&self) -> u32 {
    self.slot_end.saturating_add(1).saturating_sub(self.slot_start)
  }

  #[must_use]
  pub fn state(&self) -> SystemState {
    self.state
  }

  #[must_use]
  pub fn is_operational(&self) -> bool {
    self.state == SystemState::Operational
  }

  #[must_use]
  pub fn contains(&self, slot: u32) -> bool {
    (self.slot_start..=self.slot_end).contains(&slot)
  }

  /// Advance the state one step toward destroyed.
  ///
  /// # Returns
  /// `true` if the state changed, `false` if the system was already destroyed (the hit is absorbed by the wreckage).
  pub fn take_critical_hit(&mut self) -> bool {
    match self.state.degraded() {
      Some(next) => {
        self.state = next;
        true
      }
      None => false,
    }
  }

  /// Restore to operational.  Only used by section reset and tooling, never during combat resolution.
  pub fn repair(&mut self) {
    self.state = SystemState::Operational;
  }

  fn is_well_formed(&self) -> bool {
    self.slot_start >= 1 && self.slot_end >= self.slot_start
  }
}

/// Fixed-size, 1-indexed array of slots.
///
/// Systems are kept sorted by `slot_start` with no overlaps, so the occupant of any slot is found with a binary search.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(try_from = "RawSlotLayout")]
pub struct SlotLayout {
  total_slots: u32,
  systems: Vec<MountedSystem>,
}

// Deserialization goes through here so persisted layouts get the same validation as freshly mounted ones.
#[derive(Deserialize)]
struct RawSlotLayout {
  total_slots: u32,
  #[serde(default)]
  systems: Vec<MountedSystem>,
}

impl TryFrom<RawSlotLayout> for SlotLayout {
  type Error = LayoutError;

  fn try_from(raw: RawSlotLayout) -> Result<Self, Self::Error> {
    let mut layout = SlotLayout::new(raw.total_slots);
    for system in raw.systems {
      layout.mount(system)?;
    }
    Ok(layout)
  }
}

impl SlotLayout {
  #[must_use]
  pub fn new(total_slots: u32) -> Self {
    SlotLayout {
      total_slots,
      systems: Vec::new(),
    }
  }

  /// Place a system into the layout.
  ///
  /// # Errors
  /// Returns a [`LayoutError`] if the system's range is empty, runs past the end of the layout, or overlaps a system
  /// already mounted.  The layout is unchanged on error.
  pub fn mount(&mut self, system: MountedSystem) -> Result<(), LayoutError> {
    if !system.is_well_formed() {
      return Err(LayoutError::EmptyRange {
        system_type: system.system_type,
        slot_start: system.slot_start,
        slot_end: system.slot_end,
      });
    }

    if system.slot_end > self.total_slots {
      return Err(LayoutError::OutOfRange {
        system_type: system.system_type,
        slot_end: system.slot_end,
        total_slots: self.total_slots,
      });
    }

    if let Some(existing) = self
      .systems
      .iter()
      .find(|s| s.slot_start <= system.slot_end && system.slot_start <= s.slot_end)
    {
      return Err(LayoutError::Overlap {
        system_type: system.system_type,
        existing: existing.system_type,
        slot: u32::max(existing.slot_start, system.slot_start),
      });
    }

    let index = self.systems.partition_point(|s| s.slot_start < system.slot_start);
    self.systems.insert(index, system);
    Ok(())
  }

  #[must_use]
  pub fn total_slots(&self) -> u32 {
    self.total_slots
  }

  #[must_use]
  pub fn systems(&self) -> &[MountedSystem] {
    &self.systems
  }

  fn index_of_slot(&self, slot: u32) -> Option<usize> {
    if slot == 0 || slot > self.total_slots {
      return None;
    }
    let after = self.systems.partition_point(|s| s.slot_start <= slot);
    after.checked_sub(1).filter(|&index| self.systems[index].contains(slot))
  }

  /// The system occupying `slot`, or `None` for an empty or out of range slot.
  #[must_use]
  pub fn system_at_slot(&self, slot: u32) -> Option<&MountedSystem> {
    self.index_of_slot(slot).map(|index| &self.systems[index])
  }

  pub fn system_at_slot_mut(&mut self, slot: u32) -> Option<&mut MountedSystem> {
    self.index_of_slot(slot).map(|index| &mut self.systems[index])
  }

  #[must_use]
  pub fn occupied_slot_count(&self) -> u32 {
    self.systems.iter().map(MountedSystem::size).sum()
  }

  #[must_use]
  pub fn free_slot_count(&self) -> u32 {
    self.total_slots - self.occupied_slot_count()
  }

  #[must_use]
  pub fn count_in_state(&self, state: SystemState) -> usize {
    self.systems.iter().filter(|s| s.state == state).count()
  }

  pub fn repair_all(&mut self) {
    for system in &mut self.systems {
      system.repair();
    }
  }
}
