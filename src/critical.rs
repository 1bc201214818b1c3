//! Critical hit resolution.  Structural damage always risks hitting equipment: a slot is drawn uniformly from the
//! section's layout and whatever occupies it is degraded one step.  Because the layout has one slot per point of max
//! structure, tougher sections dilute the chance that any given hit finds equipment.
use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::section::SectionType;
use crate::slots::{SlotLayout, SystemState, SystemType};
use crate::{debug, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum CriticalOutcome {
  /// Nothing mounted at the rolled slot.
  EmptySlot,
  /// The occupying system degraded from `previous_state` to `new_state`.
  SystemHit {
    system_type: SystemType,
    slot_start: u32,
    slot_end: u32,
    previous_state: SystemState,
    new_state: SystemState,
  },
  /// The occupying system was already destroyed so the hit did nothing.
  DestroyedSystemAbsorbed {
    system_type: SystemType,
    slot_start: u32,
    slot_end: u32,
  },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CriticalHitResult {
  pub rolled_slot: u32,
  pub total_slots: u32,
  pub section_type: SectionType,
  pub outcome: CriticalOutcome,
}

impl CriticalHitResult {
  /// True only if a system changed state.
  #[must_use]
  pub fn hit_system(&self) -> bool {
    matches!(self.outcome, CriticalOutcome::SystemHit { .. })
  }

  #[must_use]
  pub fn is_empty_slot(&self) -> bool {
    matches!(self.outcome, CriticalOutcome::EmptySlot)
  }

  #[must_use]
  pub fn was_absorbed(&self) -> bool {
    matches!(self.outcome, CriticalOutcome::DestroyedSystemAbsorbed { .. })
  }

  /// True if this roll is the one that destroyed a system.
  #[must_use]
  pub fn destroyed_system(&self) -> bool {
    matches!(
      self.outcome,
      CriticalOutcome::SystemHit {
        new_state: SystemState::Destroyed,
        ..
      }
    )
  }

  /// The system at the rolled slot, whether or not it changed.
  #[must_use]
  pub fn system_type(&self) -> Option<SystemType> {
    match self.outcome {
      CriticalOutcome::EmptySlot => None,
      CriticalOutcome::SystemHit { system_type, .. } | CriticalOutcome::DestroyedSystemAbsorbed { system_type, .. } => {
        Some(system_type)
      }
    }
  }
}

impl fmt::Display for CriticalHitResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "critical roll on {} slot {}/{}: ",
      String::from(self.section_type),
      self.rolled_slot,
      self.total_slots
    )?;
    match &self.outcome {
      CriticalOutcome::EmptySlot => write!(f, "empty slot"),
      CriticalOutcome::SystemHit {
        system_type,
        previous_state,
        new_state,
        ..
      } => write!(f, "{system_type:?} {previous_state:?} -> {new_state:?}"),
      CriticalOutcome::DestroyedSystemAbsorbed { system_type, .. } => {
        write!(f, "{system_type:?} already destroyed")
      }
    }
  }
}

/// Rolls critical hits and keeps running statistics.  Stateless apart from the counters; the random source is passed
/// in on every roll so the caller controls draw order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalHitSystem {
  total_rolls: u64,
  system_hits: u64,
  empty_hits: u64,
  absorbed_hits: u64,
}

impl CriticalHitSystem {
  #[must_use]
  pub fn new() -> Self {
    CriticalHitSystem::default()
  }

  /// Draw a slot uniformly from `1..=total_slots` and apply the hit.
  ///
  /// # Returns
  /// The itemized result, or `None` if the layout has no slots at all (nothing to roll against).
  pub fn roll_critical(
    &mut self, layout: &mut SlotLayout, section_type: SectionType, rng: &mut dyn RngCore,
  ) -> Option<CriticalHitResult> {
    let total_slots = layout.total_slots();
    if total_slots == 0 {
      debug!("(CriticalHitSystem.roll_critical) {section_type:?} has no slots, skipping critical roll.");
      return None;
    }

    let slot = rng.gen_range(1..=total_slots);
    debug!("(CriticalHitSystem.roll_critical) {section_type:?} rolled slot {slot} of {total_slots}.");
    Some(self.resolve(layout, slot, section_type))
  }

  /// Apply a critical hit to a chosen slot instead of a random one.  For deterministic tests and debug tooling.
  ///
  /// # Returns
  /// The same result a random roll of `slot` would produce, or `None` if `slot` is outside the layout.
  pub fn force_critical(
    &mut self, layout: &mut SlotLayout, slot: u32, section_type: SectionType,
  ) -> Option<CriticalHitResult> {
    if slot == 0 || slot > layout.total_slots() {
      warn!(
        "(CriticalHitSystem.force_critical) Slot {slot} is outside {section_type:?} layout of {} slots.",
        layout.total_slots()
      );
      return None;
    }
    Some(self.resolve(layout, slot, section_type))
  }

  fn resolve(&mut self, layout: &mut SlotLayout, slot: u32, section_type: SectionType) -> CriticalHitResult {
    self.total_rolls += 1;
    let total_slots = layout.total_slots();

    let outcome = match layout.system_at_slot_mut(slot) {
      None => {
        self.empty_hits += 1;
        CriticalOutcome::EmptySlot
      }
      Some(system) => {
        let previous_state = system.state();
        if system.take_critical_hit() {
          self.system_hits += 1;
          CriticalOutcome::SystemHit {
            system_type: system.system_type(),
            slot_start: system.slot_start(),
            slot_end: system.slot_end(),
            previous_state,
            new_state: system.state(),
          }
        } else {
          self.absorbed_hits += 1;
          CriticalOutcome::DestroyedSystemAbsorbed {
            system_type: system.system_type(),
            slot_start: system.slot_start(),
            slot_end: system.slot_end(),
          }
        }
      }
    };

    let result = CriticalHitResult {
      rolled_slot: slot,
      total_slots,
      section_type,
      outcome,
    };
    debug!("(CriticalHitSystem.resolve) {result}");
    result
  }

  #[must_use]
  pub fn total_rolls(&self) -> u64 {
    self.total_rolls
  }

  #[must_use]
  pub fn system_hits(&self) -> u64 {
    self.system_hits
  }

  #[must_use]
  pub fn empty_hits(&self) -> u64 {
    self.empty_hits
  }

  /// Rolls that landed on already destroyed equipment.
  #[must_use]
  pub fn absorbed_hits(&self) -> u64 {
    self.absorbed_hits
  }

  /// Fraction of rolls that changed a system's state.
  #[must_use]
  #[allow(clippy::cast_precision_loss)]
  pub fn hit_rate(&self) -> f64 {
    if self.total_rolls == 0 {
      0.0
    } else {
      self.system_hits as f64 / self.total_rolls as f64
    }
  }

  pub fn reset_statistics(&mut self) {
    *self = CriticalHitSystem::default();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::slots::MountedSystem;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn half_full_layout() -> SlotLayout {
    let mut layout = SlotLayout::new(10);
    layout.mount(MountedSystem::new(SystemType::Engine, 1, 3)).unwrap();
    layout.mount(MountedSystem::new(SystemType::Magazine, 6, 7)).unwrap();
    layout
  }

  #[test_log::test]
  fn test_force_critical_outcomes() {
    let mut crits = CriticalHitSystem::new();
    let mut layout = half_full_layout();

    let miss = crits.force_critical(&mut layout, 4, SectionType::Aft).unwrap();
    assert!(miss.is_empty_slot());
    assert_eq!(miss.rolled_slot, 4);
    assert_eq!(miss.total_slots, 10);
    assert_eq!(miss.section_type, SectionType::Aft);
    assert_eq!(miss.system_type(), None);

    let first = crits.force_critical(&mut layout, 2, SectionType::Aft).unwrap();
    assert_eq!(
      first.outcome,
      CriticalOutcome::SystemHit {
        system_type: SystemType::Engine,
        slot_start: 1,
        slot_end: 3,
        previous_state: SystemState::Operational,
        new_state: SystemState::Damaged,
      }
    );
    assert!(!first.destroyed_system());

    let second = crits.force_critical(&mut layout, 3, SectionType::Aft).unwrap();
    assert!(second.destroyed_system());
    assert_eq!(layout.system_at_slot(1).unwrap().state(), SystemState::Destroyed);

    let third = crits.force_critical(&mut layout, 1, SectionType::Aft).unwrap();
    assert!(third.was_absorbed());
    assert!(!third.hit_system());
    assert_eq!(third.system_type(), Some(SystemType::Engine));

    assert_eq!(crits.total_rolls(), 4);
    assert_eq!(crits.system_hits(), 2);
    assert_eq!(crits.empty_hits(), 1);
    assert_eq!(crits.absorbed_hits(), 1);
    approx::assert_relative_eq!(crits.hit_rate(), 0.5);

    crits.reset_statistics();
    assert_eq!(crits, CriticalHitSystem::new());
  }

  #[test]
  fn test_force_critical_out_of_range() {
    let mut crits = CriticalHitSystem::new();
    let mut layout = half_full_layout();
    assert!(crits.force_critical(&mut layout, 0, SectionType::Fore).is_none());
    assert!(crits.force_critical(&mut layout, 11, SectionType::Fore).is_none());
    assert_eq!(crits.total_rolls(), 0);
  }

  #[test]
  fn test_roll_on_empty_layout() {
    let mut crits = CriticalHitSystem::new();
    let mut layout = SlotLayout::new(0);
    let mut rng = StdRng::seed_from_u64(1);
    assert!(crits.roll_critical(&mut layout, SectionType::Dorsal, &mut rng).is_none());
    assert_eq!(crits.total_rolls(), 0);
  }

  #[test_log::test]
  fn test_random_roll_matches_forced_roll() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..50 {
      let mut rolled_layout = half_full_layout();
      let mut forced_layout = half_full_layout();
      let mut crits = CriticalHitSystem::new();

      let rolled = crits
        .roll_critical(&mut rolled_layout, SectionType::Port, &mut rng)
        .unwrap();
      assert!((1..=10).contains(&rolled.rolled_slot));

      let forced = crits
        .force_critical(&mut forced_layout, rolled.rolled_slot, SectionType::Port)
        .unwrap();
      assert_eq!(rolled, forced);
      assert_eq!(rolled_layout, forced_layout);
    }
  }

  #[test]
  fn test_same_seed_replays_identically() {
    let run = |seed: u64| {
      let mut rng = StdRng::seed_from_u64(seed);
      let mut crits = CriticalHitSystem::new();
      let mut layout = half_full_layout();
      let results: Vec<CriticalHitResult> = (0..20)
        .filter_map(|_| crits.roll_critical(&mut layout, SectionType::Ventral, &mut rng))
        .collect();
      (results, layout, crits)
    };

    assert_eq!(run(7), run(7));
  }

  #[test]
  fn test_roll_distribution_covers_all_slots() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut crits = CriticalHitSystem::new();
    let mut layout = SlotLayout::new(6);
    let mut seen = [false; 6];

    for _ in 0..200 {
      let result = crits.roll_critical(&mut layout, SectionType::Fore, &mut rng).unwrap();
      seen[result.rolled_slot as usize - 1] = true;
    }

    assert!(seen.iter().all(|s| *s), "Every slot should be drawn eventually: {seen:?}");
    assert_eq!(crits.empty_hits(), 200);
  }
}
