use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use strum_macros::FromRepr;

use crate::config::SectionConfig;
use crate::critical::{CriticalHitResult, CriticalHitSystem};
use crate::error::{LayoutError, ParseSectionError, SectionStateError};
use crate::events::DamageEvent;
use crate::slots::{MountedSystem, SlotLayout};
use crate::{debug, info};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr)]
pub enum SectionType {
  Fore = 0,
  Aft,
  Port,
  Starboard,
  Dorsal,
  Ventral,
  Core,
}

impl SectionType {
  pub const ALL: [SectionType; 7] = [
    SectionType::Fore,
    SectionType::Aft,
    SectionType::Port,
    SectionType::Starboard,
    SectionType::Dorsal,
    SectionType::Ventral,
    SectionType::Core,
  ];

  /// Every section except Core, in a fixed order used for fallback selection.
  pub const OUTER: [SectionType; 6] = [
    SectionType::Fore,
    SectionType::Aft,
    SectionType::Port,
    SectionType::Starboard,
    SectionType::Dorsal,
    SectionType::Ventral,
  ];

  #[must_use]
  pub fn is_core(self) -> bool {
    self == SectionType::Core
  }
}

impl From<SectionType> for String {
  fn from(s: SectionType) -> Self {
    match s {
      SectionType::Fore => "fore".to_string(),
      SectionType::Aft => "aft".to_string(),
      SectionType::Port => "port".to_string(),
      SectionType::Starboard => "starboard".to_string(),
      SectionType::Dorsal => "dorsal".to_string(),
      SectionType::Ventral => "ventral".to_string(),
      SectionType::Core => "core".to_string(),
    }
  }
}

impl FromStr for SectionType {
  type Err = ParseSectionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    SectionType::ALL
      .into_iter()
      .find(|section| String::from(*section).eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| ParseSectionError(s.to_string()))
  }
}

/// Itemized outcome of one [`ShipSection::apply_damage`] call.
///
/// Every unit of `incoming` lands in exactly one of `armor_damage`, `structure_damage` or `overflow_damage`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DamageResult {
  pub section_type: SectionType,
  pub incoming: f64,
  pub armor_damage: f64,
  pub structure_damage: f64,
  pub overflow_damage: f64,
  pub armor_broken: bool,
  pub section_breached: bool,
  pub was_already_breached: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub critical: Option<CriticalHitResult>,
}

impl DamageResult {
  fn nothing(section_type: SectionType) -> Self {
    DamageResult {
      section_type,
      incoming: 0.0,
      armor_damage: 0.0,
      structure_damage: 0.0,
      overflow_damage: 0.0,
      armor_broken: false,
      section_breached: false,
      was_already_breached: false,
      critical: None,
    }
  }

  /// Damage the section actually soaked up (armor plus structure).
  #[must_use]
  pub fn absorbed(&self) -> f64 {
    self.armor_damage + self.structure_damage
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawShipSection")]
pub struct ShipSection {
  section_type: SectionType,
  max_armor: f64,
  current_armor: f64,
  max_structure: f64,
  current_structure: f64,
  #[serde(default)]
  is_breached: bool,
  layout: SlotLayout,
}

// Persisted sections are checked against the same bounds damage keeps them in.
#[derive(Deserialize)]
struct RawShipSection {
  section_type: SectionType,
  max_armor: f64,
  current_armor: f64,
  max_structure: f64,
  current_structure: f64,
  #[serde(default)]
  is_breached: bool,
  layout: SlotLayout,
}

impl TryFrom<RawShipSection> for ShipSection {
  type Error = SectionStateError;

  fn try_from(raw: RawShipSection) -> Result<Self, Self::Error> {
    let section = raw.section_type;
    for (field, value) in [
      ("max_armor", raw.max_armor),
      ("current_armor", raw.current_armor),
      ("max_structure", raw.max_structure),
      ("current_structure", raw.current_structure),
    ] {
      if !value.is_finite() || value < 0.0 {
        return Err(SectionStateError::InvalidValue { section, field, value });
      }
    }

    for (field, current, max) in [
      ("current_armor", raw.current_armor, raw.max_armor),
      ("current_structure", raw.current_structure, raw.max_structure),
    ] {
      if current > max {
        return Err(SectionStateError::AboveMax {
          section,
          field,
          current,
          max,
        });
      }
    }

    let expected = slots_for_structure(raw.max_structure);
    if raw.layout.total_slots() != expected {
      return Err(SectionStateError::SlotMismatch {
        section,
        total_slots: raw.layout.total_slots(),
        expected,
      });
    }

    Ok(ShipSection {
      section_type: raw.section_type,
      max_armor: raw.max_armor,
      current_armor: raw.current_armor,
      max_structure: raw.max_structure,
      current_structure: raw.current_structure,
      is_breached: raw.is_breached,
      layout: raw.layout,
    })
  }
}

/// One slot per whole point of structure.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn slots_for_structure(max_structure: f64) -> u32 {
  if max_structure.is_nan() || max_structure < 1.0 {
    0
  } else {
    max_structure.floor().min(f64::from(u32::MAX)) as u32
  }
}

fn non_negative(value: f64) -> f64 {
  if value.is_nan() {
    0.0
  } else {
    value.max(0.0)
  }
}

impl ShipSection {
  /// Create an undamaged section with an empty slot layout sized to its structure.
  #[must_use]
  pub fn new(section_type: SectionType, max_armor: f64, max_structure: f64) -> Self {
    let max_armor = non_negative(max_armor);
    let max_structure = non_negative(max_structure);
    ShipSection {
      section_type,
      max_armor,
      current_armor: max_armor,
      max_structure,
      current_structure: max_structure,
      is_breached: false,
      layout: SlotLayout::new(slots_for_structure(max_structure)),
    }
  }

  /// Build a section and mount its equipment from a class configuration entry.
  ///
  /// # Errors
  /// Returns a [`LayoutError`] if any mount doesn't fit the section's slot layout.
  pub fn from_config(config: &SectionConfig) -> Result<Self, LayoutError> {
    let mut section = ShipSection::new(config.section, config.max_armor, config.max_structure);
    for mount in &config.mounts {
      section.mount(MountedSystem::with_size(mount.system, mount.slot_start, mount.size))?;
    }
    Ok(section)
  }

  /// Mount a system into this section's layout.
  ///
  /// # Errors
  /// See [`SlotLayout::mount`].
  pub fn mount(&mut self, system: MountedSystem) -> Result<(), LayoutError> {
    self.layout.mount(system)
  }

  /// Run the armor -> structure cascade for one hit.
  ///
  /// Armor soaks damage first.  Anything left goes into structure, and any structural damage at all triggers exactly
  /// one critical roll against this section's layout.  Damage reaching structure that is (or becomes) zero breaches the
  /// section, after which all damage to it passes straight through as overflow until [`ShipSection::reset`].
  ///
  /// # Arguments
  /// * `incoming` - Damage reaching this section (after shields).  Non-positive amounts have no effect.
  /// * `crits` - Critical hit roller, which also keeps statistics.
  /// * `rng` - Random source for the critical roll.
  /// * `events` - Events raised by this hit are appended here in the order they happen.
  ///
  /// # Returns
  /// The itemized result.  `armor_damage + structure_damage + overflow_damage == incoming`.
  pub fn apply_damage(
    &mut self, incoming: f64, crits: &mut CriticalHitSystem, rng: &mut dyn RngCore, events: &mut Vec<DamageEvent>,
  ) -> DamageResult {
    let mut result = DamageResult::nothing(self.section_type);
    if incoming.is_nan() || incoming <= 0.0 {
      return result;
    }
    result.incoming = incoming;

    if self.is_breached {
      debug!(
        "(ShipSection.apply_damage) {:?} already breached, {incoming:.2} passes through.",
        self.section_type
      );
      result.was_already_breached = true;
      result.overflow_damage = incoming;
      return result;
    }

    let mut remaining = incoming;

    let to_armor = f64::min(remaining, self.current_armor);
    if to_armor > 0.0 {
      self.current_armor -= to_armor;
      remaining -= to_armor;
      result.armor_damage = to_armor;
      result.armor_broken = self.current_armor <= 0.0;
      if result.armor_broken {
        self.current_armor = 0.0;
      }
      events.push(DamageEvent::ArmorDamaged {
        section: self.section_type,
        amount: to_armor,
        remaining: self.current_armor,
      });
    }

    let reached_structure = remaining > 0.0;
    let to_structure = f64::min(remaining, self.current_structure);
    if to_structure > 0.0 {
      self.current_structure -= to_structure;
      remaining -= to_structure;
      result.structure_damage = to_structure;
      events.push(DamageEvent::StructureDamaged {
        section: self.section_type,
        amount: to_structure,
        remaining: self.current_structure,
      });

      result.critical = crits.roll_critical(&mut self.layout, self.section_type, rng);
      if let Some(critical) = &result.critical {
        events.push(DamageEvent::CriticalHitRolled(critical.clone()));
      }
    }

    // A section built with no structure breaches as soon as anything gets past its armor.
    if reached_structure && self.current_structure <= 0.0 {
      self.current_structure = 0.0;
      self.is_breached = true;
      result.section_breached = true;
      info!("(ShipSection.apply_damage) {:?} section breached.", self.section_type);
      events.push(DamageEvent::SectionBreached {
        section: self.section_type,
      });
    }

    result.overflow_damage = remaining;

    debug!(
      "(ShipSection.apply_damage) {:?} took {incoming:.2}: armor {:.2}, structure {:.2}, overflow {:.2}.",
      self.section_type, result.armor_damage, result.structure_damage, result.overflow_damage
    );

    result
  }

  /// Restore armor and structure, clear the breach and repair all mounted systems.  Between engagements only.
  pub fn reset(&mut self) {
    self.current_armor = self.max_armor;
    self.current_structure = self.max_structure;
    self.is_breached = false;
    self.layout.repair_all();
  }

  #[must_use]
  pub fn section_type(&self) -> SectionType {
    self.section_type
  }

  #[must_use]
  pub fn max_armor(&self) -> f64 {
    self.max_armor
  }

  #[must_use]
  pub fn current_armor(&self) -> f64 {
    self.current_armor
  }

  #[must_use]
  pub fn max_structure(&self) -> f64 {
    self.max_structure
  }

  #[must_use]
  pub fn current_structure(&self) -> f64 {
    self.current_structure
  }

  #[must_use]
  pub fn is_breached(&self) -> bool {
    self.is_breached
  }

  #[must_use]
  pub fn layout(&self) -> &SlotLayout {
    &self.layout
  }

  pub fn layout_mut(&mut self) -> &mut SlotLayout {
    &mut self.layout
  }

  #[must_use]
  pub fn armor_percentage(&self) -> f64 {
    if self.max_armor > 0.0 {
      self.current_armor / self.max_armor
    } else {
      0.0
    }
  }

  #[must_use]
  pub fn structure_percentage(&self) -> f64 {
    if self.max_structure > 0.0 {
      self.current_structure / self.max_structure
    } else {
      0.0
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::slots::{SystemState, SystemType};
  use approx::assert_relative_eq;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn hit(section: &mut ShipSection, amount: f64) -> (DamageResult, Vec<DamageEvent>) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut crits = CriticalHitSystem::new();
    let mut events = vec![];
    let result = section.apply_damage(amount, &mut crits, &mut rng, &mut events);
    (result, events)
  }

  fn assert_conserved(result: &DamageResult, incoming: f64) {
    assert_relative_eq!(
      result.armor_damage + result.structure_damage + result.overflow_damage,
      incoming,
      epsilon = 1e-9
    );
  }

  #[test_log::test]
  fn test_armor_only_hit() {
    let mut section = ShipSection::new(SectionType::Fore, 100.0, 50.0);
    let (result, events) = hit(&mut section, 30.0);

    assert_relative_eq!(section.current_armor(), 70.0);
    assert_relative_eq!(section.current_structure(), 50.0);
    assert!(!result.armor_broken);
    assert!(!result.section_breached);
    assert_relative_eq!(result.overflow_damage, 0.0);
    assert!(result.critical.is_none());
    assert_eq!(events.len(), 1);
    assert_conserved(&result, 30.0);
  }

  #[test_log::test]
  fn test_armor_breaks_into_structure() {
    let mut section = ShipSection::new(SectionType::Fore, 100.0, 50.0);
    hit(&mut section, 30.0);
    let (result, events) = hit(&mut section, 90.0);

    assert_relative_eq!(result.armor_damage, 70.0);
    assert_relative_eq!(result.structure_damage, 20.0);
    assert!(result.armor_broken);
    assert_relative_eq!(section.current_armor(), 0.0);
    assert_relative_eq!(section.current_structure(), 30.0);
    assert!(!section.is_breached());
    assert_relative_eq!(result.overflow_damage, 0.0);

    // Structural penetration always rolls a critical, even against an empty layout slot.
    let critical = result.critical.as_ref().unwrap();
    assert!(critical.is_empty_slot());
    assert_eq!(critical.total_slots, 50);

    assert!(matches!(events[0], DamageEvent::ArmorDamaged { .. }));
    assert!(matches!(events[1], DamageEvent::StructureDamaged { .. }));
    assert!(matches!(events[2], DamageEvent::CriticalHitRolled(_)));
    assert_conserved(&result, 90.0);
  }

  #[test_log::test]
  fn test_breach_with_overflow() {
    let mut section = ShipSection::new(SectionType::Port, 0.0, 10.0);
    hit(&mut section, 9.0);
    assert_relative_eq!(section.current_structure(), 1.0);

    let (result, events) = hit(&mut section, 5.0);
    assert_relative_eq!(result.armor_damage, 0.0);
    assert!(!result.armor_broken);
    assert_relative_eq!(result.structure_damage, 1.0);
    assert_relative_eq!(result.overflow_damage, 4.0);
    assert!(result.section_breached);
    assert!(section.is_breached());
    assert!(result.critical.is_some());
    assert_eq!(
      events.last(),
      Some(&DamageEvent::SectionBreached {
        section: SectionType::Port
      })
    );
    assert_conserved(&result, 5.0);
  }

  #[test]
  fn test_breached_section_passes_everything() {
    let mut section = ShipSection::new(SectionType::Aft, 5.0, 5.0);
    hit(&mut section, 10.0);
    assert!(section.is_breached());

    for amount in [0.5, 3.0, 100.0] {
      let (result, events) = hit(&mut section, amount);
      assert!(result.was_already_breached);
      assert!(!result.section_breached);
      assert_relative_eq!(result.overflow_damage, amount);
      assert!(result.critical.is_none());
      assert!(events.is_empty());
      assert_relative_eq!(section.current_armor(), 0.0);
      assert_relative_eq!(section.current_structure(), 0.0);
      assert!(section.is_breached());
    }
  }

  #[test]
  fn test_non_positive_damage() {
    let mut section = ShipSection::new(SectionType::Dorsal, 10.0, 10.0);
    for amount in [0.0, -4.0, f64::NAN] {
      let (result, events) = hit(&mut section, amount);
      assert_eq!(result, DamageResult::nothing(SectionType::Dorsal));
      assert!(events.is_empty());
    }
    assert_relative_eq!(section.current_armor(), 10.0);
  }

  #[test]
  fn test_fractional_damage_conserved() {
    let mut section = ShipSection::new(SectionType::Ventral, 1.5, 2.25);
    let mut total = 0.0;
    for _ in 0..10 {
      let (result, _) = hit(&mut section, 0.35);
      assert_conserved(&result, 0.35);
      total += result.absorbed();
    }
    assert_relative_eq!(total, 3.5, epsilon = 1e-9);
    assert!(!section.is_breached());
    assert_relative_eq!(section.current_structure(), 0.25, epsilon = 1e-9);
  }

  #[test_log::test]
  fn test_critical_damages_mounted_system() {
    let mut section = ShipSection::new(SectionType::Core, 0.0, 4.0);
    section.mount(MountedSystem::new(SystemType::Reactor, 1, 4)).unwrap();

    let (result, _) = hit(&mut section, 1.0);
    let critical = result.critical.unwrap();
    assert!(critical.hit_system());
    assert_eq!(section.layout().systems()[0].state(), SystemState::Damaged);

    hit(&mut section, 1.0);
    assert_eq!(section.layout().systems()[0].state(), SystemState::Destroyed);

    let (result, _) = hit(&mut section, 1.0);
    assert!(result.critical.unwrap().was_absorbed());
  }

  #[test]
  fn test_reset_restores_everything() {
    let mut section = ShipSection::new(SectionType::Starboard, 3.0, 3.0);
    section.mount(MountedSystem::new(SystemType::Turret, 1, 3)).unwrap();
    hit(&mut section, 100.0);
    assert!(section.is_breached());
    assert_ne!(section.layout().systems()[0].state(), SystemState::Operational);

    section.reset();
    assert!(!section.is_breached());
    assert_relative_eq!(section.armor_percentage(), 1.0);
    assert_relative_eq!(section.structure_percentage(), 1.0);
    assert_eq!(section.layout().systems()[0].state(), SystemState::Operational);
  }

  #[test]
  fn test_slots_follow_structure() {
    assert_eq!(ShipSection::new(SectionType::Fore, 10.0, 40.0).layout().total_slots(), 40);
    assert_eq!(ShipSection::new(SectionType::Fore, 10.0, 12.9).layout().total_slots(), 12);
    assert_eq!(ShipSection::new(SectionType::Fore, 10.0, 0.5).layout().total_slots(), 0);
    assert_eq!(slots_for_structure(f64::NAN), 0);
  }

  #[test]
  fn test_zero_slot_section_still_scores_damage() {
    let mut section = ShipSection::new(SectionType::Fore, 0.0, 0.5);
    let (result, events) = hit(&mut section, 2.0);
    assert_relative_eq!(result.structure_damage, 0.5);
    assert_relative_eq!(result.overflow_damage, 1.5);
    assert!(result.critical.is_none());
    assert!(result.section_breached);
    assert_eq!(events.len(), 2);
  }

  #[test_log::test]
  fn test_structureless_section_breaches_once_armor_is_gone() {
    let mut section = ShipSection::new(SectionType::Dorsal, 5.0, 0.0);

    // Armor alone stops the first hit, so nothing reaches the (empty) structure.
    let (result, _) = hit(&mut section, 5.0);
    assert!(result.armor_broken);
    assert!(!result.section_breached);
    assert!(!section.is_breached());

    let (result, events) = hit(&mut section, 3.0);
    assert!(result.section_breached);
    assert!(!result.was_already_breached);
    assert!(result.critical.is_none());
    assert_relative_eq!(result.structure_damage, 0.0);
    assert_relative_eq!(result.overflow_damage, 3.0);
    assert_eq!(
      events,
      vec![DamageEvent::SectionBreached {
        section: SectionType::Dorsal
      }]
    );
    assert!(section.is_breached());

    let (result, _) = hit(&mut section, 3.0);
    assert!(result.was_already_breached);
  }

  #[test]
  fn test_exact_structure_kill_breaches() {
    let mut section = ShipSection::new(SectionType::Aft, 2.0, 3.0);
    let (result, _) = hit(&mut section, 5.0);
    assert!(result.section_breached);
    assert_relative_eq!(result.overflow_damage, 0.0);
  }

  #[test]
  fn test_deserialize_validates_section() {
    let mut section = ShipSection::new(SectionType::Port, 10.0, 8.0);
    section.mount(MountedSystem::new(SystemType::Turret, 2, 4)).unwrap();
    hit(&mut section, 12.0);

    let json = serde_json::to_value(&section).unwrap();
    let restored: ShipSection = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(restored, section);

    let mut above_max = json.clone();
    above_max["current_armor"] = serde_json::json!(11.0);
    let err = serde_json::from_value::<ShipSection>(above_max).unwrap_err();
    assert!(err.to_string().contains("current_armor"), "{err}");

    let mut negative = json.clone();
    negative["current_structure"] = serde_json::json!(-1.0);
    assert!(serde_json::from_value::<ShipSection>(negative).is_err());

    let mut wrong_slots = json.clone();
    wrong_slots["max_structure"] = serde_json::json!(20.0);
    let err = serde_json::from_value::<ShipSection>(wrong_slots).unwrap_err();
    assert!(err.to_string().contains("slots"), "{err}");

    let mut bad_layout = json;
    bad_layout["layout"]["total_slots"] = serde_json::json!(3);
    assert!(serde_json::from_value::<ShipSection>(bad_layout).is_err());
  }

  #[test]
  fn test_parse_section_type() {
    assert_eq!("Fore".parse::<SectionType>(), Ok(SectionType::Fore));
    assert_eq!(" starboard ".parse::<SectionType>(), Ok(SectionType::Starboard));
    assert_eq!("CORE".parse::<SectionType>(), Ok(SectionType::Core));
    assert!("bridge".parse::<SectionType>().is_err());
    assert_eq!(SectionType::from_repr(6), Some(SectionType::Core));
  }
}
