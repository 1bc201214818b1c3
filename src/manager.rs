use std::collections::BTreeMap;

use derivative::Derivative;
use rand::RngCore;

use crate::config::ShipClassConfig;
use crate::critical::CriticalHitSystem;
use crate::error::ConfigError;
use crate::events::{DamageEvent, DamageObserver};
use crate::section::{DamageResult, SectionType, ShipSection};
use crate::slots::{SystemState, SystemType};
use crate::{debug, trace};

/// All the sections of one ship, keyed by [`SectionType`], plus the observers interested in damage to them.
///
/// Iteration is always in [`SectionType`] order so queries and fan-out are deterministic.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct SectionManager {
  sections: BTreeMap<SectionType, ShipSection>,
  #[derivative(Debug = "ignore")]
  observers: Vec<Box<dyn DamageObserver>>,
}

impl SectionManager {
  #[must_use]
  pub fn new() -> Self {
    SectionManager::default()
  }

  /// Build every section listed in a ship class.
  ///
  /// # Errors
  /// Returns a [`ConfigError`] if the class fails validation.
  pub fn from_config(config: &ShipClassConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    let mut manager = SectionManager::new();
    for section_config in &config.sections {
      let section = ShipSection::from_config(section_config).map_err(|source| ConfigError::Layout {
        section: section_config.section,
        source,
      })?;
      manager.add_section(section);
    }
    debug!(
      "(SectionManager.from_config) Built {} sections for class {}.",
      manager.section_count(),
      config.name
    );
    Ok(manager)
  }

  /// Register a section, returning any section it replaces.
  pub fn add_section(&mut self, section: ShipSection) -> Option<ShipSection> {
    self.sections.insert(section.section_type(), section)
  }

  pub fn remove_section(&mut self, section: SectionType) -> Option<ShipSection> {
    self.sections.remove(&section)
  }

  #[must_use]
  pub fn section(&self, section: SectionType) -> Option<&ShipSection> {
    self.sections.get(&section)
  }

  pub fn section_mut(&mut self, section: SectionType) -> Option<&mut ShipSection> {
    self.sections.get_mut(&section)
  }

  #[must_use]
  pub fn has_section(&self, section: SectionType) -> bool {
    self.sections.contains_key(&section)
  }

  pub fn sections(&self) -> impl Iterator<Item = &ShipSection> + '_ {
    self.sections.values()
  }

  #[must_use]
  pub fn section_count(&self) -> usize {
    self.sections.len()
  }

  pub fn subscribe(&mut self, observer: Box<dyn DamageObserver>) {
    self.observers.push(observer);
  }

  #[must_use]
  pub fn observer_count(&self) -> usize {
    self.observers.len()
  }

  /// Hand events to every observer, in order.
  pub fn publish(&mut self, events: &[DamageEvent]) {
    for event in events {
      trace!("(SectionManager.publish) {event:?}");
      for observer in &mut self.observers {
        observer.on_damage_event(event);
      }
    }
  }

  /// Apply damage to one section and publish the resulting events.
  ///
  /// # Returns
  /// The section's [`DamageResult`], or `None` if this ship has no such section.
  pub fn apply_damage(
    &mut self, section: SectionType, amount: f64, crits: &mut CriticalHitSystem, rng: &mut dyn RngCore,
  ) -> Option<DamageResult> {
    let target = self.sections.get_mut(&section)?;
    let mut events = Vec::new();
    let result = target.apply_damage(amount, crits, rng, &mut events);
    self.publish(&events);
    Some(result)
  }

  pub fn reset_all(&mut self) {
    for section in self.sections.values_mut() {
      section.reset();
    }
  }

  #[must_use]
  pub fn total_armor(&self) -> f64 {
    self.sections.values().map(ShipSection::current_armor).sum()
  }

  #[must_use]
  pub fn total_max_armor(&self) -> f64 {
    self.sections.values().map(ShipSection::max_armor).sum()
  }

  #[must_use]
  pub fn total_structure(&self) -> f64 {
    self.sections.values().map(ShipSection::current_structure).sum()
  }

  #[must_use]
  pub fn total_max_structure(&self) -> f64 {
    self.sections.values().map(ShipSection::max_structure).sum()
  }

  #[must_use]
  pub fn breached_sections(&self) -> Vec<SectionType> {
    self
      .sections
      .values()
      .filter(|s| s.is_breached())
      .map(ShipSection::section_type)
      .collect()
  }

  /// Current armor of a section as a fraction of its max.
  #[must_use]
  pub fn armor_percentage(&self, section: SectionType) -> Option<f64> {
    self.section(section).map(ShipSection::armor_percentage)
  }

  #[must_use]
  pub fn structure_percentage(&self, section: SectionType) -> Option<f64> {
    self.section(section).map(ShipSection::structure_percentage)
  }

  #[must_use]
  pub fn is_core_breached(&self) -> bool {
    self.section(SectionType::Core).is_some_and(ShipSection::is_breached)
  }

  /// True when every fitted section other than Core is breached.  Vacuously true with no outer sections.
  #[must_use]
  pub fn all_outer_breached(&self) -> bool {
    self
      .sections
      .values()
      .filter(|s| !s.section_type().is_core())
      .all(ShipSection::is_breached)
  }

  /// Remaining armor plus structure over the maximum, across the whole ship.
  #[must_use]
  pub fn overall_integrity(&self) -> f64 {
    let max = self.total_max_armor() + self.total_max_structure();
    if max > 0.0 {
      (self.total_armor() + self.total_structure()) / max
    } else {
      0.0
    }
  }

  /// Every mounted system currently in `state`, in section then slot order.
  #[must_use]
  pub fn systems_in_state(&self, state: SystemState) -> Vec<(SectionType, SystemType)> {
    self
      .sections
      .values()
      .flat_map(|section| {
        section
          .layout()
          .systems()
          .iter()
          .filter(move |system| system.state() == state)
          .map(move |system| (section.section_type(), system.system_type()))
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::{EventRecorder, MockDamageObserver};
  use crate::slots::MountedSystem;
  use approx::assert_relative_eq;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn two_section_ship() -> SectionManager {
    let mut sections = SectionManager::new();
    sections.add_section(ShipSection::new(SectionType::Fore, 20.0, 10.0));
    let mut core = ShipSection::new(SectionType::Core, 10.0, 5.0);
    core.mount(MountedSystem::new(SystemType::Reactor, 1, 5)).unwrap();
    sections.add_section(core);
    sections
  }

  #[test]
  fn test_from_default_config() {
    let sections = SectionManager::from_config(&ShipClassConfig::default()).unwrap();
    assert_eq!(sections.section_count(), 7);
    assert_relative_eq!(sections.total_max_armor(), 220.0);
    assert_relative_eq!(sections.total_max_structure(), 195.0);
    assert_relative_eq!(sections.overall_integrity(), 1.0);
    assert!(sections.breached_sections().is_empty());
    assert!(!sections.is_core_breached());
    assert_eq!(sections.systems_in_state(SystemState::Operational).len(), 14);
  }

  #[test]
  fn test_from_bad_config() {
    let mut class = ShipClassConfig::default();
    class.sections[0] = crate::config::SectionConfig::new(SectionType::Fore, 1.0, 2.0).with_mount(SystemType::Weapon, 1, 3);
    assert!(matches!(
      SectionManager::from_config(&class),
      Err(ConfigError::Layout { .. })
    ));
  }

  #[test_log::test]
  fn test_aggregate_queries() {
    let mut sections = two_section_ship();
    let mut crits = CriticalHitSystem::new();
    let mut rng = StdRng::seed_from_u64(1);

    sections.apply_damage(SectionType::Fore, 25.0, &mut crits, &mut rng).unwrap();
    assert_relative_eq!(sections.total_armor(), 10.0);
    assert_relative_eq!(sections.total_structure(), 10.0);
    assert_relative_eq!(sections.armor_percentage(SectionType::Fore).unwrap(), 0.0);
    assert_relative_eq!(sections.structure_percentage(SectionType::Fore).unwrap(), 0.5);
    assert!(sections.armor_percentage(SectionType::Aft).is_none());
    assert!(!sections.all_outer_breached());

    sections.apply_damage(SectionType::Fore, 5.0, &mut crits, &mut rng).unwrap();
    assert_eq!(sections.breached_sections(), vec![SectionType::Fore]);
    assert!(sections.all_outer_breached());
    assert!(!sections.is_core_breached());

    sections.apply_damage(SectionType::Core, 100.0, &mut crits, &mut rng).unwrap();
    assert!(sections.is_core_breached());
    assert_eq!(sections.breached_sections(), vec![SectionType::Fore, SectionType::Core]);
    assert_relative_eq!(sections.overall_integrity(), 0.0);
    assert_eq!(sections.systems_in_state(SystemState::Damaged), vec![(SectionType::Core, SystemType::Reactor)]);

    sections.reset_all();
    assert!(sections.breached_sections().is_empty());
    assert_relative_eq!(sections.overall_integrity(), 1.0);
  }

  #[test]
  fn test_missing_section() {
    let mut sections = two_section_ship();
    let mut crits = CriticalHitSystem::new();
    let mut rng = StdRng::seed_from_u64(1);
    assert!(sections.apply_damage(SectionType::Port, 5.0, &mut crits, &mut rng).is_none());
    assert_eq!(crits.total_rolls(), 0);
  }

  #[test]
  fn test_add_and_remove_sections() {
    let mut sections = two_section_ship();
    let replaced = sections.add_section(ShipSection::new(SectionType::Fore, 1.0, 1.0));
    assert_relative_eq!(replaced.unwrap().max_armor(), 20.0);
    assert_eq!(sections.section_count(), 2);

    assert!(sections.remove_section(SectionType::Fore).is_some());
    assert!(!sections.has_section(SectionType::Fore));
    assert!(sections.remove_section(SectionType::Fore).is_none());
  }

  #[test_log::test]
  fn test_events_fan_out_in_order() {
    let mut sections = two_section_ship();
    let recorder = EventRecorder::new();
    sections.subscribe(Box::new(recorder.clone()));

    let mut mock = MockDamageObserver::new();
    mock
      .expect_on_damage_event()
      .withf(|event| matches!(event, DamageEvent::SectionBreached { section: SectionType::Core }))
      .times(1)
      .return_const(());
    mock
      .expect_on_damage_event()
      .withf(|event| !matches!(event, DamageEvent::SectionBreached { .. }))
      .times(4)
      .return_const(());
    sections.subscribe(Box::new(mock));
    assert_eq!(sections.observer_count(), 2);

    let mut crits = CriticalHitSystem::new();
    let mut rng = StdRng::seed_from_u64(1);
    let result = sections
      .apply_damage(SectionType::Core, 20.0, &mut crits, &mut rng)
      .unwrap();
    assert!(result.section_breached);

    let events = recorder.events();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], DamageEvent::ArmorDamaged { section: SectionType::Core, .. }));
    assert!(matches!(events[1], DamageEvent::StructureDamaged { section: SectionType::Core, .. }));
    assert!(matches!(&events[2], DamageEvent::CriticalHitRolled(critical) if critical.hit_system()));
    assert_eq!(events[3], DamageEvent::SectionBreached { section: SectionType::Core });

    recorder.clear();
    assert!(recorder.events().is_empty());
    sections.apply_damage(SectionType::Fore, 3.0, &mut crits, &mut rng).unwrap();
    assert_eq!(
      recorder.events(),
      vec![DamageEvent::ArmorDamaged {
        section: SectionType::Fore,
        amount: 3.0,
        remaining: 17.0
      }]
    );
  }
}
