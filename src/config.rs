//! Per ship class configuration.  The core only ever consumes an already materialized [`ShipClassConfig`]; the file
//! loader here exists for tooling and scenarios.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::error::ConfigError;
use crate::protection::CoreProtectionConfig;
use crate::section::{SectionType, ShipSection};
use crate::slots::SystemType;
use crate::debug;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MountConfig {
  pub system: SystemType,
  pub slot_start: u32,
  #[serde(default = "default_mount_size")]
  pub size: u32,
}

fn default_mount_size() -> u32 {
  1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SectionConfig {
  pub section: SectionType,
  #[serde(default)]
  pub max_armor: f64,
  pub max_structure: f64,
  #[serde(default)]
  pub mounts: Vec<MountConfig>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShipClassConfig {
  pub name: String,
  pub description: Option<String>,
  #[serde(default)]
  pub max_shields: f64,
  pub sections: Vec<SectionConfig>,
  #[serde(default)]
  pub protection: CoreProtectionConfig,
}

impl SectionConfig {
  #[must_use]
  pub fn new(section: SectionType, max_armor: f64, max_structure: f64) -> Self {
    SectionConfig {
      section,
      max_armor,
      max_structure,
      mounts: vec![],
    }
  }

  #[must_use]
  pub fn with_mount(mut self, system: SystemType, slot_start: u32, size: u32) -> Self {
    self.mounts.push(MountConfig {
      system,
      slot_start,
      size,
    });
    self
  }
}

impl ShipClassConfig {
  #[must_use]
  pub fn section(&self, section: SectionType) -> Option<&SectionConfig> {
    self.sections.iter().find(|s| s.section == section)
  }

  /// Check the class for data errors before any ship is built from it.
  ///
  /// # Errors
  /// Returns the first problem found: duplicate sections, negative or non-finite armor, structure or shields, a lucky
  /// shot chance outside `[0, 1]`, or a mount that doesn't fit its section.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.max_shields.is_finite() || self.max_shields < 0.0 {
      return Err(ConfigError::InvalidShields {
        class: self.name.clone(),
        value: self.max_shields,
      });
    }

    let chance = self.protection.lucky_shot_chance;
    if !(0.0..=1.0).contains(&chance) {
      return Err(ConfigError::InvalidProbability(chance));
    }

    let mut seen = HashSet::new();
    for section in &self.sections {
      if !seen.insert(section.section) {
        return Err(ConfigError::DuplicateSection {
          class: self.name.clone(),
          section: section.section,
        });
      }

      for (field, value) in [("max_armor", section.max_armor), ("max_structure", section.max_structure)] {
        if !value.is_finite() || value < 0.0 {
          return Err(ConfigError::InvalidSectionValue {
            class: self.name.clone(),
            section: section.section,
            field,
            value,
          });
        }
      }

      ShipSection::from_config(section).map_err(|source| ConfigError::Layout {
        section: section.section,
        source,
      })?;
    }
    Ok(())
  }
}

impl Default for ShipClassConfig {
  /// A light frigate: thin outer plating, a heavily built core holding the reactor and bridge.
  fn default() -> Self {
    ShipClassConfig {
      name: "Frigate".to_string(),
      description: None,
      max_shields: 60.0,
      sections: vec![
        SectionConfig::new(SectionType::Fore, 40.0, 30.0)
          .with_mount(SystemType::Weapon, 1, 4)
          .with_mount(SystemType::Sensor, 10, 3),
        SectionConfig::new(SectionType::Aft, 30.0, 35.0)
          .with_mount(SystemType::Engine, 1, 8)
          .with_mount(SystemType::Radiator, 20, 4),
        SectionConfig::new(SectionType::Port, 30.0, 25.0)
          .with_mount(SystemType::Turret, 5, 3)
          .with_mount(SystemType::Magazine, 12, 2),
        SectionConfig::new(SectionType::Starboard, 30.0, 25.0)
          .with_mount(SystemType::Turret, 5, 3)
          .with_mount(SystemType::Magazine, 12, 2),
        SectionConfig::new(SectionType::Dorsal, 20.0, 20.0)
          .with_mount(SystemType::Radiator, 1, 4)
          .with_mount(SystemType::Sensor, 15, 2),
        SectionConfig::new(SectionType::Ventral, 20.0, 20.0)
          .with_mount(SystemType::FuelTank, 3, 6),
        SectionConfig::new(SectionType::Core, 50.0, 40.0)
          .with_mount(SystemType::Reactor, 1, 10)
          .with_mount(SystemType::Bridge, 18, 4)
          .with_mount(SystemType::LifeSupport, 30, 3),
      ],
      protection: CoreProtectionConfig::default(),
    }
  }
}

/// Load ship classes from a JSON file holding an array of [`ShipClassConfig`].  Each class is validated.
///
/// # Errors
/// Returns `Err` if the file cannot be read or parsed, or if any class fails [`ShipClassConfig::validate`].
pub fn load_ship_classes_from_file(file_name: &str) -> Result<HashMap<String, Arc<ShipClassConfig>>, ConfigError> {
  debug!("(load_ship_classes_from_file) Reading ship classes from {file_name}.");
  let file = std::fs::File::open(file_name)?;
  let reader = std::io::BufReader::new(file);
  let classes: Vec<ShipClassConfig> = serde_json::from_reader(reader)?;

  classes
    .into_iter()
    .map(|class| {
      class.validate()?;
      Ok((class.name.clone(), Arc::new(class)))
    })
    .collect()
}
