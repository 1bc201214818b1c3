use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::critical::CriticalHitResult;
use crate::section::{DamageResult, SectionType};

/// The complete, itemized record of one hit as returned by [`DamageRouter::process_damage`](crate::router::DamageRouter::process_damage).
///
/// `shield_damage + armor_damage + structure_damage + overflow_damage == total_incoming` for every report.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DamageReport {
  pub requested_section: SectionType,
  /// The section the hit landed on after core protection.  `None` if the shield took everything.
  pub resolved_section: Option<SectionType>,
  pub total_incoming: f64,
  pub shield_damage: f64,
  pub armor_damage: f64,
  pub structure_damage: f64,
  pub overflow_damage: f64,
  pub shields_absorbed: bool,
  pub shields_depleted: bool,
  pub armor_broken: bool,
  pub section_breached: bool,
  pub was_already_breached: bool,
  pub core_was_protected: bool,
  pub was_lucky_shot: bool,
  pub critical: Option<CriticalHitResult>,
}

impl DamageReport {
  /// A report for a hit that did nothing at all (non-positive damage).
  #[must_use]
  pub fn no_damage(requested_section: SectionType) -> Self {
    DamageReport {
      requested_section,
      resolved_section: None,
      total_incoming: 0.0,
      shield_damage: 0.0,
      armor_damage: 0.0,
      structure_damage: 0.0,
      overflow_damage: 0.0,
      shields_absorbed: false,
      shields_depleted: false,
      armor_broken: false,
      section_breached: false,
      was_already_breached: false,
      core_was_protected: false,
      was_lucky_shot: false,
      critical: None,
    }
  }

  /// A hit stopped entirely by the shield.
  #[must_use]
  pub fn shields_only(requested_section: SectionType, amount: f64, shields_depleted: bool) -> Self {
    DamageReport {
      total_incoming: amount,
      shield_damage: amount,
      shields_absorbed: true,
      shields_depleted,
      ..DamageReport::no_damage(requested_section)
    }
  }

  /// Fold a section's result into this report.
  pub fn merge_section_result(&mut self, result: DamageResult) {
    self.resolved_section = Some(result.section_type);
    self.armor_damage = result.armor_damage;
    self.structure_damage = result.structure_damage;
    self.overflow_damage = result.overflow_damage;
    self.armor_broken = result.armor_broken;
    self.section_breached = result.section_breached;
    self.was_already_breached = result.was_already_breached;
    self.critical = result.critical;
  }

  /// Damage that was absorbed by something (shield, armor or structure) rather than passing through.
  #[must_use]
  pub fn total_absorbed(&self) -> f64 {
    self.shield_damage + self.armor_damage + self.structure_damage
  }

  /// Sum of every bucket.  Equal to `total_incoming` up to floating point error.
  #[must_use]
  pub fn accounted(&self) -> f64 {
    self.total_absorbed() + self.overflow_damage
  }

  #[must_use]
  pub fn hull_was_hit(&self) -> bool {
    self.armor_damage > 0.0 || self.structure_damage > 0.0
  }
}

impl fmt::Display for DamageReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.1} damage aimed at {}", self.total_incoming, String::from(self.requested_section))?;
    if self.shield_damage > 0.0 {
      write!(f, "; shields absorb {:.1}", self.shield_damage)?;
    }
    if self.shields_depleted {
      write!(f, " (shields down)")?;
    }
    if let Some(section) = self.resolved_section {
      if self.core_was_protected {
        write!(f, "; core protected, redirected to {}", String::from(section))?;
      } else if self.was_lucky_shot {
        write!(f, "; lucky shot into {}", String::from(section))?;
      } else if section != self.requested_section {
        write!(f, "; landed on {}", String::from(section))?;
      }
      write!(
        f,
        "; armor {:.1}, structure {:.1}, overflow {:.1}",
        self.armor_damage, self.structure_damage, self.overflow_damage
      )?;
    }
    if self.armor_broken {
      write!(f, "; armor broken")?;
    }
    if self.section_breached {
      write!(f, "; SECTION BREACHED")?;
    }
    if self.was_already_breached {
      write!(f, "; through existing breach")?;
    }
    if let Some(critical) = &self.critical {
      write!(f, "; {critical}")?;
    }
    Ok(())
  }
}
