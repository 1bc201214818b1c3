use derivative::Derivative;
use rand::RngCore;

use crate::config::ShipClassConfig;
use crate::critical::CriticalHitSystem;
use crate::error::ConfigError;
use crate::events::{DamageEvent, DamageObserver};
use crate::manager::SectionManager;
use crate::protection::CoreProtectionSystem;
use crate::report::DamageReport;
use crate::section::SectionType;
use crate::shield::ShieldSystem;
use crate::{debug, info, warn};

/// The single entry point for damage against one ship.
///
/// Owns everything a hit can touch: shields, sections, the critical hit roller, core protection and the ship's random
/// source.  [`DamageRouter::process_damage`] takes `&mut self`, so hits against one ship are always resolved one at a
/// time and in call order; that order, together with the seed, fully determines the outcome.  Different ships have
/// different routers and can be resolved independently.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DamageRouter {
  name: String,
  shields: ShieldSystem,
  sections: SectionManager,
  crits: CriticalHitSystem,
  protection: CoreProtectionSystem,
  #[derivative(Debug = "ignore")]
  rng: Box<dyn RngCore + Send>,
}

impl DamageRouter {
  #[must_use]
  pub fn new(
    name: &str, shields: ShieldSystem, sections: SectionManager, protection: CoreProtectionSystem,
    rng: Box<dyn RngCore + Send>,
  ) -> Self {
    DamageRouter {
      name: name.to_string(),
      shields,
      sections,
      crits: CriticalHitSystem::new(),
      protection,
      rng,
    }
  }

  /// Assemble a ship from its class.
  ///
  /// # Errors
  /// Returns a [`ConfigError`] if the class fails validation.
  pub fn from_config(name: &str, config: &ShipClassConfig, rng: Box<dyn RngCore + Send>) -> Result<Self, ConfigError> {
    let sections = SectionManager::from_config(config)?;
    info!(
      "(DamageRouter.from_config) Built {name} as {} with {} shields and {} sections.",
      config.name,
      config.max_shields,
      sections.section_count()
    );
    Ok(DamageRouter::new(
      name,
      ShieldSystem::new(config.max_shields),
      sections,
      CoreProtectionSystem::new(config.protection),
      rng,
    ))
  }

  /// Resolve one landed hit of `amount` aimed at `target`.
  ///
  /// Shields absorb first.  Whatever gets through is routed by core protection to the section actually struck, which
  /// then runs its armor -> structure cascade (and critical roll).  Never fails: degenerate input gives a degenerate
  /// report.
  ///
  /// # Returns
  /// The itemized [`DamageReport`] for this hit.
  pub fn process_damage(&mut self, amount: f64, target: SectionType) -> DamageReport {
    if !amount.is_finite() || amount <= 0.0 {
      debug!(
        "(DamageRouter.process_damage) {} ignoring non-positive or non-finite damage {amount}.",
        self.name
      );
      return DamageReport::no_damage(target);
    }

    let charge_before = self.shields.current_charge();
    let overflow = self.shields.absorb_damage(amount);
    let shield_damage = charge_before - self.shields.current_charge();
    let shields_depleted = charge_before > 0.0 && !self.shields.is_active();

    let mut shield_events = Vec::new();
    if shield_damage > 0.0 {
      shield_events.push(DamageEvent::ShieldsDamaged {
        amount: shield_damage,
        remaining: self.shields.current_charge(),
      });
    }
    if shields_depleted {
      shield_events.push(DamageEvent::ShieldsDepleted);
    }
    self.sections.publish(&shield_events);

    if overflow <= 0.0 {
      debug!(
        "(DamageRouter.process_damage) {}'s shields absorb all {amount:.2} aimed at {target:?}.",
        self.name
      );
      return DamageReport::shields_only(target, amount, shields_depleted);
    }

    let resolved = self
      .protection
      .resolve_target(target, &self.sections, self.rng.as_mut());

    let mut report = DamageReport {
      total_incoming: amount,
      shield_damage,
      shields_depleted,
      core_was_protected: resolved.core_was_protected,
      was_lucky_shot: resolved.was_lucky_shot,
      ..DamageReport::no_damage(target)
    };

    match self
      .sections
      .apply_damage(resolved.section, overflow, &mut self.crits, self.rng.as_mut())
    {
      Some(result) => report.merge_section_result(result),
      None => {
        warn!(
          "(DamageRouter.process_damage) {} has no {:?} section; {overflow:.2} damage passes through.",
          self.name, resolved.section
        );
        report.overflow_damage = overflow;
      }
    }

    debug!("(DamageRouter.process_damage) {}: {report}", self.name);
    report
  }

  /// Restore shields, sections, equipment and statistics between engagements.
  pub fn reset(&mut self) {
    self.shields.reset();
    self.sections.reset_all();
    self.crits.reset_statistics();
    self.protection.reset();
  }

  pub fn subscribe(&mut self, observer: Box<dyn DamageObserver>) {
    self.sections.subscribe(observer);
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub fn shields(&self) -> &ShieldSystem {
    &self.shields
  }

  pub fn shields_mut(&mut self) -> &mut ShieldSystem {
    &mut self.shields
  }

  #[must_use]
  pub fn sections(&self) -> &SectionManager {
    &self.sections
  }

  pub fn sections_mut(&mut self) -> &mut SectionManager {
    &mut self.sections
  }

  #[must_use]
  pub fn critical_hits(&self) -> &CriticalHitSystem {
    &self.crits
  }

  #[must_use]
  pub fn protection(&self) -> &CoreProtectionSystem {
    &self.protection
  }

  #[must_use]
  pub fn is_core_exposed(&self) -> bool {
    self.protection.is_core_exposed(&self.sections)
  }

  /// A ship is out of the fight once its Core is breached.
  #[must_use]
  pub fn is_destroyed(&self) -> bool {
    self.sections.is_core_breached()
  }
}
