//! Core protection.  The Core section sits behind the outer hull: a shot aimed at it is only allowed through once every
//! other section is breached, or on a rare lucky shot.  Otherwise it is redirected to an outer section.  Lucky shots
//! can also pull a shot aimed at an outer section into the Core.
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::manager::SectionManager;
use crate::section::SectionType;
use crate::{debug, warn};

pub const DEFAULT_LUCKY_SHOT_CHANCE: f64 = 0.02;

/// How a protected Core hit picks the outer section it lands on instead.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
  /// Always the same section, breached or not.  If the section isn't fitted, falls back to round robin.
  Fixed(SectionType),
  /// Cycle through intact outer sections in [`SectionType::OUTER`] order.
  #[default]
  RoundRobin,
  /// The intact outer section with the most armor plus structure left.
  MostIntact,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CoreProtectionConfig {
  /// Chance in `[0, 1]` for each eligible hit to be a lucky shot.
  pub lucky_shot_chance: f64,
  pub fallback: FallbackPolicy,
  /// Whether lucky shots can also redirect hits aimed at outer sections into the Core.
  pub lucky_shots_redirect_outer_hits: bool,
}

impl Default for CoreProtectionConfig {
  fn default() -> Self {
    CoreProtectionConfig {
      lucky_shot_chance: DEFAULT_LUCKY_SHOT_CHANCE,
      fallback: FallbackPolicy::RoundRobin,
      lucky_shots_redirect_outer_hits: true,
    }
  }
}

/// Where a hit actually lands after core protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
  pub section: SectionType,
  pub core_was_protected: bool,
  pub was_lucky_shot: bool,
}

impl ResolvedTarget {
  fn direct(section: SectionType) -> Self {
    ResolvedTarget {
      section,
      core_was_protected: false,
      was_lucky_shot: false,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CoreProtectionSystem {
  config: CoreProtectionConfig,
  // Index into SectionType::OUTER for the next round robin pick.
  #[serde(default)]
  next_fallback: usize,
}

impl CoreProtectionSystem {
  #[must_use]
  pub fn new(config: CoreProtectionConfig) -> Self {
    CoreProtectionSystem {
      config,
      next_fallback: 0,
    }
  }

  #[must_use]
  pub fn config(&self) -> &CoreProtectionConfig {
    &self.config
  }

  /// The Core is exposed once every other fitted section is breached.  A ship with nothing but a Core is always
  /// exposed.
  #[must_use]
  pub fn is_core_exposed(&self, sections: &SectionManager) -> bool {
    sections.all_outer_breached()
  }

  /// Decide which section a hit aimed at `requested` actually strikes.
  ///
  /// Draws at most one value from `rng`, and only when a lucky shot could change the outcome with a non-zero chance.
  pub fn resolve_target(
    &mut self, requested: SectionType, sections: &SectionManager, rng: &mut dyn RngCore,
  ) -> ResolvedTarget {
    if !sections.has_section(SectionType::Core) {
      if requested.is_core() {
        let section = self.fallback_section(sections).unwrap_or(requested);
        warn!("(CoreProtectionSystem.resolve_target) Ship has no Core section, redirecting hit to {section:?}.");
        return ResolvedTarget::direct(section);
      }
      return ResolvedTarget::direct(requested);
    }

    if requested.is_core() {
      if self.is_core_exposed(sections) {
        debug!("(CoreProtectionSystem.resolve_target) Core is exposed, hit goes through.");
        return ResolvedTarget::direct(SectionType::Core);
      }

      if self.roll_lucky_shot(rng) {
        debug!("(CoreProtectionSystem.resolve_target) Lucky shot gets through to the protected Core.");
        return ResolvedTarget {
          section: SectionType::Core,
          core_was_protected: false,
          was_lucky_shot: true,
        };
      }

      let section = self.fallback_section(sections).unwrap_or(SectionType::Core);
      debug!("(CoreProtectionSystem.resolve_target) Core protected, hit redirected to {section:?}.");
      return ResolvedTarget {
        section,
        core_was_protected: true,
        was_lucky_shot: false,
      };
    }

    if self.config.lucky_shots_redirect_outer_hits && self.roll_lucky_shot(rng) {
      debug!("(CoreProtectionSystem.resolve_target) Lucky shot aimed at {requested:?} punches through to the Core.");
      return ResolvedTarget {
        section: SectionType::Core,
        core_was_protected: false,
        was_lucky_shot: true,
      };
    }

    ResolvedTarget::direct(requested)
  }

  fn roll_lucky_shot(&self, rng: &mut dyn RngCore) -> bool {
    let chance = self.config.lucky_shot_chance;
    if chance.is_nan() || chance <= 0.0 {
      return false;
    }
    rng.gen_bool(chance.min(1.0))
  }

  /// The outer section a protected Core hit is moved to, or `None` if the ship has no outer sections.
  fn fallback_section(&mut self, sections: &SectionManager) -> Option<SectionType> {
    let intact = |section: &SectionType| sections.section(*section).is_some_and(|s| !s.is_breached());

    match self.config.fallback {
      FallbackPolicy::Fixed(section) if !section.is_core() && sections.has_section(section) => Some(section),
      FallbackPolicy::Fixed(_) | FallbackPolicy::RoundRobin => {
        let count = SectionType::OUTER.len();
        let pick = (0..count)
          .map(|offset| (self.next_fallback + offset) % count)
          .find(|&index| intact(&SectionType::OUTER[index]))
          .or_else(|| {
            (0..count)
              .map(|offset| (self.next_fallback + offset) % count)
              .find(|&index| sections.has_section(SectionType::OUTER[index]))
          })?;
        self.next_fallback = (pick + 1) % count;
        Some(SectionType::OUTER[pick])
      }
      FallbackPolicy::MostIntact => SectionType::OUTER
        .iter()
        .filter(|section| intact(section))
        .filter_map(|section| sections.section(*section))
        .fold(None, |best: Option<(SectionType, f64)>, s| {
          let health = s.current_armor() + s.current_structure();
          match best {
            Some((_, best_health)) if best_health >= health => best,
            _ => Some((s.section_type(), health)),
          }
        })
        .map(|(section, _)| section)
        .or_else(|| SectionType::OUTER.into_iter().find(|s| sections.has_section(*s))),
    }
  }

  /// Restart the round robin cycle.
  pub fn reset(&mut self) {
    self.next_fallback = 0;
  }
}
