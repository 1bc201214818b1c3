use serde::{Deserialize, Serialize};

use crate::debug;

/// Ship-wide energy shield.  Absorbs damage before any section sees it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ShieldSystem {
  max_charge: f64,
  current_charge: f64,
}

// NaN and negative values clamp to zero.
fn clamp_charge(value: f64, max: f64) -> f64 {
  if value.is_nan() {
    0.0
  } else {
    value.clamp(0.0, max)
  }
}

impl ShieldSystem {
  /// Create a fully charged shield.
  #[must_use]
  pub fn new(max_charge: f64) -> Self {
    let max_charge = clamp_charge(max_charge, f64::MAX);
    ShieldSystem {
      max_charge,
      current_charge: max_charge,
    }
  }

  /// Soak up as much of `amount` as the current charge allows.
  ///
  /// # Returns
  /// The overflow that the shield could not absorb.  Non-positive amounts are a no-op returning 0.
  pub fn absorb_damage(&mut self, amount: f64) -> f64 {
    if amount.is_nan() || amount <= 0.0 {
      return 0.0;
    }

    let absorbed = f64::min(amount, self.current_charge);
    self.current_charge -= absorbed;

    debug!(
      "(ShieldSystem.absorb_damage) Absorbed {:.2} of {:.2}, charge now {:.2}/{:.2}.",
      absorbed, amount, self.current_charge, self.max_charge
    );

    amount - absorbed
  }

  pub fn set_shields(&mut self, value: f64) {
    self.current_charge = clamp_charge(value, self.max_charge);
  }

  /// Add charge, e.g. from turn-based regeneration.  Never exceeds max.
  pub fn regenerate(&mut self, amount: f64) {
    if amount > 0.0 {
      self.set_shields(self.current_charge + amount);
    }
  }

  pub fn reset(&mut self) {
    self.current_charge = self.max_charge;
  }

  #[must_use]
  pub fn current_charge(&self) -> f64 {
    self.current_charge
  }

  #[must_use]
  pub fn max_charge(&self) -> f64 {
    self.max_charge
  }

  #[must_use]
  pub fn is_active(&self) -> bool {
    self.current_charge > 0.0
  }

  /// Charge as a fraction of max in `[0, 1]`; a ship without shields reports 0.
  #[must_use]
  pub fn percentage(&self) -> f64 {
    if self.max_charge > 0.0 {
      self.current_charge / self.max_charge
    } else {
      0.0
    }
  }
}
