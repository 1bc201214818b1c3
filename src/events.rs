//! Notifications fired while damage is applied.  The core never consumes these itself; they exist for combat logs,
//! UI and statistics.  Observers are registered on the [`SectionManager`](crate::manager::SectionManager), which fans
//! every event out synchronously before the damage call returns.
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::critical::CriticalHitResult;
use crate::{info, LOG_DAMAGE_ACTIVITY};
use crate::section::SectionType;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum DamageEvent {
  ShieldsDamaged {
    amount: f64,
    remaining: f64,
  },
  ShieldsDepleted,
  ArmorDamaged {
    section: SectionType,
    amount: f64,
    remaining: f64,
  },
  StructureDamaged {
    section: SectionType,
    amount: f64,
    remaining: f64,
  },
  SectionBreached {
    section: SectionType,
  },
  CriticalHitRolled(CriticalHitResult),
}

#[cfg_attr(test, mockall::automock)]
pub trait DamageObserver: Send {
  fn on_damage_event(&mut self, event: &DamageEvent);
}

/// Writes every event to the log at info level.  Used by the command line tool.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
  ship_name: String,
}

impl LoggingObserver {
  #[must_use]
  pub fn new(ship_name: &str) -> Self {
    LoggingObserver {
      ship_name: ship_name.to_string(),
    }
  }
}

impl DamageObserver for LoggingObserver {
  fn on_damage_event(&mut self, event: &DamageEvent) {
    let name = &self.ship_name;
    match event {
      DamageEvent::ShieldsDamaged { amount, remaining } => {
        info!(target: LOG_DAMAGE_ACTIVITY, "{name}'s shields absorb {amount:.1} ({remaining:.1} left).");
      }
      DamageEvent::ShieldsDepleted => {
        info!(target: LOG_DAMAGE_ACTIVITY, "{name}'s shields are down.");
      }
      DamageEvent::ArmorDamaged {
        section,
        amount,
        remaining,
      } => {
        let section = String::from(*section);
        info!(target: LOG_DAMAGE_ACTIVITY, "{name}'s {section} armor takes {amount:.1} ({remaining:.1} left).");
      }
      DamageEvent::StructureDamaged {
        section,
        amount,
        remaining,
      } => {
        let section = String::from(*section);
        info!(target: LOG_DAMAGE_ACTIVITY, "{name}'s {section} structure takes {amount:.1} ({remaining:.1} left).");
      }
      DamageEvent::SectionBreached { section } => {
        let section = String::from(*section);
        info!(target: LOG_DAMAGE_ACTIVITY, "{name}'s {section} section is breached!");
      }
      DamageEvent::CriticalHitRolled(result) => {
        info!(target: LOG_DAMAGE_ACTIVITY, "{name}: {result}");
      }
    }
  }
}

/// Keeps a shared copy of every event it sees.  Clone it before subscribing and read the events from the clone.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
  events: Arc<Mutex<Vec<DamageEvent>>>,
}

impl EventRecorder {
  #[must_use]
  pub fn new() -> Self {
    EventRecorder::default()
  }

  /// Snapshot of the events seen so far.
  #[must_use]
  pub fn events(&self) -> Vec<DamageEvent> {
    self
      .events
      .lock()
      .map(|events| events.clone())
      .unwrap_or_default()
  }

  pub fn clear(&self) {
    if let Ok(mut events) = self.events.lock() {
      events.clear();
    }
  }
}

impl DamageObserver for EventRecorder {
  fn on_damage_event(&mut self, event: &DamageEvent) {
    if let Ok(mut events) = self.events.lock() {
      events.push(event.clone());
    }
  }
}
