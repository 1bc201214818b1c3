use thiserror::Error;

use crate::section::SectionType;
use crate::slots::SystemType;

/// A mount that cannot be placed into a [`SlotLayout`](crate::slots::SlotLayout).  These are programming or data
/// errors in a ship class, never something that happens during combat resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
  #[error("{system_type:?} mount has empty slot range {slot_start}..={slot_end} (slots are 1-indexed)")]
  EmptyRange {
    system_type: SystemType,
    slot_start: u32,
    slot_end: u32,
  },
  #[error("{system_type:?} mount ends at slot {slot_end} but the layout only has {total_slots} slots")]
  OutOfRange {
    system_type: SystemType,
    slot_end: u32,
    total_slots: u32,
  },
  #[error("{system_type:?} mount overlaps {existing:?} at slot {slot}")]
  Overlap {
    system_type: SystemType,
    existing: SystemType,
    slot: u32,
  },
}

/// Persisted section state that no sequence of hits could have produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SectionStateError {
  #[error("section {section:?} has invalid {field} {value}")]
  InvalidValue {
    section: SectionType,
    field: &'static str,
    value: f64,
  },
  #[error("section {section:?} has {field} {current} above its max of {max}")]
  AboveMax {
    section: SectionType,
    field: &'static str,
    current: f64,
    max: f64,
  },
  #[error("section {section:?} has {total_slots} slots but its structure calls for {expected}")]
  SlotMismatch {
    section: SectionType,
    total_slots: u32,
    expected: u32,
  },
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("unable to read ship class file: {0}")]
  Io(#[from] std::io::Error),
  #[error("unable to parse ship class file: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("ship class {class} lists section {section:?} more than once")]
  DuplicateSection { class: String, section: SectionType },
  #[error("ship class {class} has invalid {field} {value} for section {section:?}")]
  InvalidSectionValue {
    class: String,
    section: SectionType,
    field: &'static str,
    value: f64,
  },
  #[error("ship class {class} has invalid shield capacity {value}")]
  InvalidShields { class: String, value: f64 },
  #[error("lucky shot chance {0} must be within [0, 1]")]
  InvalidProbability(f64),
  #[error("bad mount in section {section:?}: {source}")]
  Layout {
    section: SectionType,
    #[source]
    source: LayoutError,
  },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown section name '{0}'")]
pub struct ParseSectionError(pub String);
