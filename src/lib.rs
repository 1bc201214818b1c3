/// Lib for broadside
///
/// Damage resolution for a multi-section ship: shields, per-section armor and structure, breaches, critical hits on
/// mounted equipment, and core protection.  [`router::DamageRouter`] is the entry point; everything else is the
/// machinery it drives and the read-only queries the rest of a game consumes.
pub mod config;
pub mod critical;
pub mod error;
pub mod events;
pub mod manager;
pub mod protection;
pub mod report;
pub mod router;
pub mod section;
pub mod shield;
pub mod slots;

#[macro_use]
mod cov_util;

pub use config::{load_ship_classes_from_file, ShipClassConfig};
pub use report::DamageReport;
pub use router::DamageRouter;
pub use section::SectionType;

pub const LOG_DAMAGE_ACTIVITY: &str = "DAMAGE";
