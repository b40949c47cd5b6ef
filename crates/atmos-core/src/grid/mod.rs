//! Grid store and the systems that advance it

mod excited_group_system;
#[allow(clippy::module_inception)]
mod grid;
mod hotspot_system;
pub mod layout;
mod monstermos_system;
mod processor;
mod reaction_system;
mod share_system;
pub mod stats;
mod superconduction_system;
mod tile_set;

pub use excited_group_system::ExcitedGroupSystem;
pub use grid::{ExcitedGroup, GridAtmos, parse_direction};
pub use hotspot_system::HotspotSystem;
pub use layout::RectLayout;
pub use monstermos_system::{EqualizeOutcome, MonstermosSystem};
pub use processor::{Completion, ProcessResult};
pub use reaction_system::{FuelBurn, ReactionOutcome, ReactionSystem};
pub use share_system::ShareSystem;
pub use stats::{AtmosStats, NoopStats};
pub use superconduction_system::SuperconductionSystem;
