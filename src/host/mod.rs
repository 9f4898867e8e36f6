//! Host collaborator boundary.
//!
//! The world trait the engine drives, plus manager-lifetime stores that
//! survive individual events: restore records, statistics and saved
//! definitions. The tokio driver feeds elapsed time to the manager.

pub mod definitions;
pub mod driver;
pub mod restore;
pub mod stats;
pub mod world;

pub use definitions::{DefinitionError, EventDefinitions};
pub use driver::{DriverConfig, EventDriver};
pub use restore::{ContainerKind, ItemData, RestoreRecord, RestoreStep, RestoreStore, Vitals};
pub use stats::{Statistic, StatisticsStore};
pub use world::{EntityId, EntityRef, ReferenceLookup, WorldActions, WorldError};
