//! Sector operations: planning, replication, boundaries, phases and groups.

pub mod boundary;
pub mod phase;
pub mod planner;
pub mod registry;
pub mod replicate;

pub use boundary::{OuterBoundary, PeriodicBoundary, PeriodicPair, SlidingBoundary};
pub use phase::{tag_winding, AssignPhases, PhaseGroups};
pub use planner::{PeriodicityPlan, Replication};
pub use registry::{lookup, magnets_group, GroupSpec, PhysicalGroupRegistry, PhysicalTag, GROUPS};
pub use replicate::{
    Instance, RealizeRegion, Realized, Replicate, SectorInstances, SECTOR_SYMMETRY_PLANE,
};
