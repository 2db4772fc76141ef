//! The parametric machine model consumed by the assembly.

mod description;
mod winding;

pub use description::{
    MachineDescription, RotorBoundaries, RotorDescription, StatorBoundaries, StatorDescription,
};
pub use winding::{ConnectionMatrix, Phase, PhaseBand, Winding, WindingLayout};

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::kernel::Tag;
use crate::primitives::RegionGeometry;

/// Rotor construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotorTopology {
    /// Magnets glued on the core surface; no pockets.
    #[serde(alias = "SPM")]
    SurfaceMounted,
    /// Magnets buried in the core, one layer per pole.
    #[serde(alias = "IPM")]
    InteriorRadial,
    /// Buried magnets arranged in a V per pole.
    InteriorVShape,
    /// Tangentially magnetized magnets between core spokes.
    Spoke,
}

impl RotorTopology {
    /// Whether magnets sit inside the core, with pockets around them.
    #[must_use]
    pub fn is_interior(self) -> bool {
        !matches!(self, Self::SurfaceMounted)
    }
}

/// How magnets are arranged within one drawn half pole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MagnetTopology {
    #[default]
    Simple,
    VRectangular,
    MultiPerPole,
}

impl MagnetTopology {
    /// Checks the number of drawn magnet regions against the arrangement.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTopology`] for an arrangement the rotor
    /// cannot carry or a wrong magnet count.
    pub fn check(self, rotor: RotorTopology, magnets: usize) -> Result<(), TopologyError> {
        match self {
            Self::VRectangular if !rotor.is_interior() => Err(TopologyError::InvalidTopology(
                format!("{self:?} magnets need an interior rotor, got {rotor:?}"),
            )),
            Self::Simple | Self::VRectangular if magnets != 1 => {
                Err(TopologyError::InvalidTopology(format!(
                    "{self:?} magnets need exactly one magnet region per half pole, got {magnets}"
                )))
            }
            Self::MultiPerPole if magnets == 0 => Err(TopologyError::InvalidTopology(
                "multi-magnet poles need at least one magnet region".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Regions of the drawn half slot pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatorRegion {
    SlotOpening,
    SlotWedge,
    CoilArea,
    Backiron,
    Tooth,
    ToothTip,
    StatorAirgap,
    SlidingAirgap,
}

/// Regions of the drawn half pole pitch, besides magnets and pockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotorRegion {
    Shaft,
    Core,
    RotorAirgap,
}

/// Open curve chains of the stator sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatorBoundary {
    Outer,
    Master,
    AirgapArc,
    Sliding,
}

/// Open curve chains of the rotor sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotorBoundary {
    Master,
    Sliding,
}

/// Data source describing one machine's drawn sectors.
///
/// Regions are drawn over half a slot pitch (stator) or half a pole pitch
/// (rotor), between angle `-pitch / 2` and `0`, so that the plane `y = 0` is
/// the symmetry plane of the drawn sector. Boundary chains name curves of the
/// drawn regions.
pub trait MachineModel {
    /// Number of stator slots.
    fn slots(&self) -> i32;

    /// Number of rotor pole pairs.
    fn pole_pairs(&self) -> i32;

    fn rotor_topology(&self) -> RotorTopology;

    fn magnet_topology(&self) -> MagnetTopology;

    fn winding(&self) -> &Winding;

    /// A stator region, or `None` if this machine does not have it.
    fn stator_region(&self, region: StatorRegion) -> Option<&RegionGeometry>;

    /// Conductor regions of the drawn slot, outermost layer first.
    fn conductors(&self) -> &[RegionGeometry];

    fn stator_boundary(&self, boundary: StatorBoundary) -> &[Tag];

    /// A rotor region, or `None` if this machine does not have it.
    fn rotor_region(&self, region: RotorRegion) -> Option<&RegionGeometry>;

    /// Magnet regions of the drawn half pole.
    fn magnets(&self) -> &[RegionGeometry];

    /// Air pockets of the drawn half pole (interior rotors).
    fn pockets(&self) -> &[RegionGeometry];

    fn rotor_boundary(&self, boundary: RotorBoundary) -> &[Tag];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnet_counts_per_arrangement() {
        use MagnetTopology::{MultiPerPole, Simple, VRectangular};
        use RotorTopology::{InteriorRadial, SurfaceMounted};

        assert!(Simple.check(SurfaceMounted, 1).is_ok());
        assert!(Simple.check(SurfaceMounted, 2).is_err());
        assert!(VRectangular.check(InteriorRadial, 1).is_ok());
        assert!(VRectangular.check(SurfaceMounted, 1).is_err());
        assert!(MultiPerPole.check(InteriorRadial, 3).is_ok());
        assert!(MultiPerPole.check(InteriorRadial, 0).is_err());
    }

    #[test]
    fn unknown_rotor_topology_is_rejected() {
        assert_eq!(
            serde_json::from_str::<RotorTopology>("\"SPM\"").ok(),
            Some(RotorTopology::SurfaceMounted)
        );
        assert!(serde_json::from_str::<RotorTopology>("\"Halbach\"").is_err());
    }
}
