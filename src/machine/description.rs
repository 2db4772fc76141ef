use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::kernel::Tag;
use crate::mesh::MeshOptions;
use crate::primitives::RegionGeometry;

use super::{
    MachineModel, MagnetTopology, RotorBoundary, RotorRegion, RotorTopology, StatorBoundary,
    StatorRegion, Winding,
};

/// Boundary chains of the stator sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatorBoundaries {
    pub outer: Vec<Tag>,
    pub master: Vec<Tag>,
    pub airgap_arc: Vec<Tag>,
    pub sliding: Vec<Tag>,
}

/// Drawn regions of the stator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatorDescription {
    #[serde(default)]
    pub slot_opening: Option<RegionGeometry>,
    #[serde(default)]
    pub slot_wedge: Option<RegionGeometry>,
    #[serde(default)]
    pub conductors: Vec<RegionGeometry>,
    #[serde(default)]
    pub coil_area: Option<RegionGeometry>,
    #[serde(default)]
    pub backiron: Option<RegionGeometry>,
    #[serde(default)]
    pub tooth: Option<RegionGeometry>,
    #[serde(default)]
    pub tooth_tip: Option<RegionGeometry>,
    #[serde(default)]
    pub stator_airgap: Option<RegionGeometry>,
    #[serde(default)]
    pub sliding_airgap: Option<RegionGeometry>,
    #[serde(default)]
    pub boundaries: StatorBoundaries,
}

/// Boundary chains of the rotor sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RotorBoundaries {
    pub master: Vec<Tag>,
    pub sliding: Vec<Tag>,
}

/// Drawn regions of the rotor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotorDescription {
    #[serde(default)]
    pub shaft: Option<RegionGeometry>,
    #[serde(default)]
    pub core: Option<RegionGeometry>,
    #[serde(default)]
    pub rotor_airgap: Option<RegionGeometry>,
    #[serde(default)]
    pub magnets: Vec<RegionGeometry>,
    #[serde(default)]
    pub pockets: Vec<RegionGeometry>,
    #[serde(default)]
    pub boundaries: RotorBoundaries,
}

/// A machine described by a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineDescription {
    pub slots: i32,
    pub pole_pairs: i32,
    pub rotor_topology: RotorTopology,
    #[serde(default)]
    pub magnet_topology: MagnetTopology,
    pub winding: Winding,
    pub stator: StatorDescription,
    pub rotor: RotorDescription,
    #[serde(default)]
    pub mesh: MeshOptions,
}

impl MachineDescription {
    /// Parses a machine description.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON, unknown fields or an
    /// unknown topology.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text).map_err(ConfigError::from)?)
    }

    /// Reads and parses a machine description file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or any
    /// [`from_json`](Self::from_json) error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let description = Self::from_json(&text)?;
        debug!(
            path = %path.display(),
            slots = description.slots,
            pole_pairs = description.pole_pairs,
            rotor = ?description.rotor_topology,
            "machine description loaded"
        );
        Ok(description)
    }
}

impl MachineModel for MachineDescription {
    fn slots(&self) -> i32 {
        self.slots
    }

    fn pole_pairs(&self) -> i32 {
        self.pole_pairs
    }

    fn rotor_topology(&self) -> RotorTopology {
        self.rotor_topology
    }

    fn magnet_topology(&self) -> MagnetTopology {
        self.magnet_topology
    }

    fn winding(&self) -> &Winding {
        &self.winding
    }

    fn stator_region(&self, region: StatorRegion) -> Option<&RegionGeometry> {
        let s = &self.stator;
        match region {
            StatorRegion::SlotOpening => s.slot_opening.as_ref(),
            StatorRegion::SlotWedge => s.slot_wedge.as_ref(),
            StatorRegion::CoilArea => s.coil_area.as_ref(),
            StatorRegion::Backiron => s.backiron.as_ref(),
            StatorRegion::Tooth => s.tooth.as_ref(),
            StatorRegion::ToothTip => s.tooth_tip.as_ref(),
            StatorRegion::StatorAirgap => s.stator_airgap.as_ref(),
            StatorRegion::SlidingAirgap => s.sliding_airgap.as_ref(),
        }
    }

    fn conductors(&self) -> &[RegionGeometry] {
        &self.stator.conductors
    }

    fn stator_boundary(&self, boundary: StatorBoundary) -> &[Tag] {
        let b = &self.stator.boundaries;
        match boundary {
            StatorBoundary::Outer => &b.outer,
            StatorBoundary::Master => &b.master,
            StatorBoundary::AirgapArc => &b.airgap_arc,
            StatorBoundary::Sliding => &b.sliding,
        }
    }

    fn rotor_region(&self, region: RotorRegion) -> Option<&RegionGeometry> {
        let r = &self.rotor;
        match region {
            RotorRegion::Shaft => r.shaft.as_ref(),
            RotorRegion::Core => r.core.as_ref(),
            RotorRegion::RotorAirgap => r.rotor_airgap.as_ref(),
        }
    }

    fn magnets(&self) -> &[RegionGeometry] {
        &self.rotor.magnets
    }

    fn pockets(&self) -> &[RegionGeometry] {
        &self.rotor.pockets
    }

    fn rotor_boundary(&self, boundary: RotorBoundary) -> &[Tag] {
        match boundary {
            RotorBoundary::Master => &self.rotor.boundaries.master,
            RotorBoundary::Sliding => &self.rotor.boundaries.sliding,
        }
    }
}
