//! Physical groups: the fixed body/boundary table and per-build registration.
//!
//! Ids are grouped by range. The 100s belong to the stator (surfaces 101-108,
//! phases 120-125, boundaries 150-154), the 200s to the rotor (surfaces 201-204,
//! magnets 210-221, boundaries 250-252).

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::kernel::{Dim, Handle, Kernel, Tag};

/// Solver attributes of one physical group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: &'static str,
    pub id: i32,
    pub dim: Dim,
    /// Equation set; 0 for boundaries.
    pub equation: i32,
    /// Material id; 0 for boundaries.
    pub material: i32,
    /// Whether the body takes part in the force calculation.
    pub force: bool,
    /// Torque group; 0 when the body produces no torque.
    pub torque_group: i32,
}

const fn body(name: &'static str, id: i32, material: i32, force: bool, torque_group: i32) -> GroupSpec {
    GroupSpec {
        name,
        id,
        dim: Dim::Surface,
        equation: 1,
        material,
        force,
        torque_group,
    }
}

const fn boundary(name: &'static str, id: i32) -> GroupSpec {
    GroupSpec {
        name,
        id,
        dim: Dim::Curve,
        equation: 0,
        material: 0,
        force: false,
        torque_group: 0,
    }
}

/// Every physical group a build may create.
pub static GROUPS: &[GroupSpec] = &[
    body("SLOT_OPENINGS", 101, 1, false, 0),
    body("SLOT_WEDGES", 102, 2, false, 0),
    body("COIL_AREAS", 103, 1, false, 0),
    body("BACKIRONS", 104, 3, false, 0),
    body("TEETH", 105, 3, false, 0),
    body("TOOTHTIPS", 106, 3, false, 0),
    body("STATOR_AIRGAPS", 107, 1, false, 0),
    body("SLIDING_AIRGAPS", 108, 1, false, 0),
    body("A_PLUS", 120, 1, false, 0),
    body("A_MINUS", 121, 1, false, 0),
    body("B_PLUS", 122, 1, false, 0),
    body("B_MINUS", 123, 1, false, 0),
    body("C_PLUS", 124, 1, false, 0),
    body("C_MINUS", 125, 1, false, 0),
    boundary("OUTER_STATOR_BOUNDARY", 150),
    boundary("STATOR_MASTER_BOUNDARY", 151),
    boundary("STATOR_SLAVE_BOUNDARY", 152),
    boundary("STATOR_AIRGAP_ARC_BOUNDARY", 153),
    boundary("STATOR_SLIDING_BOUNDARY", 154),
    body("SHAFTS", 201, 1, true, 1),
    body("ROTORCORES", 202, 4, true, 1),
    body("ROTOR_AIRGAPS", 203, 1, true, 0),
    body("ROTORPOCKETS", 204, 1, true, 0),
    body("MAGNETS1", 210, 5, true, 1),
    body("MAGNETS2", 211, 6, true, 1),
    body("MAGNETS3", 212, 7, true, 1),
    body("MAGNETS4", 213, 8, true, 1),
    body("MAGNETS5", 214, 9, true, 1),
    body("MAGNETS6", 215, 10, true, 1),
    body("MAGNETS7", 216, 11, true, 1),
    body("MAGNETS8", 217, 12, true, 1),
    body("MAGNETS9", 218, 13, true, 1),
    body("MAGNETS10", 219, 14, true, 1),
    body("MAGNETS11", 220, 15, true, 1),
    body("MAGNETS12", 221, 16, true, 1),
    boundary("ROTOR_MASTER_BOUNDARY", 250),
    boundary("ROTOR_SLAVE_BOUNDARY", 251),
    boundary("ROTOR_SLIDING_BOUNDARY", 252),
];

const FIRST_MAGNET: i32 = 210;
const LAST_MAGNET: i32 = 221;

/// Looks a group up by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static GroupSpec> {
    GROUPS.iter().find(|g| g.name == name)
}

/// Group of the magnets of rotational copy `copy` (0-based).
///
/// # Errors
///
/// Returns [`RegistryError::UnknownGroup`] past the last magnet group.
pub fn magnets_group(copy: usize) -> Result<&'static GroupSpec, RegistryError> {
    let unknown = || RegistryError::UnknownGroup(format!("MAGNETS{}", copy + 1));
    let id = i32::try_from(copy)
        .ok()
        .and_then(|c| c.checked_add(FIRST_MAGNET))
        .filter(|&id| id <= LAST_MAGNET)
        .ok_or_else(unknown)?;
    GROUPS.iter().find(|g| g.id == id).ok_or_else(unknown)
}

/// A physical group id, classified by range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysicalTag(pub i32);

impl PhysicalTag {
    #[must_use]
    pub fn is_stator(self) -> bool {
        (100..200).contains(&self.0)
    }

    #[must_use]
    pub fn is_rotor(self) -> bool {
        (200..300).contains(&self.0)
    }

    #[must_use]
    pub fn is_phase(self) -> bool {
        (120..=125).contains(&self.0)
    }

    #[must_use]
    pub fn is_boundary(self) -> bool {
        (150..200).contains(&self.0) || (250..300).contains(&self.0)
    }
}

/// Groups registered during one build, written to the kernel in id order.
#[derive(Debug, Default)]
pub struct PhysicalGroupRegistry {
    entries: BTreeMap<i32, (&'static GroupSpec, Vec<Tag>)>,
    owners: HashMap<Handle, &'static str>,
}

impl PhysicalGroupRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handles` under the group `name`.
    ///
    /// Returns `None` without registering when `handles` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownGroup`] for a name outside the table,
    /// [`RegistryError::DuplicateTag`] if `name` was already registered in this
    /// build (table ids are unique per name, so no two names can collide),
    /// [`RegistryError::WrongDimension`] for a handle of the wrong dimension and
    /// [`RegistryError::HandleAlreadyGrouped`] if a handle already has a group.
    pub fn register(
        &mut self,
        name: &str,
        handles: &[Handle],
    ) -> Result<Option<&'static GroupSpec>, RegistryError> {
        let spec = lookup(name).ok_or_else(|| RegistryError::UnknownGroup(name.to_owned()))?;
        if handles.is_empty() {
            debug!(group = spec.name, "empty group skipped");
            return Ok(None);
        }
        if let Some((existing, _)) = self.entries.get(&spec.id) {
            return Err(RegistryError::DuplicateTag {
                id: spec.id,
                existing: existing.name,
                requested: spec.name,
            });
        }
        for &h in handles {
            if h.dim != spec.dim {
                return Err(RegistryError::WrongDimension {
                    group: spec.name,
                    expected: spec.dim,
                    found: h.dim,
                });
            }
            if let Some(&group) = self.owners.get(&h) {
                return Err(RegistryError::HandleAlreadyGrouped {
                    dim: h.dim,
                    tag: h.tag,
                    group,
                });
            }
        }
        let mut tags = Vec::with_capacity(handles.len());
        for &h in handles {
            if self.owners.insert(h, spec.name).is_none() {
                tags.push(h.tag);
            }
        }
        debug!(group = spec.name, id = spec.id, members = tags.len(), "group registered");
        self.entries.insert(spec.id, (spec, tags));
        Ok(Some(spec))
    }

    /// Members of a registered group.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Tag]> {
        let spec = lookup(name)?;
        self.entries.get(&spec.id).map(|(_, tags)| tags.as_slice())
    }

    /// Registered groups in id order.
    pub fn groups(&self) -> impl Iterator<Item = (&'static GroupSpec, &[Tag])> + '_ {
        self.entries.values().map(|(spec, tags)| (*spec, tags.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates and names every registered group in the kernel.
    ///
    /// # Errors
    ///
    /// Returns the kernel error if a group cannot be created.
    pub fn apply<K: Kernel>(&self, kernel: &mut K) -> Result<()> {
        for (spec, tags) in self.groups() {
            kernel.add_physical_group(spec.dim, tags, spec.id)?;
            kernel.set_group_name(spec.dim, spec.id, spec.name)?;
        }
        Ok(())
    }
}
