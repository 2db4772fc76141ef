use tracing::debug;

use crate::error::Result;
use crate::kernel::{Handle, Kernel, Tag};
use crate::math::{Point3, Vector3};
use crate::primitives::{CurveSpec, RegionGeometry};

use super::planner::Replication;

/// Plane `y = 0`, the symmetry plane of every drawn sector.
pub const SECTOR_SYMMETRY_PLANE: [f64; 4] = [0.0, 1.0, 0.0, 0.0];

/// Kernel tags of a realized region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Realized {
    pub surface: Tag,
    /// Outer curve loop, usable as a hole of an enclosing region.
    pub boundary: Tag,
}

/// Realizes a drawn region as a plane surface.
pub struct RealizeRegion<'a> {
    region: &'a RegionGeometry,
    size: f64,
    holes: Vec<Tag>,
}

impl<'a> RealizeRegion<'a> {
    /// `size` is the element size of points without their own.
    #[must_use]
    pub fn new(region: &'a RegionGeometry, size: f64) -> Self {
        Self {
            region,
            size,
            holes: Vec::new(),
        }
    }

    /// Curve loops subtracted from the surface.
    #[must_use]
    pub fn with_holes(mut self, holes: Vec<Tag>) -> Self {
        self.holes = holes;
        self
    }

    /// Adds the points, curves, loop and surface.
    ///
    /// # Errors
    ///
    /// Returns a kernel error if a tag collides, a point is missing or the
    /// curves do not close.
    pub fn execute<K: Kernel>(&self, kernel: &mut K) -> Result<Realized> {
        for (&tag, point) in &self.region.points {
            kernel.add_point(point.coord, point.size.unwrap_or(self.size), tag)?;
        }
        let mut wire = Vec::with_capacity(self.region.curves.len());
        for (tag, curve) in self.region.present_curves() {
            match curve {
                CurveSpec::Line { start, end } => kernel.add_line(start, end, tag)?,
                CurveSpec::Arc { start, center, end } => kernel.add_arc(start, center, end, tag)?,
                CurveSpec::Absent(_) => continue,
            };
            wire.push(tag);
        }
        let boundary = kernel.add_curve_loop(&wire)?;
        let loops: Vec<Tag> = std::iter::once(boundary)
            .chain(self.holes.iter().copied())
            .collect();
        let surface = kernel.add_plane_surface(&loops)?;
        Ok(Realized { surface, boundary })
    }
}

/// One rotational copy: the drawn entities and their mirror image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance<'a> {
    pub primary: &'a [Handle],
    pub mirrored: Option<&'a [Handle]>,
}

impl Instance<'_> {
    /// Primary handles followed by mirrored ones.
    #[must_use]
    pub fn merged(&self) -> Vec<Handle> {
        let mut out = self.primary.to_vec();
        out.extend_from_slice(self.mirrored.unwrap_or_default());
        out
    }
}

/// Every instance one drawn feature produced, in replication order.
///
/// Copy `i` sits at `i · pitch` from the drawn sector. An empty value stands
/// for a feature this machine does not have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorInstances {
    primary: Vec<Vec<Handle>>,
    mirrored: Option<Vec<Vec<Handle>>>,
}

impl SectorInstances {
    /// The instances of an absent feature.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.iter().all(Vec::is_empty)
    }

    /// Number of rotational copies.
    #[must_use]
    pub fn copies(&self) -> usize {
        self.primary.len()
    }

    #[must_use]
    pub fn is_mirrored(&self) -> bool {
        self.mirrored.is_some()
    }

    /// Copy `i`, if it exists.
    #[must_use]
    pub fn copy(&self, i: usize) -> Option<Instance<'_>> {
        Some(Instance {
            primary: self.primary.get(i)?,
            mirrored: match &self.mirrored {
                Some(m) => Some(m.get(i)?.as_slice()),
                None => None,
            },
        })
    }

    /// All copies in order.
    pub fn iter(&self) -> impl Iterator<Item = Instance<'_>> + '_ {
        (0..self.copies()).filter_map(|i| self.copy(i))
    }

    /// Every handle: primary copies first, then mirrored ones.
    #[must_use]
    pub fn handles(&self) -> Vec<Handle> {
        self.primary
            .iter()
            .chain(self.mirrored.iter().flatten())
            .flatten()
            .copied()
            .collect()
    }

    /// Number of handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary
            .iter()
            .chain(self.mirrored.iter().flatten())
            .map(Vec::len)
            .sum()
    }

    /// Per copy, the primary handles together with their mirror image.
    #[must_use]
    pub fn merged_copies(&self) -> Vec<Vec<Handle>> {
        self.iter().map(|inst| inst.merged()).collect()
    }

    /// Per copy, the primary handles only.
    #[must_use]
    pub fn primary_copies(&self) -> Vec<Vec<Handle>> {
        self.primary.clone()
    }

    /// Per copy, the mirrored handles only; empty if not mirrored.
    #[must_use]
    pub fn mirrored_copies(&self) -> Vec<Vec<Handle>> {
        self.mirrored.clone().unwrap_or_default()
    }
}

/// Mirrors and rotationally copies already realized entities.
///
/// The mirror image is taken across [`SECTOR_SYMMETRY_PLANE`]. Each further
/// copy is made from the previous copy and rotated by one pitch about the
/// z axis through the machine center.
pub struct Replicate {
    seed: Vec<Handle>,
    mirror: bool,
    replication: Replication,
}

impl Replicate {
    #[must_use]
    pub fn new(seed: Vec<Handle>, mirror: bool, replication: Replication) -> Self {
        Self {
            seed,
            mirror,
            replication,
        }
    }

    /// Produces the instances.
    ///
    /// # Errors
    ///
    /// Returns a kernel error if copying or transforming fails.
    pub fn execute<K: Kernel>(&self, kernel: &mut K) -> Result<SectorInstances> {
        if self.seed.is_empty() {
            return Ok(SectorInstances::absent());
        }
        let copies = self.replication.copies.max(1);

        let mut mirrored = if self.mirror {
            let image = kernel.copy(&self.seed)?;
            kernel.mirror(&image, SECTOR_SYMMETRY_PLANE)?;
            Some(vec![image])
        } else {
            None
        };
        let mut primary = vec![self.seed.clone()];

        for _ in 1..copies {
            rotate_next(kernel, &mut primary, self.replication.pitch)?;
            if let Some(m) = mirrored.as_mut() {
                rotate_next(kernel, m, self.replication.pitch)?;
            }
        }

        let instances = SectorInstances { primary, mirrored };
        debug!(
            copies,
            mirrored = self.mirror,
            handles = instances.len(),
            "replicated"
        );
        Ok(instances)
    }
}

fn rotate_next<K: Kernel>(kernel: &mut K, chain: &mut Vec<Vec<Handle>>, pitch: f64) -> Result<()> {
    let last = chain.last().map(Vec::as_slice).unwrap_or_default();
    let next = kernel.copy(last)?;
    kernel.rotate(&next, Point3::origin(), Vector3::z(), pitch)?;
    chain.push(next);
    Ok(())
}
