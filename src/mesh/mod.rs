//! Conforming triangle meshing of a synchronized [`GeoModel`](crate::kernel::GeoModel)
//! and Gmsh MSH 2.2 export.

mod discretize;
mod generate;
mod msh;
mod triangulate;

pub use discretize::DiscretizeCurve;
pub use generate::GenerateMesh;
pub use msh::MshWriter;

use serde::{Deserialize, Serialize};

use crate::kernel::Tag;
use crate::math::Point3;

/// Mesh sizing and merging parameters of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeshOptions {
    /// Multiplier applied to every point's target size.
    pub size_factor: f64,
    /// Lower clamp of the element size.
    pub size_min: f64,
    /// Upper clamp of the element size; also used where no size is given.
    pub size_max: f64,
    /// Relative distance under which two points are merged.
    pub tolerance: f64,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            size_factor: 1.0,
            size_min: 0.0,
            size_max: 1e22,
            tolerance: 1e-8,
        }
    }
}

impl MeshOptions {
    /// Effective element size near a point with target size `size`.
    #[must_use]
    pub fn element_size(&self, size: f64) -> f64 {
        let raw = if size > 0.0 {
            size * self.size_factor
        } else {
            self.size_max
        };
        raw.clamp(self.size_min, self.size_max.max(self.size_min))
    }
}

/// Element kinds written to the mesh file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// 2-node line.
    Line,
    /// 3-node triangle.
    Triangle,
}

impl ElementKind {
    /// MSH element type number.
    #[must_use]
    pub fn msh_type(self) -> u8 {
        match self {
            Self::Line => 1,
            Self::Triangle => 2,
        }
    }
}

/// One mesh element, tagged with its physical group and source entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    /// Physical group id; `0` when the model has no groups.
    pub physical: i32,
    /// Tag of the curve or surface the element discretizes.
    pub entity: Tag,
    /// Zero-based node indices.
    pub nodes: Vec<usize>,
}

/// A node/element mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub nodes: Vec<Point3>,
    pub elements: Vec<Element>,
}

impl Mesh {
    /// Elements belonging to physical group `physical`.
    pub fn elements_in(&self, physical: i32) -> impl Iterator<Item = &Element> + '_ {
        self.elements.iter().filter(move |e| e.physical == physical)
    }

    /// Number of elements of a kind.
    #[must_use]
    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind == kind).count()
    }
}
