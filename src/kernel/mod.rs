//! Geometry/meshing kernel capability interface.
//!
//! The assembly only talks to a kernel through [`Kernel`]. [`GeoModel`] is the
//! in-memory implementation shipped with the crate; [`Session`] scopes one model
//! build so that two builds never share kernel state.

pub mod entity;
mod model;
mod session;

use std::path::Path;

pub use entity::{
    CurveData, CurveKey, CurveShape, LoopData, LoopKey, OrientedCurve, PhysicalGroup,
    PointData, PointKey, SurfaceData, SurfaceKey,
};
pub use model::GeoModel;
pub use session::Session;

use crate::error::Result;
use crate::math::{Point3, Vector3};

/// Caller- or kernel-assigned integer identifier of a kernel entity.
pub type Tag = i32;

/// Topological dimension of a kernel entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    Point,
    Curve,
    Surface,
}

impl Dim {
    /// Numeric dimension as written to mesh files.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Point => 0,
            Self::Curve => 1,
            Self::Surface => 2,
        }
    }
}

/// Value reference to a kernel entity, used for transforms and group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    pub dim: Dim,
    pub tag: Tag,
}

impl Handle {
    #[must_use]
    pub fn curve(tag: Tag) -> Self {
        Self {
            dim: Dim::Curve,
            tag,
        }
    }

    #[must_use]
    pub fn surface(tag: Tag) -> Self {
        Self {
            dim: Dim::Surface,
            tag,
        }
    }
}

/// Geometric kind of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    Segment,
    Arc,
}

/// Capabilities the assembly needs from a geometry/meshing kernel.
///
/// Points and curves carry caller-assigned tags; curve loops and surfaces get
/// kernel-assigned tags. Copies produce fresh tags for every entity they
/// duplicate, including the boundary entities of a copied surface.
pub trait Kernel {
    /// Adds a point with a target element size.
    ///
    /// # Errors
    ///
    /// Returns an error if `tag` is already used by another point.
    fn add_point(&mut self, coord: Point3, size: f64, tag: Tag) -> Result<Tag>;

    /// Adds a straight segment between two existing points.
    ///
    /// # Errors
    ///
    /// Returns an error if a point is missing or `tag` is in use.
    fn add_line(&mut self, start: Tag, end: Tag, tag: Tag) -> Result<Tag>;

    /// Adds the minor circular arc from `start` to `end` around `center`.
    ///
    /// # Errors
    ///
    /// Returns an error if a point is missing, `tag` is in use or the three
    /// points do not define a unique minor arc.
    fn add_arc(&mut self, start: Tag, center: Tag, end: Tag, tag: Tag) -> Result<Tag>;

    /// Builds a closed loop from curves, reordering and reorienting as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a curve is missing or the curves do not close.
    fn add_curve_loop(&mut self, curves: &[Tag]) -> Result<Tag>;

    /// Adds a plane surface bounded by the first loop, with the others as holes.
    ///
    /// # Errors
    ///
    /// Returns an error if a loop is missing or no loop is given.
    fn add_plane_surface(&mut self, loops: &[Tag]) -> Result<Tag>;

    /// Deep-copies entities, returning the new handles in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity is missing.
    fn copy(&mut self, handles: &[Handle]) -> Result<Vec<Handle>>;

    /// Rotates entities (and every point they depend on) about an axis.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity is missing or the axis is zero.
    fn rotate(&mut self, handles: &[Handle], origin: Point3, axis: Vector3, angle: f64)
        -> Result<()>;

    /// Reflects entities across the plane `a·x + b·y + c·z + d = 0`.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity is missing or the plane normal is zero.
    fn mirror(&mut self, handles: &[Handle], plane: [f64; 4]) -> Result<()>;

    /// Creates physical group `id` of dimension `dim`.
    ///
    /// # Errors
    ///
    /// Returns an error if a member is missing or the id is taken.
    fn add_physical_group(&mut self, dim: Dim, tags: &[Tag], id: i32) -> Result<()>;

    /// Names an existing physical group.
    ///
    /// # Errors
    ///
    /// Returns an error if the group does not exist.
    fn set_group_name(&mut self, dim: Dim, id: i32, name: &str) -> Result<()>;

    /// Length of a curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve is missing or degenerate.
    fn curve_length(&self, tag: Tag) -> Result<f64>;

    /// Whether a curve is a segment or an arc.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve is missing.
    fn curve_kind(&self, tag: Tag) -> Result<CurveKind>;

    /// Makes the built geometry visible to the mesher, merging coincident entities.
    ///
    /// # Errors
    ///
    /// Returns an error if merging collapses a curve.
    fn synchronize(&mut self) -> Result<()>;

    /// Generates a mesh up to dimension `dim`.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity cannot be meshed (e.g. a zero-area surface).
    fn generate_mesh(&mut self, dim: Dim) -> Result<()>;

    /// Writes the generated mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if no mesh exists or the file cannot be written.
    fn write_mesh(&self, path: &Path) -> Result<()>;

    /// Discards every entity, group and mesh.
    fn reset(&mut self);
}
