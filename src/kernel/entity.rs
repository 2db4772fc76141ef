use crate::math::Point3;

use super::{Dim, Tag};

slotmap::new_key_type! {
    /// Arena key of a point in a [`GeoModel`](super::GeoModel).
    pub struct PointKey;
    /// Arena key of a curve.
    pub struct CurveKey;
    /// Arena key of a curve loop.
    pub struct LoopKey;
    /// Arena key of a plane surface.
    pub struct SurfaceKey;
}

/// A model point.
#[derive(Debug, Clone)]
pub struct PointData {
    pub tag: Tag,
    pub coord: Point3,
    /// Target element size near this point; `0.0` means unconstrained.
    pub size: f64,
}

/// The geometric shape of a curve, by point reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveShape {
    /// A straight segment.
    Line { start: PointKey, end: PointKey },
    /// The minor circular arc from `start` to `end` around `center`.
    Arc {
        start: PointKey,
        center: PointKey,
        end: PointKey,
    },
}

impl CurveShape {
    /// Start and end points.
    #[must_use]
    pub fn endpoints(&self) -> (PointKey, PointKey) {
        match *self {
            Self::Line { start, end } | Self::Arc { start, end, .. } => (start, end),
        }
    }

    /// Every point the curve depends on.
    #[must_use]
    pub fn points(&self) -> Vec<PointKey> {
        match *self {
            Self::Line { start, end } => vec![start, end],
            Self::Arc { start, center, end } => vec![start, center, end],
        }
    }

    /// Returns the shape with every point passed through `f`.
    #[must_use]
    pub fn map_points(&self, mut f: impl FnMut(PointKey) -> PointKey) -> Self {
        match *self {
            Self::Line { start, end } => Self::Line {
                start: f(start),
                end: f(end),
            },
            Self::Arc { start, center, end } => Self::Arc {
                start: f(start),
                center: f(center),
                end: f(end),
            },
        }
    }

    #[must_use]
    pub fn is_arc(&self) -> bool {
        matches!(self, Self::Arc { .. })
    }
}

/// A model curve.
#[derive(Debug, Clone)]
pub struct CurveData {
    pub tag: Tag,
    pub shape: CurveShape,
}

/// A curve with orientation information within a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedCurve {
    pub curve: CurveKey,
    /// If `true`, the curve is traversed start → end.
    pub forward: bool,
}

/// A closed, ordered sequence of oriented curves.
#[derive(Debug, Clone)]
pub struct LoopData {
    pub tag: Tag,
    pub curves: Vec<OrientedCurve>,
}

/// A plane surface: one outer loop and any number of hole loops.
#[derive(Debug, Clone)]
pub struct SurfaceData {
    pub tag: Tag,
    pub outer: LoopKey,
    pub holes: Vec<LoopKey>,
}

impl SurfaceData {
    /// Outer loop followed by the holes.
    pub fn loops(&self) -> impl Iterator<Item = LoopKey> + '_ {
        std::iter::once(self.outer).chain(self.holes.iter().copied())
    }
}

/// A numbered, optionally named set of entities of one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalGroup {
    pub dim: Dim,
    pub id: i32,
    pub name: Option<String>,
    pub members: Vec<Tag>,
}
