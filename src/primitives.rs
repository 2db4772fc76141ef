//! Drawn geometry primitives of one cross-section region.
//!
//! A region is a map of point ids to coordinates and a map of curve ids to
//! the point ids they join. Curves listed with a single id are placeholders
//! for a curve that does not exist in this variant and are skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::kernel::Tag;
use crate::math::Point3;

/// A drawn point with an optional explicit element size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPoint", into = "RawPoint")]
pub struct PointSpec {
    pub coord: Point3,
    /// Overrides the region's element size at this point.
    pub size: Option<f64>,
}

impl PointSpec {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            coord: Point3::new(x, y, 0.0),
            size: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Bare([f64; 3]),
    Sized { at: [f64; 3], size: f64 },
}

impl From<RawPoint> for PointSpec {
    fn from(raw: RawPoint) -> Self {
        match raw {
            RawPoint::Bare([x, y, z]) => Self {
                coord: Point3::new(x, y, z),
                size: None,
            },
            RawPoint::Sized { at: [x, y, z], size } => Self {
                coord: Point3::new(x, y, z),
                size: Some(size),
            },
        }
    }
}

impl From<PointSpec> for RawPoint {
    fn from(p: PointSpec) -> Self {
        let at = [p.coord.x, p.coord.y, p.coord.z];
        match p.size {
            Some(size) => Self::Sized { at, size },
            None => Self::Bare(at),
        }
    }
}

/// A drawn curve, by point id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tag>", into = "Vec<Tag>")]
pub enum CurveSpec {
    /// Placeholder for a curve this variant does not have.
    Absent(Tag),
    Line { start: Tag, end: Tag },
    /// Minor circular arc from `start` to `end`; `center` is the arc center.
    Arc { start: Tag, center: Tag, end: Tag },
}

impl TryFrom<Vec<Tag>> for CurveSpec {
    type Error = TopologyError;

    fn try_from(ids: Vec<Tag>) -> Result<Self, Self::Error> {
        match ids[..] {
            [id] => Ok(Self::Absent(id)),
            [start, end] => Ok(Self::Line { start, end }),
            [start, center, end] => Ok(Self::Arc { start, center, end }),
            _ => Err(TopologyError::InvalidPrimitive(format!(
                "a curve joins 1, 2 or 3 points, got {ids:?}"
            ))),
        }
    }
}

impl From<CurveSpec> for Vec<Tag> {
    fn from(c: CurveSpec) -> Self {
        match c {
            CurveSpec::Absent(id) => vec![id],
            CurveSpec::Line { start, end } => vec![start, end],
            CurveSpec::Arc { start, center, end } => vec![start, center, end],
        }
    }
}

/// Closed outline of one region in the drawn sector.
///
/// `points` may be empty when the outline only reuses points realized by
/// regions built before it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionGeometry {
    #[serde(default)]
    pub points: BTreeMap<Tag, PointSpec>,
    pub curves: BTreeMap<Tag, CurveSpec>,
}

impl RegionGeometry {
    /// Curves that exist, in id order.
    pub fn present_curves(&self) -> impl Iterator<Item = (Tag, CurveSpec)> + '_ {
        self.curves
            .iter()
            .filter(|(_, c)| !matches!(c, CurveSpec::Absent(_)))
            .map(|(&tag, &c)| (tag, c))
    }

    /// Larger side of the bounding box of the region's own points.
    #[must_use]
    pub fn extent(&self) -> Option<f64> {
        let mut it = self.points.values().map(|p| p.coord);
        let first = it.next()?;
        let (mut lo, mut hi) = (first, first);
        for c in it {
            lo = Point3::new(lo.x.min(c.x), lo.y.min(c.y), 0.0);
            hi = Point3::new(hi.x.max(c.x), hi.y.max(c.y), 0.0);
        }
        Some((hi.x - lo.x).max(hi.y - lo.y))
    }

    /// Element size derived from the region extent, or `None` when the region
    /// has no points of its own.
    #[must_use]
    pub fn mesh_size(&self, divisor: f64) -> Option<f64> {
        self.extent().filter(|e| *e > 0.0).map(|e| e / divisor)
    }

    /// Checks that the region has at least one curve.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidPrimitive`] if every curve is a placeholder.
    pub fn validate(&self, name: &str) -> Result<(), TopologyError> {
        if self.present_curves().next().is_none() {
            return Err(TopologyError::InvalidPrimitive(format!("{name} has no curves")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn parses_points_and_curves() {
        let json = r#"{
            "points": {
                "1": [0.0, 0.0, 0.0],
                "2": {"at": [0.02, 0.0, 0.0], "size": 0.001},
                "3": [0.0, 0.01, 0.0]
            },
            "curves": {"10": [1, 2], "11": [2, 1, 3], "12": [3, 1], "13": [0]}
        }"#;
        let region: RegionGeometry = serde_json::from_str(json).unwrap();
        assert_eq!(region.points[&2].size, Some(0.001));
        assert_eq!(region.points[&1].size, None);
        assert_eq!(
            region.curves[&11],
            CurveSpec::Arc {
                start: 2,
                center: 1,
                end: 3
            }
        );
        assert_eq!(region.present_curves().count(), 3);
        assert_relative_eq!(region.mesh_size(2.0).unwrap(), 0.01);
    }

    #[test]
    fn rejects_four_point_curve() {
        let json = r#"{"curves": {"1": [1, 2, 3, 4]}}"#;
        let err = serde_json::from_str::<RegionGeometry>(json).unwrap_err();
        assert!(err.to_string().contains("1, 2 or 3 points"));
    }

    #[test]
    fn region_without_points_has_no_size() {
        let json = r#"{"curves": {"1": [1, 2]}}"#;
        let region: RegionGeometry = serde_json::from_str(json).unwrap();
        assert_eq!(region.mesh_size(2.0), None);
        assert!(region.validate("coil area").is_ok());
    }

    #[test]
    fn placeholder_only_region_is_invalid() {
        let region = RegionGeometry {
            points: BTreeMap::new(),
            curves: BTreeMap::from([(1, CurveSpec::Absent(0))]),
        };
        assert!(region.validate("slot wedge").is_err());
    }
}
