//! Geometric coherence: merging of coincident points and duplicate curves.
//!
//! Replicated sector copies share their seams only geometrically. Merging
//! makes neighbouring copies reference the same boundary curve so that the
//! mesher discretizes each seam once and the mesh is conforming.

use std::collections::HashMap;

use super::GeoModel;
use crate::error::{KernelError, Result};
use crate::kernel::{CurveKey, CurveShape, Dim, PointKey, Tag};

type Cell = (i64, i64, i64);

/// Identity of a curve up to orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Signature {
    Line(Tag, Tag),
    Arc(Tag, Tag, Tag),
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(x: f64, y: f64, z: f64, size: f64) -> Cell {
    (
        (x / size).floor() as i64,
        (y / size).floor() as i64,
        (z / size).floor() as i64,
    )
}

fn neighbours((i, j, k): Cell) -> impl Iterator<Item = Cell> {
    (-1..=1).flat_map(move |di| {
        (-1..=1).flat_map(move |dj| (-1..=1).map(move |dk| (i + di, j + dj, k + dk)))
    })
}

/// Smallest positive size, where non-positive means unconstrained.
fn finer(a: f64, b: f64) -> f64 {
    if a <= 0.0 {
        b
    } else if b <= 0.0 {
        a
    } else {
        a.min(b)
    }
}

impl GeoModel {
    /// Merges coincident points, then curves made identical by the merge.
    ///
    /// Loops and physical groups are rewired to the surviving entities.
    /// Returns the number of removed entities.
    pub(super) fn merge_coincident(&mut self) -> Result<usize> {
        let tol = self.merge_tolerance();

        let point_map = self.find_coincident_points(tol);
        let mut point_tags = HashMap::with_capacity(point_map.len());
        for (&dup, &keep) in &point_map {
            let (Some(d), Some(k)) = (self.points.get(dup), self.points.get(keep)) else {
                continue;
            };
            point_tags.insert(d.tag, k.tag);
            let size = finer(d.size, k.size);
            if let Some(k) = self.points.get_mut(keep) {
                k.size = size;
            }
        }
        for curve in self.curves.values_mut() {
            curve.shape = curve
                .shape
                .map_points(|p| *point_map.get(&p).unwrap_or(&p));
        }
        for &dup in point_map.keys() {
            if let Some(data) = self.points.remove(dup) {
                self.point_tags.remove(&data.tag);
            }
        }

        let curve_map = self.find_duplicate_curves()?;
        let mut curve_tags = HashMap::with_capacity(curve_map.len());
        for (&dup, &(keep, _)) in &curve_map {
            if let (Some(d), Some(k)) = (self.curves.get(dup), self.curves.get(keep)) {
                curve_tags.insert(d.tag, k.tag);
            }
        }
        for lp in self.loops.values_mut() {
            for oc in &mut lp.curves {
                if let Some(&(keep, same_direction)) = curve_map.get(&oc.curve) {
                    oc.curve = keep;
                    if !same_direction {
                        oc.forward = !oc.forward;
                    }
                }
            }
        }
        for &dup in curve_map.keys() {
            if let Some(data) = self.curves.remove(dup) {
                self.curve_tags.remove(&data.tag);
            }
        }

        for group in self.groups.values_mut() {
            let renames = match group.dim {
                Dim::Point => &point_tags,
                Dim::Curve => &curve_tags,
                Dim::Surface => continue,
            };
            let mut members: Vec<Tag> = Vec::with_capacity(group.members.len());
            for tag in &group.members {
                let tag = *renames.get(tag).unwrap_or(tag);
                if !members.contains(&tag) {
                    members.push(tag);
                }
            }
            group.members = members;
        }

        Ok(point_map.len() + curve_map.len())
    }

    /// Absolute merge distance, scaled by the model extent.
    fn merge_tolerance(&self) -> f64 {
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for p in self.points.values() {
            for (axis, v) in [p.coord.x, p.coord.y, p.coord.z].into_iter().enumerate() {
                lo[axis] = lo[axis].min(v);
                hi[axis] = hi[axis].max(v);
            }
        }
        let diagonal = if self.points.is_empty() {
            0.0
        } else {
            ((hi[0] - lo[0]).powi(2) + (hi[1] - lo[1]).powi(2) + (hi[2] - lo[2]).powi(2)).sqrt()
        };
        self.options.tolerance * diagonal.max(1.0)
    }

    /// Maps every duplicate point to the earliest-tagged point it coincides with.
    fn find_coincident_points(&self, tol: f64) -> HashMap<PointKey, PointKey> {
        let mut grid: HashMap<Cell, Vec<PointKey>> = HashMap::new();
        let mut merged = HashMap::new();
        for &key in self.point_tags.values() {
            let Some(point) = self.points.get(key) else {
                continue;
            };
            let c = point.coord;
            let cell = cell_of(c.x, c.y, c.z, tol);
            let existing = neighbours(cell).find_map(|n| {
                grid.get(&n)?.iter().copied().find(|&k| {
                    self.points
                        .get(k)
                        .is_some_and(|other| (other.coord - c).norm() <= tol)
                })
            });
            match existing {
                Some(keep) => {
                    merged.insert(key, keep);
                }
                None => grid.entry(cell).or_default().push(key),
            }
        }
        merged
    }

    /// Maps every duplicate curve to the earliest-tagged identical curve,
    /// with `true` when both run in the same direction.
    fn find_duplicate_curves(&self) -> Result<HashMap<CurveKey, (CurveKey, bool)>> {
        let mut seen: HashMap<Signature, (CurveKey, PointKey)> = HashMap::new();
        let mut merged = HashMap::new();
        for (key, curve) in self.curves() {
            let (start, end) = curve.shape.endpoints();
            if start == end {
                return Err(KernelError::Degenerate(format!(
                    "curve {} collapsed to a point while merging",
                    curve.tag
                ))
                .into());
            }
            let signature = self.signature(&curve.shape)?;
            match seen.get(&signature) {
                Some(&(keep, keep_start)) => {
                    merged.insert(key, (keep, keep_start == start));
                }
                None => {
                    seen.insert(signature, (key, start));
                }
            }
        }
        Ok(merged)
    }

    fn signature(&self, shape: &CurveShape) -> Result<Signature> {
        let tag = |k: PointKey| self.point(k).map(|p| p.tag);
        let ordered = |a: Tag, b: Tag| if a <= b { (a, b) } else { (b, a) };
        Ok(match *shape {
            CurveShape::Line { start, end } => {
                let (a, b) = ordered(tag(start)?, tag(end)?);
                Signature::Line(a, b)
            }
            CurveShape::Arc { start, center, end } => {
                let (a, b) = ordered(tag(start)?, tag(end)?);
                Signature::Arc(a, b, tag(center)?)
            }
        })
    }
}
