use std::collections::{HashMap, HashSet};

use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::{KernelError, Result};
use crate::kernel::Tag;
use crate::math::polygon_2d::{point_in_polygon_2d, point_to_segment_dist, signed_area_2d};
use crate::math::Point3;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Upper bound on interior points added to one surface.
const MAX_STEINER: f64 = 20_000.0;

/// Triangulates one plane surface from its discretized boundary rings.
///
/// The first ring is the outer boundary, the others are holes. Ring entries
/// are indices into the shared node list, so neighbouring surfaces meet at
/// identical nodes. Interior nodes are appended to that list.
pub(super) struct TriangulateSurface<'a> {
    surface: Tag,
    rings: &'a [Vec<usize>],
}

impl<'a> TriangulateSurface<'a> {
    pub(super) fn new(surface: Tag, rings: &'a [Vec<usize>]) -> Self {
        Self { surface, rings }
    }

    fn degenerate(&self, what: &str) -> KernelError {
        KernelError::Degenerate(format!("surface {}: {what}", self.surface))
    }

    /// Returns counter-clockwise triangles as node index triples.
    pub(super) fn execute(&self, nodes: &mut Vec<Point3>) -> Result<Vec<[usize; 3]>> {
        let polygons: Vec<Vec<Point3>> = self
            .rings
            .iter()
            .map(|ring| ring.iter().filter_map(|&i| nodes.get(i).copied()).collect())
            .collect();
        let Some((outer, holes)) = polygons.split_first() else {
            return Err(self.degenerate("no boundary").into());
        };
        if polygons.iter().any(|p| p.len() < 3) {
            return Err(self.degenerate("boundary loop has fewer than 3 nodes").into());
        }

        let perimeter = ring_perimeter(outer);
        let area = signed_area_2d(outer).abs()
            - holes.iter().map(|h| signed_area_2d(h).abs()).sum::<f64>();
        if area <= 1e-9 * perimeter * perimeter {
            return Err(self.degenerate("zero area").into());
        }

        let mut cdt = Cdt::new();
        let mut vertex_nodes: HashMap<usize, usize> = HashMap::new();
        for (ring, polygon) in self.rings.iter().zip(&polygons) {
            let mut handles = Vec::with_capacity(ring.len());
            for (&node, p) in ring.iter().zip(polygon) {
                let h = cdt.insert(SpadePoint2::new(p.x, p.y)).map_err(|e: InsertionError| {
                    self.degenerate(&format!("CDT insert: {e}"))
                })?;
                vertex_nodes.entry(h.index()).or_insert(node);
                handles.push(h);
            }
            for (i, &from) in handles.iter().enumerate() {
                let to = handles[(i + 1) % handles.len()];
                if from == to || cdt.exists_constraint(from, to) {
                    continue;
                }
                if !cdt.can_add_constraint(from, to) {
                    return Err(self.degenerate("boundary intersects itself").into());
                }
                cdt.add_constraint(from, to);
            }
        }

        let z = outer[0].z;
        let spacing = mean_segment_length(&polygons);
        for (x, y) in steiner_points(outer, holes, spacing, area) {
            let h = cdt
                .insert(SpadePoint2::new(x, y))
                .map_err(|e: InsertionError| self.degenerate(&format!("CDT insert: {e}")))?;
            vertex_nodes.entry(h.index()).or_insert_with(|| {
                nodes.push(Point3::new(x, y, z));
                nodes.len() - 1
            });
        }

        let interior = interior_faces(&cdt, outer, holes);
        let mut triangles = Vec::with_capacity(interior.len());
        for face in cdt.inner_faces() {
            if !interior.contains(&face.fix().index()) {
                continue;
            }
            let mut tri = [0usize; 3];
            for (slot, v) in tri.iter_mut().zip(face.vertices()) {
                *slot = *vertex_nodes
                    .get(&v.fix().index())
                    .ok_or_else(|| self.degenerate("constraint split a boundary segment"))?;
            }
            let corners = [nodes[tri[0]], nodes[tri[1]], nodes[tri[2]]];
            if signed_area_2d(&corners) < 0.0 {
                tri.swap(1, 2);
            }
            triangles.push(tri);
        }
        if triangles.is_empty() {
            return Err(self.degenerate("no interior triangles").into());
        }
        Ok(triangles)
    }
}

fn ring_perimeter(ring: &[Point3]) -> f64 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| (b - a).norm())
        .sum()
}

#[allow(clippy::cast_precision_loss)]
fn mean_segment_length(rings: &[Vec<Point3>]) -> f64 {
    let count: usize = rings.iter().map(Vec::len).sum();
    if count == 0 {
        return 0.0;
    }
    rings.iter().map(|r| ring_perimeter(r)).sum::<f64>() / count as f64
}

/// Regular grid of interior points keeping half a spacing clear of every ring.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn steiner_points(outer: &[Point3], holes: &[Vec<Point3>], spacing: f64, area: f64) -> Vec<(f64, f64)> {
    if spacing <= 0.0 {
        return Vec::new();
    }
    let step = spacing.max((area / MAX_STEINER).sqrt());
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in outer {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let nx = ((max_x - min_x) / step).ceil() as usize;
    let ny = ((max_y - min_y) / step).ceil() as usize;
    let clearance = 0.5 * step;

    let rings: Vec<&[Point3]> = std::iter::once(outer)
        .chain(holes.iter().map(Vec::as_slice))
        .collect();
    let clear = |x: f64, y: f64| {
        rings.iter().all(|ring| {
            ring.iter()
                .zip(ring.iter().cycle().skip(1))
                .all(|(a, b)| point_to_segment_dist(x, y, a, b) >= clearance)
        })
    };

    let mut points = Vec::new();
    for i in 0..nx {
        for j in 0..ny {
            let x = min_x + (i as f64 + 0.5) * step;
            let y = min_y + (j as f64 + 0.5) * step;
            if point_in_polygon_2d(x, y, outer)
                && !holes.iter().any(|h| point_in_polygon_2d(x, y, h))
                && clear(x, y)
            {
                points.push((x, y));
            }
        }
    }
    points
}

/// Inner faces of the CDT lying inside the outer ring and outside every hole.
///
/// Faces never cross a constraint, so the centroid decides for the whole face;
/// holes that share an edge are handled like any other hole.
fn interior_faces(cdt: &Cdt, outer: &[Point3], holes: &[Vec<Point3>]) -> HashSet<usize> {
    cdt.inner_faces()
        .filter(|face| {
            let [a, b, c] = face.positions();
            let (x, y) = ((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
            point_in_polygon_2d(x, y, outer) && !holes.iter().any(|h| point_in_polygon_2d(x, y, h))
        })
        .map(|face| face.fix().index())
        .collect()
}
