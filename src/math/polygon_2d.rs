use super::Point3;

/// Computes the signed area of a polygon in the XY plane (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point3]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Even-odd point-in-polygon test in the XY plane.
#[must_use]
pub fn point_in_polygon_2d(px: f64, py: f64, polygon: &[Point3]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Returns the minimum distance from point `(px, py)` to the line segment
/// from `a` to `b`.
#[must_use]
pub fn point_to_segment_dist(px: f64, py: f64, a: &Point3, b: &Point3) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-20 {
        return (px - a.x).hypot(py - a.y);
    }

    // Project onto the infinite line, clamp to [0, 1].
    let t = (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    (px - (a.x + t * dx)).hypot(py - (a.y + t * dy))
}
