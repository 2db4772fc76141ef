//! 2D arc math for arcs given as `[start, center, end]`.
//!
//! The arc is always the minor arc between start and end, so
//! `|sweep| < π`; a sweep of exactly π is ambiguous and rejected.

use std::f64::consts::PI;

use super::{Point3, TOLERANCE};

/// Center-radius-angle form of a minor arc in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcParams {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep: f64,
}

impl ArcParams {
    /// Arc length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.radius * self.sweep.abs()
    }

    /// Evaluates a point on the arc at parameter `t` in `[0, 1]`.
    #[must_use]
    pub fn point_at(&self, t: f64, z: f64) -> Point3 {
        let angle = self.start_angle + self.sweep * t;
        Point3::new(
            self.cx + self.radius * angle.cos(),
            self.cy + self.radius * angle.sin(),
            z,
        )
    }
}

/// Why a `[start, center, end]` triple does not define an arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDefect {
    /// Start coincides with the center.
    ZeroRadius,
    /// Start and end are at different distances from the center.
    UnequalRadii,
    /// Start and end coincide, or are diametrically opposite.
    AmbiguousSweep,
}

/// Computes the minor arc from `start` to `end` around `center`.
///
/// # Errors
///
/// Returns an [`ArcDefect`] if the three points do not define a unique minor arc.
pub fn arc_from_center(start: &Point3, center: &Point3, end: &Point3) -> Result<ArcParams, ArcDefect> {
    let (sx, sy) = (start.x - center.x, start.y - center.y);
    let (ex, ey) = (end.x - center.x, end.y - center.y);
    let r0 = sx.hypot(sy);
    let r1 = ex.hypot(ey);
    if r0 < TOLERANCE {
        return Err(ArcDefect::ZeroRadius);
    }
    if (r0 - r1).abs() > 1e-6 * r0.max(1.0) {
        return Err(ArcDefect::UnequalRadii);
    }

    let start_angle = sy.atan2(sx);
    let sweep = (sx * ey - sy * ex).atan2(sx * ex + sy * ey);
    if sweep.abs() < TOLERANCE || (PI - sweep.abs()) < 1e-9 {
        return Err(ArcDefect::AmbiguousSweep);
    }

    Ok(ArcParams {
        cx: center.x,
        cy: center.y,
        radius: r0,
        start_angle,
        sweep,
    })
}
