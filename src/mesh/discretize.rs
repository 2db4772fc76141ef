use crate::error::Result;
use crate::kernel::{CurveKey, CurveShape, GeoModel};
use crate::math::Point3;

use super::MeshOptions;

const MAX_SEGMENTS: usize = 10_000;

/// Splits a curve into equal segments sized from its end points.
pub struct DiscretizeCurve {
    curve: CurveKey,
}

impl DiscretizeCurve {
    #[must_use]
    pub fn new(curve: CurveKey) -> Self {
        Self { curve }
    }

    /// Number of segments for a curve of `length` between points of sizes
    /// `start_size` and `end_size`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn segment_count(length: f64, start_size: f64, end_size: f64, options: &MeshOptions) -> usize {
        let size = options
            .element_size(start_size)
            .min(options.element_size(end_size));
        if size <= 0.0 || !size.is_finite() {
            return 1;
        }
        let n = (length / size).ceil();
        if n.is_finite() {
            (n as usize).clamp(1, MAX_SEGMENTS)
        } else {
            MAX_SEGMENTS
        }
    }

    /// Returns the nodes from start to end, both included.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve is missing or degenerate.
    #[allow(clippy::cast_precision_loss)]
    pub fn execute(&self, model: &GeoModel) -> Result<Vec<Point3>> {
        let shape = model.curve(self.curve)?.shape;
        let (start, end) = shape.endpoints();
        let (start, end) = (model.point(start)?, model.point(end)?);
        let length = model.curve_length_of(self.curve)?;
        let n = Self::segment_count(length, start.size, end.size, model.options());

        let mut nodes = Vec::with_capacity(n + 1);
        nodes.push(start.coord);
        match shape {
            CurveShape::Line { .. } => {
                let step = (end.coord - start.coord) / n as f64;
                for i in 1..n {
                    nodes.push(start.coord + step * i as f64);
                }
            }
            CurveShape::Arc { .. } => {
                let arc = model.arc_params(&shape)?;
                for i in 1..n {
                    nodes.push(arc.point_at(i as f64 / n as f64, start.coord.z));
                }
            }
        }
        nodes.push(end.coord);
        Ok(nodes)
    }
}
