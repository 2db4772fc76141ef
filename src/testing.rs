//! Drawn machine fixtures shared by unit tests.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::f64::consts::PI;

use tempfile::TempDir;

use crate::kernel::Tag;
use crate::machine::{
    ConnectionMatrix, MachineDescription, MagnetTopology, RotorBoundaries, RotorDescription,
    RotorTopology, StatorBoundaries, StatorDescription, Winding, WindingLayout,
};
use crate::mesh::MeshOptions;
use crate::primitives::{CurveSpec, PointSpec, RegionGeometry};

/// A region outlined by polar vertices `(r, θ)`.
///
/// Point `base` is the origin, vertex `k` is point `base + k + 1` and curve
/// `base + k + 1` runs from vertex `k` to the next one. Edges between vertices
/// on the same circle are arcs about the origin, the others are lines.
pub(crate) fn sector_region(base: Tag, vertices: &[(f64, f64)]) -> RegionGeometry {
    let tags: Vec<Tag> = (base + 1..).take(vertices.len()).collect();
    let mut points = BTreeMap::from([(base, PointSpec::new(0.0, 0.0))]);
    for (&tag, &(r, theta)) in tags.iter().zip(vertices) {
        points.insert(tag, PointSpec::new(r * theta.cos(), r * theta.sin()));
    }
    let mut curves = BTreeMap::new();
    for (k, &(r, _)) in vertices.iter().enumerate() {
        let next = (k + 1) % vertices.len();
        let (start, end) = (tags[k], tags[next]);
        let curve = if (r - vertices[next].0).abs() < 1e-12 && r > 0.0 {
            CurveSpec::Arc {
                start,
                center: base,
                end,
            }
        } else {
            CurveSpec::Line { start, end }
        };
        curves.insert(start, curve);
    }
    RegionGeometry { points, curves }
}

/// Ring sector between radii `r_in`, `r_out` and angles `theta0`, `theta1`.
///
/// Curves: `base + 1` line at `theta0`, `base + 2` outer arc, `base + 3` line
/// at `theta1`, `base + 4` inner arc.
pub(crate) fn annular_sector(
    base: Tag,
    r_in: f64,
    r_out: f64,
    theta0: f64,
    theta1: f64,
) -> RegionGeometry {
    sector_region(
        base,
        &[(r_in, theta0), (r_out, theta0), (r_out, theta1), (r_in, theta1)],
    )
}

/// Three-phase single-layer matrix for a 12-slot, 2-pole-pair machine.
pub(crate) fn single_layer_matrix() -> Vec<Vec<i32>> {
    vec![
        vec![1, 0, 0, -1, 0, 0, 1, 0, 0, -1, 0, 0],
        vec![0, 0, 1, 0, 0, -1, 0, 0, 1, 0, 0, -1],
        vec![0, -1, 0, 0, 1, 0, 0, -1, 0, 0, 1, 0],
    ]
}

/// Fresh scratch directory, removed when dropped.
pub(crate) fn scratch_dir(name: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("emsector-{name}-"))
        .tempdir()
        .unwrap()
}

fn stator(slots: i32, layout: WindingLayout) -> StatorDescription {
    let h = PI / f64::from(slots);
    let a = h / 3.0;
    let conductors = if layout == WindingLayout::DualLayerTopBottom {
        vec![
            annular_sector(800, 1.8, 1.95, -0.8 * a, -0.2 * a),
            annular_sector(1000, 1.55, 1.7, -0.8 * a, -0.2 * a),
        ]
    } else {
        vec![annular_sector(800, 1.6, 1.9, -0.8 * a, -0.2 * a)]
    };
    StatorDescription {
        sliding_airgap: Some(annular_sector(100, 1.1, 1.2, -h, 0.0)),
        stator_airgap: Some(sector_region(
            200,
            &[(1.2, -h), (1.3, -h), (1.3, -a), (1.3, 0.0), (1.2, 0.0)],
        )),
        tooth_tip: Some(annular_sector(300, 1.3, 1.4, -h, -a)),
        slot_opening: Some(annular_sector(400, 1.3, 1.4, -a, 0.0)),
        slot_wedge: Some(annular_sector(500, 1.4, 1.5, -a, 0.0)),
        tooth: Some(sector_region(
            600,
            &[(1.4, -h), (2.0, -h), (2.0, -a), (1.5, -a), (1.4, -a)],
        )),
        coil_area: Some(annular_sector(700, 1.5, 2.0, -a, 0.0)),
        conductors,
        backiron: Some(sector_region(
            900,
            &[(2.0, -h), (2.5, -h), (2.5, 0.0), (2.0, 0.0), (2.0, -a)],
        )),
        boundaries: StatorBoundaries {
            outer: vec![902],
            master: vec![101, 201, 301, 601, 901],
            airgap_arc: vec![205],
            sliding: vec![104],
        },
    }
}

fn rotor(pole_pairs: i32, topology: RotorTopology) -> RotorDescription {
    let h = PI / f64::from(2 * pole_pairs);
    let shaft = sector_region(100, &[(0.0, 0.0), (0.3, -h), (0.3, 0.0)]);
    let boundaries = RotorBoundaries {
        master: vec![101, 201, 401],
        sliding: vec![402],
    };
    if topology.is_interior() {
        RotorDescription {
            shaft: Some(shaft),
            core: Some(annular_sector(200, 0.3, 0.9, -h, 0.0)),
            rotor_airgap: Some(annular_sector(400, 0.9, 1.1, -h, 0.0)),
            magnets: vec![annular_sector(300, 0.6, 0.7, -0.65 * h, -0.25 * h)],
            // Shares its edge at -0.65 h with the magnet.
            pockets: vec![annular_sector(500, 0.6, 0.7, -0.85 * h, -0.65 * h)],
            boundaries,
        }
    } else {
        let m = 2.0 * h / 3.0;
        RotorDescription {
            shaft: Some(shaft),
            core: Some(sector_region(
                200,
                &[(0.3, -h), (0.8, -h), (0.8, -m), (0.8, 0.0), (0.3, 0.0)],
            )),
            rotor_airgap: Some(sector_region(
                400,
                &[(0.8, -h), (1.1, -h), (1.1, 0.0), (0.9, 0.0), (0.9, -m), (0.8, -m)],
            )),
            magnets: vec![annular_sector(300, 0.8, 0.9, -m, 0.0)],
            pockets: Vec::new(),
            boundaries,
        }
    }
}

/// A complete machine with concentric ring-sector regions.
///
/// Single-layer windings use [`single_layer_matrix`]; dual layers repeat it
/// for the second row band.
pub(crate) fn machine(
    slots: i32,
    pole_pairs: i32,
    rotor_topology: RotorTopology,
    layout: WindingLayout,
) -> MachineDescription {
    let mut rows = single_layer_matrix();
    if layout != WindingLayout::SingleLayer {
        rows.extend(single_layer_matrix());
    }
    MachineDescription {
        slots,
        pole_pairs,
        rotor_topology,
        magnet_topology: MagnetTopology::Simple,
        winding: Winding {
            layout,
            connection_matrix: ConnectionMatrix::new(rows).unwrap(),
        },
        stator: stator(slots, layout),
        rotor: rotor(pole_pairs, rotor_topology),
        mesh: MeshOptions::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dirs_are_distinct() {
        let first = scratch_dir("shared");
        std::fs::write(first.path().join("stator.msh"), "x").unwrap();
        let second = scratch_dir("shared");
        assert_ne!(first.path(), second.path());
        assert!(first.path().join("stator.msh").is_file());
        let kept = second.path().to_path_buf();
        drop(second);
        assert!(!kept.exists());
    }

    #[test]
    fn sector_region_mixes_arcs_and_lines() {
        let region = annular_sector(10, 1.0, 2.0, -0.5, 0.0);
        assert_eq!(region.points.len(), 5);
        assert_eq!(region.curves[&11], CurveSpec::Line { start: 11, end: 12 });
        assert_eq!(
            region.curves[&12],
            CurveSpec::Arc {
                start: 12,
                center: 10,
                end: 13
            }
        );
        assert_eq!(
            region.curves[&14],
            CurveSpec::Arc {
                start: 14,
                center: 10,
                end: 11
            }
        );
    }
}
