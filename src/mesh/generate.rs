use std::collections::HashMap;

use crate::error::Result;
use crate::kernel::{CurveKey, Dim, GeoModel, LoopKey, PhysicalGroup, PointKey, SurfaceData, Tag};
use crate::math::Point3;

use super::discretize::DiscretizeCurve;
use super::triangulate::TriangulateSurface;
use super::{Element, ElementKind, Mesh};

/// Meshes the physical groups of a synchronized model up to a dimension.
///
/// Every curve is discretized once and shared by all loops that use it, so
/// adjacent surfaces meet node to node. Only entities in a physical group
/// produce elements; a model without groups meshes everything under id `0`.
pub struct GenerateMesh<'a> {
    model: &'a GeoModel,
    dim: Dim,
}

#[derive(Default)]
struct NodeTable {
    nodes: Vec<Point3>,
    points: HashMap<PointKey, usize>,
    curves: HashMap<CurveKey, Vec<usize>>,
}

impl NodeTable {
    fn point_node(&mut self, model: &GeoModel, key: PointKey) -> Result<usize> {
        if let Some(&n) = self.points.get(&key) {
            return Ok(n);
        }
        self.nodes.push(model.point(key)?.coord);
        let n = self.nodes.len() - 1;
        self.points.insert(key, n);
        Ok(n)
    }

    fn curve_nodes(&mut self, model: &GeoModel, key: CurveKey) -> Result<Vec<usize>> {
        if let Some(nodes) = self.curves.get(&key) {
            return Ok(nodes.clone());
        }
        let (start, end) = model.curve(key)?.shape.endpoints();
        let polyline = DiscretizeCurve::new(key).execute(model)?;
        let mut nodes = Vec::with_capacity(polyline.len());
        nodes.push(self.point_node(model, start)?);
        for p in polyline.iter().skip(1).take(polyline.len().saturating_sub(2)) {
            self.nodes.push(*p);
            nodes.push(self.nodes.len() - 1);
        }
        nodes.push(self.point_node(model, end)?);
        self.curves.insert(key, nodes.clone());
        Ok(nodes)
    }

    /// Node ring of a loop, without repeating the closing node.
    fn ring(&mut self, model: &GeoModel, key: LoopKey) -> Result<Vec<usize>> {
        let mut ring = Vec::new();
        for oc in model.curve_loop(key)?.curves.clone() {
            let nodes = self.curve_nodes(model, oc.curve)?;
            if oc.forward {
                ring.extend(nodes.iter().take(nodes.len() - 1));
            } else {
                ring.extend(nodes.iter().skip(1).rev());
            }
        }
        Ok(ring)
    }
}

impl<'a> GenerateMesh<'a> {
    #[must_use]
    pub fn new(model: &'a GeoModel, dim: Dim) -> Self {
        Self { model, dim }
    }

    /// Generates the mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if a grouped entity is missing or a surface cannot be
    /// triangulated.
    pub fn execute(&self) -> Result<Mesh> {
        let mut table = NodeTable::default();
        let mut elements = Vec::new();

        let groups: Vec<&PhysicalGroup> = self.model.groups().collect();
        if groups.is_empty() {
            let curves: Vec<(CurveKey, Tag)> = self.model.curves().map(|(k, c)| (k, c.tag)).collect();
            for (key, tag) in curves {
                self.lines(&mut table, key, tag, 0, &mut elements)?;
            }
            if self.dim == Dim::Surface {
                for surface in self.model.surfaces() {
                    self.triangles(&mut table, surface, 0, &mut elements)?;
                }
            }
        } else {
            for group in groups {
                match group.dim {
                    Dim::Point => {}
                    Dim::Curve => {
                        for &tag in &group.members {
                            let key = self.model.curve_key(tag)?;
                            self.lines(&mut table, key, tag, group.id, &mut elements)?;
                        }
                    }
                    Dim::Surface if self.dim == Dim::Surface => {
                        for &tag in &group.members {
                            let surface = self.model.surface(tag)?;
                            self.triangles(&mut table, surface, group.id, &mut elements)?;
                        }
                    }
                    Dim::Surface => {}
                }
            }
        }

        Ok(Mesh {
            nodes: table.nodes,
            elements,
        })
    }

    fn lines(
        &self,
        table: &mut NodeTable,
        key: CurveKey,
        tag: Tag,
        physical: i32,
        out: &mut Vec<Element>,
    ) -> Result<()> {
        let nodes = table.curve_nodes(self.model, key)?;
        out.extend(nodes.windows(2).map(|pair| Element {
            kind: ElementKind::Line,
            physical,
            entity: tag,
            nodes: pair.to_vec(),
        }));
        Ok(())
    }

    fn triangles(
        &self,
        table: &mut NodeTable,
        surface: &SurfaceData,
        physical: i32,
        out: &mut Vec<Element>,
    ) -> Result<()> {
        let mut rings = Vec::with_capacity(1 + surface.holes.len());
        for lp in surface.loops() {
            rings.push(table.ring(self.model, lp)?);
        }
        let triangles = TriangulateSurface::new(surface.tag, &rings).execute(&mut table.nodes)?;
        out.extend(triangles.into_iter().map(|t| Element {
            kind: ElementKind::Triangle,
            physical,
            entity: surface.tag,
            nodes: t.to_vec(),
        }));
        Ok(())
    }
}
