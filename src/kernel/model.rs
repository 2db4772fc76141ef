use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{BufWriter, Write};
use std::path::Path;

use slotmap::SlotMap;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{KernelError, Result};
use crate::math::arc_2d::{arc_from_center, ArcParams};
use crate::math::{reflection_across, rotation_about, transform_point, Matrix4, Point3, Vector3, TOLERANCE};
use crate::mesh::{GenerateMesh, Mesh, MeshOptions, MshWriter};

use super::entity::{
    CurveData, CurveKey, CurveShape, LoopData, LoopKey, OrientedCurve, PhysicalGroup, PointData,
    PointKey, SurfaceData, SurfaceKey,
};
use super::{CurveKind, Dim, Handle, Kernel, Tag};

mod coherence;

/// In-memory geometry kernel.
///
/// Entities live in generational arenas and reference each other by key;
/// the integer tags seen by callers are indexed separately so that merging
/// and copying never invalidate references.
#[derive(Debug, Default)]
pub struct GeoModel {
    name: String,
    options: MeshOptions,
    points: SlotMap<PointKey, PointData>,
    curves: SlotMap<CurveKey, CurveData>,
    loops: SlotMap<LoopKey, LoopData>,
    surfaces: SlotMap<SurfaceKey, SurfaceData>,
    point_tags: BTreeMap<Tag, PointKey>,
    curve_tags: BTreeMap<Tag, CurveKey>,
    loop_tags: BTreeMap<Tag, LoopKey>,
    surface_tags: BTreeMap<Tag, SurfaceKey>,
    groups: BTreeMap<(Dim, i32), PhysicalGroup>,
    synchronized: bool,
    mesh: Option<Mesh>,
}

fn next_tag<K>(index: &BTreeMap<Tag, K>) -> Tag {
    index.keys().next_back().map_or(1, |t| t + 1)
}

fn not_found(dim: Dim, tag: Tag) -> KernelError {
    KernelError::EntityNotFound { dim, tag }
}

impl GeoModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new(name: impl Into<String>, options: MeshOptions) -> Self {
        Self {
            name: name.into(),
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn options(&self) -> &MeshOptions {
        &self.options
    }

    // --- Lookup ---

    /// Returns the point data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the model.
    pub fn point(&self, key: PointKey) -> Result<&PointData> {
        self.points
            .get(key)
            .ok_or_else(|| KernelError::Degenerate("dangling point reference".into()).into())
    }

    /// Returns the curve data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the model.
    pub fn curve(&self, key: CurveKey) -> Result<&CurveData> {
        self.curves
            .get(key)
            .ok_or_else(|| KernelError::Degenerate("dangling curve reference".into()).into())
    }

    /// Returns the curve loop data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the model.
    pub fn curve_loop(&self, key: LoopKey) -> Result<&LoopData> {
        self.loops
            .get(key)
            .ok_or_else(|| KernelError::Degenerate("dangling curve loop reference".into()).into())
    }

    /// Resolves a point tag.
    ///
    /// # Errors
    ///
    /// Returns an error if no point has this tag.
    pub fn point_key(&self, tag: Tag) -> Result<PointKey> {
        Ok(*self
            .point_tags
            .get(&tag)
            .ok_or_else(|| not_found(Dim::Point, tag))?)
    }

    /// Resolves a curve tag.
    ///
    /// # Errors
    ///
    /// Returns an error if no curve has this tag.
    pub fn curve_key(&self, tag: Tag) -> Result<CurveKey> {
        Ok(*self
            .curve_tags
            .get(&tag)
            .ok_or_else(|| not_found(Dim::Curve, tag))?)
    }

    /// Resolves a surface tag.
    ///
    /// # Errors
    ///
    /// Returns an error if no surface has this tag.
    pub fn surface_key(&self, tag: Tag) -> Result<SurfaceKey> {
        Ok(*self
            .surface_tags
            .get(&tag)
            .ok_or_else(|| not_found(Dim::Surface, tag))?)
    }

    /// Returns the surface data by tag.
    ///
    /// # Errors
    ///
    /// Returns an error if no surface has this tag.
    pub fn surface(&self, tag: Tag) -> Result<&SurfaceData> {
        let key = self.surface_key(tag)?;
        self.surfaces
            .get(key)
            .ok_or_else(|| not_found(Dim::Surface, tag).into())
    }

    /// Coordinates of a point by tag.
    ///
    /// # Errors
    ///
    /// Returns an error if no point has this tag.
    pub fn point_coord(&self, tag: Tag) -> Result<Point3> {
        Ok(self.point(self.point_key(tag)?)?.coord)
    }

    /// Curves in tag order.
    pub fn curves(&self) -> impl Iterator<Item = (CurveKey, &CurveData)> + '_ {
        self.curve_tags
            .values()
            .filter_map(|&k| self.curves.get(k).map(|c| (k, c)))
    }

    /// Surfaces in tag order.
    pub fn surfaces(&self) -> impl Iterator<Item = &SurfaceData> + '_ {
        self.surface_tags
            .values()
            .filter_map(|&k| self.surfaces.get(k))
    }

    /// Number of entities of a dimension.
    #[must_use]
    pub fn count(&self, dim: Dim) -> usize {
        match dim {
            Dim::Point => self.points.len(),
            Dim::Curve => self.curves.len(),
            Dim::Surface => self.surfaces.len(),
        }
    }

    fn contains(&self, dim: Dim, tag: Tag) -> bool {
        match dim {
            Dim::Point => self.point_tags.contains_key(&tag),
            Dim::Curve => self.curve_tags.contains_key(&tag),
            Dim::Surface => self.surface_tags.contains_key(&tag),
        }
    }

    /// Physical groups ordered by dimension and id.
    pub fn groups(&self) -> impl Iterator<Item = &PhysicalGroup> + '_ {
        self.groups.values()
    }

    #[must_use]
    pub fn group(&self, dim: Dim, id: i32) -> Option<&PhysicalGroup> {
        self.groups.get(&(dim, id))
    }

    /// The last generated mesh.
    #[must_use]
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    // --- Geometry queries ---

    /// Center-radius-angle form of an arc shape.
    ///
    /// # Errors
    ///
    /// Returns an error for line shapes or arcs that are not a unique minor arc.
    pub fn arc_params(&self, shape: &CurveShape) -> Result<ArcParams> {
        let CurveShape::Arc { start, center, end } = *shape else {
            return Err(KernelError::Degenerate("not an arc".into()).into());
        };
        let (s, c, e) = (
            self.point(start)?.coord,
            self.point(center)?.coord,
            self.point(end)?.coord,
        );
        arc_from_center(&s, &c, &e).map_err(|defect| {
            KernelError::Degenerate(format!(
                "arc ({}, {}) / ({}, {}) around ({}, {}): {defect:?}",
                s.x, s.y, e.x, e.y, c.x, c.y
            ))
            .into()
        })
    }

    /// Length of a curve by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve or its points are missing or the arc is degenerate.
    pub fn curve_length_of(&self, key: CurveKey) -> Result<f64> {
        let shape = self.curve(key)?.shape;
        match shape {
            CurveShape::Line { start, end } => {
                Ok((self.point(end)?.coord - self.point(start)?.coord).norm())
            }
            CurveShape::Arc { .. } => Ok(self.arc_params(&shape)?.length()),
        }
    }

    fn same_point(&self, a: PointKey, b: PointKey) -> bool {
        if a == b {
            return true;
        }
        match (self.points.get(a), self.points.get(b)) {
            (Some(pa), Some(pb)) => (pa.coord - pb.coord).norm() <= self.options.tolerance,
            _ => false,
        }
    }

    // --- Creation helpers ---

    fn insert_curve(&mut self, tag: Tag, shape: CurveShape) -> Result<Tag> {
        if self.curve_tags.contains_key(&tag) {
            return Err(KernelError::TagInUse {
                dim: Dim::Curve,
                tag,
            }
            .into());
        }
        let key = self.curves.insert(CurveData { tag, shape });
        self.curve_tags.insert(tag, key);
        self.invalidate();
        Ok(tag)
    }

    fn invalidate(&mut self) {
        self.synchronized = false;
        self.mesh = None;
    }

    // --- Copy helpers ---

    fn copy_point(&mut self, key: PointKey, done: &mut HashMap<PointKey, PointKey>) -> Result<PointKey> {
        if let Some(&copied) = done.get(&key) {
            return Ok(copied);
        }
        let mut data = self.point(key)?.clone();
        data.tag = next_tag(&self.point_tags);
        let tag = data.tag;
        let new_key = self.points.insert(data);
        self.point_tags.insert(tag, new_key);
        done.insert(key, new_key);
        Ok(new_key)
    }

    fn copy_curve(&mut self, key: CurveKey, copied: &mut CopyMaps) -> Result<CurveKey> {
        if let Some(&done) = copied.curves.get(&key) {
            return Ok(done);
        }
        let shape = self.curve(key)?.shape;
        let mut local = HashMap::new();
        for p in shape.points() {
            local.insert(p, self.copy_point(p, &mut copied.points)?);
        }
        let shape = shape.map_points(|p| *local.get(&p).unwrap_or(&p));
        let tag = next_tag(&self.curve_tags);
        let new_key = self.curves.insert(CurveData { tag, shape });
        self.curve_tags.insert(tag, new_key);
        copied.curves.insert(key, new_key);
        Ok(new_key)
    }

    fn copy_loop(&mut self, key: LoopKey, copied: &mut CopyMaps) -> Result<LoopKey> {
        let original = self.curve_loop(key)?.curves.clone();
        let mut curves = Vec::with_capacity(original.len());
        for oc in original {
            curves.push(OrientedCurve {
                curve: self.copy_curve(oc.curve, copied)?,
                forward: oc.forward,
            });
        }
        let tag = next_tag(&self.loop_tags);
        let new_key = self.loops.insert(LoopData { tag, curves });
        self.loop_tags.insert(tag, new_key);
        Ok(new_key)
    }

    fn copy_surface(&mut self, key: SurfaceKey, copied: &mut CopyMaps) -> Result<Tag> {
        let surface = self
            .surfaces
            .get(key)
            .cloned()
            .ok_or_else(|| KernelError::Degenerate("dangling surface reference".into()))?;
        let outer = self.copy_loop(surface.outer, copied)?;
        let mut holes = Vec::with_capacity(surface.holes.len());
        for hole in surface.holes {
            holes.push(self.copy_loop(hole, copied)?);
        }
        let tag = next_tag(&self.surface_tags);
        let new_key = self.surfaces.insert(SurfaceData { tag, outer, holes });
        self.surface_tags.insert(tag, new_key);
        Ok(tag)
    }

    // --- Transform helpers ---

    /// Collects every point the handles depend on, each once.
    fn dependent_points(&self, handles: &[Handle]) -> Result<Vec<PointKey>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut push = |k: PointKey| {
            if seen.insert(k) {
                keys.push(k);
            }
        };
        for handle in handles {
            match handle.dim {
                Dim::Point => push(self.point_key(handle.tag)?),
                Dim::Curve => {
                    let curve = self.curve(self.curve_key(handle.tag)?)?;
                    curve.shape.points().into_iter().for_each(&mut push);
                }
                Dim::Surface => {
                    for lp in self.surface(handle.tag)?.loops() {
                        for oc in &self.curve_loop(lp)?.curves {
                            self.curve(oc.curve)?.shape.points().into_iter().for_each(&mut push);
                        }
                    }
                }
            }
        }
        Ok(keys)
    }

    fn transform(&mut self, handles: &[Handle], matrix: &Matrix4) -> Result<()> {
        for key in self.dependent_points(handles)? {
            if let Some(point) = self.points.get_mut(key) {
                point.coord = transform_point(matrix, &point.coord);
            }
        }
        self.invalidate();
        Ok(())
    }

    fn group_names(&self) -> Vec<(Dim, i32, String)> {
        self.groups
            .values()
            .filter_map(|g| g.name.clone().map(|n| (g.dim, g.id, n)))
            .collect()
    }
}

#[derive(Default)]
struct CopyMaps {
    points: HashMap<PointKey, PointKey>,
    curves: HashMap<CurveKey, CurveKey>,
}

impl Kernel for GeoModel {
    fn add_point(&mut self, coord: Point3, size: f64, tag: Tag) -> Result<Tag> {
        if self.point_tags.contains_key(&tag) {
            return Err(KernelError::TagInUse {
                dim: Dim::Point,
                tag,
            }
            .into());
        }
        let key = self.points.insert(PointData { tag, coord, size });
        self.point_tags.insert(tag, key);
        self.invalidate();
        Ok(tag)
    }

    fn add_line(&mut self, start: Tag, end: Tag, tag: Tag) -> Result<Tag> {
        let (s, e) = (self.point_key(start)?, self.point_key(end)?);
        if self.same_point(s, e) {
            return Err(KernelError::Degenerate(format!(
                "line {tag} joins coincident points {start} and {end}"
            ))
            .into());
        }
        self.insert_curve(tag, CurveShape::Line { start: s, end: e })
    }

    fn add_arc(&mut self, start: Tag, center: Tag, end: Tag, tag: Tag) -> Result<Tag> {
        let shape = CurveShape::Arc {
            start: self.point_key(start)?,
            center: self.point_key(center)?,
            end: self.point_key(end)?,
        };
        self.arc_params(&shape)?;
        self.insert_curve(tag, shape)
    }

    fn add_curve_loop(&mut self, curves: &[Tag]) -> Result<Tag> {
        let mut pending = Vec::with_capacity(curves.len());
        for &tag in curves {
            let key = self.curve_key(tag)?;
            let (s, e) = self.curve(key)?.shape.endpoints();
            pending.push((key, s, e));
        }
        if pending.is_empty() {
            return Err(KernelError::OpenLoop(Vec::new()).into());
        }

        let (first, loop_start, mut end) = pending.remove(0);
        let mut chain = vec![OrientedCurve {
            curve: first,
            forward: true,
        }];
        while !pending.is_empty() {
            let next = pending
                .iter()
                .position(|&(_, s, e)| self.same_point(s, end) || self.same_point(e, end))
                .ok_or_else(|| KernelError::OpenLoop(curves.to_vec()))?;
            let (key, s, e) = pending.remove(next);
            let forward = self.same_point(s, end);
            end = if forward { e } else { s };
            chain.push(OrientedCurve {
                curve: key,
                forward,
            });
        }
        if !self.same_point(end, loop_start) {
            return Err(KernelError::OpenLoop(curves.to_vec()).into());
        }

        let tag = next_tag(&self.loop_tags);
        let key = self.loops.insert(LoopData { tag, curves: chain });
        self.loop_tags.insert(tag, key);
        Ok(tag)
    }

    fn add_plane_surface(&mut self, loops: &[Tag]) -> Result<Tag> {
        let mut keys = Vec::with_capacity(loops.len());
        for &tag in loops {
            let key = self
                .loop_tags
                .get(&tag)
                .copied()
                .ok_or_else(|| KernelError::Degenerate(format!("curve loop {tag} not found")))?;
            keys.push(key);
        }
        let Some((&outer, holes)) = keys.split_first() else {
            return Err(KernelError::Degenerate("plane surface needs a boundary loop".into()).into());
        };
        let tag = next_tag(&self.surface_tags);
        let key = self.surfaces.insert(SurfaceData {
            tag,
            outer,
            holes: holes.to_vec(),
        });
        self.surface_tags.insert(tag, key);
        self.invalidate();
        Ok(tag)
    }

    fn copy(&mut self, handles: &[Handle]) -> Result<Vec<Handle>> {
        let mut copied = CopyMaps::default();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            let tag = match handle.dim {
                Dim::Point => {
                    let key = self.copy_point(self.point_key(handle.tag)?, &mut copied.points)?;
                    self.point(key)?.tag
                }
                Dim::Curve => {
                    let key = self.copy_curve(self.curve_key(handle.tag)?, &mut copied)?;
                    self.curve(key)?.tag
                }
                Dim::Surface => self.copy_surface(self.surface_key(handle.tag)?, &mut copied)?,
            };
            out.push(Handle {
                dim: handle.dim,
                tag,
            });
        }
        self.invalidate();
        Ok(out)
    }

    fn rotate(
        &mut self,
        handles: &[Handle],
        origin: Point3,
        axis: Vector3,
        angle: f64,
    ) -> Result<()> {
        if axis.norm() < TOLERANCE {
            return Err(KernelError::Degenerate("rotation axis must be non-zero".into()).into());
        }
        self.transform(handles, &rotation_about(&origin, &axis, angle))
    }

    fn mirror(&mut self, handles: &[Handle], plane: [f64; 4]) -> Result<()> {
        let matrix = reflection_across(plane)
            .ok_or_else(|| KernelError::Degenerate("mirror plane normal must be non-zero".into()))?;
        self.transform(handles, &matrix)
    }

    fn add_physical_group(&mut self, dim: Dim, tags: &[Tag], id: i32) -> Result<()> {
        if let Some(&missing) = tags.iter().find(|&&t| !self.contains(dim, t)) {
            return Err(not_found(dim, missing).into());
        }
        if self.groups.contains_key(&(dim, id)) {
            return Err(KernelError::TagInUse { dim, tag: id }.into());
        }
        self.groups.insert(
            (dim, id),
            PhysicalGroup {
                dim,
                id,
                name: None,
                members: tags.to_vec(),
            },
        );
        Ok(())
    }

    fn set_group_name(&mut self, dim: Dim, id: i32, name: &str) -> Result<()> {
        let group = self
            .groups
            .get_mut(&(dim, id))
            .ok_or_else(|| not_found(dim, id))?;
        group.name = Some(name.to_owned());
        Ok(())
    }

    fn curve_length(&self, tag: Tag) -> Result<f64> {
        self.curve_length_of(self.curve_key(tag)?)
    }

    fn curve_kind(&self, tag: Tag) -> Result<CurveKind> {
        let shape = self.curve(self.curve_key(tag)?)?.shape;
        Ok(if shape.is_arc() {
            CurveKind::Arc
        } else {
            CurveKind::Segment
        })
    }

    fn synchronize(&mut self) -> Result<()> {
        let merged = self.merge_coincident()?;
        for (key, curve) in self.curves() {
            let length = self.curve_length_of(key)?;
            if length <= self.options.tolerance {
                return Err(KernelError::Degenerate(format!("curve {} has zero length", curve.tag)).into());
            }
        }
        self.synchronized = true;
        debug!(
            model = %self.name,
            merged,
            points = self.points.len(),
            curves = self.curves.len(),
            surfaces = self.surfaces.len(),
            "synchronized"
        );
        Ok(())
    }

    fn generate_mesh(&mut self, dim: Dim) -> Result<()> {
        if !self.synchronized {
            self.synchronize()?;
        }
        let mesh = GenerateMesh::new(self, dim).execute()?;
        debug!(
            model = %self.name,
            nodes = mesh.nodes.len(),
            elements = mesh.elements.len(),
            "mesh generated"
        );
        self.mesh = Some(mesh);
        Ok(())
    }

    fn write_mesh(&self, path: &Path) -> Result<()> {
        let mesh = self.mesh.as_ref().ok_or(KernelError::NotMeshed)?;
        // Written beside the target and renamed, so a failed write never leaves a partial file.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = NamedTempFile::new_in(dir).map_err(KernelError::from)?;
        let mut writer = BufWriter::new(staged);
        MshWriter::new(mesh, self.group_names())
            .write_to(&mut writer)
            .and_then(|()| writer.flush())
            .map_err(KernelError::from)?;
        let staged = writer.into_inner().map_err(|e| KernelError::from(e.into_error()))?;
        staged
            .persist(path)
            .map_err(|e| KernelError::from(e.error))?;
        debug!(model = %self.name, path = %path.display(), "mesh written");
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.name), self.options);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;
    use crate::error::EmsectorError;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    /// Unit square with corners 1..=4 and sides 1..=4.
    fn square(model: &mut GeoModel) -> Tag {
        for (tag, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].into_iter().enumerate() {
            model.add_point(p(x, y), 0.5, tag as Tag + 1).unwrap();
        }
        for i in 1..=4 {
            model.add_line(i, i % 4 + 1, i).unwrap();
        }
        let lp = model.add_curve_loop(&[1, 2, 3, 4]).unwrap();
        model.add_plane_surface(&[lp]).unwrap()
    }

    #[test]
    fn duplicate_point_tag_rejected() {
        let mut model = GeoModel::default();
        model.add_point(p(0.0, 0.0), 0.1, 7).unwrap();
        let err = model.add_point(p(1.0, 0.0), 0.1, 7).unwrap_err();
        assert!(matches!(
            err,
            EmsectorError::Kernel(KernelError::TagInUse { dim: Dim::Point, tag: 7 })
        ));
    }

    #[test]
    fn loop_reorders_and_reorients_curves() {
        let mut model = GeoModel::default();
        for (tag, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)].into_iter().enumerate() {
            model.add_point(p(x, y), 0.5, tag as Tag + 1).unwrap();
        }
        model.add_line(1, 2, 10).unwrap();
        model.add_line(1, 3, 11).unwrap(); // reversed w.r.t. traversal
        model.add_line(2, 3, 12).unwrap();
        let lp = model.add_curve_loop(&[10, 11, 12]).unwrap();
        let data = model.curve_loop(model.loop_tags[&lp]).unwrap();
        let forward: Vec<bool> = data.curves.iter().map(|oc| oc.forward).collect();
        assert_eq!(forward, vec![true, true, false]);
    }

    #[test]
    fn open_loop_rejected() {
        let mut model = GeoModel::default();
        for (tag, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)].into_iter().enumerate() {
            model.add_point(p(x, y), 0.5, tag as Tag + 1).unwrap();
        }
        model.add_line(1, 2, 1).unwrap();
        model.add_line(2, 3, 2).unwrap();
        let err = model.add_curve_loop(&[1, 2]).unwrap_err();
        assert!(matches!(err, EmsectorError::Kernel(KernelError::OpenLoop(_))));
    }

    #[test]
    fn copy_duplicates_boundary_entities() {
        let mut model = GeoModel::default();
        let s = square(&mut model);
        let copies = model.copy(&[Handle::surface(s)]).unwrap();
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0].tag, s);
        assert_eq!(model.count(Dim::Surface), 2);
        assert_eq!(model.count(Dim::Curve), 8);
        assert_eq!(model.count(Dim::Point), 8);
    }

    #[test]
    fn rotating_a_copy_leaves_the_original() {
        let mut model = GeoModel::default();
        let s = square(&mut model);
        let copy = model.copy(&[Handle::surface(s)]).unwrap();
        model
            .rotate(&copy, Point3::origin(), Vector3::z(), FRAC_PI_2)
            .unwrap();
        assert_relative_eq!(model.point_coord(2).unwrap().x, 1.0);
        // Point tags 5..=8 belong to the copy; tag 6 is the copy of (1, 0).
        let rotated = model.point_coord(6).unwrap();
        assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mirror_reflects_arc_endpoints() {
        let mut model = GeoModel::default();
        model.add_point(p(0.0, 0.0), 0.1, 1).unwrap();
        model.add_point(p(1.0, 0.0), 0.1, 2).unwrap();
        model.add_point(p(0.0, 1.0), 0.1, 3).unwrap();
        model.add_arc(2, 1, 3, 1).unwrap();
        let copy = model.copy(&[Handle::curve(1)]).unwrap();
        model.mirror(&copy, [0.0, 1.0, 0.0, 0.0]).unwrap();
        let key = model.curve_key(copy[0].tag).unwrap();
        let shape = model.curve(key).unwrap().shape;
        let arc = model.arc_params(&shape).unwrap();
        assert_relative_eq!(arc.sweep, -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(model.curve_length(copy[0].tag).unwrap(), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn physical_group_requires_existing_members() {
        let mut model = GeoModel::default();
        let s = square(&mut model);
        model.add_physical_group(Dim::Surface, &[s], 101).unwrap();
        model.set_group_name(Dim::Surface, 101, "TEETH").unwrap();
        assert_eq!(
            model.group(Dim::Surface, 101).unwrap().name.as_deref(),
            Some("TEETH")
        );
        assert!(model.add_physical_group(Dim::Surface, &[s + 10], 102).is_err());
        assert!(model.add_physical_group(Dim::Surface, &[s], 101).is_err());
        assert!(model.set_group_name(Dim::Curve, 5, "X").is_err());
    }

    #[test]
    fn write_without_mesh_fails() {
        let model = GeoModel::default();
        let err = model.write_mesh(Path::new("unused.msh")).unwrap_err();
        assert!(matches!(err, EmsectorError::Kernel(KernelError::NotMeshed)));
    }

    fn meshed_square() -> GeoModel {
        let mut model = GeoModel::default();
        let s = square(&mut model);
        model.add_physical_group(Dim::Surface, &[s], 101).unwrap();
        model.generate_mesh(Dim::Surface).unwrap();
        model
    }

    #[test]
    fn written_mesh_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.msh");
        meshed_square().write_mesh(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("$MeshFormat"));
        assert!(text.trim_end().ends_with("$EndElements"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // The target is a non-empty directory, so the final rename fails.
        let target = dir.path().join("taken.msh");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();
        let err = meshed_square().write_mesh(&target).unwrap_err();
        assert!(matches!(err, EmsectorError::Kernel(KernelError::Io(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(target.join("keep").is_file());
    }

    #[test]
    fn reset_clears_entities() {
        let mut model = GeoModel::new("stator", MeshOptions::default());
        square(&mut model);
        model.reset();
        assert_eq!(model.count(Dim::Point), 0);
        assert_eq!(model.name(), "stator");
    }
}
