use std::io::{self, Write};

use crate::kernel::Dim;

use super::Mesh;

/// Writes a mesh in the Gmsh MSH 2.2 ASCII format.
///
/// Each element carries two tags: its physical group id and the tag of the
/// elementary entity it came from.
pub struct MshWriter<'a> {
    mesh: &'a Mesh,
    names: Vec<(Dim, i32, String)>,
}

impl<'a> MshWriter<'a> {
    #[must_use]
    pub fn new(mesh: &'a Mesh, names: Vec<(Dim, i32, String)>) -> Self {
        Self { mesh, names }
    }

    /// Writes the whole file.
    ///
    /// # Errors
    ///
    /// Returns any error of the underlying writer.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "$MeshFormat")?;
        writeln!(w, "2.2 0 8")?;
        writeln!(w, "$EndMeshFormat")?;

        if !self.names.is_empty() {
            writeln!(w, "$PhysicalNames")?;
            writeln!(w, "{}", self.names.len())?;
            for (dim, id, name) in &self.names {
                writeln!(w, "{} {id} \"{name}\"", dim.as_i32())?;
            }
            writeln!(w, "$EndPhysicalNames")?;
        }

        writeln!(w, "$Nodes")?;
        writeln!(w, "{}", self.mesh.nodes.len())?;
        for (i, p) in self.mesh.nodes.iter().enumerate() {
            writeln!(w, "{} {} {} {}", i + 1, p.x, p.y, p.z)?;
        }
        writeln!(w, "$EndNodes")?;

        writeln!(w, "$Elements")?;
        writeln!(w, "{}", self.mesh.elements.len())?;
        for (i, e) in self.mesh.elements.iter().enumerate() {
            write!(w, "{} {} 2 {} {}", i + 1, e.kind.msh_type(), e.physical, e.entity)?;
            for n in &e.nodes {
                write!(w, " {}", n + 1)?;
            }
            writeln!(w)?;
        }
        writeln!(w, "$EndElements")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::mesh::{Element, ElementKind};

    #[test]
    fn writes_sections_with_one_based_indices() {
        let mesh = Mesh {
            nodes: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            elements: vec![
                Element {
                    kind: ElementKind::Line,
                    physical: 150,
                    entity: 4,
                    nodes: vec![0, 1],
                },
                Element {
                    kind: ElementKind::Triangle,
                    physical: 101,
                    entity: 1,
                    nodes: vec![0, 1, 2],
                },
            ],
        };
        let names = vec![
            (Dim::Curve, 150, "OUTER_STATOR_BOUNDARY".to_owned()),
            (Dim::Surface, 101, "SLOT_OPENINGS".to_owned()),
        ];
        let mut out = Vec::new();
        MshWriter::new(&mesh, names).write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(&lines[..3], ["$MeshFormat", "2.2 0 8", "$EndMeshFormat"]);
        assert!(lines.contains(&"1 150 \"OUTER_STATOR_BOUNDARY\""));
        assert!(lines.contains(&"2 101 \"SLOT_OPENINGS\""));
        assert!(lines.contains(&"2 1 0 0"));
        assert!(lines.contains(&"1 1 2 150 4 1 2"));
        assert!(lines.contains(&"2 2 2 101 1 1 2 3"));
        assert_eq!(lines.last(), Some(&"$EndElements"));
    }
}
