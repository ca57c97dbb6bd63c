//! Geometry loading for bench models.
//!
//! Parts come either from STL files or from built-in primitive shapes, so
//! the bench can run without any assets on disk. Everything here is
//! CPU-side and safe to run on a loader thread; upload happens later in
//! [`GpuMesh::new`](crate::mesh::GpuMesh::new).
//!
//! | Source                  | Notes                               |
//! |-------------------------|-------------------------------------|
//! | [`GeometrySource::Stl`] | Binary and ASCII STL, face normals  |
//! | [`GeometrySource::Cube`]   | Unit cube centered at the origin |
//! | [`GeometrySource::Sphere`] | UV sphere, radius 0.5            |

use crate::error::GeometryError;
use crate::mesh::Vertex3d;
use glam::Vec3;
use std::path::{Path, PathBuf};

/// Where a part's geometry comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometrySource {
    /// An STL file on disk.
    Stl(PathBuf),
    /// A unit cube (1×1×1).
    Cube,
    /// A UV sphere with radius 0.5.
    Sphere {
        /// Longitudinal divisions.
        segments: u32,
        /// Latitudinal divisions.
        rings: u32,
    },
}

impl GeometrySource {
    /// Loads the geometry, reading from disk for file sources.
    pub fn load(&self) -> Result<RawGeometry, GeometryError> {
        match self {
            GeometrySource::Stl(path) => RawGeometry::from_file(path),
            GeometrySource::Cube => Ok(RawGeometry::cube()),
            GeometrySource::Sphere { segments, rings } => {
                Ok(RawGeometry::sphere(*segments, *rings))
            }
        }
    }
}

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug)]
pub struct RawGeometry {
    /// Vertex positions and normals.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Loads a file, detecting the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self, GeometryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let geometry = match ext.as_str() {
            "stl" => {
                let file = std::fs::File::open(path)?;
                let mut reader = std::io::BufReader::new(file);
                Self::parse_stl(&mut reader)?
            }
            _ => return Err(GeometryError::UnknownFormat(ext)),
        };

        if geometry.indices.is_empty() {
            return Err(GeometryError::Empty(path.to_path_buf()));
        }
        Ok(geometry)
    }

    fn parse_stl<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<Self, GeometryError> {
        let stl = stl_io::read_stl(reader)
            .map_err(|e| GeometryError::ParseError(format!("STL parse error: {}", e)))?;

        let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
        let mut indices = Vec::with_capacity(stl.faces.len() * 3);

        // Faces index into a shared vertex list; duplicate per face to keep flat normals
        for (i, face) in stl.faces.iter().enumerate() {
            let normal: [f32; 3] = face.normal.into();
            for &vertex_idx in &face.vertices {
                let position: [f32; 3] = stl.vertices[vertex_idx].into();
                vertices.push(Vertex3d::new(position, normal));
            }
            let base = (i * 3) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        Ok(Self::new(vertices, indices))
    }

    /// A unit cube centered at the origin, 4 vertices per face.
    pub fn cube() -> Self {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            let center = normal * 0.5;
            for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let p = center + u * su + v * sv;
                vertices.push(Vertex3d::new(p.into(), normal.into()));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    /// A UV sphere of radius 0.5 centered at the origin.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            for seg in 0..=segments {
                let theta = std::f32::consts::TAU * seg as f32 / segments as f32;
                let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                vertices.push(Vertex3d::new((n * 0.5).into(), n.into()));
            }
        }

        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
        for ring in 0..rings {
            for seg in 0..segments {
                let a = ring * (segments + 1) + seg;
                let b = a + segments + 1;
                indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
            }
        }

        Self::new(vertices, indices)
    }

    /// Computes the axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).into();
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) * factor).into();
        }
    }

    /// Centers the geometry at the origin.
    pub fn recenter(&mut self) {
        let center = self.center();
        self.translate(-center);
    }

    /// Scales the geometry to fit within a unit cube.
    pub fn normalize(&mut self) {
        let size = self.size();
        let max_dim = size.x.max(size.y).max(size.z);
        if max_dim > 0.0 {
            self.scale(1.0 / max_dim);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_TRIANGLE: &str = "solid tri
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 1 0
  endloop
endfacet
endsolid tri
";

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 2]);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn raw_geometry_recenter() {
        let vertices = vec![
            Vertex3d::new([2.0, 2.0, 2.0], [0.0, 1.0, 0.0]),
            Vertex3d::new([4.0, 4.0, 4.0], [0.0, 1.0, 0.0]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 0]);

        geom.recenter();

        assert!(geom.center().length() < 0.001);
    }

    #[test]
    fn normalize_fits_unit_cube() {
        let mut geom = RawGeometry::cube();
        geom.scale(7.0);
        geom.normalize();
        assert!((geom.size().max_element() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cube_is_unit_sized_and_centered() {
        let cube = RawGeometry::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.bounds(), (Vec3::splat(-0.5), Vec3::splat(0.5)));
    }

    #[test]
    fn sphere_has_radius_half() {
        let sphere = RawGeometry::sphere(16, 8);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.position).length() - 0.5).abs() < 1e-5);
        }
        assert_eq!(sphere.indices.len(), 16 * 8 * 6);
    }

    #[test]
    fn parses_ascii_stl_bytes() {
        let mut cursor = std::io::Cursor::new(ASCII_TRIANGLE.as_bytes());
        let geom = RawGeometry::parse_stl(&mut cursor).unwrap();
        assert_eq!(geom.indices, vec![0, 1, 2]);
        assert_eq!(geom.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(geom.bounds().1, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = RawGeometry::from_file(Path::new("model.obj")).unwrap_err();
        assert!(matches!(err, GeometryError::UnknownFormat(ext) if ext == "obj"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = GeometrySource::Stl(PathBuf::from("/nonexistent/gloves.stl"));
        assert!(matches!(source.load(), Err(GeometryError::Io(_))));
    }
}
