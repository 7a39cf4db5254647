//! Mesh ingestion: OBJ parsing and vertex welding.
//!
//! An OBJ file stores positions and normals in separate pools and lets every
//! face corner pick one of each. The GPU wants a single interleaved vertex per
//! index, so each corner is resolved to a `(position, normal)` pair and pairs
//! that are bit-for-bit identical are merged into one vertex.
//!
//! ```no_run
//! use weldview::gfx::scene::mesh::load_mesh;
//!
//! let mesh = load_mesh("teapot.obj")?;
//! println!("{} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());
//! # Ok::<(), weldview::error::MeshError>(())
//! ```

use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;

use cgmath::{Vector3, Zero};

use crate::error::MeshError;

use super::vertex::Vertex3D;

/// Label used in errors for meshes parsed from memory.
const IN_MEMORY_LABEL: &str = "<memory>";

/// Axis-aligned bounding box of a mesh's vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Vector3::zero(), Vector3::zero())
    }
}

impl Bounds {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Computes the component-wise min/max over the given vertices.
    ///
    /// An empty slice yields a degenerate box at the origin. Positions must be
    /// finite; NaN components are skipped by the comparison.
    pub fn from_vertices(vertices: &[Vertex3D]) -> Self {
        let Some(first) = vertices.first() else {
            return Self::default();
        };

        let mut min = Vector3::from(first.position);
        let mut max = min;

        for vertex in vertices.iter().skip(1) {
            let v = Vector3::from(vertex.position);
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }

        Self::new(min, max)
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vector3<f32>) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.z >= self.min.z
            && point.x <= self.max.x
            && point.y <= self.max.y
            && point.z <= self.max.z
    }
}

/// A welded, indexed triangle mesh.
///
/// Every index is smaller than [`Mesh::vertex_count`], the index count is a
/// multiple of three, and the bounds cover exactly the welded vertices.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    bounds: Bounds,
}

impl Mesh {
    /// Welds a stream of triangles into an indexed mesh.
    ///
    /// Winding order and degenerate triangles are passed through untouched.
    pub fn weld<I>(triangles: I) -> Self
    where
        I: IntoIterator<Item = [Vertex3D; 3]>,
    {
        let mut welder = VertexWelder::default();
        for triangle in triangles {
            welder.push_triangle(triangle);
        }
        welder.finish()
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    /// Vertex data flattened to `px, py, pz, nx, ny, nz` per vertex.
    pub fn vertex_data(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Incremental vertex deduplicator.
///
/// The first occurrence of a vertex gets the next free index, so indices
/// follow first-encounter order.
#[derive(Debug, Default)]
pub struct VertexWelder {
    lookup: HashMap<Vertex3D, u32>,
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
}

impl VertexWelder {
    /// Returns the index of `vertex`, appending it if it is new.
    fn push_vertex(&mut self, vertex: Vertex3D) -> u32 {
        let index = *self.lookup.entry(vertex).or_insert_with(|| {
            self.vertices.push(vertex);
            (self.vertices.len() - 1) as u32
        });
        self.indices.push(index);
        index
    }

    pub fn push_triangle(&mut self, triangle: [Vertex3D; 3]) {
        for vertex in triangle {
            self.push_vertex(vertex);
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn finish(self) -> Mesh {
        let bounds = Bounds::from_vertices(&self.vertices);
        Mesh {
            vertices: self.vertices,
            indices: self.indices,
            bounds,
        }
    }
}

/// Loads and welds an OBJ file.
///
/// Fails with [`MeshError::UnsupportedFormat`] before touching the file when
/// the extension is not `.obj`.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    if !is_obj_path(path) {
        return Err(MeshError::UnsupportedFormat(path.to_path_buf()));
    }

    let source = std::fs::read(path).map_err(|err| {
        log::debug!("Cannot read {}: {}", path.display(), err);
        MeshError::Parse {
            path: path.to_path_buf(),
            source: tobj::LoadError::OpenFileFailed,
        }
    })?;

    let mesh = parse_obj(&source, path)?;
    log::info!(
        "Loaded {}: {} corners welded into {} vertices, {} indices, bounds {:?} - {:?}",
        path.display(),
        mesh.index_count(),
        mesh.vertex_count(),
        mesh.index_count(),
        mesh.bounds.min,
        mesh.bounds.max,
    );
    Ok(mesh)
}

/// Parses and welds OBJ text held in memory. Material libraries are ignored.
pub fn load_mesh_from_bytes(source: &[u8]) -> Result<Mesh, MeshError> {
    parse_obj(source, Path::new(IN_MEMORY_LABEL))
}

fn parse_obj(source: &[u8], path: &Path) -> Result<Mesh, MeshError> {
    let mut reader = BufReader::new(source);
    let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_matpath| {
        Err(tobj::LoadError::GenericFailure)
    })
    .map_err(|source| MeshError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    // tobj fills in normal indices for corners that have none
    if has_corner_without_normal(source) {
        return Err(MeshError::MissingAttribute {
            path: path.to_path_buf(),
            attribute: "normals",
        });
    }

    weld_models(&models, path)
}

/// True if any face corner lacks a `vn` reference (`v` or `v/vt` forms).
fn has_corner_without_normal(source: &[u8]) -> bool {
    let text = String::from_utf8_lossy(source);
    let mut statement = String::new();

    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default().trim_end();
        if let Some(continued) = line.strip_suffix('\\') {
            statement.push_str(continued);
            statement.push(' ');
            continue;
        }
        statement.push_str(line);

        let mut tokens = statement.split_whitespace();
        if tokens.next() == Some("f")
            && tokens.any(|corner| !matches!(corner.split('/').nth(2), Some(n) if !n.is_empty()))
        {
            return true;
        }
        statement.clear();
    }
    false
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ..Default::default()
    }
}

fn is_obj_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
}

/// Resolves every face corner of every model and welds them into one mesh.
fn weld_models(models: &[tobj::Model], path: &Path) -> Result<Mesh, MeshError> {
    let missing = |attribute| MeshError::MissingAttribute {
        path: path.to_path_buf(),
        attribute,
    };
    let parse_error = |source| MeshError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut welder = VertexWelder::default();

    for model in models {
        let mesh = &model.mesh;
        if mesh.indices.is_empty() {
            continue;
        }
        if mesh.normals.is_empty() || mesh.normal_indices.len() != mesh.indices.len() {
            return Err(missing("normals"));
        }

        for (positions, normals) in mesh
            .indices
            .chunks_exact(3)
            .zip(mesh.normal_indices.chunks_exact(3))
        {
            let mut triangle = [Vertex3D::new([0.0; 3], [0.0; 3]); 3];
            for (corner, vertex) in triangle.iter_mut().enumerate() {
                vertex.position = attribute(&mesh.positions, positions[corner])
                    .ok_or_else(|| parse_error(tobj::LoadError::FaceVertexOutOfBounds))?;
                vertex.normal = attribute(&mesh.normals, normals[corner])
                    .ok_or_else(|| parse_error(tobj::LoadError::FaceNormalOutOfBounds))?;
                if !vertex.position.iter().all(|c| c.is_finite()) {
                    return Err(parse_error(tobj::LoadError::PositionParseError));
                }
                if !vertex.normal.iter().all(|c| c.is_finite()) {
                    return Err(parse_error(tobj::LoadError::NormalParseError));
                }
            }
            welder.push_triangle(triangle);
        }
    }

    if welder.triangle_count() == 0 {
        return Err(missing("faces"));
    }

    Ok(welder.finish())
}

fn attribute(pool: &[f32], index: u32) -> Option<[f32; 3]> {
    let start = index as usize * 3;
    pool.get(start..start + 3).map(|v| [v[0], v[1], v[2]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    /// Unit cube with one normal per face: 8 positions, 6 normals, 12 triangles.
    const CUBE_OBJ: &str = "\
o Cube
v -1.0 -1.0  1.0
v  1.0 -1.0  1.0
v  1.0  1.0  1.0
v -1.0  1.0  1.0
v -1.0 -1.0 -1.0
v  1.0 -1.0 -1.0
v  1.0  1.0 -1.0
v -1.0  1.0 -1.0
vn  0.0  0.0  1.0
vn  0.0  0.0 -1.0
vn  1.0  0.0  0.0
vn -1.0  0.0  0.0
vn  0.0  1.0  0.0
vn  0.0 -1.0  0.0
f 1//1 2//1 3//1
f 1//1 3//1 4//1
f 6//2 5//2 8//2
f 6//2 8//2 7//2
f 2//3 6//3 7//3
f 2//3 7//3 3//3
f 5//4 1//4 4//4
f 5//4 4//4 8//4
f 4//5 3//5 7//5
f 4//5 7//5 8//5
f 5//6 6//6 2//6
f 5//6 2//6 1//6
";

    fn vertex(position: [f32; 3], normal: [f32; 3]) -> Vertex3D {
        Vertex3D::new(position, normal)
    }

    #[test]
    fn test_cube_welds_to_24_vertices() {
        let mesh = load_mesh_from_bytes(CUBE_OBJ.as_bytes()).unwrap();

        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.vertex_data().len(), 24 * Vertex3D::COMPONENTS);

        let bounds = mesh.bounds();
        assert_eq!(bounds.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(bounds.center(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.extent(), Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_indices_in_range_and_vertices_unique() {
        let mesh = load_mesh_from_bytes(CUBE_OBJ.as_bytes()).unwrap();

        assert!(mesh
            .indices()
            .iter()
            .all(|&i| (i as usize) < mesh.vertex_count()));

        let unique: HashSet<_> = mesh.vertices().iter().collect();
        assert_eq!(unique.len(), mesh.vertex_count());

        for v in mesh.vertices() {
            assert!(mesh.bounds().contains(Vector3::from(v.position)));
        }
    }

    #[test]
    fn test_first_encounter_order() {
        let a = vertex([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let b = vertex([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let c = vertex([1.0, 1.0, 0.0], [0.0, 0.0, 1.0]);
        let d = vertex([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);

        let mesh = Mesh::weld([[a, b, c], [a, c, d]]);

        assert_eq!(mesh.vertices(), &[a, b, c, d]);
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_no_shared_corners_keeps_every_vertex() {
        let mesh = Mesh::weld([
            [
                vertex([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
                vertex([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
                vertex([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            ],
            [
                vertex([0.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
                vertex([0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
                vertex([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ],
        ]);

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_near_duplicates_are_not_merged() {
        let base = vertex([0.1, 0.2, 0.3], [0.0, 1.0, 0.0]);
        let close = vertex([0.1, 0.2, 0.3 + f32::EPSILON], [0.0, 1.0, 0.0]);
        let signed_zero = vertex([0.1, 0.2, 0.3], [-0.0, 1.0, 0.0]);

        let mesh = Mesh::weld([[base, close, signed_zero]]);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_welder_builds_whole_triangles() {
        let a = vertex([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let b = vertex([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let c = vertex([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);

        let mut welder = VertexWelder::default();
        welder.push_triangle([a, b, c]);
        welder.push_triangle([c, b, a]);
        assert_eq!(welder.triangle_count(), 2);

        let mesh = welder.finish();
        assert_eq!(mesh.index_count() % 3, 0);
        assert_eq!(mesh.indices(), &[0, 1, 2, 2, 1, 0]);
    }

    #[test]
    fn test_degenerate_triangles_pass_through() {
        let p = vertex([2.0, 2.0, 2.0], [1.0, 0.0, 0.0]);
        let mesh = Mesh::weld([[p, p, p]]);

        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.indices(), &[0, 0, 0]);
        assert_eq!(mesh.bounds().min, mesh.bounds().max);
    }

    #[test]
    fn test_bounds_cover_welded_set() {
        let mesh = Mesh::weld([[
            vertex([-3.0, 0.5, 2.0], [0.0, 1.0, 0.0]),
            vertex([4.0, -1.5, 0.0], [0.0, 1.0, 0.0]),
            vertex([0.0, 7.0, -9.0], [0.0, 1.0, 0.0]),
        ]]);

        assert_eq!(mesh.bounds().min, Vector3::new(-3.0, -1.5, -9.0));
        assert_eq!(mesh.bounds().max, Vector3::new(4.0, 7.0, 2.0));
    }

    #[test]
    fn test_quads_are_triangulated() {
        let quad = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";
        let mesh = load_mesh_from_bytes(quad.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_models_share_one_weld_map() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
o First
f 1//1 2//1 3//1
o Second
f 1//1 3//1 2//1
";
        let mesh = load_mesh_from_bytes(source.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 1]);
    }

    #[test]
    fn test_missing_normals_rejected() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";
        let err = load_mesh_from_bytes(source.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            MeshError::MissingAttribute {
                attribute: "normals",
                ..
            }
        ));
    }

    #[test]
    fn test_partial_normals_rejected() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
f 1 2 3
";
        let err = load_mesh_from_bytes(source.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            MeshError::MissingAttribute {
                attribute: "normals",
                ..
            }
        ));
    }

    #[test]
    fn test_corner_normal_scan() {
        assert!(!has_corner_without_normal(b"f 1//1 2//1 3//1\n"));
        assert!(!has_corner_without_normal(b"f 1/4/1 2/5/1 3/6/1 # textured\n"));
        assert!(!has_corner_without_normal(b"f 1//1 2//1 \\\n  3//1\n"));
        assert!(!has_corner_without_normal(b"v 0 0 0\nvn 0 0 1\n"));
        assert!(has_corner_without_normal(b"f 1/4 2/5 3/6\n"));
        assert!(has_corner_without_normal(b"f 1//1 2// 3//1\n"));
        assert!(has_corner_without_normal(b"f 1//1 2//1 3//1\nf 1 2 3\n"));
    }

    #[test]
    fn test_out_of_pool_indices_are_parse_errors() {
        let position = "v 0 0 0\nvn 0 0 1\nf 1//1 2//1 9//1\n";
        let err = load_mesh_from_bytes(position.as_bytes()).unwrap_err();
        assert!(matches!(err, MeshError::Parse { .. }), "{err:?}");

        let normal = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//7\n";
        let err = load_mesh_from_bytes(normal.as_bytes()).unwrap_err();
        assert!(matches!(err, MeshError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn test_non_finite_position_is_parse_error() {
        let source = "v nan 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
        let err = load_mesh_from_bytes(source.as_bytes()).unwrap_err();
        assert!(matches!(err, MeshError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn test_faceless_file_rejected() {
        let err = load_mesh_from_bytes(b"v 0 0 0\nvn 0 0 1\n").unwrap_err();
        assert!(matches!(
            err,
            MeshError::MissingAttribute {
                attribute: "faces",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_syntax_is_parse_error() {
        let source = "v 0 0 0\nvn 0 0 1\nf 1//1 banana 1//1\n";
        let err = load_mesh_from_bytes(source.as_bytes()).unwrap_err();
        match err {
            MeshError::Parse { path, .. } => assert_eq!(path, PathBuf::from("<memory>")),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_extension_rejected_before_reading() {
        let err = load_mesh("does/not/exist/teapot.stl").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat(_)));

        let err = load_mesh("does/not/exist/teapot").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("weldview_cube_{}.OBJ", std::process::id()));
        std::fs::write(&path, CUBE_OBJ).unwrap();

        let mesh = load_mesh(&path);
        std::fs::remove_file(&path).ok();

        let mesh = mesh.unwrap();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let err = load_mesh("does/not/exist/teapot.obj").unwrap_err();
        assert!(matches!(err, MeshError::Parse { .. }));
    }
}
