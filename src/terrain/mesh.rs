use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::debug;

use super::{HeightGrid, Rect, TerrainError};

/// Decimal precision used to key welded vertex positions.
const WELD_PRECISION: f32 = 1.0e4;

/// Lookup slot not yet claimed by any rectangle.
const UNASSIGNED: u32 = u32::MAX;

/// Vertex data for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Which diagonal splits a quad into two triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagonal {
    /// Cut from bottom-left to top-right: `(a, b, d)` and `(b, c, d)`
    BD = 0,
    /// Cut from top-left to bottom-right: `(a, b, c)` and `(a, c, d)`
    AC = 1,
}

impl Diagonal {
    /// Pick the diagonal from corner heights `a, b, c, d`.
    pub fn choose(ay: f32, by: f32, cy: f32, dy: f32) -> Self {
        if (dy - by) > (ay - cy) {
            Diagonal::AC
        } else {
            Diagonal::BD
        }
    }

    /// Corner indices (into `a, b, c, d`) of the two triangles.
    pub fn triangles(self) -> [[usize; 3]; 2] {
        match self {
            Diagonal::BD => [[0, 1, 3], [1, 2, 3]],
            Diagonal::AC => [[0, 1, 2], [0, 2, 3]],
        }
    }
}

/// One merged mesh cell.
///
/// Corners are in local space, ordered `a` = top-left, `b` = bottom-left,
/// `c` = bottom-right, `d` = top-right in grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Vec3; 4],
    pub diagonal: Diagonal,
    pub rect: Rect,
}

/// Maps every grid cell to the quad covering it.
#[derive(Debug, Clone)]
pub struct QuadLookupTable {
    cols: usize,
    cell_to_quad: Vec<u32>,
}

impl QuadLookupTable {
    pub(crate) fn new(cols: usize, cell_to_quad: Vec<u32>) -> Self {
        Self { cols, cell_to_quad }
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> usize {
        self.cell_to_quad[row * self.cols + col] as usize
    }

    pub fn len(&self) -> usize {
        self.cell_to_quad.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_to_quad.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.cell_to_quad
    }
}

/// Renderable geometry.
#[derive(Debug, Clone, Default)]
pub struct MeshBuffers {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<[u32; 3]>,
}

impl MeshBuffers {
    /// Flattened triangle list for index buffers.
    pub fn indices(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }

    /// Texture coordinates of the three corners of `face`.
    pub fn face_uvs(&self, face: usize) -> [[f32; 2]; 3] {
        self.faces[face].map(|i| self.vertices[i as usize].uv)
    }

    /// Unit normal of `face`, `Vec3::Y` for zero-area faces.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        self.face_cross(face).try_normalize().unwrap_or(Vec3::Y)
    }

    fn face_cross(&self, face: usize) -> Vec3 {
        let [p0, p1, p2] = self.faces[face].map(|i| Vec3::from(self.vertices[i as usize].position));
        (p1 - p0).cross(p2 - p0)
    }

    /// Area-weighted vertex normals from adjacent faces.
    fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.vertices.len()];
        for face in 0..self.faces.len() {
            let n = self.face_cross(face);
            for &i in &self.faces[face] {
                sums[i as usize] += n;
            }
        }
        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = sum.try_normalize().unwrap_or(Vec3::Y).to_array();
        }
    }
}

/// Built terrain geometry plus the lookup structures used by queries.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub buffers: MeshBuffers,
    pub quads: Vec<Quad>,
    pub lookup: QuadLookupTable,
    /// World extent along X
    pub width: f32,
    /// World extent along Z
    pub height: f32,
    pub cols: usize,
    pub rows: usize,
}

impl TerrainMesh {
    /// Size of one grid cell in local units `(x, z)`.
    pub fn cell_size(&self) -> (f32, f32) {
        (self.width / self.cols as f32, self.height / self.rows as f32)
    }
}

/// Turns merged rectangles into triangles.
pub struct MeshBuilder<'a> {
    grid: &'a HeightGrid,
    width: f32,
    height: f32,
    weld: bool,
}

impl<'a> MeshBuilder<'a> {
    /// `width`/`height` are the world extents the grid is stretched over,
    /// centered on the origin.
    pub fn new(grid: &'a HeightGrid, width: f32, height: f32) -> Result<Self, TerrainError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(TerrainError::InvalidExtent { width, height });
        }
        Ok(Self {
            grid,
            width,
            height,
            weld: true,
        })
    }

    /// Share one vertex between rectangles meeting at a corner (default on).
    pub fn weld(mut self, weld: bool) -> Self {
        self.weld = weld;
        self
    }

    /// Local-space position of lattice point `(gx, gz)`.
    fn lattice_point(&self, gx: usize, gz: usize) -> Vec3 {
        let grid = self.grid;
        Vec3::new(
            gx as f32 * self.width / grid.cols as f32 - self.width / 2.0,
            grid.vertex_height(gx, gz),
            gz as f32 * self.height / grid.rows as f32 - self.height / 2.0,
        )
    }

    /// Generate mesh from `rects`.
    ///
    /// The rectangles must partition the grid: each one non-empty and in
    /// bounds, every cell covered exactly once.
    pub fn build(&self, rects: &[Rect]) -> Result<TerrainMesh, TerrainError> {
        let (cols, rows) = (self.grid.cols, self.grid.rows);
        let mut buffers = MeshBuffers {
            vertices: Vec::with_capacity(rects.len() * 4),
            faces: Vec::with_capacity(rects.len() * 2),
        };
        let mut quads = Vec::with_capacity(rects.len());
        let mut cell_to_quad = vec![UNASSIGNED; cols * rows];
        let mut welded: HashMap<[i64; 3], u32> = HashMap::new();

        for rect in rects {
            if !rect.fits(cols, rows) {
                return Err(TerrainError::InvalidRect {
                    x: rect.x,
                    z: rect.z,
                    w: rect.w,
                    h: rect.h,
                    cols,
                    rows,
                });
            }

            let quad_index = quads.len() as u32;
            for (x, z) in rect.cells() {
                let slot = &mut cell_to_quad[z * cols + x];
                if *slot != UNASSIGNED {
                    return Err(TerrainError::OverlappingRects { x, z });
                }
                *slot = quad_index;
            }

            let lattice = [
                (rect.x, rect.z),
                (rect.x, rect.z + rect.h),
                (rect.x + rect.w, rect.z + rect.h),
                (rect.x + rect.w, rect.z),
            ];
            let corners = lattice.map(|(gx, gz)| self.lattice_point(gx, gz));
            let diagonal = Diagonal::choose(corners[0].y, corners[1].y, corners[2].y, corners[3].y);

            let mut ids = [0u32; 4];
            for (slot, (&(gx, gz), &pos)) in lattice.iter().zip(corners.iter()).enumerate() {
                let vertex = Vertex {
                    position: pos.to_array(),
                    normal: [0.0, 1.0, 0.0],
                    uv: [gx as f32 / cols as f32, 1.0 - gz as f32 / rows as f32],
                };
                ids[slot] = if self.weld {
                    let key = pos.to_array().map(|v| (v * WELD_PRECISION).round() as i64);
                    *welded.entry(key).or_insert_with(|| {
                        buffers.vertices.push(vertex);
                        (buffers.vertices.len() - 1) as u32
                    })
                } else {
                    buffers.vertices.push(vertex);
                    (buffers.vertices.len() - 1) as u32
                };
            }

            for tri in diagonal.triangles() {
                buffers.faces.push(tri.map(|corner| ids[corner]));
            }

            quads.push(Quad {
                corners,
                diagonal,
                rect: *rect,
            });
        }

        if let Some(i) = cell_to_quad.iter().position(|&q| q == UNASSIGNED) {
            return Err(TerrainError::UncoveredCell {
                x: i % cols,
                z: i / cols,
            });
        }

        buffers.compute_vertex_normals();

        debug!(
            "Mesh: {} quads, {} vertices, {} faces (weld {})",
            quads.len(),
            buffers.vertices.len(),
            buffers.faces.len(),
            if self.weld { "on" } else { "off" }
        );

        Ok(TerrainMesh {
            buffers,
            quads,
            lookup: QuadLookupTable::new(cols, cell_to_quad),
            width: self.width,
            height: self.height,
            cols,
            rows,
        })
    }
}
