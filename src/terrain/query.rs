//! Height and slope lookups against a built [`TerrainMesh`].
//!
//! Cell lookup uses half-open intervals: a point is inside the terrain iff
//! `-width/2 <= x < width/2` and `-height/2 <= z < height/2` in local space,
//! and a point exactly on a cell boundary belongs to the cell on the
//! positive side.

use glam::Vec3;

use super::{Diagonal, Quad, TerrainError, TerrainMesh};

/// Placement of the terrain in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Read-only query view over a mesh and the transform current at the time
/// of the call.
#[derive(Debug, Clone, Copy)]
pub struct TerrainQuery<'a> {
    mesh: &'a TerrainMesh,
    transform: Transform,
}

impl<'a> TerrainQuery<'a> {
    pub fn new(mesh: &'a TerrainMesh, transform: Transform) -> Self {
        Self { mesh, transform }
    }

    /// Interpolated world height at world `(x, z)`.
    ///
    /// Returns `Ok(None)` outside the terrain.
    pub fn height_at(&self, x: f32, z: f32) -> Result<Option<f32>, TerrainError> {
        let t = &self.transform;
        let lx = (x - t.position.x) / t.scale.x;
        let lz = (z - t.position.z) / t.scale.z;

        Ok(self
            .local_height_at(lx, lz)?
            .map(|h| h * t.scale.y + t.position.y))
    }

    /// Slope angle (radians) along `heading` at world `(x, z)`.
    ///
    /// Samples the height `radius` ahead of and behind the point; samples
    /// outside the terrain count as height `0`. A zero radius is flat.
    pub fn angle_at(&self, x: f32, z: f32, radius: f32, heading: f32) -> Result<f32, TerrainError> {
        let (sin, cos) = heading.sin_cos();
        let (x1, z1) = (x + sin * radius, z + cos * radius);
        let (x2, z2) = (x - sin * radius, z - cos * radius);

        let y1 = self.height_at(x1, z1)?.unwrap_or(0.0);
        let y2 = self.height_at(x2, z2)?.unwrap_or(0.0);

        let distance = ((x2 - x1).powi(2) + (z2 - z1).powi(2)).sqrt();
        if distance == 0.0 {
            return Ok(0.0);
        }
        Ok(((y2 - y1) / distance).atan())
    }

    /// Index of the quad owning local `(lx, lz)`, if inside.
    pub fn quad_at(&self, lx: f32, lz: f32) -> Option<usize> {
        let mesh = self.mesh;
        let (hw, hh) = (mesh.width / 2.0, mesh.height / 2.0);
        // Negated form also rejects NaN
        if !(lx >= -hw && lx < hw && lz >= -hh && lz < hh) {
            return None;
        }

        let (cw, ch) = mesh.cell_size();
        let col = (((lx + hw) / cw).floor() as usize).min(mesh.cols - 1);
        let row = (((lz + hh) / ch).floor() as usize).min(mesh.rows - 1);
        Some(mesh.lookup.get(col, row))
    }

    /// Interpolated local height at local `(lx, lz)`, before the transform.
    pub fn local_height_at(&self, lx: f32, lz: f32) -> Result<Option<f32>, TerrainError> {
        match self.quad_at(lx, lz) {
            Some(index) => interpolate(&self.mesh.quads[index], index, lx, lz).map(Some),
            None => Ok(None),
        }
    }
}

/// Barycentric height inside the triangle of `quad` containing `(x, z)`.
fn interpolate(quad: &Quad, index: usize, x: f32, z: f32) -> Result<f32, TerrainError> {
    let [a, _, c, _] = quad.corners;
    let u = (x - a.x) / (c.x - a.x);
    let v = (z - a.z) / (c.z - a.z);

    let second = match quad.diagonal {
        Diagonal::AC => u > v,
        Diagonal::BD => u + v >= 1.0,
    };
    let tri = quad.diagonal.triangles()[second as usize];
    let [p1, p2, p3] = tri.map(|i| quad.corners[i]);

    barycentric(p1, p2, p3, x, z)
        .map(|[l1, l2, l3]| l1 * p1.y + l2 * p2.y + l3 * p3.y)
        .ok_or(TerrainError::DegenerateTriangle { quad: index })
}

/// Weights of `(x, z)` relative to the XZ projection of a triangle, or
/// `None` for collinear corners.
fn barycentric(p1: Vec3, p2: Vec3, p3: Vec3, x: f32, z: f32) -> Option<[f32; 3]> {
    let det = (p2.z - p3.z) * (p1.x - p3.x) + (p3.x - p2.x) * (p1.z - p3.z);
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let l1 = ((p2.z - p3.z) * (x - p3.x) + (p3.x - p2.x) * (z - p3.z)) / det;
    let l2 = ((p3.z - p1.z) * (x - p3.x) + (p1.x - p3.x) * (z - p3.z)) / det;
    Some([l1, l2, 1.0 - l1 - l2])
}
