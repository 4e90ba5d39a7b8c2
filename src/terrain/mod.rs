//! Terrain construction and queries.
//!
//! This module provides:
//! - [`Raster`] / [`load_raster`] - Raw height samples and their loaders
//! - [`HeightGrid`] - Cell and vertex heights with per-cell signatures
//! - [`MergeStrategy`] - Rectangle decomposition of uniform cells
//! - [`MeshBuilder`] - Triangulated mesh and quad lookup table
//! - [`TerrainQuery`] - Height and slope lookups
//! - [`LightMapBaker`] - Ray-marched visibility maps
//! - [`TerrainService`] - Owner of one built terrain

pub mod error;
pub mod grid;
pub mod lightmap;
pub mod loader;
pub mod merge;
pub mod mesh;
pub mod query;

pub use error::TerrainError;
pub use grid::{CellSignature, HeightGrid};
pub use lightmap::{LightMap, LightMapBaker};
pub use loader::{load_raster, LoadError, Raster};
pub use merge::{MergeMode, MergeStrategy, Rect, RowSweep, SquareGrowth};
pub use mesh::{Diagonal, MeshBuffers, MeshBuilder, Quad, QuadLookupTable, TerrainMesh, Vertex};
pub use query::{TerrainQuery, Transform};

use glam::Vec3;
use log::info;

/// Build parameters for a [`TerrainService`].
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainConfig {
    /// World extent along X
    pub world_width: f32,
    /// World extent along Z
    pub world_height: f32,
    /// Raw samples are divided by this to get heights
    pub scale: f32,
    /// Cell columns; defaults to the raster width
    pub cols: Option<usize>,
    /// Cell rows; defaults to the raster height
    pub rows: Option<usize>,
    /// Optional terrace step applied to heights
    pub height_step: Option<f32>,
    /// Cell merging algorithm
    pub merge: MergeMode,
    /// Share vertices between adjacent quads
    pub weld: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            world_width: 300.0,
            world_height: 300.0,
            scale: 1.0,
            cols: None,
            rows: None,
            height_step: None,
            merge: MergeMode::default(),
            weld: true,
        }
    }
}

/// Size summary of a built terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainStats {
    pub cells: usize,
    pub quads: usize,
    pub vertices: usize,
    pub faces: usize,
}

impl TerrainStats {
    /// Quads per original cell; lower means more merging.
    pub fn reduction(&self) -> f32 {
        self.quads as f32 / self.cells.max(1) as f32
    }
}

/// Owns one built terrain: its height grid, mesh and world transform.
///
/// The grid and mesh are immutable after [`build`](Self::build). The
/// transform may be changed between queries; every query reads its current
/// value.
#[derive(Debug, Clone)]
pub struct TerrainService {
    grid: HeightGrid,
    mesh: TerrainMesh,
    pub transform: Transform,
}

impl TerrainService {
    pub fn build(raster: &Raster, config: &TerrainConfig) -> Result<Self, TerrainError> {
        let cols = config.cols.unwrap_or(raster.width);
        let rows = config.rows.unwrap_or(raster.height);

        let grid = HeightGrid::build(raster, config.scale, cols, rows, config.height_step)?;
        let builder = MeshBuilder::new(&grid, config.world_width, config.world_height)?
            .weld(config.weld);
        let rects = config
            .merge
            .strategy()
            .merge(grid.signatures(), grid.cols, grid.rows);
        let mesh = builder.build(&rects)?;

        let service = Self {
            grid,
            mesh,
            transform: Transform::default(),
        };
        let stats = service.stats();
        info!(
            "Built terrain: {} cells -> {} quads ({:.1}%), {} vertices, {} faces",
            stats.cells,
            stats.quads,
            stats.reduction() * 100.0,
            stats.vertices,
            stats.faces
        );
        Ok(service)
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    pub fn buffers(&self) -> &MeshBuffers {
        &self.mesh.buffers
    }

    pub fn lookup(&self) -> &QuadLookupTable {
        &self.mesh.lookup
    }

    pub fn stats(&self) -> TerrainStats {
        TerrainStats {
            cells: self.grid.cols * self.grid.rows,
            quads: self.mesh.quads.len(),
            vertices: self.mesh.buffers.vertices.len(),
            faces: self.mesh.buffers.faces.len(),
        }
    }

    /// Query view bound to the current transform.
    pub fn query(&self) -> TerrainQuery<'_> {
        TerrainQuery::new(&self.mesh, self.transform)
    }

    pub fn height_at(&self, x: f32, z: f32) -> Result<Option<f32>, TerrainError> {
        self.query().height_at(x, z)
    }

    pub fn angle_at(&self, x: f32, z: f32, radius: f32, heading: f32) -> Result<f32, TerrainError> {
        self.query().angle_at(x, z, radius, heading)
    }

    /// Bake a fresh light map for a light at `light` (texel units).
    pub fn bake_light_map(&self, light: Vec3) -> LightMap {
        LightMapBaker::new(&self.grid).bake(light)
    }
}

/// Build a terrain with default merging and welding.
pub fn build_terrain(
    world_width: f32,
    world_height: f32,
    raster: &Raster,
    scale: f32,
    cols: usize,
    rows: usize,
) -> Result<TerrainService, TerrainError> {
    let config = TerrainConfig {
        world_width,
        world_height,
        scale,
        cols: Some(cols),
        rows: Some(rows),
        ..TerrainConfig::default()
    };
    TerrainService::build(raster, &config)
}

/// Bake a light map over `grid` for a light at `(x, y, z)` in texel units.
pub fn bake_light_map(grid: &HeightGrid, x: f32, y: f32, z: f32) -> LightMap {
    LightMapBaker::new(grid).bake(Vec3::new(x, y, z))
}
