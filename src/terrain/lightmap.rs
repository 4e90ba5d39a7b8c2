//! Binary light map baking.
//!
//! Each texel marches a ray toward the light in unit steps over the
//! per-pixel heights of a [`HeightGrid`]. A texel is shadowed as soon as the
//! ray is at or below the terrain, and lit once it reaches the light, leaves
//! the grid or climbs above the highest texel.

use std::ops::Range;
use std::path::Path;

use glam::Vec3;
use image::{GrayImage, Luma};
use log::info;
use rayon::prelude::*;

use super::HeightGrid;

pub const LIT: u8 = 255;
pub const SHADOW: u8 = 0;

/// Baked visibility at raster resolution, `texels[z * width + x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightMap {
    pub width: usize,
    pub height: usize,
    pub texels: Vec<u8>,
}

impl LightMap {
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> u8 {
        self.texels[z * self.width + x]
    }

    /// Share of texels that are lit, in `0.0..=1.0`.
    pub fn lit_fraction(&self) -> f32 {
        let lit = self.texels.iter().filter(|&&t| t == LIT).count();
        lit as f32 / self.texels.len().max(1) as f32
    }

    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, z| {
            Luma([self.get(x as usize, z as usize)])
        })
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.to_image().save(path)
    }
}

/// Ray-marches visibility against a height grid.
///
/// The light position is in texel units: `x`/`z` index the raster and `y`
/// is in the grid's height units.
pub struct LightMapBaker<'a> {
    grid: &'a HeightGrid,
}

impl<'a> LightMapBaker<'a> {
    pub fn new(grid: &'a HeightGrid) -> Self {
        Self { grid }
    }

    /// Bake every texel on the calling thread.
    pub fn bake(&self, light: Vec3) -> LightMap {
        let (width, height) = self.grid.texel_size();
        let texels = self.bake_rows(light, 0..height);
        info!(
            "Baked {}x{} light map toward ({:.1}, {:.1}, {:.1})",
            width, height, light.x, light.y, light.z
        );
        LightMap {
            width,
            height,
            texels,
        }
    }

    /// Bake a band of texel rows, clipped to the raster height.
    ///
    /// Lets callers spread a bake over several invocations.
    pub fn bake_rows(&self, light: Vec3, rows: Range<usize>) -> Vec<u8> {
        let (width, height) = self.grid.texel_size();
        let rows = rows.start.min(height)..rows.end.min(height);
        let ceiling = self.grid.max_texel_height();
        let mut texels = Vec::with_capacity(rows.len() * width);
        for z in rows {
            for x in 0..width {
                texels.push(self.visibility(light, ceiling, x, z));
            }
        }
        texels
    }

    /// Bake with rows partitioned across the rayon pool.
    ///
    /// Output is identical to [`bake`](Self::bake).
    pub fn bake_parallel(&self, light: Vec3) -> LightMap {
        let (width, height) = self.grid.texel_size();
        let ceiling = self.grid.max_texel_height();
        let mut texels = vec![SHADOW; width * height];
        texels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(z, row)| {
                for (x, texel) in row.iter_mut().enumerate() {
                    *texel = self.visibility(light, ceiling, x, z);
                }
            });
        info!(
            "Baked {}x{} light map on {} threads",
            width,
            height,
            rayon::current_num_threads()
        );
        LightMap {
            width,
            height,
            texels,
        }
    }

    /// `ceiling` is the highest texel; a ray above it can no longer be blocked.
    fn visibility(&self, light: Vec3, ceiling: f32, x: usize, z: usize) -> u8 {
        let grid = self.grid;
        let (width, height) = grid.texel_size();
        let origin = Vec3::new(x as f32, grid.texel_height(x, z), z as f32);
        let to_light = light - origin;
        let distance = to_light.length();
        if distance == 0.0 || !distance.is_finite() {
            return LIT;
        }
        let dir = to_light / distance;

        // Integer step count; an f32 accumulator stalls at 2^24
        let steps = distance.ceil() as u64;
        for step in 1..steps {
            let p = origin + dir * step as f32;
            if p.y > ceiling {
                return LIT;
            }
            let (rx, rz) = (p.x.round(), p.z.round());
            if rx < 0.0 || rz < 0.0 || rx >= width as f32 || rz >= height as f32 {
                return LIT;
            }
            if p.y <= grid.texel_height(rx as usize, rz as usize) {
                return SHADOW;
            }
        }
        LIT
    }
}
