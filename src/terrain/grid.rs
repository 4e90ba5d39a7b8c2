//! Height grid construction.
//!
//! Reduces a [`Raster`] to a `cols x rows` cell grid, averages the cell
//! samples onto the `(cols + 1) x (rows + 1)` vertex lattice, and derives a
//! [`CellSignature`] per cell from its four corner heights.

use log::{debug, warn};

use super::{Raster, TerrainError};

/// Exact key of a cell's four corner heights, in `a, b, c, d` order
/// (top-left, bottom-left, bottom-right, top-right).
///
/// Stores the bit patterns of the heights, so two signatures compare equal
/// if and only if all four heights are identical. `-0.0` is folded into
/// `0.0` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellSignature([u32; 4]);

impl CellSignature {
    pub fn from_corners(corners: [f32; 4]) -> Self {
        // -0.0 + 0.0 == +0.0
        Self(corners.map(|h| (h + 0.0).to_bits()))
    }

    pub fn corners(&self) -> [f32; 4] {
        self.0.map(f32::from_bits)
    }
}

/// Discretized terrain elevation.
///
/// Immutable once built. Heights are in world-height units, i.e. raw
/// intensity divided by the build `scale`.
#[derive(Debug, Clone)]
pub struct HeightGrid {
    pub cols: usize,
    pub rows: usize,
    texel_width: usize,
    texel_height: usize,
    /// Per-pixel heights at raster resolution, `texels[z * texel_width + x]`
    texels: Vec<f32>,
    /// Per-cell heights, `cell_heights[z * cols + x]`
    cell_heights: Vec<f32>,
    /// Lattice heights, `vertex_heights[z * (cols + 1) + x]`
    vertex_heights: Vec<f32>,
    signatures: Vec<CellSignature>,
}

impl HeightGrid {
    /// Build a grid from `raster` at `cols x rows` cell resolution.
    ///
    /// `height_step`, when positive, floors every sample to a multiple of
    /// the step so gently varying regions become flat terraces.
    pub fn build(
        raster: &Raster,
        scale: f32,
        cols: usize,
        rows: usize,
        height_step: Option<f32>,
    ) -> Result<Self, TerrainError> {
        if raster.width == 0 || raster.height == 0 || raster.samples.is_empty() {
            return Err(TerrainError::EmptyInput);
        }
        if cols == 0 || rows == 0 {
            return Err(TerrainError::InvalidResolution { cols, rows });
        }
        let expected = raster.width * raster.height;
        if raster.samples.len() != expected {
            return Err(TerrainError::RasterSizeMismatch {
                expected,
                actual: raster.samples.len(),
            });
        }
        if !scale.is_finite() || scale == 0.0 {
            return Err(TerrainError::InvalidScale(scale));
        }
        let vertex_count = (cols + 1)
            .checked_mul(rows + 1)
            .filter(|&n| n <= u32::MAX as usize)
            .ok_or(TerrainError::TooLarge { cols, rows })?;

        let step = height_step.filter(|s| s.is_finite() && *s > 0.0);
        let texels = raster
            .samples
            .iter()
            .enumerate()
            .map(|(index, &v)| {
                let h = v / scale;
                let h = match step {
                    Some(s) => (h / s).floor() * s,
                    None => h,
                };
                if h.is_finite() {
                    Ok(h)
                } else {
                    Err(TerrainError::NonFiniteSample { index })
                }
            })
            .collect::<Result<Vec<f32>, _>>()?;

        if raster.width != cols || raster.height != rows {
            warn!(
                "Resampling {}x{} raster to {}x{} cells",
                raster.width, raster.height, cols, rows
            );
        }

        let cell_heights = resample_cells(&texels, raster.width, raster.height, cols, rows);
        let vertex_heights = average_vertices(&cell_heights, cols, rows);
        debug_assert_eq!(vertex_heights.len(), vertex_count);

        let cols1 = cols + 1;
        let mut signatures = Vec::with_capacity(cols * rows);
        for z in 0..rows {
            for x in 0..cols {
                signatures.push(CellSignature::from_corners([
                    vertex_heights[z * cols1 + x],
                    vertex_heights[(z + 1) * cols1 + x],
                    vertex_heights[(z + 1) * cols1 + x + 1],
                    vertex_heights[z * cols1 + x + 1],
                ]));
            }
        }

        debug!(
            "Height grid: {}x{} cells, {} lattice vertices",
            cols, rows, vertex_count
        );

        Ok(Self {
            cols,
            rows,
            texel_width: raster.width,
            texel_height: raster.height,
            texels,
            cell_heights,
            vertex_heights,
            signatures,
        })
    }

    /// Lattice height at vertex `(x, z)`, `x <= cols`, `z <= rows`.
    #[inline]
    pub fn vertex_height(&self, x: usize, z: usize) -> f32 {
        self.vertex_heights[z * (self.cols + 1) + x]
    }

    pub fn vertex_heights(&self) -> &[f32] {
        &self.vertex_heights
    }

    /// Height sample of cell `(x, z)` before lattice averaging.
    #[inline]
    pub fn cell_height(&self, x: usize, z: usize) -> f32 {
        self.cell_heights[z * self.cols + x]
    }

    #[inline]
    pub fn signature(&self, x: usize, z: usize) -> CellSignature {
        self.signatures[z * self.cols + x]
    }

    /// Row-major `cols * rows` signature array.
    pub fn signatures(&self) -> &[CellSignature] {
        &self.signatures
    }

    /// Raster dimensions `(width, height)` of the per-pixel heights.
    pub fn texel_size(&self) -> (usize, usize) {
        (self.texel_width, self.texel_height)
    }

    /// Per-pixel height at raster resolution.
    #[inline]
    pub fn texel_height(&self, x: usize, z: usize) -> f32 {
        self.texels[z * self.texel_width + x]
    }

    /// Highest per-pixel height.
    pub fn max_texel_height(&self) -> f32 {
        self.texels.iter().copied().fold(f32::MIN, f32::max)
    }

    /// Returns the minimum and maximum lattice heights.
    pub fn height_bounds(&self) -> (f32, f32) {
        self.vertex_heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }
}

/// Box-filter pixels down (or up) to one sample per cell.
fn resample_cells(
    texels: &[f32],
    width: usize,
    height: usize,
    cols: usize,
    rows: usize,
) -> Vec<f32> {
    if width == cols && height == rows {
        return texels.to_vec();
    }

    let span = |i: usize, cells: usize, pixels: usize| {
        let start = i * pixels / cells;
        let end = ((i + 1) * pixels / cells).clamp(start + 1, pixels);
        start..end
    };

    let mut cells = Vec::with_capacity(cols * rows);
    for cz in 0..rows {
        let zs = span(cz, rows, height);
        for cx in 0..cols {
            let xs = span(cx, cols, width);
            let mut sum = 0.0;
            for z in zs.clone() {
                for x in xs.clone() {
                    sum += texels[z * width + x];
                }
            }
            cells.push(sum / (zs.len() * xs.len()) as f32);
        }
    }
    cells
}

/// Average the up-to-four cells touching each lattice vertex.
fn average_vertices(cells: &[f32], cols: usize, rows: usize) -> Vec<f32> {
    let mut vertices = Vec::with_capacity((cols + 1) * (rows + 1));
    for vz in 0..=rows {
        for vx in 0..=cols {
            let mut sum = 0.0;
            let mut count = 0;
            for z in vz.saturating_sub(1)..(vz + 1).min(rows) {
                for x in vx.saturating_sub(1)..(vx + 1).min(cols) {
                    sum += cells[z * cols + x];
                    count += 1;
                }
            }
            vertices.push(sum / count as f32);
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: usize, height: usize, samples: Vec<f32>) -> Raster {
        Raster::new(width, height, samples).unwrap()
    }

    // ==================== Validation ====================

    #[test]
    fn test_zero_resolution_rejected() {
        let r = raster(2, 2, vec![0.0; 4]);
        let result = HeightGrid::build(&r, 1.0, 0, 2, None);
        assert_eq!(
            result.unwrap_err(),
            TerrainError::InvalidResolution { cols: 0, rows: 2 }
        );
    }

    #[test]
    fn test_empty_raster_rejected() {
        let r = Raster {
            width: 0,
            height: 0,
            samples: vec![],
        };
        let result = HeightGrid::build(&r, 1.0, 2, 2, None);
        assert_eq!(result.unwrap_err(), TerrainError::EmptyInput);
    }

    #[test]
    fn test_zero_scale_rejected() {
        let r = raster(1, 1, vec![1.0]);
        let result = HeightGrid::build(&r, 0.0, 1, 1, None);
        assert!(matches!(result, Err(TerrainError::InvalidScale(_))));
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let r = raster(2, 1, vec![1.0, f32::NAN]);
        let result = HeightGrid::build(&r, 1.0, 2, 1, None);
        assert_eq!(
            result.unwrap_err(),
            TerrainError::NonFiniteSample { index: 1 }
        );
    }

    // ==================== Vertex Heights ====================

    #[test]
    fn test_vertex_lattice_size() {
        let r = raster(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let grid = HeightGrid::build(&r, 1.0, 3, 2, None).unwrap();

        assert_eq!(grid.vertex_heights().len(), 4 * 3);
        assert!(grid.vertex_heights().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_vertex_averages_touching_cells() {
        let r = raster(2, 2, vec![0.0, 0.0, 0.0, 10.0]);
        let grid = HeightGrid::build(&r, 1.0, 2, 2, None).unwrap();

        // Corners see one cell, edges two, the center all four
        assert_eq!(grid.vertex_height(0, 0), 0.0);
        assert_eq!(grid.vertex_height(2, 2), 10.0);
        assert_eq!(grid.vertex_height(2, 1), 5.0);
        assert_eq!(grid.vertex_height(1, 2), 5.0);
        assert_eq!(grid.vertex_height(1, 1), 2.5);
    }

    #[test]
    fn test_scale_divides_samples() {
        let r = raster(1, 1, vec![100.0]);
        let grid = HeightGrid::build(&r, 4.0, 1, 1, None).unwrap();
        assert_eq!(grid.vertex_height(0, 0), 25.0);
        assert_eq!(grid.texel_height(0, 0), 25.0);
    }

    #[test]
    fn test_height_step_terraces() {
        let r = raster(3, 1, vec![0.4, 1.2, 1.9]);
        let grid = HeightGrid::build(&r, 1.0, 3, 1, Some(1.0)).unwrap();

        assert_eq!(grid.cell_height(0, 0), 0.0);
        assert_eq!(grid.cell_height(1, 0), 1.0);
        assert_eq!(grid.cell_height(2, 0), 1.0);
    }

    #[test]
    fn test_downsample_box_filter() {
        let r = raster(
            4,
            2,
            vec![
                1.0, 3.0, 10.0, 10.0, //
                1.0, 3.0, 20.0, 20.0,
            ],
        );
        let grid = HeightGrid::build(&r, 1.0, 2, 1, None).unwrap();

        assert_eq!(grid.cell_height(0, 0), 2.0);
        assert_eq!(grid.cell_height(1, 0), 15.0);
        // Texels keep the raster resolution
        assert_eq!(grid.texel_size(), (4, 2));
    }

    #[test]
    fn test_upsample_uses_nearest() {
        let r = raster(1, 1, vec![7.0]);
        let grid = HeightGrid::build(&r, 1.0, 3, 3, None).unwrap();

        assert!(grid.vertex_heights().iter().all(|&h| h == 7.0));
    }

    #[test]
    fn test_deterministic() {
        let r = raster(3, 3, (0..9).map(|v| v as f32 * 1.7).collect());
        let a = HeightGrid::build(&r, 2.0, 3, 3, None).unwrap();
        let b = HeightGrid::build(&r, 2.0, 3, 3, None).unwrap();

        assert_eq!(a.vertex_heights(), b.vertex_heights());
        assert_eq!(a.signatures(), b.signatures());
    }

    // ==================== Signatures ====================

    #[test]
    fn test_signature_equality_is_exact() {
        let s1 = CellSignature::from_corners([1.0, 2.0, 3.0, 4.0]);
        let s2 = CellSignature::from_corners([1.0, 2.0, 3.0, 4.0]);
        let s3 = CellSignature::from_corners([4.0, 3.0, 2.0, 1.0]);
        let s4 = CellSignature::from_corners([1.0, 2.0, 3.0, 4.000001]);

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
        assert_ne!(s1, s4);
        assert_eq!(s1.corners(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_signature_folds_negative_zero() {
        let a = CellSignature::from_corners([0.0, 0.0, 0.0, 0.0]);
        let b = CellSignature::from_corners([-0.0, 0.0, -0.0, 0.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_flat_grid_has_one_signature() {
        let r = raster(4, 4, vec![10.0; 16]);
        let grid = HeightGrid::build(&r, 1.0, 4, 4, None).unwrap();

        let first = grid.signature(0, 0);
        assert!(grid.signatures().iter().all(|&s| s == first));
    }

    #[test]
    fn test_two_by_two_distinct_signatures() {
        let r = raster(2, 2, vec![0.0, 0.0, 0.0, 10.0]);
        let grid = HeightGrid::build(&r, 1.0, 2, 2, None).unwrap();

        let sigs = grid.signatures();
        for i in 0..sigs.len() {
            for j in (i + 1)..sigs.len() {
                assert_ne!(sigs[i], sigs[j], "cells {} and {} collide", i, j);
            }
        }
    }
}
