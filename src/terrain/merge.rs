//! Rectangle decomposition of the cell signature grid.
//!
//! A [`MergeStrategy`] partitions a row-major `cols x rows` grid of
//! [`CellSignature`]s into disjoint axis-aligned [`Rect`]s whose cells all
//! share one signature. Every cell ends up in exactly one rectangle.

use super::CellSignature;

/// A group of grid cells sharing one signature.
///
/// Origin `(x, z)` is the top-left cell, `w`/`h` are extents in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub z: usize,
    pub w: usize,
    pub h: usize,
    pub signature: CellSignature,
}

impl Rect {
    pub fn area(&self) -> usize {
        self.w * self.h
    }

    /// Non-empty and inside a `cols x rows` grid.
    pub fn fits(&self, cols: usize, rows: usize) -> bool {
        self.w > 0
            && self.h > 0
            && self.x < cols
            && self.z < rows
            && self.w <= cols - self.x
            && self.h <= rows - self.z
    }

    /// Row-major cell coordinates covered by this rectangle.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.z..self.z + self.h).flat_map(move |z| (self.x..self.x + self.w).map(move |x| (x, z)))
    }
}

/// Partitions a signature grid into uniform rectangles.
///
/// Implementations must cover every cell exactly once and emit rectangles in
/// row-major order of their top-left cell.
pub trait MergeStrategy {
    fn merge(&self, signatures: &[CellSignature], cols: usize, rows: usize) -> Vec<Rect>;
}

/// Selectable merge algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Grow squares from each free cell
    #[default]
    Squares,
    /// Grow along the row first, then downward
    Rectangles,
}

impl MergeMode {
    pub fn strategy(self) -> &'static dyn MergeStrategy {
        match self {
            MergeMode::Squares => &SquareGrowth,
            MergeMode::Rectangles => &RowSweep,
        }
    }
}

/// Greedy square growth.
///
/// From each unvisited cell, grows a square one step at a time while every
/// cell of the larger square matches the start signature and is unvisited.
/// Elongated uniform regions end up split into several squares.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareGrowth;

impl MergeStrategy for SquareGrowth {
    fn merge(&self, signatures: &[CellSignature], cols: usize, rows: usize) -> Vec<Rect> {
        let mut visited = VisitMap::new(cols, rows);
        let mut rects = Vec::new();

        for z in 0..rows {
            for x in 0..cols {
                if visited.get(x, z) {
                    continue;
                }
                let start = signatures[z * cols + x];
                let fits = |cx: usize, cz: usize| {
                    signatures[cz * cols + cx] == start && !visited.get(cx, cz)
                };

                let mut size = 1;
                // Only the new bottom row and right column need checking per step
                while x + size < cols && z + size < rows {
                    let edge_ok = (x..=x + size).all(|cx| fits(cx, z + size))
                        && (z..z + size).all(|cz| fits(x + size, cz));
                    if !edge_ok {
                        break;
                    }
                    size += 1;
                }

                let rect = Rect {
                    x,
                    z,
                    w: size,
                    h: size,
                    signature: start,
                };
                visited.mark(&rect);
                rects.push(rect);
            }
        }

        rects
    }
}

/// Greedy row-first rectangle growth.
///
/// Extends right along the start row as far as the signature holds, then
/// extends downward while the whole span of the next row still matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowSweep;

impl MergeStrategy for RowSweep {
    fn merge(&self, signatures: &[CellSignature], cols: usize, rows: usize) -> Vec<Rect> {
        let mut visited = VisitMap::new(cols, rows);
        let mut rects = Vec::new();

        for z in 0..rows {
            for x in 0..cols {
                if visited.get(x, z) {
                    continue;
                }
                let start = signatures[z * cols + x];
                let fits = |cx: usize, cz: usize| {
                    signatures[cz * cols + cx] == start && !visited.get(cx, cz)
                };

                let mut w = 1;
                while x + w < cols && fits(x + w, z) {
                    w += 1;
                }
                let mut h = 1;
                while z + h < rows && (x..x + w).all(|cx| fits(cx, z + h)) {
                    h += 1;
                }

                let rect = Rect {
                    x,
                    z,
                    w,
                    h,
                    signature: start,
                };
                visited.mark(&rect);
                rects.push(rect);
            }
        }

        rects
    }
}

struct VisitMap {
    cols: usize,
    cells: Vec<bool>,
}

impl VisitMap {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            cells: vec![false; cols * rows],
        }
    }

    #[inline]
    fn get(&self, x: usize, z: usize) -> bool {
        self.cells[z * self.cols + x]
    }

    fn mark(&mut self, rect: &Rect) {
        for (x, z) in rect.cells() {
            self.cells[z * self.cols + x] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(v: f32) -> CellSignature {
        CellSignature::from_corners([v; 4])
    }

    /// Grid from a row-major list of plain values.
    fn grid(values: &[f32]) -> Vec<CellSignature> {
        values.iter().map(|&v| sig(v)).collect()
    }

    /// Asserts every cell is covered exactly once and each rect is uniform.
    fn assert_partition(rects: &[Rect], sigs: &[CellSignature], cols: usize, rows: usize) {
        let mut owner = vec![0usize; cols * rows];
        for rect in rects {
            assert!(rect.fits(cols, rows), "{:?}", rect);
            for (x, z) in rect.cells() {
                owner[z * cols + x] += 1;
                assert_eq!(sigs[z * cols + x], rect.signature);
            }
        }
        assert!(owner.iter().all(|&n| n == 1), "coverage: {:?}", owner);
    }

    fn checkerboard(cols: usize, rows: usize) -> Vec<CellSignature> {
        (0..rows)
            .flat_map(|z| (0..cols).map(move |x| sig(((x + z) % 2) as f32)))
            .collect()
    }

    // ==================== Square Growth ====================

    #[test]
    fn test_squares_uniform_square_grid() {
        let sigs = grid(&[5.0; 16]);
        let rects = SquareGrowth.merge(&sigs, 4, 4);

        assert_eq!(rects.len(), 1);
        assert_eq!((rects[0].w, rects[0].h), (4, 4));
    }

    #[test]
    fn test_squares_checkerboard() {
        let sigs = checkerboard(5, 3);
        let rects = SquareGrowth.merge(&sigs, 5, 3);

        assert_eq!(rects.len(), 15);
        assert!(rects.iter().all(|r| r.area() == 1));
        assert_partition(&rects, &sigs, 5, 3);
    }

    #[test]
    fn test_squares_clip_at_boundary() {
        // 4x2 uniform: two 2x2 squares
        let sigs = grid(&[1.0; 8]);
        let rects = SquareGrowth.merge(&sigs, 4, 2);

        assert_eq!(rects.len(), 2);
        assert_eq!((rects[0].x, rects[0].w), (0, 2));
        assert_eq!((rects[1].x, rects[1].w), (2, 2));
        assert_partition(&rects, &sigs, 4, 2);
    }

    #[test]
    fn test_squares_split_long_strip() {
        let sigs = grid(&[3.0; 6]);
        let rects = SquareGrowth.merge(&sigs, 6, 1);

        assert_eq!(rects.len(), 6);
    }

    #[test]
    fn test_squares_stop_at_visited_cells() {
        #[rustfmt::skip]
        let sigs = grid(&[
            1.0, 1.0, 2.0,
            1.0, 1.0, 2.0,
            2.0, 2.0, 2.0,
        ]);
        let rects = SquareGrowth.merge(&sigs, 3, 3);

        assert_eq!(
            rects[0],
            Rect {
                x: 0,
                z: 0,
                w: 2,
                h: 2,
                signature: sig(1.0),
            }
        );
        assert_partition(&rects, &sigs, 3, 3);
        assert_eq!(rects.len(), 1 + 5);
    }

    #[test]
    fn test_squares_row_major_order() {
        let sigs = checkerboard(3, 2);
        let rects = SquareGrowth.merge(&sigs, 3, 2);
        let origins: Vec<(usize, usize)> = rects.iter().map(|r| (r.x, r.z)).collect();

        assert_eq!(origins, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    // ==================== Row Sweep ====================

    #[test]
    fn test_rows_uniform_any_shape() {
        let sigs = grid(&[1.0; 15]);
        let rects = RowSweep.merge(&sigs, 5, 3);

        assert_eq!(rects.len(), 1);
        assert_eq!((rects[0].w, rects[0].h), (5, 3));
    }

    #[test]
    fn test_rows_long_strip_single_rect() {
        let sigs = grid(&[3.0; 6]);
        let rects = RowSweep.merge(&sigs, 6, 1);

        assert_eq!(rects.len(), 1);
    }

    #[test]
    fn test_rows_checkerboard() {
        let sigs = checkerboard(4, 4);
        let rects = RowSweep.merge(&sigs, 4, 4);

        assert_eq!(rects.len(), 16);
        assert_partition(&rects, &sigs, 4, 4);
    }

    #[test]
    fn test_rows_mixed_partition() {
        #[rustfmt::skip]
        let sigs = grid(&[
            1.0, 1.0, 1.0, 2.0,
            1.0, 1.0, 2.0, 2.0,
            3.0, 3.0, 3.0, 3.0,
        ]);
        let rects = RowSweep.merge(&sigs, 4, 3);

        assert_partition(&rects, &sigs, 4, 3);
        assert_eq!(
            rects[0],
            Rect {
                x: 0,
                z: 0,
                w: 3,
                h: 1,
                signature: sig(1.0),
            }
        );
    }

    // ==================== Mode ====================

    #[test]
    fn test_mode_dispatch() {
        let sigs = grid(&[1.0; 8]);
        assert_eq!(MergeMode::Squares.strategy().merge(&sigs, 4, 2).len(), 2);
        assert_eq!(MergeMode::Rectangles.strategy().merge(&sigs, 4, 2).len(), 1);
    }

    #[test]
    fn test_pseudo_random_partitions() {
        // Deterministic LCG noise over a small alphabet exercises odd shapes
        let (cols, rows) = (13, 9);
        let mut state = 12345u32;
        let sigs: Vec<CellSignature> = (0..cols * rows)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                sig(((state >> 16) % 3) as f32)
            })
            .collect();

        assert_partition(&SquareGrowth.merge(&sigs, cols, rows), &sigs, cols, rows);
        assert_partition(&RowSweep.merge(&sigs, cols, rows), &sigs, cols, rows);
    }
}
