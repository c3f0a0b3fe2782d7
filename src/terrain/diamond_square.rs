//! Recursive midpoint displacement ("diamond-square")
//!
//! Operates on a square row-major grid of side `2^L + 1`. Every pass fills the
//! centers of all squares of the current width, then the midpoints of all
//! their edges, then halves the width. The random perturbation is the same at
//! every width, which keeps small-scale roughness high.

use std::ops::Range;

use rand::Rng;

/// Range of the initial corner elevations
pub const CORNER_RANGE: Range<f64> = -500.0..1500.0;

/// Range of the perturbation added to every generated midpoint
pub const DISPLACEMENT_RANGE: Range<f64> = -200.0..200.0;

// ============================================================================
// GRID HELPERS
// ============================================================================

#[inline]
fn index(size: usize, x: usize, y: usize) -> usize {
    y * size + x
}

/// Seed the four corner cells with independent uniform samples
pub fn seed_corners<R: Rng + ?Sized>(cells: &mut [f64], size: usize, rng: &mut R) {
    let last = size - 1;
    for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
        cells[index(size, x, y)] = rng.gen_range(CORNER_RANGE);
    }
}

/// Fill every non-corner cell by repeated midpoint displacement
///
/// Corner cells must already be set and are never written.
pub fn subdivide<R: Rng + ?Sized>(cells: &mut [f64], size: usize, rng: &mut R) {
    let mut width = size.saturating_sub(1);

    while width >= 1 {
        let half = width / 2;
        if half >= 1 {
            square_step(cells, size, width, rng);
            edge_step(cells, size, width, rng);
        }
        width /= 2;
    }
}

// ============================================================================
// DISPLACEMENT STEPS
// ============================================================================

/// Centers of every `width`-sized square: corner mean plus perturbation
fn square_step<R: Rng + ?Sized>(cells: &mut [f64], size: usize, width: usize, rng: &mut R) {
    let half = width / 2;

    for y in (0..size - 1).step_by(width) {
        for x in (0..size - 1).step_by(width) {
            let average = (cells[index(size, x, y)]
                + cells[index(size, x + width, y)]
                + cells[index(size, x, y + width)]
                + cells[index(size, x + width, y + width)])
                / 4.0;

            cells[index(size, x + half, y + half)] = average + rng.gen_range(DISPLACEMENT_RANGE);
        }
    }
}

/// Edge midpoints of every `width`-sized square
///
/// Each midpoint sits between two square corners and one or two square
/// centers. A center outside the grid is dropped from the mean, so boundary
/// midpoints divide by 3 instead of 4.
fn edge_step<R: Rng + ?Sized>(cells: &mut [f64], size: usize, width: usize, rng: &mut R) {
    let half = width / 2;

    for y in (0..size).step_by(half) {
        // Rows on the square lattice hold horizontal edge midpoints at odd
        // multiples of `half`; rows between them hold vertical ones at even.
        let x_start = if (y / half) % 2 == 0 { half } else { 0 };

        for x in (x_start..size).step_by(width) {
            let mut sum = 0.0;
            let mut count = 0;

            let neighbours = [
                (x.checked_sub(half), Some(y)),
                (Some(x + half), Some(y)),
                (Some(x), y.checked_sub(half)),
                (Some(x), Some(y + half)),
            ];
            for (nx, ny) in neighbours {
                if let (Some(nx), Some(ny)) = (nx, ny) {
                    if nx < size && ny < size {
                        sum += cells[index(size, nx, ny)];
                        count += 1;
                    }
                }
            }

            cells[index(size, x, y)] = sum / count as f64 + rng.gen_range(DISPLACEMENT_RANGE);
        }
    }
}

// ============================================================================
// SMOOTHING
// ============================================================================

/// One 3x3 weighted blur over interior cells (1-2-1 / 2-4-2 / 1-2-1, over 16)
///
/// Reads from a snapshot of the input so the pass is not cumulative.
pub fn smooth(cells: &mut [f64], size: usize) {
    if size < 3 {
        return;
    }

    const KERNEL: [[f64; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];

    let source = cells.to_vec();
    for y in 1..size - 1 {
        for x in 1..size - 1 {
            let mut value = 0.0;
            for (dy, row) in KERNEL.iter().enumerate() {
                for (dx, weight) in row.iter().enumerate() {
                    value += source[index(size, x + dx - 1, y + dy - 1)] * weight;
                }
            }
            cells[index(size, x, y)] = value / 16.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn seeded_grid(size: usize, seed: u64) -> (Vec<f64>, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut cells = vec![f64::NAN; size * size];
        seed_corners(&mut cells, size, &mut rng);
        (cells, rng)
    }

    #[test]
    fn test_corners_in_range() {
        let (cells, _) = seeded_grid(17, 7);
        for (x, y) in [(0, 0), (16, 0), (0, 16), (16, 16)] {
            let value = cells[index(17, x, y)];
            assert!(CORNER_RANGE.contains(&value), "corner {} out of range", value);
        }
    }

    #[test]
    fn test_subdivide_preserves_corners() {
        let (mut cells, mut rng) = seeded_grid(33, 11);
        let corners: Vec<f64> = [(0, 0), (32, 0), (0, 32), (32, 32)]
            .iter()
            .map(|&(x, y)| cells[index(33, x, y)])
            .collect();

        subdivide(&mut cells, 33, &mut rng);

        let after: Vec<f64> = [(0, 0), (32, 0), (0, 32), (32, 32)]
            .iter()
            .map(|&(x, y)| cells[index(33, x, y)])
            .collect();
        assert_eq!(corners, after);
    }

    #[test]
    fn test_lod_one_fills_every_cell() {
        let (mut cells, mut rng) = seeded_grid(3, 3);
        subdivide(&mut cells, 3, &mut rng);
        assert!(cells.iter().all(|v| v.is_finite()), "cells: {:?}", cells);
    }

    #[test]
    fn test_subdivide_fills_large_grid() {
        let (mut cells, mut rng) = seeded_grid(65, 99);
        subdivide(&mut cells, 65, &mut rng);
        assert!(cells.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_boundary_midpoint_divides_by_three() {
        // Flat corners and a zero-width displacement range isolate the mean
        let mut cells = vec![f64::NAN; 9];
        for (x, y) in [(0, 0), (2, 0), (0, 2), (2, 2)] {
            cells[index(3, x, y)] = 300.0;
        }
        cells[index(3, 1, 1)] = 0.0;

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        edge_step(&mut cells, 3, 2, &mut rng);

        // (300 + 300 + 0) / 3 = 200, then perturbed within +-200
        for (x, y) in [(1, 0), (0, 1), (2, 1), (1, 2)] {
            let value = cells[index(3, x, y)];
            assert!((0.0..400.0).contains(&value), "edge value {}", value);
        }
    }

    #[test]
    fn test_smooth_single_pass() {
        // A single spike spreads into its neighbours exactly once
        let mut cells = vec![0.0; 25];
        cells[index(5, 2, 2)] = 16.0;

        smooth(&mut cells, 5);

        assert_eq!(cells[index(5, 2, 2)], 4.0);
        assert_eq!(cells[index(5, 1, 2)], 2.0);
        assert_eq!(cells[index(5, 1, 1)], 1.0);
        assert_eq!(cells[index(5, 3, 3)], 1.0);
        // Border cells are untouched
        assert_eq!(cells[index(5, 0, 0)], 0.0);
    }

    #[test]
    fn test_smooth_small_grid_noop() {
        let mut cells = vec![1.0, 2.0, 3.0, 4.0];
        smooth(&mut cells, 2);
        assert_eq!(cells, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
