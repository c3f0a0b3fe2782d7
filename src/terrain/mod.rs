//! Fractal height fields
//!
//! A [`HeightField`] is a square elevation grid of side `2^lod + 1`, built by
//! midpoint displacement and one smoothing pass. Elevations `>= 0` are land,
//! negative elevations are water.

pub mod diamond_square;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use log::debug;
use rand::Rng;

use crate::error::{MapError, Result};
use crate::timed;

/// Largest accepted level of detail (a 4097x4097 grid)
pub const MAX_LOD: u32 = 12;

/// Side length of the grid for a level of detail
#[inline]
pub fn side_for_lod(lod: u32) -> usize {
    (1usize << lod) + 1
}

/// Square elevation grid, stored row-major
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    lod: u32,
    size: usize,
    cells: Vec<f64>,
}

impl HeightField {
    /// Generate a new height field
    ///
    /// Seeds the corners, runs midpoint displacement down to single cells,
    /// then applies one 3x3 smoothing pass.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `lod > MAX_LOD`
    ///
    /// # Example
    ///
    /// ```
    /// use fractal_worldmap::HeightField;
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let mut rng = ChaCha8Rng::seed_from_u64(42);
    /// let field = HeightField::generate(4, &mut rng).unwrap();
    /// assert_eq!(field.size(), 17);
    /// ```
    pub fn generate<R: Rng + ?Sized>(lod: u32, rng: &mut R) -> Result<Self> {
        check_lod(lod)?;
        let size = side_for_lod(lod);
        let mut cells = vec![f64::NAN; size * size];

        timed!("Height field synthesis", {
            diamond_square::seed_corners(&mut cells, size, rng);
            diamond_square::subdivide(&mut cells, size, rng);
            diamond_square::smooth(&mut cells, size);
        });

        let field = Self { lod, size, cells };
        let (low, high) = field.extent();
        debug!(
            "Generated {}x{} height field, elevations {:.1}..{:.1}",
            size, size, low, high
        );
        Ok(field)
    }

    /// Build a height field from explicit row-major elevations
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `lod > MAX_LOD` or `cells` does not hold
    /// exactly `(2^lod + 1)^2` values.
    pub fn from_cells(lod: u32, cells: Vec<f64>) -> Result<Self> {
        check_lod(lod)?;
        let size = side_for_lod(lod);
        if cells.len() != size * size {
            return Err(MapError::InvalidConfig(format!(
                "lod {} needs {} cells (got {})",
                lod,
                size * size,
                cells.len()
            )));
        }
        Ok(Self { lod, size, cells })
    }

    #[inline]
    pub fn lod(&self) -> u32 {
        self.lod
    }

    /// Side length of the grid (`2^lod + 1`)
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major elevations
    #[inline]
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Elevation of a single cell
    ///
    /// # Panics
    ///
    /// Panics if `x` or `y` is outside the grid.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.cells[y * self.size + x]
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, value: f64) {
        self.cells[y * self.size + x] = value;
    }

    #[inline]
    pub fn is_land(&self, x: usize, y: usize) -> bool {
        self.get(x, y) >= 0.0
    }

    /// Lowest and highest elevation in the grid
    pub fn extent(&self) -> (f64, f64) {
        self.cells
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &v| {
                (low.min(v), high.max(v))
            })
    }

    /// Elevation at fractional coordinates in `[0, 1)`
    ///
    /// Coordinates map to grid space as `frac * (size - 1)`. By default the
    /// four enclosing cells are blended bilinearly, each weighted by the area
    /// of the sub-rectangle opposite it. With `nearest_only`, each axis snaps
    /// to the nearer cell (a remainder of exactly 0.5 rounds up) and that
    /// cell's value is returned unchanged.
    ///
    /// Fractions outside `[0, 1]` are clamped.
    pub fn height(&self, x_frac: f64, y_frac: f64, nearest_only: bool) -> f64 {
        let span = (self.size - 1) as f64;
        let fx = x_frac.clamp(0.0, 1.0) * span;
        let fy = y_frac.clamp(0.0, 1.0) * span;

        // The lower cell never goes past size - 2 so `x = 1.0` still has a
        // cell on each side.
        let min_x = (fx.floor() as usize).min(self.size - 2);
        let min_y = (fy.floor() as usize).min(self.size - 2);
        let (max_x, max_y) = (min_x + 1, min_y + 1);

        if nearest_only {
            let x = if fx - min_x as f64 >= 0.5 { max_x } else { min_x };
            let y = if fy - min_y as f64 >= 0.5 { max_y } else { min_y };
            return self.get(x, y);
        }

        let (low_x, low_y) = (min_x as f64, min_y as f64);
        let (high_x, high_y) = (max_x as f64, max_y as f64);

        (high_x - fx) * (high_y - fy) * self.get(min_x, min_y)
            + (fx - low_x) * (high_y - fy) * self.get(max_x, min_y)
            + (high_x - fx) * (fy - low_y) * self.get(min_x, max_y)
            + (fx - low_x) * (fy - low_y) * self.get(max_x, max_y)
    }
}

fn check_lod(lod: u32) -> Result<()> {
    if lod > MAX_LOD {
        return Err(MapError::InvalidConfig(format!(
            "terrain lod must be <= {} (got {})",
            MAX_LOD, lod
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_side_length_for_lod() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for lod in 0..=6 {
            let field = HeightField::generate(lod, &mut rng).unwrap();
            assert_eq!(field.size(), 2usize.pow(lod) + 1);
            assert_eq!(field.cells().len(), field.size() * field.size());
            assert!(field.cells().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_lod_too_large() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            HeightField::generate(MAX_LOD + 1, &mut rng),
            Err(MapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_generation_determinism() {
        let a = HeightField::generate(5, &mut ChaCha8Rng::seed_from_u64(77)).unwrap();
        let b = HeightField::generate(5, &mut ChaCha8Rng::seed_from_u64(77)).unwrap();
        let c = HeightField::generate(5, &mut ChaCha8Rng::seed_from_u64(78)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_cells_wrong_length() {
        assert!(HeightField::from_cells(2, vec![0.0; 24]).is_err());
        assert!(HeightField::from_cells(2, vec![0.0; 25]).is_ok());
    }

    #[test]
    fn test_bilinear_height() {
        // Values rise by 10 per column and 100 per row
        let cells: Vec<f64> = (0..9).map(|i| (i % 3) as f64 * 10.0 + (i / 3) as f64 * 100.0).collect();
        let field = HeightField::from_cells(1, cells).unwrap();

        assert_eq!(field.height(0.0, 0.0, false), 0.0);
        assert_eq!(field.height(0.5, 0.5, false), 110.0);
        // Grid (0.5, 0.5): mean of cells (0,0), (1,0), (0,1), (1,1)
        assert!((field.height(0.25, 0.25, false) - 55.0).abs() < 1e-9);
        assert!((field.height(0.75, 0.0, false) - 15.0).abs() < 1e-9);
        assert_eq!(field.height(1.0, 1.0, false), 220.0);
    }

    #[test]
    fn test_nearest_height() {
        let cells: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let field = HeightField::from_cells(1, cells).unwrap();

        // 0.2 * 2 = 0.4 snaps down, 0.25 * 2 = 0.5 snaps up
        assert_eq!(field.height(0.2, 0.0, true), 0.0);
        assert_eq!(field.height(0.25, 0.0, true), 1.0);
        assert_eq!(field.height(0.0, 0.25, true), 3.0);
        assert_eq!(field.height(0.9, 0.9, true), 8.0);
    }

    #[test]
    fn test_smallest_field() {
        let field = HeightField::from_cells(0, vec![0.0, 10.0, 20.0, 30.0]).unwrap();
        assert_eq!(field.size(), 2);
        assert_eq!(field.height(0.5, 0.5, false), 15.0);
        assert_eq!(field.height(0.5, 0.5, true), 30.0);
        assert_eq!(field.height(1.0, 0.0, false), 10.0);
    }

    #[test]
    fn test_extent() {
        let field = HeightField::from_cells(1, vec![3.0, -1.0, 4.0, 1.0, -5.0, 9.0, 2.0, 6.0, 5.0]).unwrap();
        assert_eq!(field.extent(), (-5.0, 9.0));
        assert!(!field.is_land(1, 0));
        assert!(field.is_land(0, 0));
    }
}
