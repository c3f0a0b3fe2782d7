//! Land/water region segmentation
//!
//! Splits a [`HeightField`] into maximal 8-connected groups of cells that share
//! the sign of their elevation. Regions are stored in an arena indexed by
//! [`RegionId`], and a parallel grid maps every cell to its region.

use std::cell::OnceCell;
use std::collections::VecDeque;

use log::{debug, info};
use rand::Rng;

use crate::terrain::HeightField;
use crate::util::{offset_in_grid, GridPos, NEIGHBOURS_4, NEIGHBOURS_8};

/// Index of a region within its partition (0, 1, 2, … in discovery order)
pub type RegionId = usize;

/// A maximal connected group of land or water cells
#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    is_land: bool,
    area: usize,
    seed: GridPos,
    color: [u8; 3],
    center: OnceCell<GridPos>,
}

impl Region {
    #[inline]
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Whether the region's cells are at or above sea level
    #[inline]
    pub fn is_land(&self) -> bool {
        self.is_land
    }

    /// Number of member cells
    #[inline]
    pub fn area(&self) -> usize {
        self.area
    }

    /// First cell of the region in row-major order
    #[inline]
    pub fn seed(&self) -> GridPos {
        self.seed
    }

    /// Random display color, only meaningful to renderers
    #[inline]
    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    /// The center cell, if it has already been resolved through
    /// [`RegionPartition::center`]
    #[inline]
    pub fn cached_center(&self) -> Option<GridPos> {
        self.center.get().copied()
    }
}

/// Result of segmenting a height field into regions
#[derive(Debug, Clone)]
pub struct RegionPartition {
    size: usize,
    regions: Vec<Region>,
    region_map: Vec<RegionId>,
}

impl RegionPartition {
    /// Segment a height field in a single pass
    ///
    /// Cells are scanned in row-major order; every cell not yet claimed seeds
    /// a breadth-first flood fill over its 8 neighbours. Out-of-grid
    /// neighbours are skipped (no wraparound).
    pub fn segment<R: Rng + ?Sized>(field: &HeightField, rng: &mut R) -> Self {
        let size = field.size();
        let mut assigned: Vec<Option<RegionId>> = vec![None; size * size];
        let mut regions = Vec::new();
        let mut queue = VecDeque::new();

        for y in 0..size {
            for x in 0..size {
                if assigned[y * size + x].is_some() {
                    continue;
                }

                let id = regions.len();
                let is_land = field.is_land(x, y);
                let mut area = 0;

                assigned[y * size + x] = Some(id);
                queue.push_back((x, y));

                while let Some(cell) = queue.pop_front() {
                    area += 1;
                    for offset in NEIGHBOURS_8 {
                        let Some((nx, ny)) = offset_in_grid(cell, offset, size) else {
                            continue;
                        };
                        let slot = &mut assigned[ny * size + nx];
                        if slot.is_none() && field.is_land(nx, ny) == is_land {
                            *slot = Some(id);
                            queue.push_back((nx, ny));
                        }
                    }
                }

                regions.push(Region {
                    id,
                    is_land,
                    area,
                    seed: (x, y),
                    color: [rng.gen(), rng.gen(), rng.gen()],
                    center: OnceCell::new(),
                });
            }
        }

        // Every cell was claimed by the scan above
        let region_map = assigned.into_iter().flatten().collect();

        Self {
            size,
            regions,
            region_map,
        }
    }

    /// Segment a height field, dissolving single-cell regions once
    ///
    /// After the first pass, each region of area 1 has its cell's elevation
    /// replaced by the mean of its in-grid cardinal neighbours, and the whole
    /// grid is segmented again. The cleanup is not repeated, so singletons
    /// created by the rewrite itself survive.
    pub fn build<R: Rng + ?Sized>(field: &mut HeightField, rng: &mut R) -> Self {
        let first = Self::segment(field, rng);
        let singletons = first.singleton_count();
        if singletons == 0 {
            info!("Segmented terrain into {} regions", first.len());
            return first;
        }

        let rewritten = first.dissolve_singletons(field);
        debug!(
            "Dissolved {} of {} singleton regions, re-segmenting",
            rewritten, singletons
        );

        let second = Self::segment(field, rng);
        let residual = second.singleton_count();
        if residual > 0 {
            debug!("{} singleton regions remain after cleanup", residual);
        }
        info!("Segmented terrain into {} regions", second.len());
        second
    }

    /// Rewrite the elevation of every singleton region's cell to the mean of
    /// its in-grid cardinal neighbours
    ///
    /// Neighbour values are read before any cell is rewritten. Returns the
    /// number of cells rewritten.
    pub fn dissolve_singletons(&self, field: &mut HeightField) -> usize {
        let rewrites: Vec<(GridPos, f64)> = self
            .regions
            .iter()
            .filter(|region| region.area == 1)
            .filter_map(|region| {
                let (total, count) = NEIGHBOURS_4
                    .iter()
                    .filter_map(|&offset| offset_in_grid(region.seed, offset, self.size))
                    .fold((0.0, 0), |(total, count), (nx, ny)| {
                        (total + field.get(nx, ny), count + 1)
                    });
                (count > 0).then(|| (region.seed, total / count as f64))
            })
            .collect();

        for &((x, y), value) in &rewrites {
            field.set(x, y, value);
        }
        rewrites.len()
    }

    /// Number of regions
    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Side length of the segmented grid
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// All regions, indexed by id
    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[inline]
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id)
    }

    /// Row-major grid of region ids, parallel to the height field
    #[inline]
    pub fn region_map(&self) -> &[RegionId] {
        &self.region_map
    }

    /// Region owning a cell
    ///
    /// # Panics
    ///
    /// Panics if `x` or `y` is outside the grid.
    #[inline]
    pub fn region_at(&self, x: usize, y: usize) -> RegionId {
        self.region_map[y * self.size + x]
    }

    pub fn land_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|region| region.is_land)
    }

    /// Number of regions made of a single cell
    pub fn singleton_count(&self) -> usize {
        self.regions.iter().filter(|region| region.area == 1).count()
    }

    /// Representative cell of a region, guaranteed to belong to it
    ///
    /// The mean of the member coordinates, floored to a cell, is used when
    /// that cell lies in the region. Otherwise (non-convex shapes) the member
    /// cell closest to the mean is used. Resolved once, then cached.
    pub fn center(&self, id: RegionId) -> Option<GridPos> {
        let region = self.regions.get(id)?;
        Some(*region.center.get_or_init(|| self.resolve_center(region)))
    }

    fn resolve_center(&self, region: &Region) -> GridPos {
        let (mut x_total, mut y_total) = (0.0, 0.0);
        let mut count = 0usize;
        self.walk_region(region, |(x, y)| {
            x_total += x as f64;
            y_total += y as f64;
            count += 1;
        });

        let average = (x_total / count as f64, y_total / count as f64);
        let floored = (average.0.floor() as usize, average.1.floor() as usize);
        if self.region_at(floored.0, floored.1) == region.id {
            return floored;
        }

        let distance = |(x, y): GridPos| (x as f64 - average.0).hypot(y as f64 - average.1);
        let mut closest = region.seed;
        let mut closest_distance = distance(closest);
        self.walk_region(region, |cell| {
            let d = distance(cell);
            if d < closest_distance {
                closest = cell;
                closest_distance = d;
            }
        });
        closest
    }

    /// Breadth-first walk over a region's cells, starting at its seed
    fn walk_region<F: FnMut(GridPos)>(&self, region: &Region, mut visit: F) {
        let mut visited = vec![false; self.size * self.size];
        let mut queue = VecDeque::from([region.seed]);
        visited[region.seed.1 * self.size + region.seed.0] = true;

        while let Some(cell) = queue.pop_front() {
            visit(cell);
            for offset in NEIGHBOURS_8 {
                let Some((nx, ny)) = offset_in_grid(cell, offset, self.size) else {
                    continue;
                };
                let index = ny * self.size + nx;
                if !visited[index] && self.region_map[index] == region.id {
                    visited[index] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(5)
    }

    fn field_5x5(water: &[GridPos]) -> HeightField {
        let mut cells = vec![1.0; 25];
        for &(x, y) in water {
            cells[y * 5 + x] = -1.0;
        }
        HeightField::from_cells(2, cells).unwrap()
    }

    fn assert_strict_partition(partition: &RegionPartition) {
        let size = partition.size();
        assert_eq!(partition.region_map().len(), size * size);

        let mut counted = vec![0usize; partition.len()];
        for &id in partition.region_map() {
            assert!(id < partition.len());
            counted[id] += 1;
        }
        for region in partition.regions() {
            assert_eq!(counted[region.id()], region.area());
        }
        let total: usize = partition.regions().iter().map(Region::area).sum();
        assert_eq!(total, size * size);
    }

    #[test]
    fn test_all_land_single_region() {
        let field = field_5x5(&[]);
        let partition = RegionPartition::segment(&field, &mut rng());

        assert_eq!(partition.len(), 1);
        let region = &partition.regions()[0];
        assert!(region.is_land());
        assert_eq!(region.area(), 25);
        assert_eq!(region.seed(), (0, 0));
    }

    #[test]
    fn test_zero_counts_as_land() {
        let mut cells = vec![0.0; 9];
        cells[4] = 5.0;
        let field = HeightField::from_cells(1, cells).unwrap();
        let partition = RegionPartition::segment(&field, &mut rng());
        assert_eq!(partition.len(), 1);
        assert!(partition.regions()[0].is_land());
    }

    #[test]
    fn test_single_water_cell() {
        let field = field_5x5(&[(2, 2)]);
        let partition = RegionPartition::segment(&field, &mut rng());

        assert_eq!(partition.len(), 2);
        assert_eq!(partition.regions()[0].area(), 24);
        assert!(partition.regions()[0].is_land());
        assert_eq!(partition.regions()[1].area(), 1);
        assert!(!partition.regions()[1].is_land());
        assert_eq!(partition.region_at(2, 2), 1);
        assert_strict_partition(&partition);
    }

    #[test]
    fn test_singleton_cleanup() {
        let mut field = field_5x5(&[(2, 2)]);
        let partition = RegionPartition::build(&mut field, &mut rng());

        assert_eq!(partition.len(), 1);
        assert_eq!(partition.regions()[0].area(), 25);
        assert_eq!(field.get(2, 2), 1.0);
    }

    #[test]
    fn test_singleton_cleanup_uses_cardinal_neighbours() {
        let mut cells = vec![2.0; 25];
        cells[2 * 5 + 2] = -10.0;
        // Diagonal neighbours must not contribute
        cells[1 * 5 + 1] = 50.0;
        cells[2 * 5 + 1] = 4.0;
        let mut field = HeightField::from_cells(2, cells).unwrap();

        let partition = RegionPartition::segment(&field, &mut rng());
        assert_eq!(partition.dissolve_singletons(&mut field), 1);
        assert_eq!(field.get(2, 2), (4.0 + 2.0 + 2.0 + 2.0) / 4.0);
    }

    #[test]
    fn test_corner_singleton_averages_in_grid_neighbours() {
        let mut cells = vec![-3.0; 25];
        cells[0] = 7.0;
        cells[1] = -1.0;
        cells[5] = -5.0;
        let mut field = HeightField::from_cells(2, cells).unwrap();

        let partition = RegionPartition::segment(&field, &mut rng());
        assert_eq!(partition.singleton_count(), 1);
        partition.dissolve_singletons(&mut field);
        assert_eq!(field.get(0, 0), -3.0);
    }

    #[test]
    fn test_smallest_grid_cleanup() {
        let mut field = HeightField::from_cells(0, vec![-4.0, 2.0, 6.0, 1.0]).unwrap();
        let partition = RegionPartition::build(&mut field, &mut rng());

        // (0, 0) takes the mean of (1, 0) and (0, 1)
        assert_eq!(field.get(0, 0), 4.0);
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.regions()[0].area(), 4);
        assert_eq!(partition.center(0), Some((0, 0)));
    }

    #[test]
    fn test_diagonal_connectivity() {
        // Water along the anti-diagonal is one region under 8-connectivity
        let field = field_5x5(&[(4, 0), (3, 1), (2, 2), (1, 3), (0, 4)]);
        let partition = RegionPartition::segment(&field, &mut rng());

        let water: Vec<&Region> = partition.regions().iter().filter(|r| !r.is_land()).collect();
        assert_eq!(water.len(), 1);
        assert_eq!(water[0].area(), 5);
        // Land also connects diagonally, across the water line
        assert_eq!(partition.land_regions().count(), 1);
        assert_eq!(partition.len(), 2);
        assert_strict_partition(&partition);
    }

    #[test]
    fn test_center_inside_convex_region() {
        let field = field_5x5(&[]);
        let partition = RegionPartition::segment(&field, &mut rng());

        assert_eq!(partition.regions()[0].cached_center(), None);
        assert_eq!(partition.center(0), Some((2, 2)));
        assert_eq!(partition.regions()[0].cached_center(), Some((2, 2)));
    }

    #[test]
    fn test_center_floors_mean() {
        // 4x4 land block in the top-left corner, mean (1.5, 1.5)
        let water: Vec<GridPos> = (0..5)
            .flat_map(|y| (0..5).map(move |x| (x, y)))
            .filter(|&(x, y)| x == 4 || y == 4)
            .collect();
        let field = field_5x5(&water);
        let partition = RegionPartition::segment(&field, &mut rng());

        let land = partition.region_at(0, 0);
        assert_eq!(partition.region(land).unwrap().area(), 16);
        assert_eq!(partition.center(land), Some((1, 1)));
    }

    #[test]
    fn test_segment_through_dyn_rng() {
        let field = field_5x5(&[(2, 2)]);
        let mut seeded = rng();
        let dynamic: &mut dyn rand::RngCore = &mut seeded;
        let partition = RegionPartition::segment(&field, dynamic);
        assert_eq!(partition.len(), 2);
    }

    #[test]
    fn test_center_of_ring_falls_back_to_member() {
        // Land ring around a 3x3 lake: the ring's mean is the lake's middle
        let lake: Vec<GridPos> = (1..4).flat_map(|y| (1..4).map(move |x| (x, y))).collect();
        let field = field_5x5(&lake);
        let partition = RegionPartition::segment(&field, &mut rng());
        assert_eq!(partition.len(), 2);

        let ring = partition.region_at(0, 0);
        let (cx, cy) = partition.center(ring).unwrap();
        assert_eq!(partition.region_at(cx, cy), ring);
        let distance = (cx as f64 - 2.0).hypot(cy as f64 - 2.0);
        assert_eq!(distance, 2.0);

        let lake_id = partition.region_at(2, 2);
        assert_eq!(partition.center(lake_id), Some((2, 2)));
    }

    #[test]
    fn test_unknown_region_has_no_center() {
        let field = field_5x5(&[]);
        let partition = RegionPartition::segment(&field, &mut rng());
        assert_eq!(partition.center(3), None);
    }

    #[test]
    fn test_generated_field_partition() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let mut field = HeightField::generate(6, &mut rng).unwrap();
        let partition = RegionPartition::build(&mut field, &mut rng);

        assert_strict_partition(&partition);
        for region in partition.regions() {
            let (x, y) = partition.center(region.id()).unwrap();
            assert_eq!(partition.region_at(x, y), region.id());
            assert_eq!(field.is_land(x, y), region.is_land());
        }
    }
}
