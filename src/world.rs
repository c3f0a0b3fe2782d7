//! WorldMap: terrain, regions and cities in one place

use std::f64::consts::{PI, TAU};

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{Placement, PolarConfig, WorldConfig};
use crate::error::Result;
use crate::geometry::{polar_offset, Line, Point, Rectangle, Shape};
use crate::naming::{CityNamer, NamePool};
use crate::region::RegionPartition;
use crate::spatial::QuadTree;
use crate::terrain::HeightField;
use crate::timed;
use crate::util::GridPos;

/// Identifier of a city; assigned 1, 2, 3, … in insertion order
pub type CityId = u64;

/// A settlement placed on the map
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub name: String,
    pub position: Point,
    /// City this one was founded from; a road joins the two
    pub parent: Option<CityId>,
}

impl City {
    pub fn new(name: impl Into<String>, position: Point) -> Self {
        Self {
            name: name.into(),
            position,
            parent: None,
        }
    }

    pub fn with_parent(name: impl Into<String>, position: Point, parent: CityId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(name, position)
        }
    }
}

/// Area covered by the city index
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapBounds {
    /// Fixed square; inserts outside of it fail
    Fixed(Rectangle),
    /// Disc around `center` that grows to fit new cities
    Radial { center: Point, radius: f64 },
}

impl MapBounds {
    /// Root rectangle for a spatial index covering these bounds
    ///
    /// One unit of slack is added past the far edges, since index rectangles
    /// exclude their maximum edge.
    pub fn index_rect(&self) -> Rectangle {
        match *self {
            MapBounds::Fixed(rect) => rect,
            MapBounds::Radial { center, radius } => Rectangle::around(center, radius + 1.0),
        }
    }
}

/// A generated world map
///
/// Owns the height field, its region partition, and the ordered list of
/// cities together with a quadtree over their positions. The list and the
/// tree always hold the same cities under the same ids.
///
/// # Examples
///
/// ```
/// use fractal_worldmap::*;
///
/// let config = WorldConfigBuilder::new()
///     .seed(42)
///     .terrain_lod(5)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let map = WorldMap::generate(config).unwrap();
/// let land = map.regions().land_regions().count();
/// assert_eq!(map.cities(None).unwrap().len(), land);
/// ```
#[derive(Debug, Clone)]
pub struct WorldMap {
    config: WorldConfig,
    terrain: HeightField,
    regions: RegionPartition,
    cities: Vec<City>,
    /// Payload is the city's position in `cities`
    index: QuadTree<usize>,
    bounds: MapBounds,
    sections: Vec<Line>,
    next_id: CityId,
}

impl WorldMap {
    /// Generate a map, naming cities from the default [`NamePool`]
    pub fn generate(config: WorldConfig) -> Result<Self> {
        Self::generate_with_namer(config, &mut NamePool::default())
    }

    /// Generate a map with a custom city namer
    ///
    /// Builds the height field and regions, then places cities with the
    /// configured [`Placement`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unusable config, or any index error
    /// raised while placing cities.
    pub fn generate_with_namer<N: CityNamer>(config: WorldConfig, namer: &mut N) -> Result<Self> {
        config.validate()?;
        info!("Generating world map with config {:#?}", config);

        let mut terrain_rng = ChaCha8Rng::seed_from_u64(config.terrain_seed as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed as u64);

        let mut terrain = HeightField::generate(config.terrain_lod, &mut terrain_rng)?;
        let regions = timed!("Region segmentation", {
            if config.dissolve_singletons {
                RegionPartition::build(&mut terrain, &mut terrain_rng)
            } else {
                RegionPartition::segment(&terrain, &mut terrain_rng)
            }
        });

        let bounds = match config.placement {
            Placement::RegionCenters => MapBounds::Fixed(Rectangle::new(
                Point::ZERO,
                Point::splat(config.map_width + 1.0),
            )),
            Placement::Polar(_) => MapBounds::Radial {
                center: Point::ZERO,
                radius: 0.0,
            },
        };
        let index = QuadTree::with_capacity(bounds.index_rect(), config.node_capacity)?;

        let mut map = Self {
            config,
            terrain,
            regions,
            cities: Vec::new(),
            index,
            bounds,
            sections: Vec::new(),
            next_id: 1,
        };

        timed!("City placement", log::Level::Info, {
            match map.config.placement {
                Placement::RegionCenters => map.place_region_centers(namer, &mut rng),
                Placement::Polar(polar) => map.place_polar(polar, namer, &mut rng),
            }
        })?;

        info!(
            "Placed {} cities ({}), index depth {}",
            map.cities.len(),
            map.config.placement.name(),
            map.index.depth()
        );
        Ok(map)
    }

    // ========================================================================
    // PLACEMENT
    // ========================================================================

    /// One city at the center of every land region, in region order
    fn place_region_centers<N: CityNamer, R: Rng + ?Sized>(&mut self, namer: &mut N, rng: &mut R) -> Result<()> {
        let centers: Vec<GridPos> = self
            .regions
            .land_regions()
            .filter_map(|region| self.regions.center(region.id()))
            .collect();

        for cell in centers {
            let position = self.grid_to_world(cell);
            self.add_city(City::new(namer.next_name(rng), position))?;
        }
        Ok(())
    }

    /// A center city, then arms extended ring by ring, depth first
    fn place_polar<N: CityNamer, R: Rng + ?Sized>(
        &mut self,
        polar: PolarConfig,
        namer: &mut N,
        rng: &mut R,
    ) -> Result<()> {
        let center = self.add_city(City::new(namer.next_name(rng), Point::ZERO))?;
        if polar.steps == 0 {
            return Ok(());
        }

        for arm in 0..polar.arms_at(1) {
            self.extend_arm(&polar, 1, arm, center, namer, rng)?;
        }
        Ok(())
    }

    fn extend_arm<N: CityNamer, R: Rng + ?Sized>(
        &mut self,
        polar: &PolarConfig,
        ring: usize,
        arm: usize,
        parent: CityId,
        namer: &mut N,
        rng: &mut R,
    ) -> Result<()> {
        let arms = polar.arms_at(ring);
        let radius = polar.radius_at(ring);
        let angle = TAU * arm as f64 / arms as f64;

        let id = self.add_city(City::with_parent(
            namer.next_name(rng),
            polar_offset(angle, radius),
            parent,
        ))?;

        // Border between this arm and the next one on the same ring
        let half_step = polar.spacing / 2.0;
        self.sections.push(Line::polar(
            Point::ZERO,
            angle + PI / arms as f64,
            radius - half_step,
            radius + half_step,
        ));

        if ring < polar.steps {
            // Arm j of the next ring descends from arm floor(j * arms / next)
            let next = polar.arms_at(ring + 1);
            let first = (arm * next).div_ceil(arms);
            let last = ((arm + 1) * next).div_ceil(arms);
            for child in first..last {
                self.extend_arm(polar, ring + 1, child, id, namer, rng)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // CITIES
    // ========================================================================

    /// Add a city under the next id
    ///
    /// With radial bounds, a city beyond the current radius grows the radius
    /// to reach it and rebuilds the index from the existing cities first.
    ///
    /// # Errors
    ///
    /// Returns `Bounds` if the city lies outside fixed bounds, or `Split` if
    /// the index cannot store it. On error the city list is unchanged and the
    /// id is not consumed.
    pub fn add_city(&mut self, city: City) -> Result<CityId> {
        if let MapBounds::Radial { center, radius } = self.bounds {
            let distance = center.distance(city.position);
            if distance > radius {
                self.grow_radius(center, distance)?;
            }
        }

        let id = self.next_id;
        self.index.insert(self.cities.len(), id, city.position)?;
        self.cities.push(city);
        self.next_id += 1;
        Ok(id)
    }

    /// Replace the index with one covering `radius`, re-inserting every city
    fn grow_radius(&mut self, center: Point, radius: f64) -> Result<()> {
        let bounds = MapBounds::Radial { center, radius };
        let mut index = QuadTree::with_capacity(bounds.index_rect(), self.config.node_capacity)?;
        for (slot, (id, city)) in (1..).zip(&self.cities).enumerate() {
            index.insert(slot, id, city.position)?;
        }

        debug!(
            "Grew map radius to {:.1}, rebuilt index with {} cities",
            radius,
            self.cities.len()
        );
        self.index = index;
        self.bounds = bounds;
        Ok(())
    }

    /// All cities in insertion order, or those within `shape`
    ///
    /// # Errors
    ///
    /// Returns `UnknownShape` for a malformed shape
    pub fn cities(&self, shape: Option<&Shape>) -> Result<Vec<&City>> {
        match shape {
            None => Ok(self.cities.iter().collect()),
            Some(shape) => Ok(self
                .index
                .query(shape)?
                .into_iter()
                .map(|&slot| &self.cities[slot])
                .collect()),
        }
    }

    /// Cities within `shape` along with their ids
    pub fn cities_with_ids(&self, shape: &Shape) -> Result<Vec<(CityId, &City)>> {
        Ok(self
            .index
            .query_items(shape)?
            .into_iter()
            .map(|item| (item.id, &self.cities[item.value]))
            .collect())
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        let slot = usize::try_from(id.checked_sub(1)?).ok()?;
        self.cities.get(slot)
    }

    #[inline]
    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    /// Road segments from every city to the city it was founded from
    pub fn roads(&self) -> Vec<Line> {
        self.cities
            .iter()
            .filter_map(|city| {
                let parent = self.city(city.parent?)?;
                Some(Line::new(parent.position, city.position))
            })
            .collect()
    }

    /// Cities founded from `id`
    pub fn children(&self, id: CityId) -> Vec<(CityId, &City)> {
        (1..)
            .zip(&self.cities)
            .filter(|(_, city)| city.parent == Some(id))
            .collect()
    }

    /// Border segments between polar arms (empty for region placement)
    #[inline]
    pub fn sections(&self) -> &[Line] {
        &self.sections
    }

    // ========================================================================
    // TERRAIN
    // ========================================================================

    /// Elevation at fractional map coordinates, see [`HeightField::height`]
    #[inline]
    pub fn height(&self, x_frac: f64, y_frac: f64, nearest_only: bool) -> f64 {
        self.terrain.height(x_frac, y_frac, nearest_only)
    }

    #[inline]
    pub fn height_field(&self) -> &HeightField {
        &self.terrain
    }

    #[inline]
    pub fn regions(&self) -> &RegionPartition {
        &self.regions
    }

    /// Row-major grid of region ids
    #[inline]
    pub fn region_map(&self) -> &[usize] {
        self.regions.region_map()
    }

    /// World position of a grid cell, scaling `[0, size - 1]` to `[0, width]`
    pub fn grid_to_world(&self, (x, y): GridPos) -> Point {
        let span = (self.terrain.size() - 1) as f64;
        Point::new(x as f64, y as f64) / span * self.config.map_width
    }

    /// Nearest grid cell to a world position, if it lies on the map
    pub fn world_to_grid(&self, position: Point) -> Option<GridPos> {
        let span = (self.terrain.size() - 1) as f64;
        let grid = (position / self.config.map_width * span).round();
        let in_range = |v: f64| v >= 0.0 && v <= span;
        (in_range(grid.x) && in_range(grid.y)).then(|| (grid.x as usize, grid.y as usize))
    }

    // ========================================================================
    // METADATA
    // ========================================================================

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn placement(&self) -> Placement {
        self.config.placement
    }

    /// Width of the map in distance units
    ///
    /// Fixed for region placement; twice the bounding radius for polar maps.
    pub fn map_width(&self) -> f64 {
        match self.bounds {
            MapBounds::Fixed(_) => self.config.map_width,
            MapBounds::Radial { radius, .. } => radius * 2.0,
        }
    }

    #[inline]
    pub fn map_resolution(&self) -> f64 {
        self.config.map_resolution
    }

    #[inline]
    pub fn distance_unit(&self) -> &str {
        &self.config.distance_unit
    }

    /// Current radius of radial bounds, `None` for fixed bounds
    pub fn bounding_radius(&self) -> Option<f64> {
        match self.bounds {
            MapBounds::Fixed(_) => None,
            MapBounds::Radial { radius, .. } => Some(radius),
        }
    }

    #[inline]
    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    #[inline]
    pub fn index(&self) -> &QuadTree<usize> {
        &self.index
    }

    /// Version tag of the generator that built this map
    #[inline]
    pub fn version(&self) -> &'static str {
        crate::VERSION
    }
}
