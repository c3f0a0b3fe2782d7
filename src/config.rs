//! World map configuration and builder
//!
//! A [`WorldConfig`] fully determines a generated map: the same config always
//! produces the same terrain, regions and cities.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::spatial::DEFAULT_CAPACITY;
use crate::terrain::MAX_LOD;

/// Most arms a single polar ring may hold
pub const MAX_RING_ARMS: usize = 4096;

/// Most rings a polar layout may have
pub const MAX_POLAR_STEPS: usize = 64;

/// Parameters of the polar settlement layout
///
/// Ring `s` (1-based) lies at radius `s * spacing` and holds
/// `floor(branching * growth^(s - 1))` arms, evenly spaced in angle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarConfig {
    /// Number of rings around the center city
    pub steps: usize,
    /// Arms leaving the center city
    pub branching: usize,
    /// Factor by which the arm count grows from one ring to the next (>= 1)
    pub growth: f64,
    /// Distance between consecutive rings, in map units
    pub spacing: f64,
}

impl PolarConfig {
    pub fn new(steps: usize, branching: usize, growth: f64) -> Self {
        Self {
            steps,
            branching,
            growth,
            ..Default::default()
        }
    }

    /// Number of arms on ring `ring` (ring 0 is the center city)
    pub fn arms_at(&self, ring: usize) -> usize {
        if ring == 0 {
            return 1;
        }
        (self.branching as f64 * self.growth.powi(ring as i32 - 1)).floor() as usize
    }

    /// Radius of ring `ring`
    #[inline]
    pub fn radius_at(&self, ring: usize) -> f64 {
        ring as f64 * self.spacing
    }

    fn validate(&self) -> Result<()> {
        if self.steps > MAX_POLAR_STEPS {
            return Err(MapError::InvalidConfig(format!(
                "polar steps must be <= {} (got {})",
                MAX_POLAR_STEPS, self.steps
            )));
        }
        if self.branching == 0 {
            return Err(MapError::InvalidConfig(
                "polar branching must be at least 1".into(),
            ));
        }
        if !(self.growth >= 1.0 && self.growth.is_finite()) {
            return Err(MapError::InvalidConfig(format!(
                "polar growth must be a finite factor >= 1 (got {})",
                self.growth
            )));
        }
        if !(self.spacing > 0.0 && self.spacing.is_finite()) {
            return Err(MapError::InvalidConfig(format!(
                "polar spacing must be positive (got {})",
                self.spacing
            )));
        }
        let outer = self.arms_at(self.steps);
        if outer > MAX_RING_ARMS {
            return Err(MapError::InvalidConfig(format!(
                "outer polar ring would hold {} arms (max {})",
                outer, MAX_RING_ARMS
            )));
        }
        Ok(())
    }
}

impl Default for PolarConfig {
    fn default() -> Self {
        Self {
            steps: 4,
            branching: 3,
            growth: 1.5,
            spacing: 50.0,
        }
    }
}

/// How cities are placed on a new map
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Placement {
    /// One city at the center of every land region; fixed map bounds
    #[default]
    RegionCenters,
    /// Arms of cities radiating from a center city, ignoring terrain; the
    /// map's bounding radius grows as cities are added
    Polar(PolarConfig),
}

impl Placement {
    pub fn name(&self) -> &'static str {
        match self {
            Placement::RegionCenters => "region centers",
            Placement::Polar(_) => "polar",
        }
    }
}

/// Configuration for deterministic map generation
///
/// # Example
///
/// ```rust
/// use fractal_worldmap::*;
///
/// let config = WorldConfigBuilder::new()
///     .seed(42)
///     .map_width(500.0)
///     .unwrap()
///     .terrain_lod(5)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(config.terrain_seed, 42);
/// assert_eq!(config.placement, Placement::RegionCenters);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    /// Seed for city placement, naming and region colors
    pub seed: u32,

    /// Seed for the height field (separate from `seed` so the same terrain
    /// can be reused with different settlements)
    pub terrain_seed: u32,

    /// Width (and height) of the square map, in distance units
    pub map_width: f64,

    /// Size of one map cell, in distance units
    pub map_resolution: f64,

    /// Name of the distance unit, e.g. "km"
    pub distance_unit: String,

    /// Terrain level of detail; the height grid has side `2^lod + 1`
    pub terrain_lod: u32,

    /// City placement strategy
    pub placement: Placement,

    /// Items per quadtree leaf before it splits
    pub node_capacity: usize,

    /// Whether single-cell regions are dissolved after segmentation
    pub dissolve_singletons: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            terrain_seed: 0,
            map_width: 1000.0,
            map_resolution: 10.0,
            distance_unit: "km".to_string(),
            terrain_lod: 7,
            placement: Placement::RegionCenters,
            node_capacity: DEFAULT_CAPACITY,
            dissolve_singletons: true,
        }
    }
}

impl WorldConfig {
    /// Check every field against the rules [`WorldConfigBuilder`] enforces
    ///
    /// Configs built by hand or deserialized bypass the builder, so
    /// [`WorldMap::generate`](crate::WorldMap::generate) calls this first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first rejected field
    pub fn validate(&self) -> Result<()> {
        check_map_width(self.map_width)?;
        check_map_resolution(self.map_resolution)?;
        if self.map_resolution > self.map_width {
            return Err(MapError::InvalidConfig(format!(
                "map resolution {} exceeds map width {}",
                self.map_resolution, self.map_width
            )));
        }
        check_terrain_lod(self.terrain_lod)?;
        check_node_capacity(self.node_capacity)?;
        if let Placement::Polar(polar) = &self.placement {
            polar.validate()?;
        }
        Ok(())
    }
}

fn check_map_width(width: f64) -> Result<()> {
    if !(width > 0.0 && width.is_finite()) {
        return Err(MapError::InvalidConfig(format!(
            "map width must be positive (got {})",
            width
        )));
    }
    Ok(())
}

fn check_map_resolution(resolution: f64) -> Result<()> {
    if !(resolution > 0.0 && resolution.is_finite()) {
        return Err(MapError::InvalidConfig(format!(
            "map resolution must be positive (got {})",
            resolution
        )));
    }
    Ok(())
}

fn check_terrain_lod(lod: u32) -> Result<()> {
    if lod > MAX_LOD {
        return Err(MapError::InvalidConfig(format!(
            "terrain lod must be <= {} (got {})",
            MAX_LOD, lod
        )));
    }
    Ok(())
}

fn check_node_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(MapError::InvalidConfig(
            "node capacity must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Builder for [`WorldConfig`] with validation
#[derive(Debug, Clone)]
pub struct WorldConfigBuilder {
    seed: Option<u32>,
    terrain_seed: Option<u32>,
    config: WorldConfig,
}

impl WorldConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - seed: random (from `rand::random`)
    /// - terrain_seed: same as seed
    /// - map: 1000 km wide, 10 km resolution
    /// - terrain_lod: 7 (129x129 grid)
    /// - placement: region centers
    /// - node_capacity: 3
    /// - dissolve_singletons: true
    pub fn new() -> Self {
        Self {
            seed: None,
            terrain_seed: None,
            config: WorldConfig::default(),
        }
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set a separate terrain seed
    ///
    /// If not set, the terrain seed matches the map seed.
    pub fn terrain_seed(mut self, seed: u32) -> Self {
        self.terrain_seed = Some(seed);
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if `width` is not a positive finite number
    pub fn map_width(mut self, width: f64) -> Result<Self> {
        check_map_width(width)?;
        self.config.map_width = width;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if `resolution` is not a positive finite number
    pub fn map_resolution(mut self, resolution: f64) -> Result<Self> {
        check_map_resolution(resolution)?;
        self.config.map_resolution = resolution;
        Ok(self)
    }

    pub fn distance_unit(mut self, unit: impl Into<String>) -> Self {
        self.config.distance_unit = unit.into();
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if `lod` exceeds [`MAX_LOD`]
    pub fn terrain_lod(mut self, lod: u32) -> Result<Self> {
        check_terrain_lod(lod)?;
        self.config.terrain_lod = lod;
        Ok(self)
    }

    /// Place one city at the center of each land region
    pub fn region_centers(mut self) -> Self {
        self.config.placement = Placement::RegionCenters;
        self
    }

    /// Place cities along polar arms
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for too many steps, zero branching, growth
    /// below 1, non-positive spacing, or an outer ring with too many arms
    pub fn polar(mut self, polar: PolarConfig) -> Result<Self> {
        polar.validate()?;
        self.config.placement = Placement::Polar(polar);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if `capacity` is 0
    pub fn node_capacity(mut self, capacity: usize) -> Result<Self> {
        check_node_capacity(capacity)?;
        self.config.node_capacity = capacity;
        Ok(self)
    }

    pub fn dissolve_singletons(mut self, enabled: bool) -> Self {
        self.config.dissolve_singletons = enabled;
        self
    }

    /// Build the configuration
    ///
    /// If no seed was provided, a random one is drawn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the resolution is coarser than the map
    pub fn build(self) -> Result<WorldConfig> {
        let seed = self.seed.unwrap_or_else(rand::random);
        let terrain_seed = self.terrain_seed.unwrap_or(seed);

        let config = WorldConfig {
            seed,
            terrain_seed,
            ..self.config
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for WorldConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = WorldConfigBuilder::new().build().unwrap();
        assert_eq!(config.map_width, 1000.0);
        assert_eq!(config.map_resolution, 10.0);
        assert_eq!(config.distance_unit, "km");
        assert_eq!(config.terrain_lod, 7);
        assert_eq!(config.placement, Placement::RegionCenters);
        assert_eq!(config.node_capacity, 3);
        assert!(config.dissolve_singletons);
        assert_eq!(config.terrain_seed, config.seed);
    }

    #[test]
    fn test_builder_custom() {
        let config = WorldConfigBuilder::new()
            .seed(7)
            .terrain_seed(9)
            .map_width(250.0)
            .unwrap()
            .map_resolution(5.0)
            .unwrap()
            .distance_unit("leagues")
            .terrain_lod(3)
            .unwrap()
            .node_capacity(8)
            .unwrap()
            .dissolve_singletons(false)
            .build()
            .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.terrain_seed, 9);
        assert_eq!(config.map_width, 250.0);
        assert_eq!(config.map_resolution, 5.0);
        assert_eq!(config.distance_unit, "leagues");
        assert_eq!(config.terrain_lod, 3);
        assert_eq!(config.node_capacity, 8);
        assert!(!config.dissolve_singletons);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(WorldConfigBuilder::new().map_width(0.0).is_err());
        assert!(WorldConfigBuilder::new().map_width(f64::INFINITY).is_err());
        assert!(WorldConfigBuilder::new().map_resolution(-1.0).is_err());
        assert!(WorldConfigBuilder::new().terrain_lod(MAX_LOD + 1).is_err());
        assert!(WorldConfigBuilder::new().node_capacity(0).is_err());
    }

    #[test]
    fn test_resolution_coarser_than_map() {
        let result = WorldConfigBuilder::new()
            .map_width(10.0)
            .unwrap()
            .map_resolution(20.0)
            .unwrap()
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_polar_arm_counts() {
        let polar = PolarConfig::new(4, 3, 1.5);
        assert_eq!(polar.arms_at(0), 1);
        assert_eq!(polar.arms_at(1), 3);
        assert_eq!(polar.arms_at(2), 4);
        assert_eq!(polar.arms_at(3), 6);
        assert_eq!(polar.arms_at(4), 10);
        assert_eq!(polar.radius_at(2), 100.0);
    }

    #[test]
    fn test_polar_validation() {
        assert!(WorldConfigBuilder::new().polar(PolarConfig::new(3, 0, 1.0)).is_err());
        assert!(WorldConfigBuilder::new().polar(PolarConfig::new(3, 2, 0.5)).is_err());
        assert!(WorldConfigBuilder::new().polar(PolarConfig::new(3, 2, f64::NAN)).is_err());
        assert!(WorldConfigBuilder::new().polar(PolarConfig::new(40, 2, 2.0)).is_err());

        let spacing = PolarConfig {
            spacing: 0.0,
            ..Default::default()
        };
        assert!(WorldConfigBuilder::new().polar(spacing).is_err());

        let config = WorldConfigBuilder::new()
            .polar(PolarConfig::new(2, 4, 2.0))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.placement.name(), "polar");
    }

    #[test]
    fn test_validate_hand_built_config() {
        assert!(WorldConfig::default().validate().is_ok());

        let bad_polar = WorldConfig {
            placement: Placement::Polar(PolarConfig {
                steps: 3,
                branching: 3,
                growth: 0.5,
                spacing: -50.0,
            }),
            ..Default::default()
        };
        assert!(matches!(bad_polar.validate(), Err(MapError::InvalidConfig(_))));

        let nan_width = WorldConfig {
            map_width: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(nan_width.validate(), Err(MapError::InvalidConfig(_))));

        let coarse = WorldConfig {
            map_width: 5.0,
            ..Default::default()
        };
        assert!(matches!(coarse.validate(), Err(MapError::InvalidConfig(_))));

        let zero_capacity = WorldConfig {
            node_capacity: 0,
            ..Default::default()
        };
        assert!(zero_capacity.validate().is_err());

        let deep_lod = WorldConfig {
            terrain_lod: MAX_LOD + 1,
            ..Default::default()
        };
        assert!(deep_lod.validate().is_err());
    }

    #[test]
    fn test_polar_steps_capped() {
        let flat = PolarConfig::new(MAX_POLAR_STEPS + 1, 2, 1.0);
        assert!(WorldConfigBuilder::new().polar(flat).is_err());
        let flat = PolarConfig::new(MAX_POLAR_STEPS, 2, 1.0);
        assert!(WorldConfigBuilder::new().polar(flat).is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialized_config_validated() {
        let mut value = serde_json::to_value(WorldConfig::default()).unwrap();
        value["node_capacity"] = serde_json::json!(0);
        let config: WorldConfig = serde_json::from_value(value).unwrap();
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = WorldConfigBuilder::new()
            .seed(12345)
            .polar(PolarConfig::default())
            .unwrap()
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: WorldConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, restored);
    }
}
