//! Fractal world map generation
//!
//! A standalone library for generating square world maps: diamond-square
//! terrain, land and water regions, and cities stored in a quadtree for
//! fast area queries.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fractal_worldmap::*;
//!
//! // Generate a map with one city per land region
//! let config = WorldConfigBuilder::new()
//!     .seed(42)
//!     .map_width(1000.0).unwrap()
//!     .terrain_lod(7).unwrap()
//!     .build().unwrap();
//!
//! let map = WorldMap::generate(config).unwrap();
//!
//! // Find the cities near the middle of the map
//! let area = Shape::Circle(Circle::new(Point::new(500.0, 500.0), 150.0));
//! for city in map.cities(Some(&area)).unwrap() {
//!     println!("{} at {:?}", city.name, city.position);
//! }
//! ```
//!
//! # Features
//!
//! - `serde`: Enables serialization support for configuration, geometry,
//!   terrain and cities

// Modules
pub mod error;
pub mod config;
pub mod geometry;
pub mod terrain;
pub mod region;
pub mod spatial;
pub mod naming;
pub mod world;
pub mod util;

// Re-export core types for convenience
pub use error::{MapError, Result};
pub use config::{Placement, PolarConfig, WorldConfig, WorldConfigBuilder};
pub use geometry::{Circle, Line, Point, Rectangle, Shape};
pub use terrain::HeightField;
pub use region::{Region, RegionId, RegionPartition};
pub use spatial::{IndexedItem, QuadTree};
pub use naming::{CityNamer, NamePool};
pub use world::{City, CityId, MapBounds, WorldMap};

/// Version of the generator, reported by [`WorldMap::version`]
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export glam::DVec2 for convenience
pub use glam::DVec2;
