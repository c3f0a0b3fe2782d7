//! Error types for world map generation and spatial queries

use std::fmt;

use crate::geometry::Point;

/// Errors that can occur while generating a map or querying its index
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// Configuration validation failed
    InvalidConfig(String),
    /// An index insert was attempted outside the root rectangle
    ///
    /// This means the index was sized too small for the generated content.
    Bounds {
        /// Position of the rejected item
        position: Point,
    },
    /// An item fit a node's rectangle but none of its children after a split
    ///
    /// Raised instead of silently dropping the item when subdivision hits a
    /// rounding or boundary defect.
    Split {
        /// Position of the item that could not be placed
        position: Point,
    },
    /// A shape could not be classified as a supported variant
    UnknownShape(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            MapError::Bounds { position } => write!(
                f,
                "position ({}, {}) lies outside the index bounds",
                position.x, position.y
            ),
            MapError::Split { position } => write!(
                f,
                "could not split quad: item at ({}, {}) fits no child",
                position.x, position.y
            ),
            MapError::UnknownShape(msg) => write!(f, "unknown shape: {}", msg),
        }
    }
}

impl std::error::Error for MapError {}

/// Result type alias for map operations
pub type Result<T> = std::result::Result<T, MapError>;
