//! Settlement names

use rand::seq::SliceRandom;
use rand::Rng;

/// Default pool of town names
pub const TOWN_NAMES: &[&str] = &[
    "Abingdon", "Accrington", "Acle", "Acton", "Adlington", "Alcester", "Aldeburgh",
    "Aldershot", "Alford", "Alfreton", "Alnwick", "Alsager", "Alston", "Alton",
    "Altrincham", "Amble", "Ambleside", "Amersham", "Amesbury", "Ampthill", "Andover",
    "Arlesey", "Arundel",
];

/// Source of names for newly placed cities
pub trait CityNamer {
    fn next_name<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String;
}

/// Picks names uniformly at random from a fixed list (repeats allowed)
#[derive(Debug, Clone)]
pub struct NamePool {
    names: Vec<String>,
}

impl NamePool {
    /// Create a pool from a list of names
    ///
    /// An empty list falls back to [`TOWN_NAMES`].
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            Self::default()
        } else {
            Self { names }
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self {
            names: TOWN_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl CityNamer for NamePool {
    fn next_name<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        // `new` never leaves the pool empty
        self.names.choose(rng).cloned().unwrap_or_default()
    }
}
