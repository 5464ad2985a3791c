//! Planar geometry for the service area. Coordinates are opaque simulation
//! distance units; no display scaling is applied here.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance.
    pub fn distance_to(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f64, f64)> for Location {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub width: f64,
    pub height: f64,
}

impl Default for ServiceArea {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
        }
    }
}

impl ServiceArea {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, location: &Location) -> bool {
        (0.0..=self.width).contains(&location.x) && (0.0..=self.height).contains(&location.y)
    }

    pub fn center(&self) -> Location {
        Location::new(self.width / 2.0, self.height / 2.0)
    }

    /// Uniform sample over the area.
    pub fn random_location<R: Rng + ?Sized>(&self, rng: &mut R) -> Location {
        Location::new(
            rng.gen_range(0.0..=self.width),
            rng.gen_range(0.0..=self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn distance_is_euclidean_and_symmetric() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn random_locations_stay_inside_area() {
        let area = ServiceArea::new(40.0, 10.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let location = area.random_location(&mut rng);
            assert!(area.contains(&location), "{location:?} outside {area:?}");
        }
    }
}
