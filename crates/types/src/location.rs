use serde::{Deserialize, Serialize};

/// A point in machine or board space, millimetres with rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64, rotation: f64) -> Self {
        Self { x, y, z, rotation }
    }

    pub const fn xy(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotate the X/Y coordinates about the origin, leaving Z and rotation untouched
    pub fn rotate_xy(self, degrees: f64) -> Self {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
            ..self
        }
    }

    /// Component-wise sum including rotation
    pub fn add(self, other: Location) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            rotation: self.rotation + other.rotation,
        }
    }

    /// Subtract X, Y and rotation of `other`, keeping this location's Z
    pub fn subtract_with_rotation(self, other: Location) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z,
            rotation: self.rotation - other.rotation,
        }
    }

    /// Planar distance to another location
    pub fn distance_xy(&self, other: &Location) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_rotate_xy_quarter_turn() {
        let loc = Location::new(10.0, 0.0, 1.0, 45.0).rotate_xy(90.0);
        assert!(loc.x.abs() < EPS);
        assert!((loc.y - 10.0).abs() < EPS);
        assert_eq!(loc.z, 1.0);
        assert_eq!(loc.rotation, 45.0);
    }

    #[test]
    fn test_subtract_with_rotation_keeps_z() {
        let loc = Location::new(5.0, 5.0, 2.0, 10.0)
            .subtract_with_rotation(Location::new(1.0, 2.0, 7.0, 3.0));
        assert_eq!(loc, Location::new(4.0, 3.0, 2.0, 7.0));
    }

    #[test]
    fn test_distance_xy() {
        let a = Location::xy(0.0, 0.0);
        let b = Location::xy(3.0, 4.0);
        assert!((a.distance_xy(&b) - 5.0).abs() < EPS);
    }
}
