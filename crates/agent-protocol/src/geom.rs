//! Planar geometry in field coordinates.
//!
//! Angles are in degrees in the server's coordinate frame, where the y axis
//! points down the field drawing.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Wraps an angle into the half-open range `(-180, 180]`.
pub fn normalize_angle(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let mut a = degrees % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// A 2D vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Builds a vector from a length and a direction in degrees.
    pub fn polar(length: f64, dir_degrees: f64) -> Self {
        let rad = dir_degrees.to_radians();
        Self::new(length * rad.cos(), length * rad.sin())
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Direction in degrees; zero for the zero vector.
    pub fn dir(&self) -> f64 {
        if self.x == 0.0 && self.y == 0.0 {
            0.0
        } else {
            self.y.atan2(self.x).to_degrees()
        }
    }

    pub fn dist(&self, other: Vector) -> f64 {
        (*self - other).length()
    }

    /// Rotates the vector by `degrees`.
    pub fn rotate(&self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Scales the vector down to `max` if it is longer.
    pub fn clamp_length(&self, max: f64) -> Self {
        let len = self.length();
        if len > max && len > 0.0 {
            *self * (max / len)
        } else {
            *self
        }
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_angle() {
        assert!(approx(normalize_angle(190.0), -170.0));
        assert!(approx(normalize_angle(-190.0), 170.0));
        assert!(approx(normalize_angle(180.0), 180.0));
        assert!(approx(normalize_angle(-180.0), 180.0));
        assert!(approx(normalize_angle(720.0 + 45.0), 45.0));
        assert_eq!(normalize_angle(f64::NAN), 0.0);
    }

    #[test]
    fn test_polar_and_dir() {
        let v = Vector::polar(2.0, 90.0);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, 2.0));
        assert!(approx(v.dir(), 90.0));
        assert!(approx(v.length(), 2.0));
    }

    #[test]
    fn test_rotate() {
        let v = Vector::new(1.0, 0.0).rotate(-90.0);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, -1.0));
    }

    #[test]
    fn test_clamp_length() {
        let v = Vector::new(3.0, 4.0).clamp_length(2.5);
        assert!(approx(v.length(), 2.5));
        let short = Vector::new(0.3, 0.4);
        assert_eq!(short.clamp_length(2.5), short);
    }
}
