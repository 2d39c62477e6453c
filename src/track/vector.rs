use std::ops::{Add, Mul, Sub};

/// Plane vector in pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction, or zero for a (near) zero vector
    pub fn unit(self) -> Vector {
        let length = self.length();
        if length < 1e-12 || !length.is_finite() {
            return Vector::ZERO;
        }
        Vector::new(self.x / length, self.y / length)
    }

    /// The vector rotated by 90 degrees
    pub fn normal(self) -> Vector {
        Vector::new(-self.y, self.x)
    }

    pub fn distance(self, other: Vector) -> f64 {
        (self - other).length()
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<Vector> for f64 {
    type Output = Vector;

    fn mul(self, v: Vector) -> Vector {
        Vector::new(self * v.x, self * v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_and_normal() {
        let v = Vector::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(v.unit(), Vector::new(0.6, 0.8));
        assert_eq!(Vector::new(1.0, 0.0).normal(), Vector::new(0.0, 1.0));
    }

    #[test]
    fn test_unit_of_zero_is_zero() {
        assert_eq!(Vector::ZERO.unit(), Vector::ZERO);
    }
}
