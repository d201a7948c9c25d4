use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An angle, stored in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub fn radians(rads: f64) -> Angle {
        Angle(rads)
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle(degs.to_radians())
    }

    pub fn opposite(self) -> Angle {
        Angle(self.0 + PI)
    }

    /// Always in [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        let rads = self.0.rem_euclid(2.0 * PI);
        // rem_euclid can round up to exactly 2pi for tiny negative inputs
        if rads >= 2.0 * PI {
            0.0
        } else {
            rads
        }
    }

    /// Always in [0, 360)
    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The counterclockwise rotation from `self` to `other`, in [0, 2pi).
    pub fn rotation_to(self, other: Angle) -> Angle {
        Angle::radians(other.0 - self.0).normalize()
    }

    pub fn normalize(self) -> Angle {
        Angle(self.normalized_radians())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizing() {
        for (input, expected) in [(-90.0, 270.0), (360.0, 0.0), (450.0, 90.0), (0.0, 0.0)] {
            let actual = Angle::degrees(input).normalized_degrees();
            assert!(
                (actual - expected).abs() < 1e-9,
                "{} normalized to {}, not {}",
                input,
                actual,
                expected
            );
        }
    }

    #[test]
    fn rotations() {
        let a = Angle::degrees(350.0);
        let b = Angle::degrees(10.0);
        assert!((a.rotation_to(b).normalized_degrees() - 20.0).abs() < 1e-9);
        assert!((b.rotation_to(a).normalized_degrees() - 340.0).abs() < 1e-9);
    }
}
