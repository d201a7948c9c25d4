use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{trim_f64, Angle, Distance};

/// A point in projected world-space, in meters. Y points north.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        if !x.is_finite() || !y.is_finite() {
            panic!("Bad Pt2D {}, {}", x, y);
        }

        Pt2D {
            x: trim_f64(x),
            y: trim_f64(y),
        }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn dist_to(self, to: Pt2D) -> Distance {
        Distance::meters(((self.x - to.x).powi(2) + (self.y - to.y).powi(2)).sqrt())
    }

    /// The bearing from this point to another, counterclockwise from east.
    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::radians((to.y - self.y).atan2(to.x - self.x)).normalize()
    }

    /// The arithmetic mean of some points. Panics on an empty list.
    pub fn center(pts: &[Pt2D]) -> Pt2D {
        if pts.is_empty() {
            panic!("Can't find the center of no points");
        }
        let mut x = 0.0;
        let mut y = 0.0;
        for pt in pts {
            x += pt.x;
            y += pt.y;
        }
        let len = pts.len() as f64;
        Pt2D::new(x / len, y / len)
    }

    pub fn midpoint(self, other: Pt2D) -> Pt2D {
        Pt2D::center(&[self, other])
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x(), self.y())
    }
}
