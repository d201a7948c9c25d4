use serde::{Deserialize, Serialize};

use crate::Pt2D;

/// An axis-aligned rectangle.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// A boundary including no points.
    pub fn new() -> Bounds {
        Bounds {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        }
    }

    pub fn from(pts: &[Pt2D]) -> Bounds {
        let mut b = Bounds::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    pub fn update(&mut self, pt: Pt2D) {
        self.min_x = self.min_x.min(pt.x());
        self.max_x = self.max_x.max(pt.x());
        self.min_y = self.min_y.min(pt.y());
        self.max_y = self.max_y.max(pt.y());
    }

    /// Strictly inside; points on the boundary don't count.
    pub fn contains(&self, pt: Pt2D) -> bool {
        pt.x() > self.min_x && pt.x() < self.max_x && pt.y() > self.min_y && pt.y() < self.max_y
    }

    pub fn center(&self) -> Pt2D {
        Pt2D::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment() {
        let b = Bounds::from(&[Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 20.0)]);
        assert_eq!(b.center(), Pt2D::new(5.0, 10.0));
        assert!(b.contains(Pt2D::new(5.0, 5.0)));
        assert!(!b.contains(Pt2D::new(10.0, 5.0)));
        assert!(!b.contains(Pt2D::new(-1.0, 5.0)));
    }
}
