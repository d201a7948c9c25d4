//! Typed geometry and units for projected street graphs. Everything is in meters and seconds.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::distance::Distance;
pub use crate::duration::Duration;
pub use crate::pt::Pt2D;
pub use crate::speed::Speed;

mod angle;
mod bounds;
mod distance;
mod duration;
mod pt;
mod speed;

/// Reduce the precision of an f64. This helps ensure serialization is idempotent (everything is
/// exactly the same before and after saving/loading). Ideally we'd use some kind of proper
/// fixed-precision type instead of f64.
pub fn trim_f64(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Serializes a trimmed `f64` as an `i32` to save space.
fn serialize_f64<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
    // So a trimmed f64's range becomes 2**31 / 10,000 =~ 214,000, which is plenty
    // We MUST round here, the same as trim_f64. The unit test demonstrates why.
    let int = (x * 10_000.0).round() as i32;
    int.serialize(s)
}

/// Deserializes a trimmed `f64` from an `i32`.
fn deserialize_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let x = <i32>::deserialize(d)?;
    Ok(x as f64 / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_trimming() {
        for x in [0.0, 1.23456789, -45.00004, 199_999.99995] {
            let trimmed = trim_f64(x);
            let json = serde_json::to_string(&Distance::meters(trimmed)).unwrap();
            let restored: Distance = serde_json::from_str(&json).unwrap();
            assert_eq!(restored, Distance::meters(trimmed), "{} didn't survive", x);
        }
    }
}
