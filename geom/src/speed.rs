use std::{cmp, ops};

use serde::{Deserialize, Serialize};

use crate::{deserialize_f64, serialize_f64, trim_f64};

/// In meters per second. Can be negative.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Speed(
    #[serde(serialize_with = "serialize_f64", deserialize_with = "deserialize_f64")] f64,
);

// By construction, Speed is a finite f64 with trimmed precision.
impl Eq for Speed {}

#[allow(clippy::derive_ord_xor_partial_ord)] // false positive
impl Ord for Speed {
    fn cmp(&self, other: &Speed) -> cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl Speed {
    pub fn meters_per_second(value: f64) -> Speed {
        if !value.is_finite() {
            panic!("Bad Speed {}", value);
        }

        Speed(trim_f64(value))
    }

    pub fn miles_per_hour(value: f64) -> Speed {
        Speed::meters_per_second(0.44704 * value)
    }

    pub fn km_per_hour(value: f64) -> Speed {
        Speed::meters_per_second(value / 3.6)
    }

    pub fn to_km_per_hour(self) -> f64 {
        self.0 * 3.6
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} km/h", (self.0 * 3.6).round())
    }
}

impl ops::Mul<f64> for Speed {
    type Output = Speed;

    fn mul(self, scalar: f64) -> Speed {
        Speed::meters_per_second(self.0 * scalar)
    }
}

