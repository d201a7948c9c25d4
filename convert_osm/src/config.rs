use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use geom::{Bounds, Distance, Duration, Pt2D, Speed};

/// Everything that tunes a conversion. A partial JSON document overrides just the fields it names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Keyed by the value of the highway tag. Ways with any other highway value are dropped.
    pub highway_defaults: BTreeMap<String, HighwayDefaults>,
    /// If empty, every node of a retained way is used.
    pub hierarchy_layers: Vec<HierarchyLayer>,
    /// Keep every node of a way, instead of just junctions, endpoints, and signals
    pub keep_paths: bool,
    pub scale_max_speed: bool,
    pub clusters: ClusterConfig,
    pub signal_relocation: SignalRelocationConfig,
    pub lanes: LaneAssignmentConfig,
    pub signal_timings: SignalTimings,
    /// Fail on junctions the signal synthesis doesn't understand, instead of falling back
    pub strict: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighwayDefaults {
    /// 1 is the most important
    pub hierarchy: usize,
    pub lanes_per_direction: usize,
    pub freespeed_kmh: f64,
    pub freespeed_factor: f64,
    /// Vehicles per hour per lane
    pub lane_capacity: f64,
    pub oneway: bool,
}

impl HighwayDefaults {
    fn new(
        hierarchy: usize,
        lanes_per_direction: usize,
        freespeed_kmh: f64,
        lane_capacity: f64,
        oneway: bool,
    ) -> HighwayDefaults {
        HighwayDefaults {
            hierarchy,
            lanes_per_direction,
            freespeed_kmh,
            freespeed_factor: 1.0,
            lane_capacity,
            oneway,
        }
    }

    pub fn freespeed(&self) -> Speed {
        Speed::km_per_hour(self.freespeed_kmh)
    }
}

/// Only ways with a hierarchy up to `max_hierarchy` are kept inside `bounds`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HierarchyLayer {
    pub bounds: Bounds,
    pub max_hierarchy: usize,
}

impl HierarchyLayer {
    pub fn includes(&self, pt: Pt2D, hierarchy: usize) -> bool {
        hierarchy <= self.max_hierarchy && self.bounds.contains(pt)
    }
}

/// Distances in meters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub signalized_loop_radius: f64,
    pub loop_radius: f64,
    pub pair_radius: f64,
    pub max_loop_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> ClusterConfig {
        ClusterConfig {
            signalized_loop_radius: 30.0,
            loop_radius: 40.0,
            pair_radius: 50.0,
            max_loop_size: 8,
        }
    }
}

/// Distances in meters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalRelocationConfig {
    pub search_radius: f64,
    pub short_way_length: f64,
}

impl SignalRelocationConfig {
    pub fn search_radius(&self) -> Distance {
        Distance::meters(self.search_radius)
    }

    pub fn short_way_length(&self) -> Distance {
        Distance::meters(self.short_way_length)
    }
}

impl Default for SignalRelocationConfig {
    fn default() -> SignalRelocationConfig {
        SignalRelocationConfig {
            search_radius: 40.0,
            short_way_length: 25.0,
        }
    }
}

/// What the rightmost and leftmost lanes may do, when a way doesn't say
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutLaneMode {
    /// Only the sharpest turn to that side
    RightOnly,
    /// The sharpest turn to that side, and the straightest option
    RightAndStraight,
    All,
}

/// What the lanes between the outer two may do, when a way doesn't say
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidLaneMode {
    StraightOnly,
    /// The straightest option and its neighbors on either side
    StraightAndAdjacent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneAssignmentConfig {
    pub out_lane_mode: OutLaneMode,
    pub mid_lane_mode: MidLaneMode,
    /// Lanes start this many meters before the end of their link
    pub lane_offset: f64,
}

impl LaneAssignmentConfig {
    pub fn lane_offset(&self) -> Distance {
        Distance::meters(self.lane_offset)
    }
}

impl Default for LaneAssignmentConfig {
    fn default() -> LaneAssignmentConfig {
        LaneAssignmentConfig {
            out_lane_mode: OutLaneMode::RightAndStraight,
            mid_lane_mode: MidLaneMode::StraightAndAdjacent,
            lane_offset: 35.0,
        }
    }
}

/// All in seconds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTimings {
    pub intergreen: f64,
    pub protected_phase: f64,
    pub cycle: f64,
    /// For junctions with only one way in, or ones too complicated to plan
    pub default_cycle: f64,
    pub default_green_end: f64,
    /// Taken off the cycle for the single phase of a crossing
    pub crossing_clearance: f64,
    pub min_green: f64,
    pub max_green: f64,
    /// No phase is ever shorter than this
    pub min_phase: f64,
}

impl SignalTimings {
    pub fn intergreen(&self) -> Duration {
        Duration::seconds(self.intergreen)
    }

    pub fn protected_phase(&self) -> Duration {
        Duration::seconds(self.protected_phase)
    }

    pub fn cycle(&self) -> Duration {
        Duration::seconds(self.cycle)
    }

    pub fn default_cycle(&self) -> Duration {
        Duration::seconds(self.default_cycle)
    }

    pub fn default_green_end(&self) -> Duration {
        Duration::seconds(self.default_green_end)
    }

    pub fn crossing_clearance(&self) -> Duration {
        Duration::seconds(self.crossing_clearance)
    }

    pub fn min_green(&self) -> Duration {
        Duration::seconds(self.min_green)
    }

    pub fn max_green(&self) -> Duration {
        Duration::seconds(self.max_green)
    }

    pub fn min_phase(&self) -> Duration {
        Duration::seconds(self.min_phase)
    }

    fn check(&self) -> Result<()> {
        for (name, value) in [
            ("intergreen", self.intergreen),
            ("protected_phase", self.protected_phase),
            ("cycle", self.cycle),
            ("default_cycle", self.default_cycle),
            ("default_green_end", self.default_green_end),
            ("crossing_clearance", self.crossing_clearance),
            ("min_green", self.min_green),
            ("max_green", self.max_green),
            ("min_phase", self.min_phase),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("signal_timings.{} is {}, but can't be negative", name, value);
            }
        }
        if self.min_phase == 0.0 {
            bail!("signal_timings.min_phase can't be 0");
        }
        if self.min_green > self.max_green {
            bail!(
                "signal_timings.min_green ({}) is more than max_green ({})",
                self.min_green,
                self.max_green
            );
        }
        if self.default_green_end > self.default_cycle {
            bail!(
                "signal_timings.default_green_end ({}) is past the end of default_cycle ({})",
                self.default_green_end,
                self.default_cycle
            );
        }
        if self.crossing_clearance >= self.cycle {
            bail!(
                "signal_timings.crossing_clearance ({}) leaves no green in a cycle of {}",
                self.crossing_clearance,
                self.cycle
            );
        }
        Ok(())
    }
}

impl Default for SignalTimings {
    fn default() -> SignalTimings {
        SignalTimings {
            intergreen: 5.0,
            protected_phase: 10.0,
            cycle: 90.0,
            default_cycle: 120.0,
            default_green_end: 55.0,
            crossing_clearance: 15.0,
            min_green: 30.0,
            max_green: 60.0,
            min_phase: 5.0,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> ConversionConfig {
        let mut highway_defaults = BTreeMap::new();
        for (highway, defaults) in [
            ("motorway", HighwayDefaults::new(1, 2, 120.0, 2000.0, true)),
            ("motorway_link", HighwayDefaults::new(1, 1, 80.0, 1500.0, true)),
            ("trunk", HighwayDefaults::new(2, 1, 80.0, 2000.0, false)),
            ("trunk_link", HighwayDefaults::new(2, 1, 50.0, 1500.0, false)),
            ("primary", HighwayDefaults::new(3, 1, 80.0, 1500.0, false)),
            ("primary_link", HighwayDefaults::new(3, 1, 60.0, 1500.0, false)),
            ("secondary", HighwayDefaults::new(4, 1, 60.0, 1000.0, false)),
            ("tertiary", HighwayDefaults::new(5, 1, 45.0, 600.0, false)),
            ("minor", HighwayDefaults::new(6, 1, 45.0, 600.0, false)),
            ("unclassified", HighwayDefaults::new(6, 1, 45.0, 600.0, false)),
            ("residential", HighwayDefaults::new(6, 1, 30.0, 600.0, false)),
            ("living_street", HighwayDefaults::new(6, 1, 15.0, 300.0, false)),
        ] {
            highway_defaults.insert(highway.to_string(), defaults);
        }

        ConversionConfig {
            highway_defaults,
            hierarchy_layers: Vec::new(),
            keep_paths: false,
            scale_max_speed: false,
            clusters: ClusterConfig::default(),
            signal_relocation: SignalRelocationConfig::default(),
            lanes: LaneAssignmentConfig::default(),
            signal_timings: SignalTimings::default(),
            strict: false,
        }
    }
}

impl ConversionConfig {
    pub fn load(path: &str) -> Result<ConversionConfig> {
        let config: ConversionConfig =
            abstutil::read_json(path).with_context(|| format!("loading config from {}", path))?;
        config
            .signal_timings
            .check()
            .with_context(|| format!("checking config from {}", path))?;
        Ok(config)
    }

    /// Parses a JSON document; anything missing keeps its default.
    pub fn from_json(json: &str) -> Result<ConversionConfig> {
        let config: ConversionConfig = serde_json::from_str(json)?;
        config.signal_timings.check()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overrides() {
        let config = ConversionConfig::from_json(
            r#"{"keep_paths": true, "signal_timings": {"cycle": 100.0}, "lanes": {"out_lane_mode": "All"}}"#,
        )
        .unwrap();
        assert!(config.keep_paths);
        assert_eq!(config.signal_timings.cycle(), Duration::seconds(100.0));
        assert_eq!(config.signal_timings.intergreen(), Duration::seconds(5.0));
        assert_eq!(config.lanes.out_lane_mode, OutLaneMode::All);
        assert_eq!(config.lanes.mid_lane_mode, MidLaneMode::StraightAndAdjacent);
        assert_eq!(config.highway_defaults.len(), 12);
    }

    #[test]
    fn bad_signal_timings() {
        assert!(ConversionConfig::default().signal_timings.check().is_ok());
        for json in [
            r#"{"signal_timings": {"min_green": 70.0}}"#,
            r#"{"signal_timings": {"min_green": 50.0, "max_green": 40.0}}"#,
            r#"{"signal_timings": {"min_phase": 0.0}}"#,
            r#"{"signal_timings": {"intergreen": -5.0}}"#,
            r#"{"signal_timings": {"default_green_end": 130.0}}"#,
            r#"{"signal_timings": {"crossing_clearance": 90.0}}"#,
        ] {
            assert!(ConversionConfig::from_json(json).is_err(), "{}", json);
        }
        let config = ConversionConfig::from_json(
            r#"{"signal_timings": {"min_green": 20.0, "max_green": 20.0}}"#,
        )
        .unwrap();
        assert_eq!(config.signal_timings.min_phase(), Duration::seconds(5.0));
    }

    #[test]
    fn default_highways() {
        let config = ConversionConfig::default();
        let motorway = &config.highway_defaults["motorway"];
        assert!(motorway.oneway);
        assert_eq!(motorway.lanes_per_direction, 2);
        assert_eq!(config.highway_defaults["secondary"].hierarchy, 4);
        assert!(!config.highway_defaults["residential"].oneway);
    }

    #[test]
    fn layers() {
        let layer = HierarchyLayer {
            bounds: Bounds::from(&[Pt2D::new(0.0, 0.0), Pt2D::new(100.0, 100.0)]),
            max_hierarchy: 4,
        };
        assert!(layer.includes(Pt2D::new(50.0, 50.0), 3));
        assert!(layer.includes(Pt2D::new(50.0, 50.0), 4));
        assert!(!layer.includes(Pt2D::new(50.0, 50.0), 6));
        assert!(!layer.includes(Pt2D::new(150.0, 50.0), 1));
    }
}
