use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use abstutil::{prettyprint_usize, Counter};
use map_model::Network;
use raw_map::{NodeID, RelationID, WayID};

/// Which rule merged a cluster of junctions
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterPolicy {
    /// Four signalized junctions forming a closed loop of oneway streets
    SignalizedLoop,
    /// Any closed loop of oneway streets
    Loop,
    /// Two nearby junctions on oneway streets
    Pair,
}

/// Everything unusual noticed during one conversion. Tag values are remembered once, no matter
/// how often they occur.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub unknown_highways: BTreeSet<String>,
    pub unknown_maxspeeds: BTreeSet<String>,
    pub unknown_lanes: BTreeSet<String>,
    pub unknown_oneways: BTreeSet<String>,
    pub unknown_turn_lanes: BTreeSet<String>,
    pub ways_missing_nodes: BTreeSet<WayID>,
    pub incomplete_restrictions: BTreeSet<RelationID>,
    /// The "to" way never matched any link leaving the via node
    pub unmatched_restrictions: BTreeSet<RelationID>,

    pub signals_relocated: usize,
    pub signals_removed: usize,
    pub signals_bridged: usize,
    pub clusters: Counter<ClusterPolicy>,
    /// Signalized junctions with more incoming links than the signal planner handles
    pub unexpected_junctions: BTreeSet<NodeID>,

    pub num_nodes: usize,
    pub num_links: usize,
    pub num_lane_tables: usize,
    pub num_signal_systems: usize,
}

impl ConversionReport {
    /// Returns true the first time a value is seen, so the caller can warn once.
    pub(crate) fn unknown(set: &mut BTreeSet<String>, key: &str, value: &str) -> bool {
        let new = set.insert(value.to_string());
        if new {
            warn!("Unrecognized {} value {:?}", key, value);
        }
        new
    }

    pub(crate) fn record_sizes(&mut self, network: &Network) {
        self.num_nodes = network.nodes.len();
        self.num_links = network.links.len();
        self.num_lane_tables = network.lanes.len();
        self.num_signal_systems = network.signals.len();
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "{} nodes, {} links, {} lane tables, {} signal systems",
                prettyprint_usize(self.num_nodes),
                prettyprint_usize(self.num_links),
                prettyprint_usize(self.num_lane_tables),
                prettyprint_usize(self.num_signal_systems)
            ),
            format!(
                "Signals: {} relocated onto junctions, {} removed near other signals, {} moved \
                 across short ways",
                prettyprint_usize(self.signals_relocated),
                prettyprint_usize(self.signals_removed),
                prettyprint_usize(self.signals_bridged)
            ),
            format!(
                "Merged junction clusters: {} signalized loops, {} loops, {} pairs",
                prettyprint_usize(self.clusters.get(ClusterPolicy::SignalizedLoop)),
                prettyprint_usize(self.clusters.get(ClusterPolicy::Loop)),
                prettyprint_usize(self.clusters.get(ClusterPolicy::Pair))
            ),
        ];
        for (label, values) in [
            ("highway", &self.unknown_highways),
            ("maxspeed", &self.unknown_maxspeeds),
            ("lanes", &self.unknown_lanes),
            ("oneway", &self.unknown_oneways),
            ("turn:lanes", &self.unknown_turn_lanes),
        ] {
            if !values.is_empty() {
                lines.push(format!(
                    "Unrecognized {} values: {}",
                    label,
                    abstutil::plain_list_names(values.clone())
                ));
            }
        }
        if !self.ways_missing_nodes.is_empty() {
            lines.push(format!(
                "{} ways dropped for referring to missing nodes",
                prettyprint_usize(self.ways_missing_nodes.len())
            ));
        }
        if !self.incomplete_restrictions.is_empty() || !self.unmatched_restrictions.is_empty() {
            lines.push(format!(
                "Restrictions: {} incomplete, {} never matched a link",
                prettyprint_usize(self.incomplete_restrictions.len()),
                prettyprint_usize(self.unmatched_restrictions.len())
            ));
        }
        if !self.unexpected_junctions.is_empty() {
            lines.push(format!(
                "{} signalized junctions had more than 4 incoming links and got a default plan: {}",
                prettyprint_usize(self.unexpected_junctions.len()),
                self.unexpected_junctions
                    .iter()
                    .map(|n| n.0.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_once() {
        let mut report = ConversionReport::default();
        assert!(ConversionReport::unknown(
            &mut report.unknown_maxspeeds,
            "maxspeed",
            "signals"
        ));
        assert!(!ConversionReport::unknown(
            &mut report.unknown_maxspeeds,
            "maxspeed",
            "signals"
        ));
        assert_eq!(report.unknown_maxspeeds.len(), 1);

        let lines = report.describe();
        assert!(lines
            .iter()
            .any(|l| l == "Unrecognized maxspeed values: signals"));
    }

    #[test]
    fn json() {
        let mut report = ConversionReport::default();
        report.clusters.inc(ClusterPolicy::Pair);
        report.clusters.inc(ClusterPolicy::Pair);
        report.unexpected_junctions.insert(NodeID(7));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""map":{"Pair":2}"#), "{}", json);
        assert!(json.contains(r#""unexpected_junctions":[7]"#), "{}", json);
    }
}
