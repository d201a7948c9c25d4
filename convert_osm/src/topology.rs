use std::collections::{BTreeMap, BTreeSet};

use abstutil::Timer;
use geom::{Distance, Speed};
use map_model::{Link, LinkID, Network};
use raw_map::{osm, NodeID, RawGraph, RawWay, RestrictionRelation};

use crate::osm::{parse_lanes, parse_maxspeed, parse_oneway, Oneway};
use crate::turn_lanes::{parse_turn_lanes, LaneTurns};
use crate::{ConversionConfig, ConversionReport};

/// The simplified network, before lanes and signals, plus what later stages need to know about
/// where it came from.
pub struct Topology {
    pub network: Network,
    /// Rightmost lane first, for links whose way declares turn lanes
    pub turn_lanes: BTreeMap<LinkID, Vec<LaneTurns>>,
    pub signalized: BTreeSet<NodeID>,
    pub restrictions: BTreeMap<NodeID, Vec<RestrictionRelation>>,
}

/// Everything about one direction of a way
#[derive(Clone, Debug, PartialEq)]
struct DirectionSpec {
    lanes: usize,
    turn_lanes: Option<Vec<LaneTurns>>,
}

/// Tags resolved against the class defaults, once per way
#[derive(Clone, Debug, PartialEq)]
struct WaySpec {
    highway: String,
    hierarchy: usize,
    freespeed: Speed,
    lane_capacity: f64,
    forwards: Option<DirectionSpec>,
    backwards: Option<DirectionSpec>,
}

pub fn materialize(
    graph: &RawGraph,
    config: &ConversionConfig,
    report: &mut ConversionReport,
    timer: &mut Timer,
) -> Topology {
    let mut topo = Topology {
        network: Network::new(),
        turn_lanes: BTreeMap::new(),
        signalized: BTreeSet::new(),
        restrictions: BTreeMap::new(),
    };

    for node in graph.nodes.values() {
        if !node.used || node.representative.is_some() {
            continue;
        }
        topo.network.add_node(node.id, node.pt);
        if node.signalized {
            topo.signalized.insert(node.id);
        }
        if !node.restrictions.is_empty() {
            let mut restrictions = node.restrictions.clone();
            restrictions.sort_by_key(|r| r.id);
            topo.restrictions.insert(node.id, restrictions);
        }
    }

    let mut next_link = 1;
    timer.start_iter("create links", graph.ways.len());
    for way in graph.ways.values() {
        timer.next();
        let spec = match interpret_way(way, config, report) {
            Some(spec) => spec,
            None => continue,
        };

        let mut from: Option<NodeID> = None;
        let mut last: Option<NodeID> = None;
        let mut length = Distance::ZERO;
        for id in &way.nodes {
            let node = match graph.nodes.get(id) {
                Some(n) => n,
                None => continue,
            };
            if let Some(prev) = last {
                if prev == *id {
                    continue;
                }
                length += graph.nodes[&prev].pt.dist_to(node.pt);
            }
            last = Some(*id);
            if !node.used {
                continue;
            }
            if let Some(from) = from {
                topo.add_links(graph, config, way, &spec, from, *id, length, &mut next_link);
            }
            from = Some(*id);
            length = Distance::ZERO;
        }
    }

    info!("Materialized {}", topo.network.describe());
    topo
}

impl Topology {
    #[allow(clippy::too_many_arguments)]
    fn add_links(
        &mut self,
        graph: &RawGraph,
        config: &ConversionConfig,
        way: &RawWay,
        spec: &WaySpec,
        from: NodeID,
        to: NodeID,
        mut length: Distance,
        next_link: &mut usize,
    ) {
        let from_node = &graph.nodes[&from];
        let to_node = &graph.nodes[&to];
        if !config.hierarchy_layers.is_empty()
            && !config.hierarchy_layers.iter().any(|layer| {
                layer.includes(from_node.pt, spec.hierarchy)
                    || layer.includes(to_node.pt, spec.hierarchy)
            })
        {
            return;
        }

        let from_rep = from_node.representative.unwrap_or(from);
        let to_rep = to_node.representative.unwrap_or(to);
        if from_rep == to_rep {
            return;
        }
        let (from_pt, to_pt) = match (
            self.network.nodes.get(&from_rep),
            self.network.nodes.get(&to_rep),
        ) {
            (Some(a), Some(b)) => (a.pt, b.pt),
            _ => {
                warn!("{} refers to a node that didn't make it into the network", way.id);
                return;
            }
        };
        if from_rep != from || to_rep != to {
            length = from_pt.dist_to(to_pt);
        }

        for (dir, src, dst) in [
            (&spec.forwards, from_rep, to_rep),
            (&spec.backwards, to_rep, from_rep),
        ] {
            let dir = match dir {
                Some(dir) => dir,
                None => continue,
            };
            let id = LinkID(*next_link);
            *next_link += 1;
            self.network.add_link(Link {
                id,
                from: src,
                to: dst,
                length,
                freespeed: spec.freespeed,
                capacity: (dir.lanes as f64) * spec.lane_capacity,
                num_lanes: dir.lanes,
                highway: spec.highway.clone(),
                orig_way: way.id,
            });
            if let Some(ref turns) = dir.turn_lanes {
                self.turn_lanes.insert(id, turns.clone());
            }
        }
    }
}

/// Resolves the tags of a way against its class defaults. None if no links should be made.
fn interpret_way(
    way: &RawWay,
    config: &ConversionConfig,
    report: &mut ConversionReport,
) -> Option<WaySpec> {
    let highway = way.tags.get(osm::HIGHWAY)?;
    let defaults = config.highway_defaults.get(highway)?;
    if way.tags.is(osm::ACCESS, "no") {
        debug!("{} is closed to traffic", way.id);
        return None;
    }

    let tagged_oneway = match way.tags.get(osm::ONEWAY).map(|v| parse_oneway(v)) {
        Some(Ok(dir)) => Some(dir),
        Some(Err(value)) => {
            ConversionReport::unknown(&mut report.unknown_oneways, osm::ONEWAY, &value);
            None
        }
        None => None,
    };
    let oneway = tagged_oneway.unwrap_or(if way.is_roundabout() || defaults.oneway {
        Oneway::Forward
    } else {
        Oneway::Both
    });

    let mut parse = |key: &str| match parse_lanes(&way.tags, key) {
        Ok(x) => x,
        Err(value) => {
            ConversionReport::unknown(&mut report.unknown_lanes, key, &value);
            None
        }
    };
    let total = parse(osm::LANES);
    let lanes_forward = parse(osm::LANES_FORWARD);
    let lanes_backward = parse(osm::LANES_BACKWARD);

    let default = defaults.lanes_per_direction;
    let (forward_lanes, backward_lanes) = if total.is_none()
        && lanes_forward.is_none()
        && lanes_backward.is_none()
    {
        if oneway != Oneway::Both
            && default == 1
            && ["trunk", "primary", "secondary"].contains(&highway.as_str())
        {
            (2, 2)
        } else {
            (default, default)
        }
    } else {
        let total = total.unwrap_or(if oneway == Oneway::Both {
            2 * default
        } else {
            default
        });
        match (lanes_forward, lanes_backward) {
            (Some(f), Some(b)) => (f, b),
            (Some(f), None) => (f, total.saturating_sub(f)),
            (None, Some(b)) => (total.saturating_sub(b), b),
            (None, None) => {
                if oneway == Oneway::Both {
                    (total - total / 2, total / 2)
                } else {
                    (total, total)
                }
            }
        }
    };

    let mut freespeed = defaults.freespeed();
    if let Some(value) = way.tags.get(osm::MAXSPEED) {
        match parse_maxspeed(value) {
            Some(speed) => {
                freespeed = speed;
            }
            None => {
                ConversionReport::unknown(&mut report.unknown_maxspeeds, osm::MAXSPEED, value);
            }
        }
    }
    if config.scale_max_speed {
        freespeed = freespeed * defaults.freespeed_factor;
    }

    let mut direction = |enabled: bool, lanes: usize, key: &str| {
        if !enabled {
            return None;
        }
        let lanes = lanes.max(1);
        let turn_lanes = way
            .tags
            .get(key)
            .or_else(|| way.tags.get(osm::TURN_LANES))
            .map(|value| parse_turn_lanes(value, lanes, report));
        Some(DirectionSpec { lanes, turn_lanes })
    };
    let forwards = direction(oneway.forwards(), forward_lanes, osm::TURN_LANES_FORWARD);
    let backwards = direction(oneway.backwards(), backward_lanes, osm::TURN_LANES_BACKWARD);

    Some(WaySpec {
        highway: highway.to_string(),
        hierarchy: defaults.hierarchy,
        freespeed,
        lane_capacity: defaults.lane_capacity,
        forwards,
        backwards,
    })
}
