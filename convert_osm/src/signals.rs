//! Mappers often tag traffic signals on the stop line, a few meters before the junction they
//! control. Move them onto the junction.

use std::collections::{BTreeMap, BTreeSet};

use abstutil::Timer;
use geom::{Distance, Pt2D};
use raw_map::{NodeID, RawGraph, RawWay};

use crate::config::SignalRelocationConfig;
use crate::osm::{tagged_oneway, Oneway};
use crate::usage::is_junction;
use crate::ConversionReport;

#[derive(Clone, Copy, Debug, PartialEq)]
enum SignalState {
    /// Tagged somewhere along a way, not at a junction
    MidSegment,
    /// Found a junction close enough to take over the signal
    Candidate { target: NodeID, dist: Distance },
    Relocated(NodeID),
}

pub fn consolidate(
    graph: &mut RawGraph,
    config: &SignalRelocationConfig,
    report: &mut ConversionReport,
    timer: &mut Timer,
) {
    let radius = config.search_radius();

    timer.start("relocate signals onto junctions");
    let mut states: BTreeMap<NodeID, SignalState> = BTreeMap::new();
    for way in graph.ways.values() {
        for idx in 1..way.nodes.len() - 1 {
            let id = way.nodes[idx];
            let signalized = graph
                .nodes
                .get(&id)
                .map(|n| n.used && n.signalized)
                .unwrap_or(false);
            if !signalized || states.contains_key(&id) || is_junction(graph, id) {
                continue;
            }
            let found = if way.is_roundabout() {
                search_ring(graph, way, idx, radius)
            } else {
                search_way(graph, way, idx, radius)
            };
            states.insert(
                id,
                match found {
                    Some((target, dist)) => SignalState::Candidate { target, dist },
                    None => SignalState::MidSegment,
                },
            );
        }
    }
    for (id, state) in states.iter_mut() {
        if let SignalState::Candidate { target, dist } = *state {
            debug!("Moving the signal at {} to {}, {} away", id, target, dist);
            if let Some(node) = graph.nodes.get_mut(id) {
                node.signalized = false;
            }
            if let Some(node) = graph.nodes.get_mut(&target) {
                node.signalized = true;
            }
            *state = SignalState::Relocated(target);
            report.signals_relocated += 1;
        }
    }
    let stuck = states
        .values()
        .filter(|s| **s == SignalState::MidSegment)
        .count();
    if stuck > 0 {
        debug!("{} signals have no junction nearby", stuck);
    }
    timer.stop("relocate signals onto junctions");

    timer.start("remove signals near junction signals");
    let junction_signals: Vec<Pt2D> = graph
        .nodes
        .values()
        .filter(|n| n.used && n.signalized && is_junction(graph, n.id))
        .map(|n| n.pt)
        .collect();
    let redundant: Vec<NodeID> = graph
        .nodes
        .values()
        .filter(|n| n.used && n.signalized && !is_junction(graph, n.id))
        .filter(|n| junction_signals.iter().any(|pt| pt.dist_to(n.pt) < radius))
        .map(|n| n.id)
        .collect();
    for id in redundant {
        debug!("Removing the signal at {}, since a junction nearby has one", id);
        if let Some(node) = graph.nodes.get_mut(&id) {
            node.signalized = false;
        }
        report.signals_removed += 1;
    }
    timer.stop("remove signals near junction signals");

    bridge_short_ways(graph, config.short_way_length(), report);

    info!(
        "Signals: {} relocated, {} removed, {} moved across short ways",
        report.signals_relocated, report.signals_removed, report.signals_bridged
    );
}

/// Looks both ways along the way (as far as traffic may flow) for the nearest junction.
fn search_way(
    graph: &RawGraph,
    way: &RawWay,
    idx: usize,
    radius: Distance,
) -> Option<(NodeID, Distance)> {
    let dir = tagged_oneway(way).unwrap_or(Oneway::Both);
    let forwards = if dir.forwards() {
        nearest_junction(graph, way.nodes[idx..].iter(), radius)
    } else {
        None
    };
    let backwards = if dir.backwards() {
        nearest_junction(graph, way.nodes[..=idx].iter().rev(), radius)
    } else {
        None
    };
    match (forwards, backwards) {
        (Some(f), Some(b)) => {
            if b.1 < f.1 {
                Some(b)
            } else {
                Some(f)
            }
        }
        (f, b) => f.or(b),
    }
}

/// Roundabouts are often split into several ways. Follow the direction of travel around the ring,
/// continuing onto the next piece of it when one ends somewhere nothing else joins. If the ring
/// ends at such a plain node, the way leaving it is searched too.
fn search_ring(
    graph: &RawGraph,
    way: &RawWay,
    idx: usize,
    radius: Distance,
) -> Option<(NodeID, Distance)> {
    let mut path: Vec<NodeID> = way.nodes[idx..].to_vec();
    let mut visited = BTreeSet::new();
    visited.insert(way.id);
    loop {
        let last = *path.last()?;
        if is_junction(graph, last) {
            break;
        }
        let onward: Vec<&RawWay> = graph
            .nodes
            .get(&last)?
            .ways
            .iter()
            .filter(|w| !visited.contains(w))
            .filter_map(|w| graph.ways.get(w))
            .collect();
        if let Some(next) = onward
            .iter()
            .find(|w| w.is_roundabout() && w.first_node() == Some(last))
        {
            visited.insert(next.id);
            path.extend(next.nodes.iter().skip(1).cloned());
            continue;
        }
        if let Some(exit) = onward.iter().find(|w| !w.is_roundabout()) {
            let dir = tagged_oneway(exit).unwrap_or(Oneway::Both);
            if exit.first_node() == Some(last) && dir.forwards() {
                path.extend(exit.nodes.iter().skip(1).cloned());
            } else if exit.last_node() == Some(last) && dir.backwards() {
                path.extend(exit.nodes.iter().rev().skip(1).cloned());
            }
        }
        break;
    }
    nearest_junction(graph, path.iter(), radius)
}

/// The first node is where the search starts. Pedestrian crossings between the signal and the
/// junction are stepped over like any other node in between, so `crossing` needs no special case.
fn nearest_junction<'a, I: Iterator<Item = &'a NodeID>>(
    graph: &RawGraph,
    mut path: I,
    radius: Distance,
) -> Option<(NodeID, Distance)> {
    let mut last_pt = graph.nodes.get(path.next()?)?.pt;
    let mut dist = Distance::ZERO;
    for id in path {
        let node = graph.nodes.get(id)?;
        dist += last_pt.dist_to(node.pt);
        if dist > radius {
            return None;
        }
        if node.used && is_junction(graph, *id) {
            return Some((*id, dist));
        }
        last_pt = node.pt;
    }
    None
}

/// A signal at the near end of a very short way, whose far end is a bigger junction, belongs to
/// that junction.
fn bridge_short_ways(graph: &mut RawGraph, max_length: Distance, report: &mut ConversionReport) {
    let mut candidates = Vec::new();
    for way in graph.ways.values() {
        if way.nodes.len() != 2 {
            continue;
        }
        let (a, b) = match (graph.nodes.get(&way.nodes[0]), graph.nodes.get(&way.nodes[1])) {
            (Some(a), Some(b)) => (a, b),
            _ => continue,
        };
        if a.pt.dist_to(b.pt) >= max_length {
            continue;
        }
        let dir = tagged_oneway(way).unwrap_or(Oneway::Both);
        candidates.push((a.id, b.id, dir.forwards()));
        candidates.push((b.id, a.id, dir.backwards()));
    }

    for (src, dst, allowed) in candidates {
        if !allowed {
            continue;
        }
        let ok = match (graph.nodes.get(&src), graph.nodes.get(&dst)) {
            (Some(src), Some(dst)) => {
                src.degree() == 2 && dst.degree() > 2 && src.signalized && !dst.signalized
            }
            _ => false,
        };
        if ok {
            debug!("Moving the signal at {} across a short way to {}", src, dst);
            if let Some(node) = graph.nodes.get_mut(&src) {
                node.signalized = false;
            }
            if let Some(node) = graph.nodes.get_mut(&dst) {
                node.signalized = true;
            }
            report.signals_bridged += 1;
        }
    }
}
