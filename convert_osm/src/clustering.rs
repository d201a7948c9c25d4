//! Divided roads and couplets of oneway streets produce several junction nodes where one
//! junction really exists. Find these clusters and merge each into a single representative node.

use std::collections::BTreeSet;

use abstutil::Timer;
use geom::{Bounds, Distance, Pt2D};
use raw_map::{NodeID, RawGraph, RawNode};

use crate::config::ClusterConfig;
use crate::osm::{tagged_oneway, Oneway};
use crate::report::ClusterPolicy;
use crate::ConversionReport;

struct Clusters<'a> {
    graph: &'a mut RawGraph,
    /// Members and representatives alike
    clustered: BTreeSet<NodeID>,
    next_id: i64,
}

pub fn merge_junctions(
    graph: &mut RawGraph,
    config: &ClusterConfig,
    report: &mut ConversionReport,
    timer: &mut Timer,
) {
    let next_id = graph.max_node_id() + 1;
    let mut clusters = Clusters {
        graph,
        clustered: BTreeSet::new(),
        next_id,
    };

    timer.start("merge signalized loops");
    let radius = Distance::meters(config.signalized_loop_radius);
    for id in clusters.candidates(|n| n.signalized) {
        if clusters.clustered.contains(&id) {
            continue;
        }
        if let Some(members) = clusters.find_loop(id, radius, config.max_loop_size) {
            if members.len() == 4 {
                let pts: Vec<Pt2D> = members.iter().map(|m| clusters.graph.nodes[m].pt).collect();
                clusters.merge(members, Pt2D::center(&pts), ClusterPolicy::SignalizedLoop, report);
            }
        }
    }
    timer.stop("merge signalized loops");

    timer.start("merge loops");
    let radius = Distance::meters(config.loop_radius);
    for id in clusters.candidates(|_| true) {
        if clusters.clustered.contains(&id) {
            continue;
        }
        if let Some(members) = clusters.find_loop(id, radius, config.max_loop_size) {
            let pts: Vec<Pt2D> = members.iter().map(|m| clusters.graph.nodes[m].pt).collect();
            clusters.merge(members, Bounds::from(&pts).center(), ClusterPolicy::Loop, report);
        }
    }
    timer.stop("merge loops");

    timer.start("merge pairs");
    let radius = Distance::meters(config.pair_radius);
    for id in clusters.candidates(|_| true) {
        if clusters.clustered.contains(&id) || !clusters.on_oneway(id) {
            continue;
        }
        if let Some(partner) = clusters.nearest_partner(id, radius) {
            let pt = clusters.graph.nodes[&id]
                .pt
                .midpoint(clusters.graph.nodes[&partner].pt);
            clusters.merge(vec![id, partner], pt, ClusterPolicy::Pair, report);
        }
    }
    timer.stop("merge pairs");
}

impl<'a> Clusters<'a> {
    /// Used junctions not yet clustered, in ID order
    fn candidates<F: Fn(&RawNode) -> bool>(&self, filter: F) -> Vec<NodeID> {
        self.graph
            .nodes
            .values()
            .filter(|n| {
                n.used && n.degree() > 1 && !self.clustered.contains(&n.id) && filter(n)
            })
            .map(|n| n.id)
            .collect()
    }

    fn on_oneway(&self, id: NodeID) -> bool {
        self.graph.nodes[&id]
            .ways
            .iter()
            .any(|w| tagged_oneway(&self.graph.ways[w]).is_some())
    }

    /// Following the direction of travel along each oneway way through this node, the next used
    /// node, if it's close enough.
    fn successors(&self, id: NodeID, radius: Distance) -> Vec<NodeID> {
        let node = &self.graph.nodes[&id];
        let mut result = Vec::new();
        for way in node.ways.iter().map(|w| &self.graph.ways[w]) {
            let dir = match tagged_oneway(way) {
                Some(dir) => dir,
                None => continue,
            };
            for (idx, _) in way.nodes.iter().enumerate().filter(|(_, n)| **n == id) {
                let ahead: Vec<NodeID> = if dir == Oneway::Backward {
                    way.nodes[..idx].iter().rev().cloned().collect()
                } else {
                    way.nodes[idx + 1..].to_vec()
                };
                let next = ahead.into_iter().find(|n| {
                    self.graph.nodes.get(n).map(|n| n.used).unwrap_or(false)
                        && !self.clustered.contains(n)
                });
                if let Some(next) = next {
                    if node.pt.dist_to(self.graph.nodes[&next].pt) < radius
                        && !result.contains(&next)
                    {
                        result.push(next);
                    }
                }
            }
        }
        result
    }

    /// Depth-first search for a chain of nearby junctions along oneway ways that returns to the
    /// start. Chains that never close are abandoned.
    fn find_loop(&self, start: NodeID, radius: Distance, max_size: usize) -> Option<Vec<NodeID>> {
        let mut chain = vec![start];
        let mut stack = vec![self.successors(start, radius).into_iter()];
        while let Some(frame) = stack.last_mut() {
            match frame.next() {
                Some(next) => {
                    if next == start {
                        if chain.len() >= 2 {
                            return Some(chain);
                        }
                        continue;
                    }
                    if chain.contains(&next) || chain.len() >= max_size {
                        continue;
                    }
                    chain.push(next);
                    stack.push(self.successors(next, radius).into_iter());
                }
                None => {
                    stack.pop();
                    chain.pop();
                }
            }
        }
        None
    }

    /// The closest unclustered junction sharing a way with this node and also on a oneway
    fn nearest_partner(&self, id: NodeID, radius: Distance) -> Option<NodeID> {
        let node = &self.graph.nodes[&id];
        let mut neighbors = BTreeSet::new();
        for w in &node.ways {
            neighbors.extend(self.graph.ways[w].nodes.iter().cloned());
        }
        neighbors
            .into_iter()
            .filter(|n| *n != id && !self.clustered.contains(n))
            .filter_map(|n| self.graph.nodes.get(&n))
            .filter(|n| n.used && n.degree() > 1 && self.on_oneway(n.id))
            .map(|n| (node.pt.dist_to(n.pt), n.id))
            .filter(|(dist, _)| *dist < radius)
            .min()
            .map(|(_, n)| n)
    }

    fn merge(
        &mut self,
        members: Vec<NodeID>,
        pt: Pt2D,
        policy: ClusterPolicy,
        report: &mut ConversionReport,
    ) {
        let id = NodeID(self.next_id);
        self.next_id += 1;
        let mut rep = RawNode::new(id, pt);
        rep.used = true;
        for m in &members {
            let member = match self.graph.nodes.get_mut(m) {
                Some(n) => n,
                None => continue,
            };
            member.representative = Some(id);
            rep.signalized |= member.signalized;
            rep.ways.extend(member.ways.iter().cloned());
            for r in &member.restrictions {
                if !rep.restrictions.iter().any(|x| x.id == r.id) {
                    rep.restrictions.push(r.clone());
                }
            }
            self.clustered.insert(*m);
        }
        debug!("Merged {:?} into {} ({:?})", members, id, policy);
        self.clustered.insert(id);
        self.graph.nodes.insert(id, rep);
        report.clusters.inc(policy);
    }
}
