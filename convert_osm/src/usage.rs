use abstutil::Timer;
use raw_map::{osm, NodeID, RawGraph, RawWay};

use crate::{ConversionConfig, ConversionReport};

/// Drops ways that can't be used, then decides which nodes survive into the simplified network.
/// Afterwards, every remaining way has a hierarchy and every node knows its incident ways.
pub fn mark_used(
    graph: &mut RawGraph,
    config: &ConversionConfig,
    report: &mut ConversionReport,
    timer: &mut Timer,
) {
    for id in graph.ways_missing_nodes() {
        debug!("{} refers to missing nodes, dropping it", id);
        graph.ways.remove(&id);
        report.ways_missing_nodes.insert(id);
    }

    let mut drop = Vec::new();
    for way in graph.ways.values_mut() {
        let highway = match way.tags.get(osm::HIGHWAY) {
            Some(x) => x,
            None => {
                drop.push(way.id);
                continue;
            }
        };
        match config.highway_defaults.get(highway) {
            Some(defaults) => {
                way.hierarchy = Some(defaults.hierarchy);
            }
            None => {
                ConversionReport::unknown(&mut report.unknown_highways, osm::HIGHWAY, highway);
                drop.push(way.id);
            }
        }
        if way.nodes.len() < 2 {
            debug!("{} has fewer than 2 nodes, dropping it", way.id);
            drop.push(way.id);
        }
    }
    for id in drop {
        graph.ways.remove(&id);
    }

    for node in graph.nodes.values_mut() {
        node.ways.clear();
        node.used = false;
        node.endpoint = false;
    }

    timer.start_iter("mark used nodes", graph.ways.len());
    for way in graph.ways.values() {
        timer.next();
        let hierarchy = match way.hierarchy {
            Some(h) => h,
            None => continue,
        };
        for (idx, id) in way.nodes.iter().enumerate() {
            let node = match graph.nodes.get_mut(id) {
                Some(n) => n,
                None => continue,
            };
            if idx == 0 || idx == way.nodes.len() - 1 {
                node.endpoint = true;
            }
            if config.hierarchy_layers.is_empty()
                || config
                    .hierarchy_layers
                    .iter()
                    .any(|layer| layer.includes(node.pt, hierarchy))
            {
                node.used = true;
                node.ways.insert(way.id);
            }
        }
    }
}

/// Interior nodes along a single way aren't needed, unless they carry a signal. Ways looping back
/// onto themselves keep a few interior nodes, so they don't collapse into a self-loop.
pub fn collapse_paths(graph: &mut RawGraph) {
    let mut collapsed = 0;
    for node in graph.nodes.values_mut() {
        if node.used && node.ways.len() == 1 && !node.signalized && !node.endpoint {
            node.used = false;
            collapsed += 1;
        }
    }

    let repairs: Vec<NodeID> = graph
        .ways
        .values()
        .flat_map(|way| {
            loop_repairs(graph, way)
                .into_iter()
                .map(move |idx| way.nodes[idx])
        })
        .collect();
    let mut restored = 0;
    for id in repairs {
        if let Some(node) = graph.nodes.get_mut(&id) {
            if !node.used {
                node.used = true;
                restored += 1;
            }
        }
    }
    info!(
        "Collapsed {} interior nodes, kept {} to preserve loops",
        abstutil::prettyprint_usize(collapsed),
        abstutil::prettyprint_usize(restored)
    );
}

/// When two consecutive used nodes along a way are the same node, the way loops. Returns indices
/// of roughly sqrt(gap) evenly spaced nodes in between to keep.
fn loop_repairs(graph: &RawGraph, way: &RawWay) -> Vec<usize> {
    let mut result = Vec::new();
    let mut prev_idx = 0;
    let mut prev_node = way.nodes[0];
    for (idx, id) in way.nodes.iter().enumerate().skip(1) {
        if !graph.nodes.get(id).map(|n| n.used).unwrap_or(false) {
            continue;
        }
        if *id == prev_node {
            let increment = ((idx - prev_idx) as f64).sqrt();
            let mut j = prev_idx as f64 + increment;
            while j < idx as f64 {
                let keep = j.floor() as usize;
                if keep > prev_idx && !result.contains(&keep) {
                    result.push(keep);
                }
                j += increment;
            }
        }
        prev_idx = idx;
        prev_node = *id;
    }
    result
}

/// How many ways leave this node. An interior node of a way counts twice, an endpoint once.
pub fn num_arms(graph: &RawGraph, node: NodeID) -> usize {
    let mut arms = 0;
    if let Some(n) = graph.nodes.get(&node) {
        for id in &n.ways {
            if let Some(way) = graph.ways.get(id) {
                let last = way.nodes.len() - 1;
                for (idx, _) in way.nodes.iter().enumerate().filter(|(_, x)| **x == node) {
                    arms += if idx == 0 || idx == last { 1 } else { 2 };
                }
            }
        }
    }
    arms
}

/// Where at least three arms meet
pub fn is_junction(graph: &RawGraph, node: NodeID) -> bool {
    num_arms(graph, node) > 2
}

#[cfg(test)]
mod tests {
    use abstutil::Tags;
    use geom::Pt2D;
    use raw_map::WayID;

    use super::*;
    use crate::config::HierarchyLayer;

    fn tags(highway: &str) -> Tags {
        let mut tags = Tags::empty();
        tags.insert(osm::HIGHWAY, highway);
        tags
    }

    fn line(graph: &mut RawGraph, way: i64, nodes: Vec<i64>, highway: &str) {
        for id in &nodes {
            graph.add_node(NodeID(*id), Pt2D::new(*id as f64 * 10.0, 0.0));
        }
        graph.add_way(WayID(way), nodes.into_iter().map(NodeID).collect(), tags(highway));
    }

    #[test]
    fn unknown_highways_dropped() {
        let mut graph = RawGraph::new();
        line(&mut graph, 1, vec![1, 2, 3], "residential");
        line(&mut graph, 2, vec![3, 4], "footway");
        line(&mut graph, 3, vec![4, 5], "footway");
        let mut report = ConversionReport::default();
        mark_used(
            &mut graph,
            &ConversionConfig::default(),
            &mut report,
            &mut Timer::throwaway(),
        );

        assert_eq!(graph.ways.len(), 1);
        assert_eq!(report.unknown_highways.len(), 1);
        assert!(report.unknown_highways.contains("footway"));
        assert_eq!(graph.nodes[&NodeID(3)].degree(), 1);
        assert!(graph.nodes[&NodeID(3)].endpoint);
        assert!(!graph.nodes[&NodeID(2)].endpoint);
        assert!(!graph.nodes[&NodeID(4)].used);
    }

    #[test]
    fn layers_limit_used_nodes() {
        let mut graph = RawGraph::new();
        line(&mut graph, 1, vec![1, 2, 3, 4, 5], "residential");
        line(&mut graph, 2, vec![6, 7], "primary");
        let mut config = ConversionConfig::default();
        config.hierarchy_layers.push(HierarchyLayer {
            bounds: geom::Bounds::from(&[Pt2D::new(0.0, -1.0), Pt2D::new(25.0, 1.0)]),
            max_hierarchy: 6,
        });
        config.hierarchy_layers.push(HierarchyLayer {
            bounds: geom::Bounds::from(&[Pt2D::new(0.0, -1.0), Pt2D::new(100.0, 1.0)]),
            max_hierarchy: 3,
        });
        mark_used(
            &mut graph,
            &config,
            &mut ConversionReport::default(),
            &mut Timer::throwaway(),
        );
        let used: Vec<i64> = graph
            .nodes
            .values()
            .filter(|n| n.used)
            .map(|n| n.id.0)
            .collect();
        assert_eq!(used, vec![1, 2, 6, 7]);
    }

    #[test]
    fn collapsing() {
        let mut graph = RawGraph::new();
        line(&mut graph, 1, vec![1, 2, 3, 4, 5], "residential");
        line(&mut graph, 2, vec![3, 6], "residential");
        graph.nodes.get_mut(&NodeID(4)).unwrap().signalized = true;
        mark_used(
            &mut graph,
            &ConversionConfig::default(),
            &mut ConversionReport::default(),
            &mut Timer::throwaway(),
        );
        collapse_paths(&mut graph);
        for (id, used) in [(1, true), (2, false), (3, true), (4, true), (5, true), (6, true)] {
            assert_eq!(graph.nodes[&NodeID(id)].used, used, "node {}", id);
        }
    }

    #[test]
    fn loops_keep_some_nodes() {
        // A closed way: 1 -> 2 -> ... -> 9 -> 1
        let mut graph = RawGraph::new();
        for id in 1..=9 {
            let theta = (id as f64) * std::f64::consts::PI * 2.0 / 9.0;
            graph.add_node(
                NodeID(id),
                Pt2D::new(100.0 * theta.cos(), 100.0 * theta.sin()),
            );
        }
        let mut nodes: Vec<NodeID> = (1..=9).map(NodeID).collect();
        nodes.push(NodeID(1));
        graph.add_way(WayID(1), nodes, tags("residential"));
        mark_used(
            &mut graph,
            &ConversionConfig::default(),
            &mut ConversionReport::default(),
            &mut Timer::throwaway(),
        );
        collapse_paths(&mut graph);

        // The gap is 9 indices, so every 3rd node comes back
        let used: Vec<i64> = graph
            .nodes
            .values()
            .filter(|n| n.used)
            .map(|n| n.id.0)
            .collect();
        assert_eq!(used, vec![1, 4, 7]);
    }

    #[test]
    fn arms() {
        let mut graph = RawGraph::new();
        line(&mut graph, 1, vec![1, 2, 3], "residential");
        line(&mut graph, 2, vec![2, 4], "residential");
        line(&mut graph, 3, vec![3, 5], "residential");
        mark_used(
            &mut graph,
            &ConversionConfig::default(),
            &mut ConversionReport::default(),
            &mut Timer::throwaway(),
        );
        assert_eq!(num_arms(&graph, NodeID(2)), 3);
        assert!(is_junction(&graph, NodeID(2)));
        // Two ways meeting end to end are just a continuation
        assert_eq!(num_arms(&graph, NodeID(3)), 2);
        assert!(!is_junction(&graph, NodeID(3)));
        assert_eq!(num_arms(&graph, NodeID(1)), 1);
    }
}
