//! Small synthetic street graphs for the integration tests
#![allow(dead_code)]

use rand::seq::SliceRandom;
use rand::Rng;

use abstutil::{Tags, Timer};
use convert_osm::{ConversionConfig, ConversionReport};
use geom::Pt2D;
use map_model::{Link, Network};
use raw_map::{NodeID, RawGraph, RelationID, RestrictionRelation, RestrictionType, WayID};

/// Remembers everything in the order it was described, so the same graph can be built with a
/// different insertion order.
#[derive(Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<(i64, Pt2D, bool)>,
    ways: Vec<(i64, Vec<i64>, Vec<(String, String)>)>,
    restrictions: Vec<RestrictionRelation>,
}

impl GraphBuilder {
    pub fn new() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn node(&mut self, id: i64, x: f64, y: f64) -> &mut GraphBuilder {
        self.nodes.push((id, Pt2D::new(x, y), false));
        self
    }

    pub fn signal(&mut self, id: i64, x: f64, y: f64) -> &mut GraphBuilder {
        self.nodes.push((id, Pt2D::new(x, y), true));
        self
    }

    pub fn way(&mut self, id: i64, nodes: &[i64], tags: &[(&str, &str)]) -> &mut GraphBuilder {
        self.ways.push((
            id,
            nodes.to_vec(),
            tags.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    pub fn restriction(
        &mut self,
        id: i64,
        from: i64,
        via: i64,
        to: i64,
        restriction: RestrictionType,
    ) -> &mut GraphBuilder {
        self.restrictions.push(RestrictionRelation {
            id: RelationID(id),
            via: NodeID(via),
            from: WayID(from),
            to: WayID(to),
            restriction,
        });
        self
    }

    pub fn build(&self) -> RawGraph {
        self.build_in_order(
            self.nodes.iter().collect(),
            self.ways.iter().collect(),
            self.restrictions.iter().collect(),
        )
    }

    pub fn build_shuffled<R: Rng>(&self, rng: &mut R) -> RawGraph {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        let mut ways: Vec<_> = self.ways.iter().collect();
        let mut restrictions: Vec<_> = self.restrictions.iter().collect();
        nodes.shuffle(rng);
        ways.shuffle(rng);
        restrictions.shuffle(rng);
        self.build_in_order(nodes, ways, restrictions)
    }

    fn build_in_order(
        &self,
        nodes: Vec<&(i64, Pt2D, bool)>,
        ways: Vec<&(i64, Vec<i64>, Vec<(String, String)>)>,
        restrictions: Vec<&RestrictionRelation>,
    ) -> RawGraph {
        let mut graph = RawGraph::new();
        for (id, pt, signalized) in nodes {
            graph.add_node(NodeID(*id), *pt).signalized = *signalized;
        }
        for (id, nodes, tags) in ways {
            let mut t = Tags::empty();
            for (k, v) in tags {
                t.insert(k.clone(), v.clone());
            }
            graph.add_way(WayID(*id), nodes.iter().cloned().map(NodeID).collect(), t);
        }
        for r in restrictions {
            graph.add_restriction(r.clone());
        }
        graph
    }
}

pub fn convert(graph: RawGraph) -> (Network, ConversionReport) {
    convert_with(graph, &ConversionConfig::default())
}

pub fn convert_with(graph: RawGraph, config: &ConversionConfig) -> (Network, ConversionReport) {
    convert_osm::convert(graph, config, &mut Timer::throwaway()).unwrap()
}

/// The only link between two nodes in this direction
pub fn link(net: &Network, from: i64, to: i64) -> &Link {
    let matches: Vec<&Link> = net
        .links
        .values()
        .filter(|l| l.from == NodeID(from) && l.to == NodeID(to))
        .collect();
    assert_eq!(matches.len(), 1, "links from {} to {}", from, to);
    matches[0]
}

/// Node 1 at the origin, with arms 2, 3, 4, 5 reaching out 200m to the west, south, east, and
/// north. No ways yet.
pub fn crossroads(signalized: bool) -> GraphBuilder {
    let mut b = GraphBuilder::new();
    if signalized {
        b.signal(1, 0.0, 0.0);
    } else {
        b.node(1, 0.0, 0.0);
    }
    b.node(2, -200.0, 0.0)
        .node(3, 0.0, -200.0)
        .node(4, 200.0, 0.0)
        .node(5, 0.0, 200.0);
    b
}
