use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use geom::{Distance, Pt2D, Speed};
use raw_map::{NodeID, WayID};

use crate::{LaneTable, SignalSystem};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkID(pub usize);

impl fmt::Display for LinkID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Link #{}", self.0)
    }
}

/// A used raw node, or the representative of a merged cluster of them
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeID,
    pub pt: Pt2D,
    /// Links ending here, sorted by ID. Maintained by `Network::add_link`.
    pub incoming: Vec<LinkID>,
    /// Links starting here, sorted by ID
    pub outgoing: Vec<LinkID>,
}

/// One direction of travel along a simplified way segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkID,
    pub from: NodeID,
    pub to: NodeID,
    pub length: Distance,
    pub freespeed: Speed,
    /// Vehicles per hour, summed over all lanes
    pub capacity: f64,
    pub num_lanes: usize,
    pub highway: String,
    /// Restrictions are matched against this
    pub orig_way: WayID,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub nodes: BTreeMap<NodeID, Node>,
    pub links: BTreeMap<LinkID, Link>,
    /// Only links with interesting turn permissions have a lane table
    pub lanes: BTreeMap<LinkID, LaneTable>,
    pub signals: BTreeMap<NodeID, SignalSystem>,
}

impl Network {
    pub fn new() -> Network {
        Network::default()
    }

    pub fn get_n(&self, id: NodeID) -> &Node {
        &self.nodes[&id]
    }

    pub fn get_l(&self, id: LinkID) -> &Link {
        &self.links[&id]
    }

    pub fn add_node(&mut self, id: NodeID, pt: Pt2D) {
        self.nodes.insert(
            id,
            Node {
                id,
                pt,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            },
        );
    }

    /// Both endpoints should already exist; otherwise the link is kept, but `validate` will
    /// complain.
    pub fn add_link(&mut self, link: Link) {
        if let Some(node) = self.nodes.get_mut(&link.from) {
            insert_sorted(&mut node.outgoing, link.id);
        }
        if let Some(node) = self.nodes.get_mut(&link.to) {
            insert_sorted(&mut node.incoming, link.id);
        }
        self.links.insert(link.id, link);
    }

    /// Links ending at the node, ordered by ID
    pub fn in_links(&self, node: NodeID) -> Vec<&Link> {
        self.nodes
            .get(&node)
            .map(|n| n.incoming.iter().map(|l| &self.links[l]).collect())
            .unwrap_or_default()
    }

    /// Links starting at the node, ordered by ID
    pub fn out_links(&self, node: NodeID) -> Vec<&Link> {
        self.nodes
            .get(&node)
            .map(|n| n.outgoing.iter().map(|l| &self.links[l]).collect())
            .unwrap_or_default()
    }

    pub fn describe(&self) -> String {
        format!(
            "{} nodes, {} links, {} lane tables, {} signal systems",
            abstutil::prettyprint_usize(self.nodes.len()),
            abstutil::prettyprint_usize(self.links.len()),
            abstutil::prettyprint_usize(self.lanes.len()),
            abstutil::prettyprint_usize(self.signals.len())
        )
    }
}

fn insert_sorted(list: &mut Vec<LinkID>, id: LinkID) {
    if let Err(idx) = list.binary_search(&id) {
        list.insert(idx, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: usize, from: i64, to: i64) -> Link {
        Link {
            id: LinkID(id),
            from: NodeID(from),
            to: NodeID(to),
            length: Distance::meters(100.0),
            freespeed: Speed::km_per_hour(50.0),
            capacity: 600.0,
            num_lanes: 1,
            highway: "residential".to_string(),
            orig_way: WayID(id as i64),
        }
    }

    fn ids(links: Vec<&Link>) -> Vec<usize> {
        links.into_iter().map(|l| l.id.0).collect()
    }

    #[test]
    fn adjacency_follows_added_links() {
        let mut net = Network::new();
        net.add_node(NodeID(1), Pt2D::new(0.0, 0.0));
        net.add_node(NodeID(2), Pt2D::new(100.0, 0.0));
        net.add_node(NodeID(3), Pt2D::new(100.0, 100.0));
        // Out of order, and one added twice
        for l in [link(7, 1, 2), link(3, 3, 2), link(5, 2, 1), link(3, 3, 2)] {
            net.add_link(l);
        }

        assert_eq!(ids(net.in_links(NodeID(2))), vec![3, 7]);
        assert_eq!(ids(net.out_links(NodeID(2))), vec![5]);
        assert_eq!(ids(net.out_links(NodeID(3))), vec![3]);
        assert!(net.in_links(NodeID(3)).is_empty());
        assert!(net.out_links(NodeID(42)).is_empty());
    }
}
