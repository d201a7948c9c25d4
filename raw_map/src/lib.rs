//! The raw street graph, before any simplification: nodes with coordinates, ways as ordered node
//! lists with their tags, and turn restrictions attached to their via node.

#[macro_use]
extern crate log;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use abstutil::Tags;
use geom::Pt2D;

pub use self::extract::{load_extract, parse_extract, ExtractDoc};

mod extract;
pub mod osm;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeID(pub i64);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WayID(pub i64);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationID(pub i64);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

impl fmt::Display for WayID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "way #{}", self.0)
    }
}

impl fmt::Display for RelationID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "relation #{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RestrictionType {
    BanTurns,
    OnlyAllowTurns,
}

impl RestrictionType {
    /// Only the simple prefix forms are understood; time conditions, vehicle exceptions and the
    /// like are ignored.
    pub fn new(restriction: &str) -> Option<RestrictionType> {
        if restriction.starts_with("no_") {
            Some(RestrictionType::BanTurns)
        } else if restriction.starts_with("only_") {
            Some(RestrictionType::OnlyAllowTurns)
        } else {
            None
        }
    }
}

/// A simple turn restriction: from one way, through a node, onto another way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestrictionRelation {
    pub id: RelationID,
    pub via: NodeID,
    pub from: WayID,
    pub to: WayID,
    pub restriction: RestrictionType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: NodeID,
    pub pt: Pt2D,
    pub signalized: bool,
    pub crossing: bool,
    /// Only the retained ways passing through this node. Filled out during usage marking.
    pub ways: BTreeSet<WayID>,
    /// The first or last node of some retained way
    pub endpoint: bool,
    pub used: bool,
    /// Set once this node has been merged into a cluster. Points at the cluster's node, which
    /// never has a representative itself.
    pub representative: Option<NodeID>,
    pub restrictions: Vec<RestrictionRelation>,
}

impl RawNode {
    pub fn new(id: NodeID, pt: Pt2D) -> RawNode {
        RawNode {
            id,
            pt,
            signalized: false,
            crossing: false,
            ways: BTreeSet::new(),
            endpoint: false,
            used: false,
            representative: None,
            restrictions: Vec::new(),
        }
    }

    /// The number of retained ways touching this node
    pub fn degree(&self) -> usize {
        self.ways.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawWay {
    pub id: WayID,
    pub nodes: Vec<NodeID>,
    pub tags: Tags,
    /// Set once the highway class is recognized
    pub hierarchy: Option<usize>,
}

impl RawWay {
    pub fn first_node(&self) -> Option<NodeID> {
        self.nodes.first().cloned()
    }

    pub fn last_node(&self) -> Option<NodeID> {
        self.nodes.last().cloned()
    }

    pub fn is_roundabout(&self) -> bool {
        self.tags.is(osm::JUNCTION, "roundabout")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGraph {
    pub nodes: BTreeMap<NodeID, RawNode>,
    pub ways: BTreeMap<WayID, RawWay>,
    /// Restriction relations dropped because they were missing a member or polarity, or referred
    /// to something unknown.
    pub incomplete_restrictions: BTreeSet<RelationID>,
}

impl RawGraph {
    pub fn new() -> RawGraph {
        RawGraph::default()
    }

    pub fn add_node(&mut self, id: NodeID, pt: Pt2D) -> &mut RawNode {
        self.nodes.entry(id).or_insert_with(|| RawNode::new(id, pt))
    }

    pub fn add_way(&mut self, id: WayID, nodes: Vec<NodeID>, tags: Tags) {
        if self.ways.contains_key(&id) {
            warn!("{} added twice, keeping the latest", id);
        }
        self.ways.insert(
            id,
            RawWay {
                id,
                nodes,
                tags,
                hierarchy: None,
            },
        );
    }

    /// Attaches the restriction to its via node. Returns false (and remembers the relation as
    /// incomplete) if the via node or either way is unknown.
    pub fn add_restriction(&mut self, r: RestrictionRelation) -> bool {
        if !self.ways.contains_key(&r.from) || !self.ways.contains_key(&r.to) {
            warn!(
                "{} refers to unknown ways ({} -> {}), dropping it",
                r.id, r.from, r.to
            );
            self.incomplete_restrictions.insert(r.id);
            return false;
        }
        match self.nodes.get_mut(&r.via) {
            Some(node) => {
                node.restrictions.push(r);
                true
            }
            None => {
                warn!("{} is via unknown {}, dropping it", r.id, r.via);
                self.incomplete_restrictions.insert(r.id);
                false
            }
        }
    }

    pub fn max_node_id(&self) -> i64 {
        self.nodes.keys().next_back().map(|id| id.0).unwrap_or(0)
    }

    /// Ways referring to at least one node that doesn't exist
    pub fn ways_missing_nodes(&self) -> Vec<WayID> {
        self.ways
            .values()
            .filter(|w| w.nodes.iter().any(|n| !self.nodes.contains_key(n)))
            .map(|w| w.id)
            .collect()
    }
}
