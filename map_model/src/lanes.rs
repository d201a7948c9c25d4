use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use abstutil::{deserialize_btreemap, serialize_btreemap};
use geom::Distance;

use crate::LinkID;

/// Lanes are numbered per link, starting with 1 for the rightmost lane. The aggregate lane of a
/// link is ordinal 0.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneID {
    pub link: LinkID,
    pub ordinal: usize,
}

impl LaneID {
    pub fn aggregate(link: LinkID) -> LaneID {
        LaneID { link, ordinal: 0 }
    }
}

impl fmt::Display for LaneID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Lane #{} of {}", self.ordinal, self.link)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LaneAlignment {
    Through,
    Left,
    Right,
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneID,
    pub alignment: LaneAlignment,
    /// How many physical lanes this one stands for, after merging identical neighbors
    pub represented_lanes: usize,
    pub capacity: f64,
    /// Measured back from the end of the link
    pub length: Distance,
    pub to_links: BTreeSet<LinkID>,
}

impl Lane {
    /// An exclusive left-turn lane conflicts with oncoming traffic and needs a protected phase.
    pub fn is_critical(&self) -> bool {
        self.alignment == LaneAlignment::Left
    }
}

/// Spans the whole link and feeds every surviving lane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateLane {
    pub id: LaneID,
    pub represented_lanes: usize,
    pub capacity: f64,
    pub length: Distance,
    pub to_lanes: Vec<LaneID>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneTable {
    pub link: LinkID,
    /// Right to left
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    pub lanes: BTreeMap<LaneID, Lane>,
    pub aggregate: AggregateLane,
}

impl LaneTable {
    pub fn total_represented_lanes(&self) -> usize {
        self.lanes.values().map(|l| l.represented_lanes).sum()
    }

    pub fn has_critical_lanes(&self) -> bool {
        self.lanes.values().any(|l| l.is_critical())
    }
}
