//! The simplified network handed to a microsimulation: nodes, directed links, per-link lane
//! tables with turn permissions, and fixed-cycle signal systems.

mod lanes;
mod network;
mod traffic_signals;
mod validate;

pub use crate::lanes::{AggregateLane, Lane, LaneAlignment, LaneID, LaneTable};
pub use crate::network::{Link, LinkID, Network, Node};
pub use crate::traffic_signals::{
    Signal, SignalGroup, SignalGroupID, SignalGroupSettings, SignalID, SignalPlan, SignalSystem,
};
pub use raw_map::NodeID;
