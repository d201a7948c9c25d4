use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use geom::Duration;
use raw_map::NodeID;

use crate::{LaneID, LinkID};

/// Scoped to one signal system
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalID(pub usize);

/// Scoped to one signal system
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalGroupID(pub usize);

impl fmt::Display for SignalGroupID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SignalGroup #{}", self.0)
    }
}

/// Controls one in-link, or one lane of it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalID,
    pub link: LinkID,
    pub lane: Option<LaneID>,
}

/// Signals that always show the same color
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub id: SignalGroupID,
    pub signals: BTreeSet<SignalID>,
}

/// Green from `onset` to `dropping`, measured from the start of the cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalGroupSettings {
    pub group: SignalGroupID,
    pub onset: Duration,
    pub dropping: Duration,
}

impl SignalGroupSettings {
    pub fn green_time(&self) -> Duration {
        self.dropping - self.onset
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalPlan {
    pub cycle: Duration,
    pub offset: Duration,
    pub settings: BTreeMap<SignalGroupID, SignalGroupSettings>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalSystem {
    pub node: NodeID,
    pub signals: BTreeMap<SignalID, Signal>,
    pub groups: BTreeMap<SignalGroupID, SignalGroup>,
    pub plan: SignalPlan,
}

impl SignalSystem {
    /// Starts with no groups and an empty plan
    pub fn new(node: NodeID, signals: Vec<Signal>) -> SignalSystem {
        SignalSystem {
            node,
            signals: signals.into_iter().map(|s| (s.id, s)).collect(),
            groups: BTreeMap::new(),
            plan: SignalPlan {
                cycle: Duration::ZERO,
                offset: Duration::ZERO,
                settings: BTreeMap::new(),
            },
        }
    }

    pub fn add_group(&mut self, signals: BTreeSet<SignalID>) -> SignalGroupID {
        let id = SignalGroupID(self.groups.len() + 1);
        self.groups.insert(id, SignalGroup { id, signals });
        id
    }

    pub fn set_green(&mut self, group: SignalGroupID, onset: Duration, dropping: Duration) {
        self.plan.settings.insert(
            group,
            SignalGroupSettings {
                group,
                onset,
                dropping,
            },
        );
    }

    /// The signal group containing this signal
    pub fn group_of(&self, signal: SignalID) -> Option<SignalGroupID> {
        self.groups
            .values()
            .find(|g| g.signals.contains(&signal))
            .map(|g| g.id)
    }

    pub fn signals_for_link(&self, link: LinkID) -> BTreeSet<SignalID> {
        self.signals
            .values()
            .filter(|s| s.link == link)
            .map(|s| s.id)
            .collect()
    }

    /// Sums the green time of every distinct window. Groups sharing a window count once.
    pub fn total_green_time(&self) -> Duration {
        let mut windows: Vec<(Duration, Duration)> = self
            .plan
            .settings
            .values()
            .map(|s| (s.onset, s.dropping))
            .collect();
        windows.sort();
        windows.dedup();
        windows.into_iter().map(|(on, off)| off - on).sum()
    }
}
