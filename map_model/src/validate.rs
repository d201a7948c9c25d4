use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};

use geom::Duration;
use raw_map::NodeID;

use crate::{LaneID, LinkID, Network, SignalID, SignalSystem};

impl Network {
    /// Checks that everything refers to things that exist, lanes add up, and signal plans never
    /// show green to overlapping movements without an intergreen between them. Returns the first
    /// problem found.
    pub fn validate(&self, intergreen: Duration) -> Result<()> {
        for link in self.links.values() {
            if !self.nodes.contains_key(&link.from) || !self.nodes.contains_key(&link.to) {
                bail!(
                    "{} connects {} and {}, but one doesn't exist",
                    link.id,
                    link.from,
                    link.to
                );
            }
            if link.from == link.to {
                bail!("{} is a loop at {}", link.id, link.from);
            }
        }

        let mut incoming: BTreeMap<NodeID, Vec<LinkID>> = BTreeMap::new();
        let mut outgoing: BTreeMap<NodeID, Vec<LinkID>> = BTreeMap::new();
        for link in self.links.values() {
            outgoing.entry(link.from).or_default().push(link.id);
            incoming.entry(link.to).or_default().push(link.id);
        }
        for node in self.nodes.values() {
            if node.incoming != incoming.remove(&node.id).unwrap_or_default()
                || node.outgoing != outgoing.remove(&node.id).unwrap_or_default()
            {
                bail!("{} doesn't list the links touching it", node.id);
            }
        }

        for (id, table) in &self.lanes {
            let link = match self.links.get(id) {
                Some(l) => l,
                None => bail!("Lane table for missing {}", id),
            };
            if table.link != *id {
                bail!("Lane table for {} is filed under {}", table.link, id);
            }
            if table.total_represented_lanes() != link.num_lanes {
                bail!(
                    "{} has {} lanes, but its lane table represents {}",
                    id,
                    link.num_lanes,
                    table.total_represented_lanes()
                );
            }
            let mut total_capacity = 0.0;
            for (lane_id, lane) in &table.lanes {
                if lane_id.link != *id || lane.id != *lane_id || lane_id.ordinal == 0 {
                    bail!("{} is misfiled in the lane table of {}", lane.id, id);
                }
                if lane.to_links.is_empty() {
                    bail!("{} leads nowhere", lane.id);
                }
                for to in &lane.to_links {
                    match self.links.get(to) {
                        Some(next) if next.from == link.to => {}
                        Some(_) => bail!(
                            "{} leads to {}, which doesn't start at {}",
                            lane.id,
                            to,
                            link.to
                        ),
                        None => bail!("{} leads to missing {}", lane.id, to),
                    }
                }
                total_capacity += lane.capacity;
            }
            let surviving: Vec<LaneID> = table.lanes.keys().cloned().collect();
            if table.aggregate.to_lanes != surviving {
                bail!(
                    "Aggregate lane of {} refers to {:?}, but the lanes are {:?}",
                    id,
                    table.aggregate.to_lanes,
                    surviving
                );
            }
            if (table.aggregate.capacity - total_capacity).abs() > 1e-6 {
                bail!(
                    "Aggregate lane of {} has capacity {}, but its lanes sum to {}",
                    id,
                    table.aggregate.capacity,
                    total_capacity
                );
            }
        }

        for (node, system) in &self.signals {
            if system.node != *node || !self.nodes.contains_key(node) {
                bail!("Signal system filed under {} is for {}", node, system.node);
            }
            self.validate_signal_system(system, intergreen)?;
        }

        Ok(())
    }

    fn validate_signal_system(&self, system: &SignalSystem, intergreen: Duration) -> Result<()> {
        for signal in system.signals.values() {
            match self.links.get(&signal.link) {
                Some(link) if link.to == system.node => {}
                _ => bail!(
                    "Signal {:?} at {} controls {}, which doesn't end there",
                    signal.id,
                    system.node,
                    signal.link
                ),
            }
            if let Some(lane) = signal.lane {
                let exists = lane.link == signal.link
                    && self
                        .lanes
                        .get(&signal.link)
                        .map(|t| t.lanes.contains_key(&lane))
                        .unwrap_or(false);
                if !exists {
                    bail!(
                        "Signal {:?} at {} controls missing {}",
                        signal.id,
                        system.node,
                        lane
                    );
                }
            }
        }

        let mut grouped: BTreeSet<SignalID> = BTreeSet::new();
        for group in system.groups.values() {
            for signal in &group.signals {
                if !system.signals.contains_key(signal) {
                    bail!("{} at {} refers to missing {:?}", group.id, system.node, signal);
                }
                if !grouped.insert(*signal) {
                    bail!("{:?} at {} belongs to more than one group", signal, system.node);
                }
            }
        }
        if grouped.len() != system.signals.len() {
            bail!("Some signals at {} don't belong to any group", system.node);
        }

        let plan = &system.plan;
        for settings in plan.settings.values() {
            if !system.groups.contains_key(&settings.group) {
                bail!("Plan at {} refers to missing {}", system.node, settings.group);
            }
            if settings.onset < Duration::ZERO
                || settings.onset >= settings.dropping
                || settings.dropping > plan.cycle
            {
                bail!(
                    "{} at {} is green from {} to {}, outside of the {} cycle",
                    settings.group,
                    system.node,
                    settings.onset,
                    settings.dropping,
                    plan.cycle
                );
            }
        }

        let all_settings: Vec<_> = plan.settings.values().collect();
        for (idx, s1) in all_settings.iter().enumerate() {
            for s2 in &all_settings[idx + 1..] {
                if s1.onset == s2.onset && s1.dropping == s2.dropping {
                    // Running together is fine, as long as they don't share signals, which the
                    // group check already covers.
                    continue;
                }
                if s1.onset < s2.dropping && s2.onset < s1.dropping {
                    bail!(
                        "{} and {} at {} have overlapping but different green windows",
                        s1.group,
                        s2.group,
                        system.node
                    );
                }
                let gap1 = (s2.onset - s1.dropping) % plan.cycle;
                let gap2 = (s1.onset - s2.dropping) % plan.cycle;
                if gap1 < intergreen || gap2 < intergreen {
                    bail!(
                        "{} and {} at {} aren't separated by an intergreen of {}",
                        s1.group,
                        s2.group,
                        system.node,
                        intergreen
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geom::{Distance, Pt2D, Speed};
    use raw_map::{NodeID, WayID};

    use super::*;
    use crate::{Link, LinkID, Signal};

    fn two_links() -> Network {
        let mut net = Network::new();
        for (id, x, y) in [(1, 0.0, 0.0), (2, 100.0, 0.0), (3, 100.0, 100.0)] {
            net.add_node(NodeID(id), Pt2D::new(x, y));
        }
        for (id, from, to) in [(1, 1, 2), (2, 3, 2)] {
            net.add_link(Link {
                id: LinkID(id),
                from: NodeID(from),
                to: NodeID(to),
                length: Distance::meters(100.0),
                freespeed: Speed::km_per_hour(50.0),
                capacity: 600.0,
                num_lanes: 1,
                highway: "residential".to_string(),
                orig_way: WayID(id as i64),
            });
        }
        net
    }

    fn signalize(net: &mut Network, windows: Vec<(f64, f64)>) {
        let mut system = SignalSystem::new(
            NodeID(2),
            vec![
                Signal {
                    id: SignalID(1),
                    link: LinkID(1),
                    lane: None,
                },
                Signal {
                    id: SignalID(2),
                    link: LinkID(2),
                    lane: None,
                },
            ],
        );
        system.plan.cycle = Duration::seconds(90.0);
        for (idx, (onset, dropping)) in windows.into_iter().enumerate() {
            let g = system.add_group(vec![SignalID(idx + 1)].into_iter().collect());
            system.set_green(g, Duration::seconds(onset), Duration::seconds(dropping));
        }
        net.signals.insert(NodeID(2), system);
    }

    #[test]
    fn signal_plans() {
        let intergreen = Duration::seconds(5.0);
        for (description, windows, ok) in vec![
            ("alternating", vec![(0.0, 40.0), (45.0, 85.0)], true),
            ("simultaneous", vec![(0.0, 40.0), (0.0, 40.0)], true),
            ("overlapping", vec![(0.0, 40.0), (30.0, 85.0)], false),
            ("no intergreen", vec![(0.0, 40.0), (42.0, 85.0)], false),
            ("no intergreen at wraparound", vec![(0.0, 40.0), (45.0, 88.0)], false),
            ("past the cycle", vec![(0.0, 40.0), (45.0, 95.0)], false),
        ] {
            let mut net = two_links();
            signalize(&mut net, windows);
            assert_eq!(net.validate(intergreen).is_ok(), ok, "{}", description);
        }
    }

    #[test]
    fn ungrouped_signal() {
        let mut net = two_links();
        signalize(&mut net, vec![(0.0, 40.0)]);
        assert!(net.validate(Duration::seconds(5.0)).is_err());
    }

    #[test]
    fn stale_adjacency() {
        let mut net = two_links();
        net.links.remove(&LinkID(2));
        assert!(net.validate(Duration::seconds(5.0)).is_err());
    }

    #[test]
    fn self_loops() {
        let mut net = two_links();
        assert!(net.validate(Duration::seconds(5.0)).is_ok());
        net.links.get_mut(&LinkID(1)).unwrap().from = NodeID(2);
        assert!(net.validate(Duration::seconds(5.0)).is_err());
    }
}
