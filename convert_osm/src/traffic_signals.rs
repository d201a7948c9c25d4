//! Fixed-cycle signal plans, derived from nothing but the geometry of each junction.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use anyhow::{bail, Result};
use itertools::Itertools;
use ordered_float::OrderedFloat;

use abstutil::Timer;
use geom::{Angle, Duration};
use map_model::{LinkID, Network, Signal, SignalID, SignalSystem};
use raw_map::NodeID;

use crate::config::SignalTimings;
use crate::ConversionReport;

/// The signals controlling one incoming link
struct Arm {
    link: LinkID,
    /// The direction vehicles travel along the link
    bearing: Angle,
    lanes: usize,
    /// Everything but exclusive left turn lanes
    regular: BTreeSet<SignalID>,
    /// Exclusive left turn lanes, which need their own phase
    critical: BTreeSet<SignalID>,
}

impl Arm {
    fn all(&self) -> BTreeSet<SignalID> {
        self.regular.union(&self.critical).cloned().collect()
    }
}

/// Some groups of signals, all green for the same stretch of time
struct Phase {
    groups: Vec<BTreeSet<SignalID>>,
    green: Duration,
}

pub fn synthesize(
    net: &mut Network,
    signalized: &BTreeSet<NodeID>,
    timings: &SignalTimings,
    strict: bool,
    report: &mut ConversionReport,
    timer: &mut Timer,
) -> Result<()> {
    timer.start_iter("synthesize signal plans", signalized.len());
    for node in signalized {
        timer.next();
        if !net.nodes.contains_key(node) {
            continue;
        }
        let (signals, arms) = make_signals(net, *node);
        if arms.is_empty() {
            warn!("{} has a signal, but nothing leads there", node);
            continue;
        }

        let mut system = SignalSystem::new(*node, signals);
        match arms.len() {
            1 => default_plan(&mut system, &arms, timings),
            2 => two_arms(&mut system, &arms, timings),
            3 => three_arms(&mut system, &arms, timings),
            4 => four_arms(&mut system, &arms, timings),
            n => {
                if strict {
                    bail!("{} has {} incoming links, but at most 4 are supported", node, n);
                }
                error!(
                    "{} has {} incoming links, but at most 4 are supported. Using a default plan.",
                    node, n
                );
                report.unexpected_junctions.insert(*node);
                default_plan(&mut system, &arms, timings);
            }
        }
        net.signals.insert(*node, system);
    }
    Ok(())
}

/// One signal per lane for links with a lane table, otherwise one for the whole link
fn make_signals(net: &Network, node: NodeID) -> (Vec<Signal>, Vec<Arm>) {
    let mut signals = Vec::new();
    let mut arms = Vec::new();
    for link in net.in_links(node) {
        let mut arm = Arm {
            link: link.id,
            bearing: net.get_n(link.from).pt.angle_to(net.get_n(link.to).pt),
            lanes: link.num_lanes,
            regular: BTreeSet::new(),
            critical: BTreeSet::new(),
        };
        match net.lanes.get(&link.id) {
            Some(table) => {
                for lane in table.lanes.values() {
                    let id = SignalID(signals.len() + 1);
                    signals.push(Signal {
                        id,
                        link: link.id,
                        lane: Some(lane.id),
                    });
                    if lane.is_critical() {
                        arm.critical.insert(id);
                    } else {
                        arm.regular.insert(id);
                    }
                }
            }
            None => {
                let id = SignalID(signals.len() + 1);
                signals.push(Signal {
                    id,
                    link: link.id,
                    lane: None,
                });
                arm.regular.insert(id);
            }
        }
        arms.push(arm);
    }
    (signals, arms)
}

/// How far from directly opposite two arms are, in radians
fn opposition(a: &Arm, b: &Arm) -> f64 {
    (a.bearing.rotation_to(b.bearing).normalized_radians() - PI).abs()
}

/// The pair of arms closest to directly opposite each other. Ties go to the first pair.
fn best_pair(arms: &[Arm]) -> (usize, usize) {
    (0..arms.len())
        .tuple_combinations::<(usize, usize)>()
        .min_by_key(|(a, b)| OrderedFloat(opposition(&arms[*a], &arms[*b])))
        .unwrap_or((0, 1))
}

fn avg_lanes(arms: &[&Arm]) -> f64 {
    (arms.iter().map(|a| a.lanes).sum::<usize>() as f64) / (arms.len() as f64)
}

/// A single long green for everything
fn default_plan(system: &mut SignalSystem, arms: &[Arm], timings: &SignalTimings) {
    let everything = arms.iter().flat_map(|a| a.all()).collect();
    let group = system.add_group(everything);
    system.set_green(group, Duration::ZERO, timings.default_green_end());
    system.plan.cycle = timings.default_cycle();
}

fn two_arms(system: &mut SignalSystem, arms: &[Arm], timings: &SignalTimings) {
    let cycle = timings.cycle();
    let diff = arms[0].bearing.rotation_to(arms[1].bearing).normalized_radians();
    if (0.75 * PI..=1.25 * PI).contains(&diff) {
        // Two halves of one road, probably stopped for a pedestrian crossing
        let everything = arms.iter().flat_map(|a| a.all()).collect();
        let group = system.add_group(everything);
        system.set_green(group, Duration::ZERO, cycle - timings.crossing_clearance());
        system.plan.cycle = cycle;
        return;
    }

    let half = (cycle / 2.0).round_seconds();
    schedule(
        system,
        vec![
            Phase {
                groups: vec![arms[0].all()],
                green: half - timings.intergreen(),
            },
            Phase {
                groups: vec![arms[1].all()],
                green: cycle - half - timings.intergreen(),
            },
        ],
        timings,
    );
}

fn three_arms(system: &mut SignalSystem, arms: &[Arm], timings: &SignalTimings) {
    let (a, b) = best_pair(arms);
    let minor = match (0..3).find(|idx| *idx != a && *idx != b) {
        Some(idx) => &arms[idx],
        None => return default_plan(system, arms, timings),
    };
    let main = [&arms[a], &arms[b]];
    debug!(
        "At {}, {} and {} are the main road",
        system.node, main[0].link, main[1].link
    );

    let protected = main.iter().any(|arm| !arm.critical.is_empty());
    let num_phases = if protected { 3 } else { 2 };
    let available = available_green(timings, num_phases, usize::from(protected));
    let share = avg_lanes(&main) / (avg_lanes(&main) + minor.lanes as f64);
    let main_green = match split_green(available, share, timings) {
        Some(g) => g,
        None => return default_plan(system, arms, timings),
    };

    let mut phases = vec![straight_phase(&main, main_green)];
    if protected {
        phases.push(protected_phase(&main, timings));
    }
    phases.push(Phase {
        groups: vec![minor.all()],
        green: available - main_green,
    });
    schedule(system, phases, timings);
}

fn four_arms(system: &mut SignalSystem, arms: &[Arm], timings: &SignalTimings) {
    let (a, b) = best_pair(arms);
    let rest: Vec<usize> = (0..4).filter(|idx| *idx != a && *idx != b).collect();
    let first = [&arms[a], &arms[b]];
    let second = [&arms[rest[0]], &arms[rest[1]]];

    let first_protected = first.iter().any(|arm| !arm.critical.is_empty());
    let second_protected = second.iter().any(|arm| !arm.critical.is_empty());
    let num_protected = usize::from(first_protected) + usize::from(second_protected);
    let available = available_green(timings, 2 + num_protected, num_protected);
    let share = avg_lanes(&first) / (avg_lanes(&first) + avg_lanes(&second));
    let first_green = match split_green(available, share, timings) {
        Some(g) => g,
        None => return default_plan(system, arms, timings),
    };

    let mut phases = vec![straight_phase(&first, first_green)];
    if first_protected {
        phases.push(protected_phase(&first, timings));
    }
    phases.push(straight_phase(&second, available - first_green));
    if second_protected {
        phases.push(protected_phase(&second, timings));
    }
    schedule(system, phases, timings);
}

/// What's left of the cycle for the regular phases, after intergreens and protected turns
fn available_green(timings: &SignalTimings, num_phases: usize, num_protected: usize) -> Duration {
    timings.cycle()
        - timings.intergreen() * (num_phases as f64)
        - timings.protected_phase() * (num_protected as f64)
}

/// How much of the available green goes to the first of two competing phases, proportional to
/// its share of lanes. None if there isn't enough time to go around.
fn split_green(available: Duration, share: f64, timings: &SignalTimings) -> Option<Duration> {
    let min_phase = timings.min_phase();
    if available < min_phase * 2.0 {
        warn!("Only {} of green to split between two phases", available);
        return None;
    }
    Some(
        (available * share)
            .round_seconds()
            .clamp(timings.min_green(), timings.max_green())
            .clamp(min_phase, available - min_phase),
    )
}

fn straight_phase(pair: &[&Arm; 2], green: Duration) -> Phase {
    Phase {
        groups: pair.iter().map(|arm| arm.regular.clone()).collect(),
        green,
    }
}

fn protected_phase(pair: &[&Arm; 2], timings: &SignalTimings) -> Phase {
    Phase {
        groups: pair.iter().map(|arm| arm.critical.clone()).collect(),
        green: timings.protected_phase(),
    }
}

/// Runs the phases back to back, each followed by an intergreen. The cycle is however long that
/// takes. Empty groups are skipped.
fn schedule(system: &mut SignalSystem, phases: Vec<Phase>, timings: &SignalTimings) {
    let mut time = Duration::ZERO;
    for phase in phases {
        for signals in phase.groups {
            if signals.is_empty() {
                continue;
            }
            let group = system.add_group(signals);
            system.set_green(group, time, time + phase.green);
        }
        time += phase.green + timings.intergreen();
    }
    system.plan.cycle = time;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use geom::{Distance, Pt2D, Speed};
    use map_model::{AggregateLane, Lane, LaneAlignment, LaneID, LaneTable, Link};
    use raw_map::WayID;

    use super::*;

    /// A junction at the origin with one incoming link from each point, numbered from 1
    fn junction(arms: Vec<(f64, f64, usize)>) -> Network {
        let mut net = Network::new();
        net.add_node(NodeID(100), Pt2D::new(0.0, 0.0));
        for (idx, (x, y, lanes)) in arms.into_iter().enumerate() {
            let node = NodeID(idx as i64 + 1);
            net.add_node(node, Pt2D::new(x, y));
            let id = LinkID(idx + 1);
            net.add_link(Link {
                id,
                from: node,
                to: NodeID(100),
                length: Distance::meters(100.0),
                freespeed: Speed::km_per_hour(50.0),
                capacity: 1000.0 * (lanes as f64),
                num_lanes: lanes,
                highway: "primary".to_string(),
                orig_way: WayID(idx as i64 + 1),
            });
        }
        net
    }

    fn run(net: &mut Network, strict: bool) -> Result<ConversionReport> {
        let mut report = ConversionReport::default();
        let signalized = vec![NodeID(100)].into_iter().collect();
        synthesize(
            net,
            &signalized,
            &SignalTimings::default(),
            strict,
            &mut report,
            &mut Timer::throwaway(),
        )?;
        Ok(report)
    }

    fn windows(system: &SignalSystem) -> Vec<(f64, f64)> {
        system
            .plan
            .settings
            .values()
            .map(|s| (s.onset.inner_seconds(), s.dropping.inner_seconds()))
            .collect()
    }

    #[test]
    fn one_arm() {
        let mut net = junction(vec![(-100.0, 0.0, 1)]);
        run(&mut net, true).unwrap();
        let system = &net.signals[&NodeID(100)];
        assert_eq!(system.plan.cycle, Duration::seconds(120.0));
        assert_eq!(windows(system), vec![(0.0, 55.0)]);
    }

    #[test]
    fn crossing() {
        let mut net = junction(vec![(-100.0, 0.0, 1), (100.0, 10.0, 1)]);
        run(&mut net, true).unwrap();
        let system = &net.signals[&NodeID(100)];
        assert_eq!(system.groups.len(), 1);
        assert_eq!(system.plan.cycle, Duration::seconds(90.0));
        assert_eq!(windows(system), vec![(0.0, 75.0)]);
        net.validate(Duration::seconds(5.0)).unwrap();
    }

    #[test]
    fn corner() {
        let mut net = junction(vec![(-100.0, 0.0, 1), (0.0, 100.0, 1)]);
        run(&mut net, true).unwrap();
        let system = &net.signals[&NodeID(100)];
        assert_eq!(system.groups.len(), 2);
        assert_eq!(windows(system), vec![(0.0, 40.0), (45.0, 85.0)]);
        assert_eq!(system.plan.cycle, Duration::seconds(90.0));
        net.validate(Duration::seconds(5.0)).unwrap();
    }

    #[test]
    fn t_junction_with_protected_left() {
        // West and east are the main road, south the minor one
        let mut net = junction(vec![
            (-100.0, 0.0, 2),
            (100.0, 0.0, 2),
            (0.0, -100.0, 1),
        ]);
        let link = LinkID(1);
        let mut lanes = BTreeMap::new();
        for (ordinal, alignment) in [(1, LaneAlignment::None), (2, LaneAlignment::Left)] {
            let id = LaneID { link, ordinal };
            lanes.insert(
                id,
                Lane {
                    id,
                    alignment,
                    represented_lanes: 1,
                    capacity: 1000.0,
                    length: Distance::meters(35.0),
                    to_links: vec![LinkID(99)].into_iter().collect(),
                },
            );
        }
        net.lanes.insert(
            link,
            LaneTable {
                link,
                aggregate: AggregateLane {
                    id: LaneID::aggregate(link),
                    represented_lanes: 2,
                    capacity: 2000.0,
                    length: Distance::meters(100.0),
                    to_lanes: lanes.keys().cloned().collect(),
                },
                lanes,
            },
        );

        run(&mut net, true).unwrap();
        let system = &net.signals[&NodeID(100)];
        assert_eq!(system.signals.len(), 4);
        assert_eq!(system.groups.len(), 4);
        // 65s of green, 2/3 of it to the main road
        assert_eq!(
            windows(system),
            vec![(0.0, 43.0), (0.0, 43.0), (48.0, 58.0), (63.0, 85.0)]
        );
        assert_eq!(system.plan.cycle, Duration::seconds(90.0));
        // The protected phase only has the left turn lane
        let protected = system.group_of(SignalID(2)).unwrap();
        assert_eq!(system.groups[&protected].signals.len(), 1);
        assert_eq!(
            system.plan.settings[&protected].onset,
            Duration::seconds(48.0)
        );
    }

    #[test]
    fn too_many_arms() {
        let arms = vec![
            (-100.0, 0.0, 1),
            (100.0, 0.0, 1),
            (0.0, -100.0, 1),
            (0.0, 100.0, 1),
            (100.0, 100.0, 1),
        ];
        let mut net = junction(arms.clone());
        let report = run(&mut net, false).unwrap();
        assert!(report.unexpected_junctions.contains(&NodeID(100)));
        let system = &net.signals[&NodeID(100)];
        assert_eq!(system.plan.cycle, Duration::seconds(120.0));
        assert_eq!(system.groups.len(), 1);

        let mut net = junction(arms);
        assert!(run(&mut net, true).is_err());
    }

    #[test]
    fn split_clamps() {
        let timings = SignalTimings::default();
        for (available, share, expected) in [
            (80.0, 0.5, 40.0),
            (80.0, 0.9, 60.0),
            (80.0, 0.1, 30.0),
            (40.0, 0.9, 35.0),
        ] {
            assert_eq!(
                split_green(Duration::seconds(available), share, &timings),
                Some(Duration::seconds(expected)),
                "{} {}",
                available,
                share
            );
        }
        assert_eq!(split_green(Duration::seconds(8.0), 0.5, &timings), None);

        let timings = SignalTimings {
            min_phase: 10.0,
            ..SignalTimings::default()
        };
        assert_eq!(
            split_green(Duration::seconds(40.0), 0.9, &timings),
            Some(Duration::seconds(30.0))
        );
        assert_eq!(split_green(Duration::seconds(15.0), 0.5, &timings), None);
    }
}
