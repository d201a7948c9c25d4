use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use ordered_float::OrderedFloat;

use abstutil::Timer;
use map_model::{AggregateLane, Lane, LaneAlignment, LaneID, LaneTable, Link, LinkID, Network};
use raw_map::{RestrictionRelation, RestrictionType};

use crate::config::{LaneAssignmentConfig, MidLaneMode, OutLaneMode};
use crate::topology::Topology;
use crate::turn_lanes::{TurnDirection, TurnFamily, LEFT_CONE, RIGHT_CONE};
use crate::ConversionReport;

/// A link leaving the end of another one
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub link: LinkID,
    /// Counterclockwise from the direction the vehicle came from, in [0, 2pi). Straight ahead is
    /// pi, turning right is less, turning left more, and a U-turn is near 0.
    pub angle: f64,
}

impl Candidate {
    fn is_right(&self) -> bool {
        self.angle < RIGHT_CONE
    }

    fn is_left(&self) -> bool {
        self.angle > LEFT_CONE
    }

    fn deviation_from_straight(&self) -> f64 {
        (self.angle - PI).abs()
    }

    fn is_u_turn(&self) -> bool {
        self.angle < PI / 6.0 || self.angle > 2.0 * PI - PI / 6.0
    }

    fn alignment(&self) -> LaneAlignment {
        if self.is_right() && !self.is_u_turn() {
            LaneAlignment::Right
        } else if self.is_left() || self.is_u_turn() {
            LaneAlignment::Left
        } else {
            LaneAlignment::Through
        }
    }
}

/// Orders the candidates from the sharpest right turn to the sharpest left turn. Ties go to the
/// lower link ID, so the result doesn't depend on the order of the input.
pub fn order_downstream_links(net: &Network, link: &Link, candidates: &[&Link]) -> Vec<Candidate> {
    let incoming = net.get_n(link.from).pt.angle_to(net.get_n(link.to).pt);
    let mut result: Vec<Candidate> = candidates
        .iter()
        .map(|c| {
            let outgoing = net.get_n(c.from).pt.angle_to(net.get_n(c.to).pt);
            Candidate {
                link: c.id,
                angle: incoming.opposite().rotation_to(outgoing).normalized_radians(),
            }
        })
        .collect();
    result.sort_by_key(|c| (OrderedFloat(c.angle), c.link));
    result
}

/// Removes what restrictions from this link forbid. Returns true if any restriction applied.
fn apply_restrictions(
    net: &Network,
    link: &Link,
    candidates: &mut Vec<Candidate>,
    restrictions: &[RestrictionRelation],
    report: &mut ConversionReport,
) -> bool {
    let mut applied = false;
    for r in restrictions.iter().filter(|r| r.from == link.orig_way) {
        let matches = |c: &Candidate| net.get_l(c.link).orig_way == r.to;
        if !candidates.iter().any(matches) {
            warn!(
                "{} from {} doesn't lead to {} from {}",
                r.id, r.from, r.to, link.id
            );
            report.unmatched_restrictions.insert(r.id);
            continue;
        }
        match r.restriction {
            RestrictionType::BanTurns => candidates.retain(|c| !matches(c)),
            RestrictionType::OnlyAllowTurns => candidates.retain(matches),
        }
        applied = true;
    }
    applied
}

/// The candidate pointing back where the vehicle came from, if any
fn find_reverse(candidates: &[Candidate]) -> Option<LinkID> {
    candidates
        .iter()
        .filter(|c| c.is_u_turn())
        .min_by_key(|c| OrderedFloat(PI - c.deviation_from_straight()))
        .map(|c| c.link)
}

/// Where a lane tagged with these directions may go. `candidates` are ordered right to left.
fn select_by_turns(
    turns: &[TurnDirection],
    candidates: &[Candidate],
    reverse: Option<LinkID>,
) -> BTreeSet<LinkID> {
    let choices = without_reverse(candidates, reverse);
    if turns.is_empty() {
        return choices.iter().map(|c| c.link).collect();
    }

    let mut result = BTreeSet::new();
    for turn in turns {
        match turn.family() {
            TurnFamily::Right => {
                let cone: Vec<&Candidate> = choices.iter().filter(|c| c.is_right()).collect();
                if cone.is_empty() {
                    result.insert(choices[0].link);
                    continue;
                }
                match turn {
                    TurnDirection::SlightRight => {
                        result.insert(cone[cone.len() - 1].link);
                    }
                    TurnDirection::SharpRight => {
                        result.insert(cone[0].link);
                    }
                    _ => {
                        result.extend(closest_to(&cone, PI / 2.0, 2));
                    }
                }
            }
            TurnFamily::Left => {
                let cone: Vec<&Candidate> = choices.iter().filter(|c| c.is_left()).collect();
                if cone.is_empty() {
                    result.insert(choices[choices.len() - 1].link);
                    continue;
                }
                match turn {
                    TurnDirection::SlightLeft => {
                        result.insert(cone[0].link);
                    }
                    TurnDirection::SharpLeft => {
                        result.insert(cone[cone.len() - 1].link);
                    }
                    _ => {
                        result.extend(closest_to(&cone, 3.0 * PI / 2.0, 2));
                    }
                }
            }
            TurnFamily::Straight => {
                result.insert(straightest(&choices).link);
            }
            TurnFamily::Reverse => {
                let link = reverse.unwrap_or_else(|| {
                    candidates
                        .iter()
                        .max_by_key(|c| (OrderedFloat(c.deviation_from_straight()), c.link))
                        .map(|c| c.link)
                        .unwrap_or(choices[0].link)
                });
                result.insert(link);
            }
        }
    }
    result
}

/// Where each lane may go when the way doesn't say, rightmost lane first
fn default_turns(
    num_lanes: usize,
    choices: &[Candidate],
    config: &LaneAssignmentConfig,
) -> Vec<BTreeSet<LinkID>> {
    let all: BTreeSet<LinkID> = choices.iter().map(|c| c.link).collect();
    if num_lanes == 1 {
        return vec![all];
    }
    let straight = straightest(choices).link;
    let out_lane = |outermost: LinkID| -> BTreeSet<LinkID> {
        match config.out_lane_mode {
            OutLaneMode::RightOnly => vec![outermost].into_iter().collect(),
            OutLaneMode::RightAndStraight => vec![outermost, straight].into_iter().collect(),
            OutLaneMode::All => all.clone(),
        }
    };

    let mut result = vec![out_lane(choices[0].link)];
    for _ in 1..num_lanes - 1 {
        result.push(match config.mid_lane_mode {
            MidLaneMode::StraightOnly => vec![straight].into_iter().collect(),
            MidLaneMode::StraightAndAdjacent => {
                let idx = choices
                    .iter()
                    .position(|c| c.link == straight)
                    .unwrap_or(0);
                choices[idx.saturating_sub(1)..(idx + 2).min(choices.len())]
                    .iter()
                    .map(|c| c.link)
                    .collect()
            }
        });
    }
    result.push(out_lane(choices[choices.len() - 1].link));
    result
}

fn without_reverse(candidates: &[Candidate], reverse: Option<LinkID>) -> Vec<Candidate> {
    let choices: Vec<Candidate> = candidates
        .iter()
        .filter(|c| Some(c.link) != reverse)
        .cloned()
        .collect();
    if choices.is_empty() {
        candidates.to_vec()
    } else {
        choices
    }
}

/// Panics on an empty list
fn straightest(choices: &[Candidate]) -> &Candidate {
    choices
        .iter()
        .min_by_key(|c| (OrderedFloat(c.deviation_from_straight()), c.link))
        .unwrap()
}

fn closest_to(cone: &[&Candidate], angle: f64, max: usize) -> Vec<LinkID> {
    let mut sorted = cone.to_vec();
    sorted.sort_by_key(|c| (OrderedFloat((c.angle - angle).abs()), c.link));
    sorted.into_iter().take(max).map(|c| c.link).collect()
}

/// Merges neighboring lanes going to the same places. The lane further left survives.
fn consolidate(lanes: Vec<Lane>) -> Vec<Lane> {
    let mut result: Vec<Lane> = Vec::new();
    for mut lane in lanes {
        if result.last().map(|prev| prev.to_links == lane.to_links) == Some(true) {
            if let Some(prev) = result.pop() {
                lane.represented_lanes += prev.represented_lanes;
                lane.capacity += prev.capacity;
            }
        }
        result.push(lane);
    }
    result
}

/// Builds a lane table for every link where it matters which lane a vehicle uses.
pub fn assign_lanes(
    topo: &Topology,
    config: &LaneAssignmentConfig,
    report: &mut ConversionReport,
    timer: &mut Timer,
) -> BTreeMap<LinkID, LaneTable> {
    let net = &topo.network;
    let mut tables = BTreeMap::new();
    timer.start_iter("assign lanes", net.links.len());
    for link in net.links.values() {
        timer.next();
        if let Some(table) = lanes_for_link(topo, link, config, report) {
            tables.insert(link.id, table);
        }
    }
    tables
}

fn lanes_for_link(
    topo: &Topology,
    link: &Link,
    config: &LaneAssignmentConfig,
    report: &mut ConversionReport,
) -> Option<LaneTable> {
    let net = &topo.network;
    let out_links = net.out_links(link.to);
    if out_links.len() <= 1 {
        return None;
    }
    let restrictions = topo
        .restrictions
        .get(&link.to)
        .map(|r| r.as_slice())
        .unwrap_or(&[]);
    if link.num_lanes <= 1 && restrictions.is_empty() {
        return None;
    }

    let mut candidates = order_downstream_links(net, link, &out_links);
    let restricted = apply_restrictions(net, link, &mut candidates, restrictions, report);
    if candidates.is_empty() {
        warn!("Restrictions leave {} with nowhere to go", link.id);
        return None;
    }
    let reverse = find_reverse(&candidates);
    let choices = without_reverse(&candidates, reverse);
    if !restricted && choices.len() <= 1 {
        return None;
    }

    let to_links: Vec<BTreeSet<LinkID>> = match topo.turn_lanes.get(&link.id) {
        Some(turns) => (0..link.num_lanes)
            .map(|idx| {
                select_by_turns(
                    turns.get(idx).map(|t| t.as_slice()).unwrap_or(&[]),
                    &candidates,
                    reverse,
                )
            })
            .collect(),
        None => default_turns(link.num_lanes, &choices, config),
    };

    let lane_capacity = link.capacity / (link.num_lanes as f64);
    let offset = config.lane_offset();
    let length = if link.length < offset * 2.0 {
        link.length / 2.0
    } else {
        offset
    };
    let lanes: Vec<Lane> = to_links
        .into_iter()
        .enumerate()
        .map(|(idx, to_links)| {
            let id = LaneID {
                link: link.id,
                ordinal: idx + 1,
            };
            Lane {
                id,
                alignment: alignment(&to_links, &candidates),
                represented_lanes: 1,
                capacity: lane_capacity,
                length,
                to_links,
            }
        })
        .collect();
    let lanes = consolidate(lanes);

    // A single lane going anywhere but back says nothing
    if lanes.len() == 1 && !restricted {
        let everywhere: BTreeSet<LinkID> = choices.iter().map(|c| c.link).collect();
        if lanes[0].to_links == everywhere {
            return None;
        }
    }

    let aggregate = AggregateLane {
        id: LaneID::aggregate(link.id),
        represented_lanes: link.num_lanes,
        capacity: lanes.iter().map(|l| l.capacity).sum(),
        length: link.length,
        to_lanes: lanes.iter().map(|l| l.id).collect(),
    };
    Some(LaneTable {
        link: link.id,
        lanes: lanes.into_iter().map(|l| (l.id, l)).collect(),
        aggregate,
    })
}

/// A lane turning only one way is aligned that way
fn alignment(to_links: &BTreeSet<LinkID>, candidates: &[Candidate]) -> LaneAlignment {
    let kinds: BTreeSet<LaneAlignment> = candidates
        .iter()
        .filter(|c| to_links.contains(&c.link))
        .map(|c| c.alignment())
        .collect();
    if kinds.len() == 1 {
        kinds.into_iter().next().unwrap_or(LaneAlignment::None)
    } else {
        LaneAlignment::None
    }
}
