use std::f64::consts::PI;

use crate::ConversionReport;

/// One token of a `turn:lanes` value
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TurnDirection {
    Through,
    Left,
    SlightLeft,
    SharpLeft,
    MergeToRight,
    Reverse,
    Right,
    SlightRight,
    SharpRight,
    MergeToLeft,
}

/// Turns to the right are negative, to the left positive.
const TOKENS: [(&str, TurnDirection, i8); 10] = [
    ("through", TurnDirection::Through, 0),
    ("left", TurnDirection::Left, 1),
    ("slight_left", TurnDirection::SlightLeft, 2),
    ("sharp_left", TurnDirection::SharpLeft, 3),
    ("merge_to_right", TurnDirection::MergeToRight, 4),
    ("reverse", TurnDirection::Reverse, 5),
    ("right", TurnDirection::Right, -1),
    ("slight_right", TurnDirection::SlightRight, -2),
    ("sharp_right", TurnDirection::SharpRight, -3),
    ("merge_to_left", TurnDirection::MergeToLeft, -5),
];

/// Everything with a smaller angle is a right turn
pub const RIGHT_CONE: f64 = 11.0 * PI / 12.0;
/// Everything with a larger angle is a left turn
pub const LEFT_CONE: f64 = 13.0 * PI / 12.0;

/// Which broad kind of movement a token asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnFamily {
    Right,
    Left,
    /// Through and merges: whatever is closest to straight ahead
    Straight,
    Reverse,
}

impl TurnDirection {
    pub fn parse(token: &str) -> Option<TurnDirection> {
        TOKENS
            .iter()
            .find(|(name, _, _)| *name == token)
            .map(|(_, dir, _)| *dir)
    }

    pub fn code(self) -> i8 {
        TOKENS
            .iter()
            .find(|(_, dir, _)| *dir == self)
            .map(|(_, _, code)| *code)
            .unwrap_or(0)
    }

    pub fn family(self) -> TurnFamily {
        match self.code() {
            -3..=-1 => TurnFamily::Right,
            1..=3 => TurnFamily::Left,
            5 => TurnFamily::Reverse,
            _ => TurnFamily::Straight,
        }
    }
}

/// The directions a single lane may take. Empty means the lane doesn't say.
pub type LaneTurns = Vec<TurnDirection>;

/// Parses something like "left|through;right|" into one entry per lane, rightmost lane first.
/// There are always exactly `num_lanes` entries: a tag describing too few lanes is padded on the
/// right with lanes that don't say, and extra lanes on the left are ignored.
pub fn parse_turn_lanes(
    value: &str,
    num_lanes: usize,
    report: &mut ConversionReport,
) -> Vec<LaneTurns> {
    let mut lanes: Vec<LaneTurns> = value
        .split('|')
        .map(|lane| {
            let mut turns = Vec::new();
            for token in lane.split(';').map(|t| t.trim()) {
                if token.is_empty() || token == "none" {
                    continue;
                }
                match TurnDirection::parse(token) {
                    Some(dir) => {
                        if !turns.contains(&dir) {
                            turns.push(dir);
                        }
                    }
                    None => {
                        ConversionReport::unknown(&mut report.unknown_turn_lanes, "turn:lanes", token);
                    }
                }
            }
            turns
        })
        .collect();
    lanes.reverse();
    while lanes.len() < num_lanes {
        lanes.insert(0, Vec::new());
    }
    lanes.truncate(num_lanes);
    lanes
}
