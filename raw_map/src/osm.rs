//! Common OSM keys. Keys used in just one or two places don't really need to be defined here.

pub const HIGHWAY: &str = "highway";
pub const MAXSPEED: &str = "maxspeed";
pub const LANES: &str = "lanes";
pub const LANES_FORWARD: &str = "lanes:forward";
pub const LANES_BACKWARD: &str = "lanes:backward";
pub const ONEWAY: &str = "oneway";
pub const JUNCTION: &str = "junction";
pub const ACCESS: &str = "access";
pub const TURN_LANES: &str = "turn:lanes";
pub const TURN_LANES_FORWARD: &str = "turn:lanes:forward";
pub const TURN_LANES_BACKWARD: &str = "turn:lanes:backward";
pub const RESTRICTION: &str = "restriction";
