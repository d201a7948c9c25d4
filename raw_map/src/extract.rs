use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use abstutil::{Tags, Timer};
use geom::Pt2D;

use crate::{osm, NodeID, RawGraph, RelationID, RestrictionRelation, RestrictionType, WayID};

/// A tagged street extract with projected coordinates, as produced by an external OSM filter.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractDoc {
    #[serde(default)]
    pub nodes: Vec<ExtractNode>,
    #[serde(default)]
    pub ways: Vec<ExtractWay>,
    #[serde(default)]
    pub relations: Vec<ExtractRelation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractNode {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractWay {
    pub id: i64,
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractRelation {
    pub id: i64,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub members: Vec<ExtractMember>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractMember {
    #[serde(rename = "type")]
    pub member_type: MemberType,
    #[serde(rename = "ref")]
    pub id: i64,
    #[serde(default)]
    pub role: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

pub fn load_extract(path: &str, timer: &mut Timer) -> Result<RawGraph> {
    timer.start(format!("read {}", path).as_str());
    let doc: ExtractDoc = abstutil::read_json(path)?;
    timer.stop(format!("read {}", path).as_str());
    Ok(build_graph(doc, timer))
}

pub fn parse_extract(json: &str, timer: &mut Timer) -> Result<RawGraph> {
    let doc: ExtractDoc = serde_json::from_str(json).context("parsing street extract")?;
    Ok(build_graph(doc, timer))
}

fn build_graph(doc: ExtractDoc, timer: &mut Timer) -> RawGraph {
    info!(
        "Extract has {} nodes, {} ways, {} relations",
        doc.nodes.len(),
        doc.ways.len(),
        doc.relations.len()
    );
    let mut graph = RawGraph::new();

    timer.start_iter("processing nodes", doc.nodes.len());
    for node in doc.nodes {
        timer.next();
        let n = graph.add_node(NodeID(node.id), Pt2D::new(node.x, node.y));
        if node.tags.is(osm::HIGHWAY, "traffic_signals") {
            n.signalized = true;
        }
        if node.tags.is(osm::HIGHWAY, "crossing") {
            n.crossing = true;
        }
    }

    timer.start_iter("processing ways", doc.ways.len());
    for way in doc.ways {
        timer.next();
        graph.add_way(
            WayID(way.id),
            way.nodes.into_iter().map(NodeID).collect(),
            way.tags,
        );
    }

    timer.start_iter("processing relations", doc.relations.len());
    for rel in doc.relations {
        timer.next();
        handle_relation(&mut graph, rel);
    }

    graph
}

fn handle_relation(graph: &mut RawGraph, rel: ExtractRelation) {
    let id = RelationID(rel.id);
    if !rel.tags.is("type", "restriction") && !rel.tags.contains_key(osm::RESTRICTION) {
        return;
    }

    let mut from_way_id: Option<WayID> = None;
    let mut via_node_id: Option<NodeID> = None;
    let mut to_way_id: Option<WayID> = None;
    for member in &rel.members {
        match (member.member_type, member.role.as_str()) {
            (MemberType::Way, "from") => {
                from_way_id = Some(WayID(member.id));
            }
            (MemberType::Way, "to") => {
                to_way_id = Some(WayID(member.id));
            }
            (MemberType::Node, "via") => {
                via_node_id = Some(NodeID(member.id));
            }
            (member_type, role) => {
                debug!("{} has unhandled {:?} member as {}", id, member_type, role);
            }
        }
    }

    let restriction = rel
        .tags
        .get(osm::RESTRICTION)
        .and_then(|r| RestrictionType::new(r));
    match (restriction, from_way_id, via_node_id, to_way_id) {
        (Some(restriction), Some(from), Some(via), Some(to)) => {
            graph.add_restriction(RestrictionRelation {
                id,
                via,
                from,
                to,
                restriction,
            });
        }
        _ => {
            warn!(
                "{} is incomplete (restriction {:?}, from {:?}, via {:?}, to {:?}), dropping it",
                id,
                rel.tags.get(osm::RESTRICTION),
                from_way_id,
                via_node_id,
                to_way_id
            );
            graph.incomplete_restrictions.insert(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_small_extract() {
        let json = r#"{
            "nodes": [
                {"id": 1, "x": 0.0, "y": 0.0},
                {"id": 2, "x": 100.0, "y": 0.0, "tags": {"highway": "traffic_signals"}},
                {"id": 3, "x": 200.0, "y": 0.0, "tags": {"highway": "crossing"}},
                {"id": 4, "x": 100.0, "y": 100.0}
            ],
            "ways": [
                {"id": 10, "nodes": [1, 2, 3], "tags": {"highway": "primary"}},
                {"id": 11, "nodes": [2, 4], "tags": {"highway": "residential"}}
            ],
            "relations": [
                {"id": 20, "tags": {"type": "restriction", "restriction": "no_left_turn"},
                 "members": [
                    {"type": "way", "ref": 10, "role": "from"},
                    {"type": "node", "ref": 2, "role": "via"},
                    {"type": "way", "ref": 11, "role": "to"}
                 ]},
                {"id": 21, "tags": {"type": "restriction", "restriction": "only_straight_on"},
                 "members": [
                    {"type": "way", "ref": 10, "role": "from"},
                    {"type": "way", "ref": 11, "role": "to"}
                 ]},
                {"id": 22, "tags": {"type": "multipolygon"}, "members": []}
            ]
        }"#;
        let graph = parse_extract(json, &mut Timer::throwaway()).unwrap();
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.ways.len(), 2);
        assert!(graph.nodes[&NodeID(2)].signalized);
        assert!(graph.nodes[&NodeID(3)].crossing);
        assert!(!graph.nodes[&NodeID(1)].signalized);
        assert_eq!(graph.ways[&WayID(10)].nodes, vec![NodeID(1), NodeID(2), NodeID(3)]);

        let restrictions = &graph.nodes[&NodeID(2)].restrictions;
        assert_eq!(restrictions.len(), 1);
        assert_eq!(restrictions[0].restriction, RestrictionType::BanTurns);
        assert_eq!(restrictions[0].from, WayID(10));
        assert_eq!(restrictions[0].to, WayID(11));

        assert_eq!(
            graph.incomplete_restrictions.iter().cloned().collect::<Vec<_>>(),
            vec![RelationID(21)]
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_extract("{\"nodes\": [", &mut Timer::throwaway()).is_err());
    }
}
