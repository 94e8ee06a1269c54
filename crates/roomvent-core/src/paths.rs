//! Transport-path enumeration (C3): every simple route between two
//! distinct cardinal sides through the aperture graph.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::building::{BuildingGraph, Endpoint, Side};

/// One step of a [`TransportPath`]: the aperture traversed, and whether it
/// was traversed against its stored `origin -> destination` direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub aperture: usize,
    pub reversed: bool,
}

/// A simple route from one cardinal side to a distinct cardinal side,
/// visiting each room at most once and no other outside side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPath {
    pub start: Side,
    pub end: Side,
    pub route: Vec<PathStep>,
}

impl TransportPath {
    pub fn len(&self) -> usize {
        self.route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }

    /// Whether `aperture` appears along this path, and at what (0-based)
    /// position if so.
    pub fn position_of(&self, aperture: usize) -> Option<usize> {
        self.route.iter().position(|s| s.aperture == aperture)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Side(Side),
    Room(usize),
}

struct Edge {
    to: Node,
    aperture: usize,
    reversed: bool,
}

/// Enumerate every simple path between two distinct cardinal sides.
///
/// Builds an undirected graph over the four cardinal sides plus every room,
/// with apertures as edges, then runs a DFS per unordered cardinal-side
/// pair (deduplicated: only `S -> T` for a fixed ordering of the six
/// pairs). A cardinal side with no incident apertures simply contributes no
/// paths; there is no failure case.
pub fn enumerate_transport_paths(graph: &BuildingGraph) -> Vec<TransportPath> {
    let mut adjacency: std::collections::HashMap<Node, Vec<Edge>> = std::collections::HashMap::new();
    for side in Side::CARDINAL {
        adjacency.entry(Node::Side(side)).or_default();
    }
    for room in 0..graph.rooms().len() {
        adjacency.entry(Node::Room(room)).or_default();
    }

    for (i, ap) in graph.apertures().iter().enumerate() {
        let from = Node::Room(ap.origin);
        let to = match ap.destination {
            Endpoint::Room(r) => Node::Room(r),
            Endpoint::Outside(side) => Node::Side(side),
        };
        adjacency.entry(from).or_default().push(Edge {
            to,
            aperture: i,
            reversed: false,
        });
        adjacency.entry(to).or_default().push(Edge {
            to: from,
            aperture: i,
            reversed: true,
        });
    }

    let pairs = [
        (Side::Front, Side::Back),
        (Side::Front, Side::Left),
        (Side::Front, Side::Right),
        (Side::Back, Side::Left),
        (Side::Back, Side::Right),
        (Side::Left, Side::Right),
    ];

    let mut result = Vec::new();
    for (start, end) in pairs {
        dfs_all_paths(&adjacency, start, end, &mut result);
    }
    result
}

fn dfs_all_paths(
    adjacency: &std::collections::HashMap<Node, Vec<Edge>>,
    start: Side,
    end: Side,
    result: &mut Vec<TransportPath>,
) {
    let mut visited_sides: HashSet<Side> = HashSet::from([start]);
    let mut visited_rooms: HashSet<usize> = HashSet::new();
    let mut route = Vec::new();

    fn recurse(
        adjacency: &std::collections::HashMap<Node, Vec<Edge>>,
        current: Node,
        end: Side,
        visited_sides: &mut HashSet<Side>,
        visited_rooms: &mut HashSet<usize>,
        route: &mut Vec<PathStep>,
        start: Side,
        result: &mut Vec<TransportPath>,
    ) {
        if current == Node::Side(end) {
            result.push(TransportPath {
                start,
                end,
                route: route.clone(),
            });
            return;
        }
        let Some(edges) = adjacency.get(&current) else {
            return;
        };
        for edge in edges {
            let (blocked, mark_side, mark_room) = match edge.to {
                Node::Side(s) => (visited_sides.contains(&s), Some(s), None),
                Node::Room(r) => (visited_rooms.contains(&r), None, Some(r)),
            };
            if blocked {
                continue;
            }
            if let Some(s) = mark_side {
                visited_sides.insert(s);
            }
            if let Some(r) = mark_room {
                visited_rooms.insert(r);
            }
            route.push(PathStep {
                aperture: edge.aperture,
                reversed: edge.reversed,
            });

            recurse(
                adjacency,
                edge.to,
                end,
                visited_sides,
                visited_rooms,
                route,
                start,
                result,
            );

            route.pop();
            if let Some(s) = mark_side {
                visited_sides.remove(&s);
            }
            if let Some(r) = mark_room {
                visited_rooms.remove(&r);
            }
        }
    }

    recurse(
        adjacency,
        Node::Side(start),
        end,
        &mut visited_sides,
        &mut visited_rooms,
        &mut route,
        start,
        result,
    );
}
