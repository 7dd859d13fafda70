//! Graph builder: road-system entity model → navigation graph.
//!
//! The builder is a pure function of its input and policy. It never fails:
//! geometry it cannot connect is left out (or left as an isolated node) for
//! the validator to report.
//!
//! ## Passes
//!
//! 1. Nodes for every intersection and landmark, tagged with floor/building
//! 2. Road edges, between consecutive connected intersections or, for roads
//!    with fewer than two connected intersections, between raw road points
//! 3. Vertical edges between same-`(name, type)` circulation landmarks of a
//!    building on consecutive levels, and between same-type landmarks stacked
//!    within the correspondence tolerance
//! 4. Landmark links to the nearest walkable nodes on the same floor
//! 5. Entrance links from ground-floor entrances/exits to the outdoor network

use std::collections::BTreeMap;

use crate::policy::RoutingPolicyV1;
use crate::types::{
    Building, FloorInfo, GraphEdge, Landmark, LandmarkType, NavigationGraph, NodeId, NodeKind,
    Position, Road, RoadSystem, TransitionType,
};

/// Where an entity lives: outdoors, or on a floor of a building.
#[derive(Debug, Clone, Copy)]
struct Placement<'a> {
    floor_id: Option<&'a str>,
    building_id: Option<&'a str>,
}

impl Placement<'static> {
    const OUTDOOR: Self = Placement { floor_id: None, building_id: None };
}

impl Placement<'_> {
    fn owned(&self) -> (Option<String>, Option<String>) {
        (self.floor_id.map(str::to_string), self.building_id.map(str::to_string))
    }
}

/// A landmark node remembered for the linking passes.
struct LandmarkNode<'a> {
    node: NodeId,
    landmark: &'a Landmark,
    placement: Placement<'a>,
    /// Floor level, for indoor landmarks.
    level: Option<i32>,
    /// Whether the landmark sits on its building's ground floor.
    on_ground_floor: bool,
}

/// Deterministic navigation graph builder.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    policy: RoutingPolicyV1,
}

impl GraphBuilder {
    /// Create a builder with a policy.
    pub fn new(policy: RoutingPolicyV1) -> Self {
        Self { policy }
    }

    /// Get the policy.
    pub fn policy(&self) -> &RoutingPolicyV1 {
        &self.policy
    }

    /// Build a navigation graph from a road system.
    pub fn build(&self, system: &RoadSystem) -> NavigationGraph {
        let mut graph = NavigationGraph::new();

        let landmarks = self.create_nodes(&mut graph, system);
        let skipped_roads = self.add_road_edges(&mut graph, system);
        let vertical = self.add_vertical_edges(&mut graph, system, &landmarks);
        let linked = self.link_landmarks(&mut graph, &landmarks);
        let entrances = self.link_entrances(&mut graph, &landmarks);

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            vertical_edges = vertical,
            landmark_links = linked,
            entrance_links = entrances,
            skipped_roads = skipped_roads,
            "navigation graph built"
        );

        graph
    }

    /// Pass 1: one node per intersection and landmark.
    fn create_nodes<'a>(
        &self,
        graph: &mut NavigationGraph,
        system: &'a RoadSystem,
    ) -> Vec<LandmarkNode<'a>> {
        let mut landmarks = Vec::new();

        for intersection in &system.outdoor_intersections {
            graph.insert_node(
                intersection.id.clone(),
                intersection.name.clone(),
                intersection.position,
                None,
                None,
                NodeKind::Intersection,
            );
        }
        for landmark in &system.outdoor_landmarks {
            let node = graph.insert_node(
                landmark.id.clone(),
                landmark.name.clone(),
                landmark.position,
                None,
                None,
                NodeKind::Landmark,
            );
            landmarks.push(LandmarkNode {
                node,
                landmark,
                placement: Placement::OUTDOOR,
                level: None,
                on_ground_floor: false,
            });
        }

        for building in &system.buildings {
            let ground_id = building.ground_floor().map(|f| f.id.as_str());
            for floor in &building.floors {
                graph.register_floor(FloorInfo {
                    id: floor.id.clone(),
                    name: floor.name.clone(),
                    level: floor.level,
                    building_id: building.id.clone(),
                });
                let placement = Placement {
                    floor_id: Some(&floor.id),
                    building_id: Some(&building.id),
                };
                let (floor_id, building_id) = placement.owned();

                for intersection in &floor.intersections {
                    graph.insert_node(
                        intersection.id.clone(),
                        intersection.name.clone(),
                        intersection.position,
                        floor_id.clone(),
                        building_id.clone(),
                        NodeKind::Intersection,
                    );
                }
                for landmark in &floor.landmarks {
                    let node = graph.insert_node(
                        landmark.id.clone(),
                        landmark.name.clone(),
                        landmark.position,
                        floor_id.clone(),
                        building_id.clone(),
                        NodeKind::Landmark,
                    );
                    landmarks.push(LandmarkNode {
                        node,
                        landmark,
                        placement,
                        level: Some(floor.level),
                        on_ground_floor: ground_id == Some(floor.id.as_str()),
                    });
                }
            }
        }

        landmarks
    }

    /// Pass 2: road edges. Returns the number of roads skipped.
    fn add_road_edges(&self, graph: &mut NavigationGraph, system: &RoadSystem) -> usize {
        let mut skipped = 0;
        for road in &system.outdoor_roads {
            if !self.add_road(graph, road, Placement::OUTDOOR) {
                skipped += 1;
            }
        }
        for building in &system.buildings {
            for floor in &building.floors {
                let placement = Placement {
                    floor_id: Some(&floor.id),
                    building_id: Some(&building.id),
                };
                for road in &floor.roads {
                    if !self.add_road(graph, road, placement) {
                        skipped += 1;
                    }
                }
            }
        }
        skipped
    }

    /// Add one road. Returns false if the road contributed nothing.
    fn add_road(&self, graph: &mut NavigationGraph, road: &Road, placement: Placement<'_>) -> bool {
        if road.points.len() < 2 {
            tracing::warn!(road_id = %road.id, points = road.points.len(), "skipping road with invalid geometry");
            return false;
        }

        if road.is_connected() {
            let mut added = false;
            for pair in road.connected_intersections.windows(2) {
                let (Some(a), Some(b)) = (graph.node_id(&pair[0]), graph.node_id(&pair[1])) else {
                    tracing::warn!(
                        road_id = %road.id,
                        from = %pair[0],
                        to = %pair[1],
                        "road references unknown intersection; segment skipped"
                    );
                    continue;
                };
                let (Some(a_pos), Some(b_pos)) = (
                    graph.node(a).map(|n| n.position),
                    graph.node(b).map(|n| n.position),
                ) else {
                    continue;
                };
                let mut edge = self.road_edge(road, a, b, a_pos.distance_to(&b_pos));
                edge.waypoints =
                    segment_waypoints(&road.points, a_pos, b_pos, self.policy.waypoint_tolerance_m);
                graph.insert_bidirectional(edge, road.is_one_way);
                added = true;
            }
            return added;
        }

        let (floor_id, building_id) = placement.owned();
        let mut previous: Option<(NodeId, Position)> = None;
        for (index, point) in road.points.iter().enumerate() {
            let node = graph.insert_node(
                road_point_key(&road.id, index),
                road.name.clone(),
                *point,
                floor_id.clone(),
                building_id.clone(),
                NodeKind::RoadPoint,
            );
            if let Some((prev, prev_pos)) = previous {
                let mut edge = self.road_edge(road, prev, node, prev_pos.distance_to(point));
                edge.waypoints = vec![prev_pos, *point];
                graph.insert_bidirectional(edge, road.is_one_way);
            }
            previous = Some((node, *point));
        }
        true
    }

    fn road_edge(&self, road: &Road, from: NodeId, to: NodeId, weight: f64) -> GraphEdge {
        let mut edge = GraphEdge::new(from, to, weight).with_meta("link", "road");
        edge.road_id = Some(road.id.clone());
        edge.road_type = Some(road.road_type);
        edge.is_one_way = road.is_one_way;
        edge
    }

    /// Pass 3: vertical circulation. Returns the number of landmark pairs joined.
    ///
    /// Members of a `(name, type)` group are joined across consecutive levels
    /// of the group. Same-type landmarks on consecutive floors of a building
    /// that lie within the correspondence tolerance are joined as well, so a
    /// shaft whose landmarks are named per floor still connects.
    fn add_vertical_edges(
        &self,
        graph: &mut NavigationGraph,
        system: &RoadSystem,
        landmarks: &[LandmarkNode<'_>],
    ) -> usize {
        let mut joined = 0;
        for building in &system.buildings {
            for group in circulation_groups(building, landmarks).into_values() {
                for (lower, upper) in stacked_pairs(&group) {
                    joined += usize::from(self.join_vertical(graph, lower, upper));
                }
            }

            let mut levels: Vec<i32> = building.floors.iter().map(|f| f.level).collect();
            levels.sort_unstable();
            levels.dedup();
            let members: Vec<&LandmarkNode<'_>> = landmarks
                .iter()
                .filter(|entry| {
                    entry.landmark.is_vertical_circulation
                        && entry.placement.building_id == Some(building.id.as_str())
                })
                .collect();
            for pair in levels.windows(2) {
                let (low, high) = (pair[0], pair[1]);
                for lower in members.iter().filter(|m| m.level == Some(low)) {
                    for upper in members.iter().filter(|m| m.level == Some(high)) {
                        let stacked = lower.landmark.landmark_type == upper.landmark.landmark_type
                            && lower.landmark.position.distance_to(&upper.landmark.position)
                                <= self.policy.correspondence_tolerance_m;
                        if stacked {
                            joined += usize::from(self.join_vertical(graph, lower, upper));
                        }
                    }
                }
            }
        }
        joined
    }

    /// Join two circulation landmarks on different levels. Returns false if
    /// they are already joined or share a level.
    fn join_vertical(&self, graph: &mut NavigationGraph, lower: &LandmarkNode<'_>, upper: &LandmarkNode<'_>) -> bool {
        let delta = upper.level.unwrap_or(0) - lower.level.unwrap_or(0);
        if delta == 0 || graph.find_edge(lower.node, upper.node).is_some() {
            return false;
        }
        let transition = TransitionType::from_landmark_type(lower.landmark.landmark_type);
        let mut edge = GraphEdge::new(lower.node, upper.node, self.policy.vertical_weight(delta, transition))
            .with_meta("link", "vertical")
            .with_meta("group", lower.landmark.name.clone());
        edge.is_vertical_transition = true;
        edge.transition_type = Some(transition);
        edge.waypoints = vec![lower.landmark.position, upper.landmark.position];
        graph.insert_bidirectional(edge, false);
        true
    }

    /// Pass 4: attach landmarks to nearby walkable nodes on their floor.
    ///
    /// Vertical-circulation landmarks get the same treatment (tagged `access`)
    /// so that indoor stages can reach them.
    fn link_landmarks(&self, graph: &mut NavigationGraph, landmarks: &[LandmarkNode<'_>]) -> usize {
        let walkable = walkable_by_placement(graph);
        let mut links = 0;
        for entry in landmarks {
            let candidates = walkable
                .get(&entry.placement.owned())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let link = if entry.landmark.is_vertical_circulation { "access" } else { "landmark" };
            links += self.link_to_nearest(graph, entry.node, entry.landmark.position, candidates, link);
        }
        links
    }

    /// Pass 5: join ground-floor entrances and exits to the outdoor network.
    fn link_entrances(&self, graph: &mut NavigationGraph, landmarks: &[LandmarkNode<'_>]) -> usize {
        let walkable = walkable_by_placement(graph);
        let outdoor = walkable
            .get(&Placement::OUTDOOR.owned())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let mut links = 0;
        for entry in landmarks.iter().filter(|l| l.on_ground_floor) {
            if entry.landmark.landmark_type.is_entrance_or_exit() {
                links += self.link_to_nearest(graph, entry.node, entry.landmark.position, outdoor, "entrance");
            }
        }
        links
    }

    /// Link `node` bidirectionally to up to `max_landmark_links` candidates
    /// within the link radius. Returns the number of links made.
    fn link_to_nearest(
        &self,
        graph: &mut NavigationGraph,
        node: NodeId,
        position: Position,
        candidates: &[(NodeId, Position)],
        link: &str,
    ) -> usize {
        let mut in_range: Vec<(NodeId, f64)> = candidates
            .iter()
            .map(|(id, pos)| (*id, pos.distance_to(&position)))
            .filter(|(id, d)| *id != node && *d <= self.policy.landmark_link_radius_m)
            .collect();
        in_range.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        in_range.truncate(self.policy.max_landmark_links);

        for (target, distance) in &in_range {
            let Some(target_pos) = graph.node(*target).map(|n| n.position) else {
                continue;
            };
            let mut edge = GraphEdge::new(node, *target, *distance).with_meta("link", link);
            edge.waypoints = vec![position, target_pos];
            graph.insert_bidirectional(edge, false);
        }
        in_range.len()
    }
}

/// Build a graph with the default policy.
pub fn build_graph(system: &RoadSystem) -> NavigationGraph {
    GraphBuilder::default().build(system)
}

/// Stable key of a synthesized road-point node.
pub fn road_point_key(road_id: &str, index: usize) -> String {
    format!("{}#{}", road_id, index)
}

/// Group a building's circulation landmarks by `(name, type)`, each group
/// sorted by floor level.
fn circulation_groups<'a, 'b>(
    building: &Building,
    landmarks: &'b [LandmarkNode<'a>],
) -> BTreeMap<(String, LandmarkType), Vec<&'b LandmarkNode<'a>>> {
    let mut groups: BTreeMap<(String, LandmarkType), Vec<&LandmarkNode<'a>>> = BTreeMap::new();
    for entry in landmarks {
        if entry.landmark.is_vertical_circulation
            && entry.placement.building_id == Some(building.id.as_str())
        {
            groups
                .entry((entry.landmark.name.clone(), entry.landmark.landmark_type))
                .or_default()
                .push(entry);
        }
    }
    for group in groups.values_mut() {
        group.sort_by_key(|entry| (entry.level.unwrap_or(0), entry.node));
    }
    groups
}

/// Pairs to join between consecutive levels of one circulation group.
///
/// Every member is paired with the nearest member on the next level up, and
/// every member on that level with its nearest member below, so a level with
/// two same-named landmarks leaves neither of them stranded.
fn stacked_pairs<'g, 'a>(group: &[&'g LandmarkNode<'a>]) -> Vec<(&'g LandmarkNode<'a>, &'g LandmarkNode<'a>)> {
    let mut levels: Vec<i32> = group.iter().filter_map(|entry| entry.level).collect();
    levels.dedup();

    let nearest = |from: &LandmarkNode<'a>, level: i32| {
        group
            .iter()
            .copied()
            .filter(|entry| entry.level == Some(level))
            .min_by(|a, b| {
                let da = a.landmark.position.distance_to(&from.landmark.position);
                let db = b.landmark.position.distance_to(&from.landmark.position);
                da.total_cmp(&db).then_with(|| a.node.cmp(&b.node))
            })
    };

    let mut pairs: BTreeMap<(NodeId, NodeId), (&'g LandmarkNode<'a>, &'g LandmarkNode<'a>)> = BTreeMap::new();
    for pair in levels.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        for entry in group.iter().copied() {
            if entry.level == Some(low) {
                if let Some(upper) = nearest(entry, high) {
                    pairs.insert((entry.node, upper.node), (entry, upper));
                }
            } else if entry.level == Some(high) {
                if let Some(lower) = nearest(entry, low) {
                    pairs.insert((lower.node, entry.node), (lower, entry));
                }
            }
        }
    }
    pairs.into_values().collect()
}

/// Intersection and road-point nodes bucketed by (floor, building).
fn walkable_by_placement(
    graph: &NavigationGraph,
) -> BTreeMap<(Option<String>, Option<String>), Vec<(NodeId, Position)>> {
    let mut buckets: BTreeMap<(Option<String>, Option<String>), Vec<(NodeId, Position)>> =
        BTreeMap::new();
    for node in graph.nodes().iter().filter(|n| n.kind.is_walkable()) {
        buckets
            .entry((node.floor_id.clone(), node.building_id.clone()))
            .or_default()
            .push((node.id, node.position));
    }
    buckets
}

/// Positions from `from` to `to` inclusive, with the raw road points lying
/// between them.
///
/// Each endpoint is matched to its nearest road point; if either match is
/// farther than `tolerance` meters the segment is rendered as a straight line.
fn segment_waypoints(points: &[Position], from: Position, to: Position, tolerance: f64) -> Vec<Position> {
    let nearest = |target: &Position| {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.distance_to(target)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    };

    let mut waypoints = vec![from];
    if let (Some((i, di)), Some((j, dj))) = (nearest(&from), nearest(&to)) {
        if di <= tolerance && dj <= tolerance {
            if i < j {
                waypoints.extend_from_slice(&points[i + 1..j]);
            } else if j < i {
                waypoints.extend(points[j + 1..i].iter().rev());
            }
        }
    }
    waypoints.push(to);
    waypoints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Floor, Intersection, RoadType};

    fn intersection(id: &str, lat: f64, lon: f64) -> Intersection {
        Intersection {
            id: id.into(),
            name: id.to_uppercase(),
            position: Position::new(lat, lon),
            connected_road_ids: vec![],
        }
    }

    fn road(id: &str, points: Vec<Position>, connected: &[&str], one_way: bool) -> Road {
        Road {
            id: id.into(),
            name: id.into(),
            points,
            road_type: RoadType::Footpath,
            width: 2.0,
            is_one_way: one_way,
            connected_intersections: connected.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn landmark(id: &str, name: &str, kind: LandmarkType, lat: f64, lon: f64, vertical: bool, floors: &[&str]) -> Landmark {
        Landmark {
            id: id.into(),
            name: name.into(),
            landmark_type: kind,
            position: Position::new(lat, lon),
            is_accessible: true,
            is_vertical_circulation: vertical,
            connected_floors: floors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_connected_road_creates_symmetric_edges() {
        let system = RoadSystem {
            outdoor_intersections: vec![intersection("a", 0.0, 0.0), intersection("b", 0.001, 0.0)],
            outdoor_roads: vec![road(
                "r1",
                vec![Position::new(0.0, 0.0), Position::new(0.0005, 0.0), Position::new(0.001, 0.0)],
                &["a", "b"],
                false,
            )],
            ..Default::default()
        };
        let graph = build_graph(&system);
        let a = graph.node_id("a").unwrap();
        let b = graph.node_id("b").unwrap();

        let forward = graph.edge(graph.find_edge(a, b).unwrap()).unwrap();
        let reverse = graph.edge(graph.find_edge(b, a).unwrap()).unwrap();
        assert!((forward.weight - 111.319).abs() < 0.01);
        assert_eq!(forward.weight, reverse.weight);
        assert_eq!(forward.waypoints.len(), 3);
        let mut back = reverse.waypoints.clone();
        back.reverse();
        assert_eq!(forward.waypoints, back);
        assert_eq!(forward.road_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_one_way_road_has_single_direction() {
        let system = RoadSystem {
            outdoor_intersections: vec![intersection("a", 0.0, 0.0), intersection("b", 0.001, 0.0)],
            outdoor_roads: vec![road(
                "r1",
                vec![Position::new(0.0, 0.0), Position::new(0.001, 0.0)],
                &["a", "b"],
                true,
            )],
            ..Default::default()
        };
        let graph = build_graph(&system);
        let a = graph.node_id("a").unwrap();
        let b = graph.node_id("b").unwrap();
        assert!(graph.find_edge(a, b).is_some());
        assert!(graph.find_edge(b, a).is_none());
        assert!(graph.edge(graph.find_edge(a, b).unwrap()).unwrap().is_one_way);
    }

    #[test]
    fn test_unconnected_road_synthesizes_points() {
        let system = RoadSystem {
            outdoor_roads: vec![road(
                "path",
                vec![Position::new(0.0, 0.0), Position::new(0.0001, 0.0), Position::new(0.0002, 0.0)],
                &[],
                false,
            )],
            ..Default::default()
        };
        let graph = build_graph(&system);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        let first = graph.node_by_key("path#0").unwrap();
        assert_eq!(first.kind, NodeKind::RoadPoint);
        assert_eq!(graph.degree(graph.node_id("path#1").unwrap()), 2);
    }

    #[test]
    fn test_road_with_one_point_is_skipped() {
        let system = RoadSystem {
            outdoor_intersections: vec![intersection("a", 0.0, 0.0)],
            outdoor_roads: vec![road("stub", vec![Position::new(0.0, 0.0)], &[], false)],
            ..Default::default()
        };
        let graph = build_graph(&system);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_segment_waypoints_tolerance() {
        let points = vec![
            Position::new(0.0, 0.0),
            Position::new(0.0003, 0.0),
            Position::new(0.0006, 0.0),
            Position::new(0.001, 0.0),
        ];
        let inside = segment_waypoints(&points, Position::new(0.0, 0.0), Position::new(0.001, 0.0), 5.0);
        assert_eq!(inside.len(), 4);

        // Reverse direction walks the points backwards.
        let reverse = segment_waypoints(&points, Position::new(0.001, 0.0), Position::new(0.0, 0.0), 5.0);
        assert_eq!(reverse[1], Position::new(0.0006, 0.0));

        // Endpoint far from every point: straight segment only.
        let outside = segment_waypoints(&points, Position::new(0.0, 0.01), Position::new(0.001, 0.0), 5.0);
        assert_eq!(outside.len(), 2);
    }

    #[test]
    fn test_vertical_edges_between_consecutive_levels() {
        let floors = (0..3)
            .map(|level| Floor {
                id: format!("f{}", level),
                name: format!("Level {}", level),
                level,
                building_id: "b".into(),
                roads: vec![],
                landmarks: vec![
                    landmark(&format!("el{}", level), "Lift A", LandmarkType::Elevator, 0.0, 0.0, true, &["f0", "f1", "f2"]),
                    landmark(&format!("st{}", level), "Stair 1", LandmarkType::Stairs, 0.0, 0.0001, true, &["f0", "f1", "f2"]),
                ],
                intersections: vec![],
            })
            .collect();
        let system = RoadSystem {
            buildings: vec![Building {
                id: "b".into(),
                name: "Hall".into(),
                center: Position::new(0.0, 0.0),
                default_floor_level: 0,
                floors,
            }],
            ..Default::default()
        };
        let graph = build_graph(&system);

        let el0 = graph.node_id("el0").unwrap();
        let el1 = graph.node_id("el1").unwrap();
        let el2 = graph.node_id("el2").unwrap();
        let st0 = graph.node_id("st0").unwrap();
        let st1 = graph.node_id("st1").unwrap();

        let lift = graph.edge(graph.find_edge(el0, el1).unwrap()).unwrap();
        assert!(lift.is_vertical_transition);
        assert_eq!(lift.transition_type, Some(TransitionType::Elevator));
        assert_eq!(lift.weight, 4.0);
        assert!(graph.find_edge(el1, el0).is_some());
        // Only consecutive levels are joined.
        assert!(graph.find_edge(el0, el2).is_none());

        let stair = graph.edge(graph.find_edge(st0, st1).unwrap()).unwrap();
        assert_eq!(stair.weight, 8.0);
        // Different groups never connect.
        assert!(graph.find_edge(el0, st1).is_none());
    }

    #[test]
    fn test_stacked_landmarks_join_across_names() {
        let floors = ["f0", "f1"];
        let level = |level: i32, landmarks: Vec<Landmark>| Floor {
            id: format!("f{}", level),
            name: format!("Level {}", level),
            level,
            building_id: "b".into(),
            roads: vec![],
            landmarks,
            intersections: vec![],
        };
        let system = RoadSystem {
            buildings: vec![Building {
                id: "b".into(),
                name: "Hall".into(),
                center: Position::new(0.0, 0.0),
                default_floor_level: 0,
                floors: vec![
                    level(0, vec![
                        landmark("el0", "Lift A", LandmarkType::Elevator, 0.0, 0.0, true, &floors),
                        landmark("st0", "Stair 1", LandmarkType::Stairs, 0.0, 0.001, true, &floors),
                    ]),
                    level(1, vec![
                        landmark("el1", "Lift A L1", LandmarkType::Elevator, 0.0, 0.0, true, &floors),
                        landmark("st1", "North Stair", LandmarkType::Stairs, 0.0, 0.002, true, &floors),
                    ]),
                ],
            }],
            ..Default::default()
        };
        let graph = build_graph(&system);
        let id = |key: &str| graph.node_id(key).unwrap();

        let lift = graph.edge(graph.find_edge(id("el0"), id("el1")).unwrap()).unwrap();
        assert!(lift.is_vertical_transition);
        assert_eq!(lift.transition_type, Some(TransitionType::Elevator));
        assert_eq!(lift.weight, 4.0);
        assert!(graph.find_edge(id("el1"), id("el0")).is_some());
        // Renamed stairs more than a meter apart stay separate.
        assert!(graph.find_edge(id("st0"), id("st1")).is_none());
    }

    #[test]
    fn test_duplicate_group_members_each_join_next_level() {
        let floors = ["f0", "f1"];
        let level = |level: i32, landmarks: Vec<Landmark>| Floor {
            id: format!("f{}", level),
            name: format!("Level {}", level),
            level,
            building_id: "b".into(),
            roads: vec![],
            landmarks,
            intersections: vec![],
        };
        let system = RoadSystem {
            buildings: vec![Building {
                id: "b".into(),
                name: "Hall".into(),
                center: Position::new(0.0, 0.0),
                default_floor_level: 0,
                floors: vec![
                    level(0, vec![
                        landmark("west0", "Lift", LandmarkType::Elevator, 0.0, 0.0, true, &floors),
                        landmark("east0", "Lift", LandmarkType::Elevator, 0.0, 0.001, true, &floors),
                    ]),
                    level(1, vec![
                        landmark("west1", "Lift", LandmarkType::Elevator, 0.0, 0.0, true, &floors),
                        landmark("east1", "Lift", LandmarkType::Elevator, 0.0, 0.001, true, &floors),
                    ]),
                ],
            }],
            ..Default::default()
        };
        let graph = build_graph(&system);
        let id = |key: &str| graph.node_id(key).unwrap();

        assert!(graph.find_edge(id("west0"), id("west1")).is_some());
        assert!(graph.find_edge(id("east0"), id("east1")).is_some());
        assert!(graph.find_edge(id("west0"), id("east1")).is_none());
        assert!(graph.find_edge(id("west0"), id("east0")).is_none());
    }

    #[test]
    fn test_landmark_links_up_to_three_within_radius() {
        let mut intersections: Vec<Intersection> = (0..5)
            .map(|i| intersection(&format!("x{}", i), 0.0001 * i as f64, 0.0))
            .collect();
        // Beyond the 50 m radius.
        intersections.push(intersection("far", 0.01, 0.0));
        let system = RoadSystem {
            outdoor_intersections: intersections,
            outdoor_landmarks: vec![landmark("cafe", "Cafe", LandmarkType::Other, 0.0, 0.00005, false, &[])],
            ..Default::default()
        };
        let graph = build_graph(&system);
        let cafe = graph.node_id("cafe").unwrap();
        let neighbors = graph.neighbors(cafe);
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.contains(&graph.node_id("x0").unwrap()));
        assert!(!neighbors.contains(&graph.node_id("far").unwrap()));
    }

    #[test]
    fn test_landmarks_do_not_link_across_floors() {
        let floor = |id: &str, level: i32, intersections: Vec<Intersection>, landmarks: Vec<Landmark>| Floor {
            id: id.into(),
            name: id.into(),
            level,
            building_id: "b".into(),
            roads: vec![],
            landmarks,
            intersections,
        };
        let system = RoadSystem {
            buildings: vec![Building {
                id: "b".into(),
                name: "Hall".into(),
                center: Position::new(0.0, 0.0),
                default_floor_level: 0,
                floors: vec![
                    floor("f0", 0, vec![intersection("c0", 0.0, 0.0)], vec![]),
                    floor("f1", 1, vec![], vec![landmark("room", "Room", LandmarkType::Office, 0.0, 0.0, false, &[])]),
                ],
            }],
            ..Default::default()
        };
        let graph = build_graph(&system);
        assert_eq!(graph.degree(graph.node_id("room").unwrap()), 0);
    }

    #[test]
    fn test_ground_floor_entrance_links_outdoors() {
        let system = RoadSystem {
            outdoor_intersections: vec![intersection("gate", 0.0001, 0.0)],
            buildings: vec![Building {
                id: "b".into(),
                name: "Hall".into(),
                center: Position::new(0.0, 0.0),
                default_floor_level: 0,
                floors: vec![Floor {
                    id: "f0".into(),
                    name: "Ground".into(),
                    level: 0,
                    building_id: "b".into(),
                    roads: vec![],
                    landmarks: vec![landmark("door", "Door", LandmarkType::Entrance, 0.0, 0.0, false, &[])],
                    intersections: vec![],
                }],
            }],
            ..Default::default()
        };
        let graph = build_graph(&system);
        let door = graph.node_id("door").unwrap();
        let gate = graph.node_id("gate").unwrap();
        let link = graph.edge(graph.find_edge(door, gate).unwrap()).unwrap();
        assert_eq!(link.metadata.get("link").map(String::as_str), Some("entrance"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let system = RoadSystem {
            outdoor_intersections: vec![intersection("a", 0.0, 0.0), intersection("b", 0.001, 0.0)],
            outdoor_roads: vec![road("r1", vec![Position::new(0.0, 0.0), Position::new(0.001, 0.0)], &["a", "b"], false)],
            outdoor_landmarks: vec![landmark("l", "L", LandmarkType::Other, 0.0, 0.0001, false, &[])],
            ..Default::default()
        };
        let g1 = build_graph(&system);
        let g2 = build_graph(&system);
        assert_eq!(g1.fingerprint(), g2.fingerprint());
        assert_eq!(g1.nodes(), g2.nodes());
        assert_eq!(g1.edges(), g2.edges());
    }
}
