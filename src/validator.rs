//! Network validator: structural checks over a road system and its graph.
//!
//! The validator never stops at the first problem. Every check runs and
//! contributes zero or more [`ValidationIssue`]s; the network is valid iff
//! none of them has error severity.
//!
//! ## Checks (in order)
//!
//! 1. Empty network
//! 2. Duplicate identifiers
//! 3. Road geometry and connection
//! 4. Building floors, entrances and vertical circulation
//! 5. Graph nodes for every intersection and landmark
//! 6. Isolated nodes and dead ends
//! 7. Connected components
//! 8. Network size

use std::collections::BTreeMap;

use crate::builder::GraphBuilder;
use crate::policy::RoutingPolicyV1;
use crate::types::{
    Building, IssueCategory, IssueCode, Landmark, LandmarkType, NavigationGraph,
    NetworkStatistics, NodeId, NodeKind, Position, RoadSystem, Severity, ValidationIssue,
    ValidationResult,
};

/// Roads shorter than this get an informational note.
const SHORT_ROAD_M: f64 = 1.0;

/// Validates road systems.
#[derive(Debug, Clone, Default)]
pub struct NetworkValidator {
    policy: RoutingPolicyV1,
}

impl NetworkValidator {
    /// Create a validator with a policy.
    pub fn new(policy: RoutingPolicyV1) -> Self {
        Self { policy }
    }

    /// Validate a road system against a fresh graph build.
    pub fn validate(&self, system: &RoadSystem) -> ValidationResult {
        let graph = GraphBuilder::new(self.policy.clone()).build(system);
        self.validate_with_graph(system, &graph)
    }

    /// Validate a road system against a graph already built from it.
    pub fn validate_with_graph(&self, system: &RoadSystem, graph: &NavigationGraph) -> ValidationResult {
        let mut issues = Vec::new();
        let mut stats = collect_statistics(system, graph);

        if system.is_empty() {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                IssueCategory::DataIntegrity,
                IssueCode::EmptyNetwork,
                "Empty network",
                "The road system has no buildings, roads, or intersections",
            ));
        }

        check_duplicates(system, &mut issues);
        check_roads(system, &mut issues);
        for building in &system.buildings {
            check_building(building, &mut issues);
        }
        for landmark in &system.outdoor_landmarks {
            check_circulation_links(landmark, &mut issues);
        }
        check_nodes_present(system, graph, &mut issues);
        let (isolated, dead_ends) = check_degrees(graph, &mut issues);
        let components = connected_components(graph);
        check_components(graph, &components, &mut issues);

        if graph.node_count() > self.policy.large_network_node_threshold {
            issues.push(ValidationIssue::new(
                Severity::Info,
                IssueCategory::Performance,
                IssueCode::LargeNetwork,
                "Large network",
                format!(
                    "Graph has {} nodes (threshold {}); route queries may be slow",
                    graph.node_count(),
                    self.policy.large_network_node_threshold
                ),
            ));
        }

        stats.component_count = components.len();
        stats.isolated_node_count = isolated;
        stats.dead_end_count = dead_ends;

        let result = ValidationResult::new(issues, stats);
        tracing::info!(
            is_valid = result.is_valid,
            errors = result.error_count(),
            issues = result.issues.len(),
            components = result.statistics.component_count,
            "network validated"
        );
        result
    }
}

/// Validate a road system with the default policy.
pub fn validate_network(system: &RoadSystem) -> ValidationResult {
    NetworkValidator::default().validate(system)
}

/// Connected components of the graph, treating edges as undirected.
///
/// Components are listed in order of their lowest node handle, and each
/// component's nodes are sorted. Traversal uses an explicit stack.
pub fn connected_components(graph: &NavigationGraph) -> Vec<Vec<NodeId>> {
    let mut seen = vec![false; graph.node_count()];
    let mut components = Vec::new();

    for node in graph.nodes() {
        if seen[node.id.index()] {
            continue;
        }
        seen[node.id.index()] = true;
        let mut stack = vec![node.id];
        let mut component = Vec::new();
        while let Some(current) = stack.pop() {
            component.push(current);
            for next in graph.neighbors(current) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    stack.push(next);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

fn collect_statistics(system: &RoadSystem, graph: &NavigationGraph) -> NetworkStatistics {
    let circulation: Vec<&Landmark> = system
        .all_landmarks()
        .filter(|l| l.is_vertical_circulation)
        .collect();
    let count_type = |kind: LandmarkType| circulation.iter().filter(|l| l.landmark_type == kind).count();

    NetworkStatistics {
        building_count: system.buildings.len(),
        floor_count: system.buildings.iter().map(|b| b.floors.len()).sum(),
        road_count: system.all_roads().count(),
        intersection_count: system.all_intersections().count(),
        landmark_count: system.all_landmarks().count(),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        total_road_length_m: system.all_roads().map(|r| r.length()).sum(),
        vertical_circulation_count: circulation.len(),
        elevator_count: count_type(LandmarkType::Elevator),
        stairs_count: count_type(LandmarkType::Stairs),
        escalator_count: count_type(LandmarkType::Escalator),
        ..NetworkStatistics::default()
    }
}

fn check_duplicates(system: &RoadSystem, issues: &mut Vec<ValidationIssue>) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in system.all_ids() {
        *counts.entry(id).or_default() += 1;
    }
    for (id, count) in counts.into_iter().filter(|(_, count)| *count > 1) {
        issues.push(
            ValidationIssue::new(
                Severity::Error,
                IssueCategory::DataIntegrity,
                IssueCode::DuplicateIdentifier,
                "Duplicate identifier",
                format!("ID '{}' is used by {} entities", id, count),
            )
            .about(id),
        );
    }
}

fn check_roads(system: &RoadSystem, issues: &mut Vec<ValidationIssue>) {
    for road in system.all_roads() {
        let location = road.points.first().copied();
        let issue = |severity, code, title: &str, description: String| {
            let issue = ValidationIssue::new(severity, IssueCategory::DataIntegrity, code, title, description)
                .about(road.id.clone());
            match location {
                Some(position) => issue.at(position),
                None => issue,
            }
        };

        match road.points.len() {
            0 => issues.push(issue(
                Severity::Error,
                IssueCode::InvalidRoadGeometry,
                "Invalid road geometry",
                format!("Road '{}' has no points", road.name),
            )),
            1 => issues.push(issue(
                Severity::Warning,
                IssueCode::InvalidRoadGeometry,
                "Invalid road geometry",
                format!("Road '{}' has a single point", road.name),
            )),
            _ => {
                let length = road.length();
                if length < SHORT_ROAD_M {
                    issues.push(issue(
                        Severity::Info,
                        IssueCode::ShortRoad,
                        "Short road",
                        format!("Road '{}' is only {:.2} m long", road.name, length),
                    ));
                }
            }
        }

        if road.connected_intersections.is_empty() {
            let mut unconnected = ValidationIssue::new(
                Severity::Warning,
                IssueCategory::Navigation,
                IssueCode::UnconnectedRoad,
                "Unconnected road",
                format!("Road '{}' is not connected to any intersection", road.name),
            )
            .about(road.id.clone());
            unconnected.location = location;
            issues.push(unconnected);
        }
    }
}

fn check_building(building: &Building, issues: &mut Vec<ValidationIssue>) {
    let circulation: Vec<&Landmark> = building
        .floors
        .iter()
        .flat_map(|f| f.vertical_circulation())
        .collect();

    if building.floors.len() > 1 && circulation.is_empty() {
        issues.push(
            ValidationIssue::new(
                Severity::Error,
                IssueCategory::Accessibility,
                IssueCode::MissingVerticalCirculation,
                "No vertical circulation",
                format!(
                    "Building '{}' has {} floors but no elevators or stairs",
                    building.name,
                    building.floors.len()
                ),
            )
            .at(building.center)
            .about(building.id.clone()),
        );
    }
    for landmark in circulation {
        check_circulation_links(landmark, issues);
    }

    match building.floor_at_level(0) {
        None => issues.push(
            ValidationIssue::new(
                Severity::Warning,
                IssueCategory::DataIntegrity,
                IssueCode::MissingGroundFloor,
                "No ground floor",
                format!("Building '{}' has no level-0 floor", building.name),
            )
            .at(building.center)
            .about(building.id.clone()),
        ),
        Some(ground) => {
            let entrances = ground.entrances().count();
            let issue = match entrances {
                0 => Some((Severity::Error, IssueCode::MissingEntrance, "No entrance")),
                1 => Some((Severity::Info, IssueCode::SingleEntrance, "Single entrance")),
                _ => None,
            };
            if let Some((severity, code, title)) = issue {
                issues.push(
                    ValidationIssue::new(
                        severity,
                        IssueCategory::Accessibility,
                        code,
                        title,
                        format!(
                            "Ground floor '{}' of '{}' has {} entrance/exit landmarks",
                            ground.name, building.name, entrances
                        ),
                    )
                    .at(building.center)
                    .about(ground.id.clone()),
                );
            }
        }
    }
}

fn check_circulation_links(landmark: &Landmark, issues: &mut Vec<ValidationIssue>) {
    if !landmark.is_vertical_circulation {
        return;
    }
    let issue = match landmark.connected_floors.len() {
        0 => (
            Severity::Error,
            IssueCode::UnlinkedVerticalCirculation,
            "Unlinked vertical circulation",
            format!("'{}' connects to no floors", landmark.name),
        ),
        1 => (
            Severity::Warning,
            IssueCode::SingleFloorCirculation,
            "Single-floor vertical circulation",
            format!("'{}' connects to only one floor", landmark.name),
        ),
        _ => return,
    };
    issues.push(
        ValidationIssue::new(issue.0, IssueCategory::Accessibility, issue.1, issue.2, issue.3)
            .at(landmark.position)
            .about(landmark.id.clone()),
    );
}

fn check_nodes_present(system: &RoadSystem, graph: &NavigationGraph, issues: &mut Vec<ValidationIssue>) {
    let missing = |id: &str, kind: NodeKind| {
        graph
            .node_by_key(id)
            .map(|node| node.kind != kind)
            .unwrap_or(true)
    };
    for intersection in system.all_intersections() {
        if missing(&intersection.id, NodeKind::Intersection) {
            issues.push(missing_node(&intersection.id, &intersection.name, intersection.position, IssueCategory::Connectivity));
        }
    }
    for landmark in system.all_landmarks() {
        if missing(&landmark.id, NodeKind::Landmark) {
            issues.push(missing_node(&landmark.id, &landmark.name, landmark.position, IssueCategory::Accessibility));
        }
    }
}

fn missing_node(id: &str, name: &str, position: Position, category: IssueCategory) -> ValidationIssue {
    ValidationIssue::new(
        Severity::Error,
        category,
        IssueCode::MissingNode,
        "Missing graph node",
        format!("'{}' has no node of its own in the navigation graph", name),
    )
    .at(position)
    .about(id)
}

/// Returns (isolated, dead-end) counts.
fn check_degrees(graph: &NavigationGraph, issues: &mut Vec<ValidationIssue>) -> (usize, usize) {
    let mut isolated = 0;
    let mut dead_ends = 0;
    for node in graph.nodes() {
        match graph.degree(node.id) {
            0 => {
                isolated += 1;
                issues.push(
                    ValidationIssue::new(
                        Severity::Error,
                        IssueCategory::Connectivity,
                        IssueCode::IsolatedNode,
                        "Isolated node",
                        format!("'{}' is not connected to anything", node.name),
                    )
                    .at(node.position)
                    .about(node.key.clone()),
                );
            }
            1 if node.kind == NodeKind::Intersection => {
                dead_ends += 1;
                issues.push(
                    ValidationIssue::new(
                        Severity::Warning,
                        IssueCategory::Navigation,
                        IssueCode::DeadEnd,
                        "Dead end",
                        format!("Intersection '{}' has a single neighbor", node.name),
                    )
                    .at(node.position)
                    .about(node.key.clone()),
                );
            }
            _ => {}
        }
    }
    (isolated, dead_ends)
}

fn check_components(graph: &NavigationGraph, components: &[Vec<NodeId>], issues: &mut Vec<ValidationIssue>) {
    if components.len() <= 1 {
        return;
    }
    issues.push(ValidationIssue::new(
        Severity::Error,
        IssueCategory::Connectivity,
        IssueCode::DisconnectedNetwork,
        "Disconnected network",
        format!("The navigation graph splits into {} components", components.len()),
    ));
    for (index, component) in components.iter().enumerate() {
        let first = component.first().and_then(|id| graph.node(*id));
        let mut issue = ValidationIssue::new(
            Severity::Info,
            IssueCategory::Connectivity,
            IssueCode::ComponentSize,
            "Component size",
            format!("Component {} has {} nodes", index + 1, component.len()),
        );
        issue.location = first.map(|n| n.position);
        issues.push(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Floor, Intersection, Road, RoadType};

    fn intersection(id: &str, lat: f64) -> Intersection {
        Intersection {
            id: id.into(),
            name: id.to_uppercase(),
            position: Position::new(lat, 0.0),
            connected_road_ids: vec![],
        }
    }

    fn road(id: &str, from: &Intersection, to: &Intersection) -> Road {
        Road {
            id: id.into(),
            name: id.into(),
            points: vec![from.position, to.position],
            road_type: RoadType::Footpath,
            width: 2.0,
            is_one_way: false,
            connected_intersections: vec![from.id.clone(), to.id.clone()],
        }
    }

    fn two_segments() -> RoadSystem {
        let (a, b, c) = (intersection("a", 0.0), intersection("b", 0.001), intersection("c", 0.002));
        RoadSystem {
            outdoor_roads: vec![road("r1", &a, &b), road("r2", &b, &c)],
            outdoor_intersections: vec![a, b, c],
            ..Default::default()
        }
    }

    #[test]
    fn test_connected_network_is_valid() {
        let result = validate_network(&two_segments());
        assert!(result.is_valid, "{:?}", result.issues);
        assert_eq!(result.statistics.component_count, 1);
        assert_eq!(result.statistics.dead_end_count, 2);
        assert_eq!(result.with_code(IssueCode::DeadEnd).len(), 2);
        assert!((result.statistics.total_road_length_m - 222.639).abs() < 0.01);
    }

    #[test]
    fn test_isolated_intersection() {
        let mut system = two_segments();
        system.outdoor_intersections.push(intersection("lonely", 0.5));
        let result = validate_network(&system);
        assert!(!result.is_valid);

        let about: Vec<&ValidationIssue> = result
            .for_entity("lonely")
            .into_iter()
            .filter(|i| i.severity == Severity::Error && i.category == IssueCategory::Connectivity)
            .collect();
        assert_eq!(about.len(), 1);
        assert_eq!(about[0].code, IssueCode::IsolatedNode);
        assert_eq!(result.statistics.isolated_node_count, 1);
    }

    #[test]
    fn test_two_components() {
        let mut system = two_segments();
        let (x, y) = (intersection("x", 1.0), intersection("y", 1.001));
        system.outdoor_roads.push(road("r3", &x, &y));
        system.outdoor_intersections.extend([x, y]);

        let result = validate_network(&system);
        assert_eq!(result.with_code(IssueCode::ComponentSize).len(), 2);
        let disconnected = result.with_code(IssueCode::DisconnectedNetwork);
        assert_eq!(disconnected.len(), 1);
        assert_eq!(disconnected[0].severity, Severity::Error);
    }

    #[test]
    fn test_road_geometry_issues() {
        let mut system = two_segments();
        let mut empty = road("empty", &intersection("p", 0.0), &intersection("q", 0.0));
        empty.points.clear();
        empty.connected_intersections.clear();
        let mut single = road("single", &intersection("p", 0.0), &intersection("q", 0.0));
        single.points.truncate(1);
        let short = Road {
            id: "short".into(),
            points: vec![Position::new(0.0, 0.0), Position::new(0.000001, 0.0)],
            ..road("short", &intersection("a", 0.0), &intersection("b", 0.001))
        };
        system.outdoor_roads.extend([empty, single, short]);

        let result = validate_network(&system);
        let empty_issues = result.for_entity("empty");
        assert!(empty_issues.iter().any(|i| i.code == IssueCode::InvalidRoadGeometry && i.severity == Severity::Error));
        assert!(empty_issues.iter().any(|i| i.code == IssueCode::UnconnectedRoad && i.severity == Severity::Warning));
        assert!(result
            .for_entity("single")
            .iter()
            .any(|i| i.code == IssueCode::InvalidRoadGeometry && i.severity == Severity::Warning));
        assert!(result.for_entity("short").iter().any(|i| i.code == IssueCode::ShortRoad));
    }

    fn floor(id: &str, level: i32, landmarks: Vec<Landmark>) -> Floor {
        Floor {
            id: id.into(),
            name: id.into(),
            level,
            building_id: "b".into(),
            roads: vec![],
            landmarks,
            intersections: vec![],
        }
    }

    fn landmark(id: &str, kind: LandmarkType, floors: &[&str]) -> Landmark {
        Landmark {
            id: id.into(),
            name: id.into(),
            landmark_type: kind,
            position: Position::default(),
            is_accessible: true,
            is_vertical_circulation: matches!(kind, LandmarkType::Elevator | LandmarkType::Stairs),
            connected_floors: floors.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn building(floors: Vec<Floor>) -> RoadSystem {
        RoadSystem {
            buildings: vec![Building {
                id: "b".into(),
                name: "Hall".into(),
                center: Position::default(),
                default_floor_level: 0,
                floors,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_multi_floor_without_circulation() {
        let system = building(vec![floor("f0", 0, vec![]), floor("f1", 1, vec![])]);
        let result = validate_network(&system);
        let titled: Vec<&ValidationIssue> = result
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error && i.title == "No vertical circulation")
            .collect();
        assert_eq!(titled.len(), 1);
        assert!(result.with_code(IssueCode::MissingEntrance).len() == 1);
    }

    #[test]
    fn test_circulation_links_and_entrances() {
        let system = building(vec![
            floor(
                "f0",
                0,
                vec![
                    landmark("door", LandmarkType::Entrance, &[]),
                    landmark("lift", LandmarkType::Elevator, &[]),
                    landmark("stair", LandmarkType::Stairs, &["f0"]),
                ],
            ),
            floor("f1", 1, vec![]),
        ]);
        let result = validate_network(&system);
        assert_eq!(result.for_entity("lift")[0].code, IssueCode::UnlinkedVerticalCirculation);
        assert_eq!(result.for_entity("stair")[0].code, IssueCode::SingleFloorCirculation);
        assert_eq!(result.with_code(IssueCode::SingleEntrance).len(), 1);
        assert!(result.with_code(IssueCode::MissingVerticalCirculation).is_empty());
        assert_eq!(result.statistics.elevator_count, 1);
        assert_eq!(result.statistics.stairs_count, 1);
    }

    #[test]
    fn test_missing_ground_floor_and_duplicates() {
        let mut system = building(vec![floor("f1", 1, vec![]), floor("f2", 2, vec![])]);
        system.outdoor_intersections = vec![intersection("f1", 0.0)];
        let result = validate_network(&system);
        assert_eq!(result.with_code(IssueCode::MissingGroundFloor).len(), 1);
        let duplicates = result.with_code(IssueCode::DuplicateIdentifier);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].related_entity_id.as_deref(), Some("f1"));
    }

    #[test]
    fn test_empty_network() {
        let result = validate_network(&RoadSystem::default());
        assert!(result.is_valid);
        assert_eq!(result.with_code(IssueCode::EmptyNetwork).len(), 1);
        assert_eq!(result.statistics.component_count, 0);
    }

    #[test]
    fn test_large_network_threshold() {
        let policy = RoutingPolicyV1 { large_network_node_threshold: 2, ..RoutingPolicyV1::default() };
        let result = NetworkValidator::new(policy).validate(&two_segments());
        assert_eq!(result.with_code(IssueCode::LargeNetwork).len(), 1);
    }

    #[test]
    fn test_components_iterative() {
        let graph = GraphBuilder::default().build(&two_segments());
        let components = connected_components(&graph);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 3);
    }
}
