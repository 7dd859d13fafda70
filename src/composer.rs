//! Route composer: multi-stage routes across floors and buildings.
//!
//! A composed route is a chain of stages, each a pathfinder call:
//!
//! ```text
//! indoor search → vertical transition → indoor search to exit
//!               → outdoor search → indoor search from entrance
//!               → vertical transition → indoor search to destination
//! ```
//!
//! Which stages run is decided by the [`RouteKind`] of the resolved
//! [`NavigationContext`]. Nodes used by earlier stages are excluded from later
//! searches. Composition stops at the first stage that cannot be completed; a
//! partial route is never returned.
//!
//! ## Vertical circulation
//!
//! On the current floor, circulation landmarks that list the target floor in
//! `connected_floors` are ordered by (preferred type first, then distance) and
//! the first one is used. Elevators are preferred when `prefer_elevator` is
//! set, stairs otherwise. On each floor passed, the ride continues at the
//! member of the same `(name, type)` group, or failing that at a landmark of
//! the same type within the correspondence tolerance.

use std::collections::BTreeSet;

use crate::builder::GraphBuilder;
use crate::context::{classify_route, NavigationContext, RouteKind};
use crate::pathfinder::{Endpoint, PathError, PathOptions, Pathfinder};
use crate::policy::RoutingPolicyV1;
use crate::types::{
    Building, Floor, FloorTransition, Landmark, LandmarkType, Maneuver, NavigationGraph,
    NavigationRoute, NodeId, NodeScope, PathResult, Position, RoadSystem, RouteInstruction,
    RouteSegment, StageKind,
};

/// Error type for route composition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComposeError {
    /// A stage search failed.
    #[error("{stage} stage failed: {source}")]
    Path {
        /// Stage that failed.
        stage: StageKind,
        /// Pathfinder error.
        source: PathError,
    },
    /// No usable elevator/stairs on a floor.
    #[error("No vertical circulation on floor {floor_id} reaching floor {target_floor_id}")]
    MissingVerticalCirculation {
        /// Floor searched.
        floor_id: String,
        /// Floor to reach.
        target_floor_id: String,
    },
    /// The chosen circulation landmark has no counterpart on the target floor.
    #[error("Landmark {landmark_id} has no counterpart on floor {target_floor_id}")]
    MissingCorrespondingLandmark {
        /// Landmark chosen on the current floor.
        landmark_id: String,
        /// Floor to reach.
        target_floor_id: String,
    },
    /// Building has no ground floor to leave or enter through.
    #[error("Building {building_id} has no ground floor")]
    MissingGroundFloor {
        /// Building ID.
        building_id: String,
    },
    /// Ground floor has no exit.
    #[error("Building {building_id} has no exit")]
    MissingExit {
        /// Building ID.
        building_id: String,
    },
    /// Ground floor has no entrance.
    #[error("Building {building_id} has no entrance")]
    MissingEntrance {
        /// Building ID.
        building_id: String,
    },
    /// Context names a building the road system does not contain.
    #[error("Unknown building: {0}")]
    UnknownBuilding(String),
}

/// Where the next stage starts.
#[derive(Debug, Clone)]
struct Cursor {
    endpoint: Endpoint,
    position: Position,
}

impl Cursor {
    fn at_position(position: Position, scope: NodeScope) -> Self {
        Self { endpoint: Endpoint::Position { position, scope }, position }
    }

    fn at_node(id: NodeId, position: Position) -> Self {
        Self { endpoint: Endpoint::Node { id }, position }
    }
}

/// Stage results gathered so far.
#[derive(Debug, Default)]
struct RouteAccumulator {
    waypoints: Vec<Position>,
    total_distance: f64,
    instructions: Vec<RouteInstruction>,
    arrival: Option<RouteInstruction>,
    floor_transitions: Vec<FloorTransition>,
    segments: Vec<RouteSegment>,
    visited: BTreeSet<NodeId>,
}

impl RouteAccumulator {
    fn push(&mut self, stage: StageKind, floor_id: Option<&str>, mut result: PathResult) {
        let mut added = 0;
        for point in result.waypoints {
            if self.waypoints.last() != Some(&point) {
                self.waypoints.push(point);
                added += 1;
            }
        }
        if result.instructions.last().map(|i| i.maneuver) == Some(Maneuver::Arrive) {
            self.arrival = result.instructions.pop();
        }
        self.instructions.append(&mut result.instructions);
        self.floor_transitions.append(&mut result.floor_transitions);
        self.visited.extend(result.nodes.iter().copied());
        self.total_distance += result.total_distance;
        self.segments.push(RouteSegment {
            stage,
            distance_m: result.total_distance,
            floor_id: floor_id.map(str::to_string),
            waypoint_count: added,
        });
    }

    fn announce(&mut self, maneuver: Maneuver, text: String, position: Position) {
        self.instructions.push(RouteInstruction::announcement(maneuver, text, position));
    }
}

/// Composes end-to-end routes over one road system and its graph.
#[derive(Debug, Clone)]
pub struct RouteComposer<'a> {
    system: &'a RoadSystem,
    pathfinder: Pathfinder<'a>,
}

impl<'a> RouteComposer<'a> {
    /// Create a composer with the default policy.
    pub fn new(system: &'a RoadSystem, graph: &'a NavigationGraph) -> Self {
        Self::with_policy(system, graph, RoutingPolicyV1::default())
    }

    /// Create a composer with a policy.
    ///
    /// `graph` must have been built from `system`.
    pub fn with_policy(system: &'a RoadSystem, graph: &'a NavigationGraph, policy: RoutingPolicyV1) -> Self {
        Self { system, pathfinder: Pathfinder::with_policy(graph, policy) }
    }

    fn graph(&self) -> &'a NavigationGraph {
        self.pathfinder.graph()
    }

    fn policy(&self) -> &RoutingPolicyV1 {
        self.pathfinder.policy()
    }

    /// Compose a route between two positions.
    pub fn compose(
        &self,
        from: Position,
        to: Position,
        context: &NavigationContext,
        prefer_elevator: bool,
    ) -> Result<NavigationRoute, ComposeError> {
        let context = context.resolve(self.system);
        let kind = classify_route(&context);
        tracing::debug!(%kind, prefer_elevator, "composing route");

        let mut acc = RouteAccumulator::default();
        let start_floor = context.start_floor_id.as_deref();
        let end_floor = context.end_floor_id.as_deref();

        match (kind, start_floor, end_floor) {
            (RouteKind::OutdoorOnly, _, _) => {
                let start = Cursor::at_position(from, NodeScope::Outdoor);
                let goal = Cursor::at_position(to, NodeScope::Outdoor);
                self.walk(&mut acc, StageKind::Outdoor, None, &start, &goal, prefer_elevator)?;
            }
            (RouteKind::SameFloor, Some(floor), _) => {
                let start = floor_cursor(from, floor);
                let goal = floor_cursor(to, floor);
                self.walk(&mut acc, StageKind::Indoor, Some(floor), &start, &goal, prefer_elevator)?;
            }
            (RouteKind::SameBuilding, Some(start_floor), Some(end_floor)) => {
                let start = floor_cursor(from, start_floor);
                let arrived = self.change_floor(&mut acc, start, start_floor, end_floor, prefer_elevator)?;
                self.walk(&mut acc, StageKind::Indoor, Some(end_floor), &arrived, &floor_cursor(to, end_floor), prefer_elevator)?;
            }
            (RouteKind::IndoorToOutdoor, Some(start_floor), _) => {
                let start = floor_cursor(from, start_floor);
                let outside = self.leave_building(&mut acc, start, start_floor, to, prefer_elevator)?;
                let goal = Cursor::at_position(to, NodeScope::Outdoor);
                self.walk(&mut acc, StageKind::Outdoor, None, &outside, &goal, prefer_elevator)?;
            }
            (RouteKind::OutdoorToIndoor, _, Some(end_floor)) => {
                let start = Cursor::at_position(from, NodeScope::Outdoor);
                let inside = self.enter_building(&mut acc, start, end_floor, prefer_elevator)?;
                self.walk(&mut acc, StageKind::Indoor, Some(end_floor), &inside, &floor_cursor(to, end_floor), prefer_elevator)?;
            }
            (RouteKind::DifferentBuildings, Some(start_floor), Some(end_floor)) => {
                let target = self
                    .system
                    .floor(end_floor)
                    .map(|(building, _)| building.center)
                    .unwrap_or(to);
                let start = floor_cursor(from, start_floor);
                let outside = self.leave_building(&mut acc, start, start_floor, target, prefer_elevator)?;
                let inside = self.enter_building(&mut acc, outside, end_floor, prefer_elevator)?;
                self.walk(&mut acc, StageKind::Indoor, Some(end_floor), &inside, &floor_cursor(to, end_floor), prefer_elevator)?;
            }
            // Indoor kinds always carry their floor IDs after resolution.
            (_, _, _) => {
                let start = Cursor::at_position(from, NodeScope::Any);
                let goal = Cursor::at_position(to, NodeScope::Any);
                self.walk(&mut acc, StageKind::Outdoor, None, &start, &goal, prefer_elevator)?;
            }
        }

        Ok(self.finish(kind, acc))
    }

    /// Run one pathfinder stage and accumulate it.
    fn walk(
        &self,
        acc: &mut RouteAccumulator,
        stage: StageKind,
        floor_id: Option<&str>,
        from: &Cursor,
        to: &Cursor,
        prefer_elevator: bool,
    ) -> Result<(), ComposeError> {
        let options = PathOptions::prefer_elevator(prefer_elevator).excluding(acc.visited.iter().copied());
        let result = self
            .pathfinder
            .find_path_endpoints(&from.endpoint, &to.endpoint, &options)
            .map_err(|source| ComposeError::Path { stage, source })?;
        tracing::debug!(%stage, hops = result.hop_count(), distance = result.total_distance, "stage composed");
        acc.push(stage, floor_id, result);
        Ok(())
    }

    /// Walk to a circulation landmark and ride it to `target_floor_id`.
    fn change_floor(
        &self,
        acc: &mut RouteAccumulator,
        cursor: Cursor,
        floor_id: &str,
        target_floor_id: &str,
        prefer_elevator: bool,
    ) -> Result<Cursor, ComposeError> {
        if floor_id == target_floor_id {
            return Ok(cursor);
        }
        let (building, floor) = self.system.floor(floor_id).ok_or_else(|| {
            ComposeError::MissingVerticalCirculation {
                floor_id: floor_id.to_string(),
                target_floor_id: target_floor_id.to_string(),
            }
        })?;
        let circulation = self
            .select_circulation(floor, target_floor_id, cursor.position, prefer_elevator)
            .ok_or_else(|| ComposeError::MissingVerticalCirculation {
                floor_id: floor_id.to_string(),
                target_floor_id: target_floor_id.to_string(),
            })?;
        let chain = self.circulation_chain(building, circulation, floor_id, target_floor_id)?;
        let counterpart = chain.last().copied().unwrap_or(circulation);

        let boarding = self.landmark_node(circulation, StageKind::Indoor)?;
        let alighting = self.landmark_node(counterpart, StageKind::Vertical)?;

        self.walk(
            acc,
            StageKind::Indoor,
            Some(floor_id),
            &cursor,
            &Cursor::at_node(boarding, circulation.position),
            prefer_elevator,
        )?;

        let options = PathOptions::prefer_elevator(prefer_elevator);
        let nodes = chain
            .iter()
            .map(|landmark| self.landmark_node(landmark, StageKind::Vertical))
            .collect::<Result<Vec<_>, _>>()?;
        let ride = self
            .pathfinder
            .path_along(&nodes, &options)
            .or_else(|_| self.pathfinder.find_path_between(boarding, alighting, &options))
            .map_err(|source| ComposeError::Path { stage: StageKind::Vertical, source })?;

        tracing::debug!(
            landmark_id = %circulation.id,
            from = floor_id,
            to = target_floor_id,
            transitions = ride.floor_transitions.len(),
            "floor change composed"
        );
        acc.push(StageKind::Vertical, Some(target_floor_id), ride);
        Ok(Cursor::at_node(alighting, counterpart.position))
    }

    /// Descend to the ground floor, walk to the exit nearest `toward`, and
    /// step outside.
    fn leave_building(
        &self,
        acc: &mut RouteAccumulator,
        cursor: Cursor,
        floor_id: &str,
        toward: Position,
        prefer_elevator: bool,
    ) -> Result<Cursor, ComposeError> {
        let building = self.building_of(floor_id)?;
        let ground = building.ground_floor().ok_or_else(|| ComposeError::MissingGroundFloor {
            building_id: building.id.clone(),
        })?;
        let exit = nearest_portal(ground, toward).ok_or_else(|| ComposeError::MissingExit {
            building_id: building.id.clone(),
        })?;
        let exit_node = self.landmark_node(exit, StageKind::Indoor)?;

        let cursor = self.change_floor(acc, cursor, floor_id, &ground.id, prefer_elevator)?;
        self.walk(
            acc,
            StageKind::Indoor,
            Some(&ground.id),
            &cursor,
            &Cursor::at_node(exit_node, exit.position),
            prefer_elevator,
        )?;
        acc.announce(Maneuver::ExitBuilding, format!("Exit {}", building.name), exit.position);
        Ok(Cursor::at_node(exit_node, exit.position))
    }

    /// Walk outdoors to the entrance nearest the cursor, step inside, and
    /// climb to `floor_id`.
    fn enter_building(
        &self,
        acc: &mut RouteAccumulator,
        cursor: Cursor,
        floor_id: &str,
        prefer_elevator: bool,
    ) -> Result<Cursor, ComposeError> {
        let building = self.building_of(floor_id)?;
        let ground = building.ground_floor().ok_or_else(|| ComposeError::MissingGroundFloor {
            building_id: building.id.clone(),
        })?;
        let entrance = nearest_portal(ground, cursor.position).ok_or_else(|| ComposeError::MissingEntrance {
            building_id: building.id.clone(),
        })?;
        let entrance_node = self.landmark_node(entrance, StageKind::Outdoor)?;

        let entered = Cursor::at_node(entrance_node, entrance.position);
        self.walk(acc, StageKind::Outdoor, None, &cursor, &entered, prefer_elevator)?;
        acc.announce(Maneuver::EnterBuilding, format!("Enter {}", building.name), entrance.position);
        self.change_floor(acc, entered, &ground.id, floor_id, prefer_elevator)
    }

    /// Best circulation landmark on `floor` reaching `target_floor_id`.
    fn select_circulation<'f>(
        &self,
        floor: &'f Floor,
        target_floor_id: &str,
        from: Position,
        prefer_elevator: bool,
    ) -> Option<&'f Landmark> {
        let preferred = if prefer_elevator { LandmarkType::Elevator } else { LandmarkType::Stairs };
        let mut candidates: Vec<(bool, f64, &Landmark)> = floor
            .vertical_circulation()
            .filter(|l| l.connects_to(target_floor_id))
            .filter(|l| self.graph().node_id(&l.id).is_some())
            .map(|l| (l.landmark_type != preferred, from.distance_to(&l.position), l))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));
        candidates.first().map(|c| c.2)
    }

    /// The landmark on `target` that continues `landmark`: the same-type
    /// landmark of the same name, or failing that the same-type landmark
    /// within the correspondence tolerance.
    fn corresponding_landmark<'f>(&self, target: &'f Floor, landmark: &Landmark) -> Option<&'f Landmark> {
        let tolerance = self.policy().correspondence_tolerance_m;
        let kind = landmark.landmark_type;
        let same_type = move || target.vertical_circulation().filter(move |l| l.landmark_type == kind);
        same_type()
            .find(|l| l.name == landmark.name)
            .or_else(|| same_type().find(|l| l.position.distance_to(&landmark.position) <= tolerance))
    }

    /// Landmarks ridden from `landmark` to the target floor, in travel order.
    ///
    /// The chain starts at `landmark` and steps floor by floor through the
    /// building. Intermediate floors without a continuation are passed over;
    /// the target floor must have one.
    fn circulation_chain<'b>(
        &self,
        building: &'b Building,
        landmark: &'b Landmark,
        floor_id: &str,
        target_floor_id: &str,
    ) -> Result<Vec<&'b Landmark>, ComposeError> {
        let missing = || ComposeError::MissingCorrespondingLandmark {
            landmark_id: landmark.id.clone(),
            target_floor_id: target_floor_id.to_string(),
        };
        let (Some(from), Some(to)) = (building.floor(floor_id), building.floor(target_floor_id)) else {
            return Err(missing());
        };
        let ascending = to.level > from.level;
        let mut between: Vec<&Floor> = building
            .floors
            .iter()
            .filter(|f| {
                if ascending {
                    f.level > from.level && f.level < to.level
                } else {
                    f.level < from.level && f.level > to.level
                }
            })
            .collect();
        between.sort_by_key(|f| f.level);
        if !ascending {
            between.reverse();
        }

        let mut chain = vec![landmark];
        let mut current = landmark;
        for floor in between {
            if let Some(next) = self.corresponding_landmark(floor, current) {
                chain.push(next);
                current = next;
            }
        }
        let last = self.corresponding_landmark(to, current).ok_or_else(missing)?;
        chain.push(last);
        Ok(chain)
    }

    fn building_of(&self, floor_id: &str) -> Result<&'a Building, ComposeError> {
        self.system
            .floor(floor_id)
            .map(|(building, _)| building)
            .ok_or_else(|| ComposeError::UnknownBuilding(floor_id.to_string()))
    }

    fn landmark_node(&self, landmark: &Landmark, stage: StageKind) -> Result<NodeId, ComposeError> {
        self.graph()
            .node_id(&landmark.id)
            .ok_or_else(|| ComposeError::Path { stage, source: PathError::NodeNotFound(landmark.id.clone()) })
    }

    fn finish(&self, kind: RouteKind, mut acc: RouteAccumulator) -> NavigationRoute {
        acc.instructions.extend(acc.arrival.take());

        let floors_changed: i32 = acc
            .floor_transitions
            .iter()
            .map(|t| {
                let level = |id: &str| self.graph().floor_info(id).map(|f| f.level).unwrap_or(0);
                (level(&t.to_floor_id) - level(&t.from_floor_id)).abs()
            })
            .sum();
        let policy = self.policy();
        let estimated_duration_secs = acc.total_distance / policy.walking_speed_mps
            + f64::from(floors_changed) * policy.floor_change_secs;

        tracing::debug!(
            %kind,
            stages = acc.segments.len(),
            total_distance = acc.total_distance,
            transitions = acc.floor_transitions.len(),
            "route composed"
        );

        NavigationRoute {
            kind,
            waypoints: acc.waypoints,
            total_distance: acc.total_distance,
            instructions: acc.instructions,
            floor_transitions: acc.floor_transitions,
            segments: acc.segments,
            estimated_duration_secs,
        }
    }
}

fn floor_cursor(position: Position, floor_id: &str) -> Cursor {
    Cursor::at_position(position, NodeScope::Floor { floor_id: floor_id.to_string() })
}

/// Entrance or exit landmark on `ground` closest to `toward`.
fn nearest_portal(ground: &Floor, toward: Position) -> Option<&Landmark> {
    ground
        .entrances()
        .min_by(|a, b| a.position.distance_to(&toward).total_cmp(&b.position.distance_to(&toward)))
}

/// Build a graph for `system` and compose one route over it.
pub fn compose_route(
    system: &RoadSystem,
    from: Position,
    to: Position,
    context: &NavigationContext,
    prefer_elevator: bool,
) -> Result<NavigationRoute, ComposeError> {
    let graph = GraphBuilder::default().build(system);
    RouteComposer::new(system, &graph).compose(from, to, context, prefer_elevator)
}
