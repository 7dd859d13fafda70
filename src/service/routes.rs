//! Axum routes for the wayfinding service.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::CacheStats;
use crate::composer::{ComposeError, RouteComposer};
use crate::context::{NavigationContext, RouteKind};
use crate::pathfinder::{PathError, PathOptions, Pathfinder};
use crate::policy::RoutingPolicyV1;
use crate::types::{GraphStats, NavigationGraph, NavigationRoute, PathResult, Position, RoadSystem, ValidationResult};
use crate::validator::NetworkValidator;
use crate::WAYFINDING_SCHEMA_VERSION;

use super::middleware::{record_path_metrics, record_route_metrics};
use super::state::{PolicyRef, ServiceState};

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request for a path between two node keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRequest {
    /// Start node key.
    pub from: String,
    /// Goal node key.
    pub to: String,
    /// Search options.
    #[serde(default)]
    pub options: PathOptions,
    /// Optional policy reference. If not provided, uses default policy.
    pub policy_ref: Option<PolicyRef>,
}

/// Request for a path between two positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionPathRequest {
    /// Start position.
    pub from: Position,
    /// End position.
    pub to: Position,
    /// Floors/buildings the positions lie on.
    #[serde(default)]
    pub context: NavigationContext,
    /// Search options.
    #[serde(default)]
    pub options: PathOptions,
    /// Optional policy reference.
    pub policy_ref: Option<PolicyRef>,
}

/// Response containing a path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathResponse {
    /// The path.
    pub path: PathResult,
    /// Stable keys of the visited nodes.
    pub node_keys: Vec<String>,
    /// Fingerprint of the graph searched.
    pub graph_fingerprint: String,
    /// Policy used.
    pub policy_ref: PolicyRef,
}

/// Request for a composed route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Start position.
    pub from: Position,
    /// End position.
    pub to: Position,
    /// Floors/buildings the positions lie on.
    #[serde(default)]
    pub context: NavigationContext,
    /// Prefer elevators for floor changes.
    #[serde(default = "default_prefer_elevator")]
    pub prefer_elevator: bool,
    /// Optional policy reference.
    pub policy_ref: Option<PolicyRef>,
}

fn default_prefer_elevator() -> bool {
    true
}

/// Response containing a composed route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    /// The route.
    pub route: NavigationRoute,
    /// Policy used.
    pub policy_ref: PolicyRef,
}

/// Classification response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    /// Route shape.
    pub kind: RouteKind,
    /// Context after deriving buildings from floors.
    pub context: NavigationContext,
}

/// Graph statistics for the current road system.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStatsResponse {
    /// Node/edge counts.
    pub stats: GraphStats,
    /// Graph fingerprint under the default policy.
    pub graph_fingerprint: String,
    /// Road system fingerprint.
    pub road_system_fingerprint: String,
    /// Graph cache counters.
    pub cache: CacheStats,
}

/// Response to a road-system replacement.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaceRoadSystemResponse {
    /// Fingerprint of the installed road system.
    pub fingerprint: String,
    /// Validation of the installed road system.
    pub validation: ValidationResult,
}

/// Request to register a new policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPolicyRequest {
    /// Policy to register.
    pub policy: RoutingPolicyV1,
}

/// Response containing a policy reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRefResponse {
    /// Reference to the registered policy.
    pub policy_ref: PolicyRef,
}

/// List of registered policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyListResponse {
    /// Registered references.
    pub policies: Vec<PolicyRef>,
    /// Registry fingerprint.
    pub registry_fingerprint: String,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy", or "empty" when no road system is loaded.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Schema version.
    pub schema_version: String,
    /// Registered policies.
    pub policy_count: usize,
    /// Registry fingerprint.
    pub registry_fingerprint: String,
    /// Fingerprint of the served road system.
    pub road_system_fingerprint: String,
    /// Buildings in the served road system.
    pub building_count: usize,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always "alive".
    pub status: String,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Log the error and pair it with its status.
    fn with_status(self, status: StatusCode) -> ApiError {
        tracing::warn!(
            status = status.as_u16(),
            code = %self.code,
            error = %self.error,
            "Request error"
        );
        (status, Json(self))
    }
}

fn path_error_body(err: &PathError) -> (StatusCode, ErrorResponse) {
    let (status, code) = match err {
        PathError::NodeNotFound(_) => (StatusCode::NOT_FOUND, "NODE_NOT_FOUND"),
        PathError::NoPathFound { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "NO_PATH_FOUND"),
        PathError::NoNearbyNode { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "NO_NEARBY_NODE"),
    };
    (status, ErrorResponse::new(code, err.to_string()))
}

fn path_error(err: PathError) -> ApiError {
    let (status, body) = path_error_body(&err);
    body.with_status(status)
}

fn compose_error(err: ComposeError) -> ApiError {
    match err {
        ComposeError::Path { stage, source } => {
            let (status, body) = path_error_body(&source);
            body.with_details(format!("{} stage", stage)).with_status(status)
        }
        ComposeError::UnknownBuilding(id) => {
            ErrorResponse::new("BUILDING_NOT_FOUND", format!("Unknown building: {}", id)).with_status(StatusCode::NOT_FOUND)
        }
        other => ErrorResponse::new("ROUTE_NOT_COMPOSABLE", other.to_string()).with_status(StatusCode::UNPROCESSABLE_ENTITY),
    }
}

fn resolve_policy(state: &ServiceState, policy_ref: Option<&PolicyRef>) -> Result<(RoutingPolicyV1, PolicyRef), ApiError> {
    state.resolve_policy(policy_ref).ok_or_else(|| {
        ErrorResponse::new("POLICY_NOT_FOUND", format!("Policy not found: {:?}", policy_ref))
            .with_status(StatusCode::NOT_FOUND)
    })
}

fn path_response(graph: &NavigationGraph, path: PathResult, policy_ref: PolicyRef) -> PathResponse {
    let node_keys = path
        .nodes
        .iter()
        .filter_map(|&id| graph.node(id).map(|n| n.key.clone()))
        .collect();
    PathResponse {
        path,
        node_keys,
        graph_fingerprint: graph.fingerprint(),
        policy_ref,
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Find a path between two node keys.
async fn path_handler(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<PathRequest>,
) -> Result<Json<PathResponse>, ApiError> {
    let start = Instant::now();
    let (policy, policy_ref) = resolve_policy(&state, request.policy_ref.as_ref())?;
    let (_snapshot, cached) = state.graph(&policy);

    let path = Pathfinder::with_policy(&cached.graph, policy)
        .find_path(&request.from, &request.to, &request.options)
        .map_err(path_error)?;

    record_path_metrics(path.hop_count(), path.nodes_expanded, cached.cache_hit, start.elapsed().as_millis() as u64);
    Ok(Json(path_response(&cached.graph, path, policy_ref)))
}

/// Find a path between two positions, snapping each to the graph.
async fn position_path_handler(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<PositionPathRequest>,
) -> Result<Json<PathResponse>, ApiError> {
    let start = Instant::now();
    let (policy, policy_ref) = resolve_policy(&state, request.policy_ref.as_ref())?;
    let (snapshot, cached) = state.graph(&policy);
    let context = request.context.resolve(&snapshot.road_system);

    let path = Pathfinder::with_policy(&cached.graph, policy)
        .find_path_from_positions(request.from, request.to, &context, &request.options)
        .map_err(path_error)?;

    record_path_metrics(path.hop_count(), path.nodes_expanded, cached.cache_hit, start.elapsed().as_millis() as u64);
    Ok(Json(path_response(&cached.graph, path, policy_ref)))
}

/// Compose a route across floors and buildings.
async fn route_handler(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    let start = Instant::now();
    let (policy, policy_ref) = resolve_policy(&state, request.policy_ref.as_ref())?;
    let (snapshot, cached) = state.graph(&policy);

    let route = RouteComposer::with_policy(&snapshot.road_system, &cached.graph, policy)
        .compose(request.from, request.to, &request.context, request.prefer_elevator)
        .map_err(compose_error)?;

    record_route_metrics(route.kind, route.segments.len(), route.total_distance, start.elapsed().as_millis() as u64);
    Ok(Json(RouteResponse { route, policy_ref }))
}

/// Classify a navigation context against the current road system.
async fn classify_handler(
    State(state): State<Arc<ServiceState>>,
    Json(context): Json<NavigationContext>,
) -> Json<ClassifyResponse> {
    let context = context.resolve(&state.snapshot().road_system);
    Json(ClassifyResponse { kind: context.kind(), context })
}

/// Validate the current road system.
async fn validate_handler(State(state): State<Arc<ServiceState>>) -> Json<ValidationResult> {
    let policy = RoutingPolicyV1::default();
    let (snapshot, cached) = state.graph(&policy);
    Json(NetworkValidator::new(policy).validate_with_graph(&snapshot.road_system, &cached.graph))
}

/// Graph statistics under the default policy.
async fn graph_stats_handler(State(state): State<Arc<ServiceState>>) -> Json<GraphStatsResponse> {
    let (snapshot, cached) = state.graph(&RoutingPolicyV1::default());
    Json(GraphStatsResponse {
        stats: cached.graph.stats(),
        graph_fingerprint: cached.graph.fingerprint(),
        road_system_fingerprint: snapshot.fingerprint.clone(),
        cache: state.graph_cache.stats(),
    })
}

/// Replace the served road system.
///
/// The new system is installed even when validation reports errors; the
/// validation result is returned so callers can decide what to do.
async fn replace_road_system_handler(
    State(state): State<Arc<ServiceState>>,
    Json(road_system): Json<RoadSystem>,
) -> Json<ReplaceRoadSystemResponse> {
    let validation = NetworkValidator::default().validate(&road_system);
    let fingerprint = state.replace_road_system(road_system);
    Json(ReplaceRoadSystemResponse { fingerprint, validation })
}

/// List registered policies.
async fn list_policies_handler(State(state): State<Arc<ServiceState>>) -> Json<PolicyListResponse> {
    let registry = state.policy_registry.read();
    Json(PolicyListResponse {
        policies: registry.list(),
        registry_fingerprint: registry.fingerprint().to_string(),
    })
}

/// Register a new policy.
async fn register_policy_handler(
    State(state): State<Arc<ServiceState>>,
    Json(request): Json<RegisterPolicyRequest>,
) -> Json<PolicyRefResponse> {
    let policy_ref = state.policy_registry.write().register(request.policy);
    Json(PolicyRefResponse { policy_ref })
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<ServiceState>>) -> Json<HealthResponse> {
    let (policy_count, registry_fingerprint) = {
        let registry = state.policy_registry.read();
        (registry.len(), registry.fingerprint().to_string())
    };
    let snapshot = state.snapshot();

    Json(HealthResponse {
        status: if snapshot.road_system.is_empty() { "empty" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: WAYFINDING_SCHEMA_VERSION.to_string(),
        policy_count,
        registry_fingerprint,
        road_system_fingerprint: snapshot.fingerprint.clone(),
        building_count: snapshot.road_system.buildings.len(),
    })
}

/// Liveness probe endpoint.
///
/// Returns 200 if the process is alive.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the wayfinding service.
pub fn create_router(state: ServiceState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Routing
        .route("/api/path", post(path_handler))
        .route("/api/path/positions", post(position_path_handler))
        .route("/api/route", post(route_handler))
        .route("/api/classify", post(classify_handler))
        // Network inspection
        .route("/api/graph/stats", get(graph_stats_handler))
        .route("/api/validate", get(validate_handler))
        .route("/api/road-system", put(replace_road_system_handler))
        // Policy management
        .route("/api/policies", get(list_policies_handler).post(register_policy_handler))
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .with_state(state)
}
