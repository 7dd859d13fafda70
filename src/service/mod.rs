//! Wayfinding REST Service
//!
//! Exposes the routing kernel over HTTP against one served road system.
//!
//! ## Endpoints
//!
//! - `POST /api/path` - Path between two node keys
//! - `POST /api/path/positions` - Path between two positions
//! - `POST /api/route` - Composed route across floors and buildings
//! - `POST /api/classify` - Classify a navigation context
//! - `GET /api/graph/stats` - Graph statistics and cache counters
//! - `GET /api/validate` - Validate the served road system
//! - `PUT /api/road-system` - Replace the served road system
//! - `GET /api/policies` - List registered policies
//! - `POST /api/policies` - Register a new policy
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_path_metrics, record_route_metrics};
pub use routes::{create_router, ErrorResponse};
pub use state::{PolicyRef, PolicyRegistry, RoadSystemSnapshot, ServiceState, StateError};
