//! Network validation findings.
//!
//! ## Issue Taxonomy
//!
//! | Code | Severity | Category |
//! |------|----------|----------|
//! | MissingNode | ERROR | connectivity / accessibility |
//! | IsolatedNode | ERROR | connectivity / accessibility |
//! | DeadEnd | WARNING | navigation |
//! | InvalidRoadGeometry | ERROR (0 points) / WARNING (1 point) | data_integrity |
//! | ShortRoad | INFO | data_integrity |
//! | UnconnectedRoad | WARNING | navigation |
//! | MissingVerticalCirculation | ERROR | accessibility |
//! | UnlinkedVerticalCirculation | ERROR | accessibility |
//! | SingleFloorCirculation | WARNING | accessibility |
//! | MissingGroundFloor | WARNING | data_integrity |
//! | MissingEntrance | ERROR | accessibility |
//! | SingleEntrance | INFO | accessibility |
//! | DuplicateIdentifier | ERROR | data_integrity |
//! | EmptyNetwork | WARNING | data_integrity |
//! | DisconnectedNetwork | ERROR | connectivity |
//! | ComponentSize | INFO | connectivity |
//! | LargeNetwork | INFO | performance |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::geo::Position;

/// Severity levels for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational note.
    Info,
    /// Degrades navigation quality.
    Warning,
    /// Makes the network invalid.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Area a validation issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Graph reachability.
    Connectivity,
    /// Route quality.
    Navigation,
    /// Malformed or inconsistent input.
    DataIntegrity,
    /// Step-free and entrance coverage.
    Accessibility,
    /// Size and cost concerns.
    Performance,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity => write!(f, "connectivity"),
            Self::Navigation => write!(f, "navigation"),
            Self::DataIntegrity => write!(f, "data_integrity"),
            Self::Accessibility => write!(f, "accessibility"),
            Self::Performance => write!(f, "performance"),
        }
    }
}

/// Machine-readable issue code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Entity has no graph node.
    MissingNode,
    /// Node has no incident edges.
    IsolatedNode,
    /// Intersection with a single neighbor.
    DeadEnd,
    /// Road with fewer than two points.
    InvalidRoadGeometry,
    /// Road shorter than one meter.
    ShortRoad,
    /// Road without connected intersections.
    UnconnectedRoad,
    /// Multi-floor building without elevators or stairs.
    MissingVerticalCirculation,
    /// Circulation landmark with no connected floors.
    UnlinkedVerticalCirculation,
    /// Circulation landmark with one connected floor.
    SingleFloorCirculation,
    /// Building without a level-0 floor.
    MissingGroundFloor,
    /// Ground floor without entrances.
    MissingEntrance,
    /// Ground floor with a single entrance.
    SingleEntrance,
    /// ID used more than once.
    DuplicateIdentifier,
    /// Nothing to navigate.
    EmptyNetwork,
    /// More than one connected component.
    DisconnectedNetwork,
    /// Size of one connected component.
    ComponentSize,
    /// Graph larger than the configured threshold.
    LargeNetwork,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity.
    pub severity: Severity,
    /// Category.
    pub category: IssueCategory,
    /// Machine-readable code.
    pub code: IssueCode,
    /// Short human title.
    pub title: String,
    /// Human description.
    pub description: String,
    /// Where the problem is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Position>,
    /// Entity the problem is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
}

impl ValidationIssue {
    /// Create an issue without location or entity.
    pub fn new(
        severity: Severity,
        category: IssueCategory,
        code: IssueCode,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            code,
            title: title.into(),
            description: description.into(),
            location: None,
            related_entity_id: None,
        }
    }

    /// Attach a location.
    pub fn at(mut self, position: Position) -> Self {
        self.location = Some(position);
        self
    }

    /// Attach the related entity.
    pub fn about(mut self, entity_id: impl Into<String>) -> Self {
        self.related_entity_id = Some(entity_id.into());
        self
    }

    /// Whether this issue invalidates the network.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({}): {}", self.severity, self.title, self.category, self.description)
    }
}

/// Aggregate statistics gathered during validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatistics {
    /// Buildings.
    pub building_count: usize,
    /// Floors across all buildings.
    pub floor_count: usize,
    /// Roads, indoor and outdoor.
    pub road_count: usize,
    /// Intersections, indoor and outdoor.
    pub intersection_count: usize,
    /// Landmarks, indoor and outdoor.
    pub landmark_count: usize,
    /// Graph nodes.
    pub node_count: usize,
    /// Directed graph edges.
    pub edge_count: usize,
    /// Sum of road polyline lengths, in meters.
    pub total_road_length_m: f64,
    /// Vertical-circulation landmarks.
    pub vertical_circulation_count: usize,
    /// Elevator landmarks among them.
    pub elevator_count: usize,
    /// Stairs landmarks among them.
    pub stairs_count: usize,
    /// Escalator landmarks among them.
    pub escalator_count: usize,
    /// Connected components of the graph.
    pub component_count: usize,
    /// Nodes with no incident edges.
    pub isolated_node_count: usize,
    /// Intersections with one neighbor.
    pub dead_end_count: usize,
}

/// Outcome of validating a road system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff no issue has error severity.
    pub is_valid: bool,
    /// All findings, in check order.
    pub issues: Vec<ValidationIssue>,
    /// Aggregate statistics.
    pub statistics: NetworkStatistics,
    /// When validation ran.
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// Build a result; validity is derived from the issues.
    pub fn new(issues: Vec<ValidationIssue>, statistics: NetworkStatistics) -> Self {
        Self {
            is_valid: !issues.iter().any(ValidationIssue::is_error),
            issues,
            statistics,
            validated_at: Utc::now(),
        }
    }

    /// Issues of one severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == severity).collect()
    }

    /// Issues with one code.
    pub fn with_code(&self, code: IssueCode) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.code == code).collect()
    }

    /// Issues about one entity.
    pub fn for_entity(&self, entity_id: &str) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.related_entity_id.as_deref() == Some(entity_id))
            .collect()
    }

    /// Number of error-severity issues.
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }
}
