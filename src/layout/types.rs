//! Core types for the layout artifact

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::instance::ProjectionChoice;

use super::constraints::LayoutConstraint;

/// A 2D point in the coordinate system
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeIcon {
    pub path: String,
    pub show_labels: bool,
}

/// A positioned atom
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub id: String,
    pub color: String,
    pub size: Size,
    pub icon: Option<NodeIcon>,
    /// Relation label -> target atoms absorbed from attribute fields
    pub attributes: IndexMap<String, Vec<String>>,
    /// Names of the groups this node belongs to
    pub groups: Vec<String>,
    pub most_specific_type: String,
    /// Most-specific type first
    pub types: Vec<String>,
    pub position: Point,
}

/// Routing category encoded in an edge id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Relation,
    Inferred,
    Group { group_on: usize, add_to_group: usize },
    Alignment,
    Hidden,
}

pub const INFERRED_PREFIX: &str = "_inferred_";
pub const GROUP_PREFIX: &str = "_g_";
pub const ALIGNMENT_PREFIX: &str = "_alignment_";
pub const HIDDEN_PREFIX: &str = "_h_";

impl EdgeKind {
    /// Decode the routing category from an edge id
    pub fn of(id: &str) -> EdgeKind {
        if id.starts_with(HIDDEN_PREFIX) {
            EdgeKind::Hidden
        } else if id.starts_with(ALIGNMENT_PREFIX) {
            EdgeKind::Alignment
        } else if id.starts_with(INFERRED_PREFIX) {
            EdgeKind::Inferred
        } else if let Some(rest) = id.strip_prefix(GROUP_PREFIX) {
            let mut parts = rest.splitn(3, '_');
            let group_on = parts.next().and_then(|p| p.parse().ok());
            let add_to_group = parts.next().and_then(|p| p.parse().ok());
            match (group_on, add_to_group) {
                (Some(group_on), Some(add_to_group)) => EdgeKind::Group {
                    group_on,
                    add_to_group,
                },
                _ => EdgeKind::Relation,
            }
        } else {
            EdgeKind::Relation
        }
    }

    /// Id of the synthetic edge standing for a whole group
    pub fn group_edge_id(group_on: usize, add_to_group: usize, suffix: &str) -> String {
        format!("{}{}_{}_{}", GROUP_PREFIX, group_on, add_to_group, suffix)
    }
}

/// A routed connection between two nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEdge {
    pub source: String,
    pub target: String,
    pub relation_name: String,
    pub label: String,
    pub id: String,
}

impl LayoutEdge {
    pub fn kind(&self) -> EdgeKind {
        EdgeKind::of(&self.id)
    }
}

/// A named set of nodes drawn inside one bounding box
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutGroup {
    pub name: String,
    pub node_ids: Vec<String>,
    /// Node that group-incident edges attach to
    pub key_node_id: String,
    pub show_label: bool,
}

impl LayoutGroup {
    pub fn contains(&self, node: &str) -> bool {
        self.node_ids.iter().any(|n| n == node)
    }

    /// Every member of `self` is a member of `other`
    pub fn is_subgroup_of(&self, other: &LayoutGroup) -> bool {
        self.node_ids.iter().all(|n| other.contains(n))
    }
}

/// The terminal artifact of one layout computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub constraints: Vec<LayoutConstraint>,
    pub groups: Vec<LayoutGroup>,
}

impl InstanceLayout {
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn group(&self, name: &str) -> Option<&LayoutGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// The same layout without hidden edges
    pub fn filter_hidden_edges(mut self) -> Self {
        self.edges = filter_hidden_edges(self.edges);
        self
    }
}

/// Drop hidden (`_h_`) edges; applying it twice is the same as once
pub fn filter_hidden_edges(edges: Vec<LayoutEdge>) -> Vec<LayoutEdge> {
    edges
        .into_iter()
        .filter(|e| e.kind() != EdgeKind::Hidden)
        .collect()
}

/// A finished layout plus the projection choices it was computed under
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub layout: InstanceLayout,
    pub projections: Vec<ProjectionChoice>,
}

impl fmt::Display for LayoutNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at ({:.1}, {:.1})",
            self.id, self.most_specific_type, self.position.x, self.position.y
        )
    }
}
