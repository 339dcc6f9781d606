//! Layout engine for relational model instances
//!
//! This module turns an [`Instance`](crate::instance::Instance) and a
//! [`LayoutSpec`](crate::spec::LayoutSpec) into an [`InstanceLayout`]: visible
//! nodes and edges, groups, and the geometric constraints their solved
//! positions satisfy.

pub mod compiler;
pub mod config;
pub mod constraints;
pub mod cyclic;
pub mod engine;
pub mod error;
pub mod extract;
pub mod graph;
pub mod groups;
pub mod solver;
pub mod types;
pub mod unsat;

pub use config::{Canvas, ConfigError, LayoutConfig};
pub use constraints::{Axis, ConstraintSource, LayoutConstraint};
pub use engine::LayoutInstance;
pub use error::LayoutError;
pub use graph::{GraphBuilder, GraphEdge, LayoutGraph};
pub use groups::validate_group_nesting;
pub use solver::{ConstraintValidator, Solution, SolverError};
pub use types::*;
pub use unsat::PositionalConflict;
