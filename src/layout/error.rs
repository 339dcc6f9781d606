//! Error types for the layout engine

use thiserror::Error;

use crate::instance::ProjectionError;
use crate::selector::SelectorError;
use crate::spec::SpecError;

use super::solver::SolverError;
use super::unsat::PositionalConflict;

/// Errors that can occur during layout computation
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The specification is inconsistent with itself or with the instance
    #[error("invalid layout specification: {0}")]
    Configuration(#[from] SpecError),

    #[error("projection failed: {0}")]
    Projection(#[from] ProjectionError),

    #[error("selector evaluation failed: {0}")]
    Selector(#[from] SelectorError),

    /// Position constraints that cannot all be satisfied
    #[error("{0}")]
    Conflict(Box<PositionalConflict>),

    /// Two groups share atoms but neither contains the other
    #[error(
        "groups '{first}' and '{second}' overlap on [{}] but neither contains the other",
        atoms.join(", ")
    )]
    GroupOverlap {
        first: String,
        second: String,
        atoms: Vec<String>,
    },

    /// Every rotation of some cyclic fragment conflicts with the rest of the layout
    #[error("cyclic constraint on '{selector}' cannot be satisfied at any rotation\n{conflict}")]
    CyclicSearchExhausted {
        selector: String,
        conflict: Box<PositionalConflict>,
    },

    #[error(
        "constraint '{constraint}' refers to node '{node}', which is not in the layout \
         (it may have been hidden or projected away)"
    )]
    MissingNode { node: String, constraint: String },

    #[error("cyclic layout search gave up after {attempts} attempts")]
    SearchBudgetExhausted { attempts: usize },

    /// A cyclic rule's relation has too many paths to enumerate
    #[error("cyclic constraint on '{selector}' has more than {limit} paths")]
    PathBudgetExhausted { selector: String, limit: usize },

    /// Constraint solver error
    #[error("constraint solver error: {0}")]
    Solver(#[from] SolverError),
}

impl LayoutError {
    /// Create a missing node error
    pub fn missing_node(node: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::MissingNode {
            node: node.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a group overlap error
    pub fn group_overlap(
        first: impl Into<String>,
        second: impl Into<String>,
        atoms: Vec<String>,
    ) -> Self {
        Self::GroupOverlap {
            first: first.into(),
            second: second.into(),
            atoms,
        }
    }

    /// The constraint conflict behind this error, if any
    pub fn conflict(&self) -> Option<&PositionalConflict> {
        match self {
            Self::Conflict(conflict) => Some(conflict),
            Self::CyclicSearchExhausted { conflict, .. } => Some(conflict),
            _ => None,
        }
    }

    /// Configuration errors are caused by the specification, not the instance geometry
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::Projection(_)
                | Self::Selector(_)
                | Self::GroupOverlap { .. }
        )
    }
}
