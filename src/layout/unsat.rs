//! Explaining solver failures
//!
//! When the solver rejects a constraint, [`minimal_conflicting_set`] shrinks the
//! constraints accepted before it down to a subset that still conflicts with
//! the rejected one. The result is only *locally* minimal: no single member can
//! be dropped, but a smaller conflicting subset may exist elsewhere.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::config::LayoutConfig;
use super::constraints::{ConstraintSource, LayoutConstraint};
use super::error::LayoutError;
use super::solver::{ConstraintValidator, SolverError};

/// A rejected constraint and the accepted constraints it conflicts with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionalConflict {
    pub constraint: LayoutConstraint,
    pub minimal_conflicting: Vec<LayoutConstraint>,
}

impl PositionalConflict {
    /// Every constraint involved, the rejected one last
    pub fn constraints(&self) -> Vec<&LayoutConstraint> {
        self.minimal_conflicting
            .iter()
            .chain(std::iter::once(&self.constraint))
            .collect()
    }

    /// The rules behind the conflict, de-duplicated, in the order they appear
    pub fn sources(&self) -> Vec<&ConstraintSource> {
        let mut sources: Vec<&ConstraintSource> = Vec::new();
        for constraint in self.constraints() {
            let source = constraint.source();
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }
}

impl fmt::Display for PositionalConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Layout constraints cannot all be satisfied.")?;
        writeln!(f, "Conflicting rules:")?;
        for source in self.sources() {
            writeln!(f, "  - {}", source)?;
        }
        write!(f, "Conflicting node constraints:")?;
        for constraint in self.constraints() {
            write!(f, "\n  - {}", constraint)?;
        }
        Ok(())
    }
}

/// Whether `constraint` is rejected on top of `base`
fn conflicts(
    node_ids: &[&str],
    base: &[LayoutConstraint],
    constraint: &LayoutConstraint,
    config: &LayoutConfig,
) -> bool {
    let Ok(mut validator) = ConstraintValidator::new(node_ids.iter().copied(), config) else {
        return false;
    };
    let outcome = validator
        .add_all(base)
        .and_then(|()| validator.add_constraint(constraint));
    matches!(outcome, Err(SolverError::Unsatisfiable { .. }))
}

/// Shrink `accepted` to a locally minimal subset that still rejects `constraint`.
///
/// Each pass tries to drop every member once, re-solving a fresh solver each
/// time; a drop that keeps the set infeasible is made permanent. Passes repeat
/// until one removes nothing.
pub fn minimal_conflicting_set(
    constraint: &LayoutConstraint,
    accepted: &[LayoutConstraint],
    node_ids: &[&str],
    config: &LayoutConfig,
) -> Vec<LayoutConstraint> {
    let mut core = accepted.to_vec();

    loop {
        let mut shrunk = false;
        let mut i = 0;
        while i < core.len() {
            let mut trial = core.clone();
            trial.remove(i);
            if conflicts(node_ids, &trial, constraint, config) {
                core = trial;
                shrunk = true;
            } else {
                i += 1;
            }
        }
        if !shrunk {
            break;
        }
    }

    debug!(
        accepted = accepted.len(),
        core = core.len(),
        "Reduced conflicting constraint set"
    );
    core
}

/// Turn a solver failure into a user-facing layout error
pub fn diagnose(error: SolverError, node_ids: &[&str], config: &LayoutConfig) -> LayoutError {
    match error {
        SolverError::Unsatisfiable {
            constraint,
            accepted,
        } => {
            let minimal_conflicting =
                minimal_conflicting_set(&constraint, &accepted, node_ids, config);
            LayoutError::Conflict(Box::new(PositionalConflict {
                constraint: *constraint,
                minimal_conflicting,
            }))
        }
        SolverError::MissingNode { node, constraint } => {
            LayoutError::missing_node(node, constraint.to_string())
        }
        internal @ SolverError::Internal(_) => LayoutError::Solver(internal),
    }
}
