//! Constraint solver integration for layout computation
//!
//! This module wraps the kasuari Cassowary solver. Every node gets one x and one
//! y variable; geometric constraints are added one at a time as REQUIRED
//! relations, and the first constraint the solver rejects is reported together
//! with everything accepted before it.

use indexmap::IndexMap;
use kasuari::{Expression, Solver as KasuariSolver, Strength, Variable, WeightedRelation::*};
use thiserror::Error;
use tracing::trace;

use super::config::LayoutConfig;
use super::constraints::{Axis, ConstraintSource, LayoutConstraint};
use super::types::Point;

/// Ratio between the anchor weights of consecutive nodes.
///
/// Signed sums of distinct powers of 100/101 never cancel, so no two layouts
/// reachable by shifting nodes can tie on the anchor objective.
const ANCHOR_DECAY: f64 = 100.0 / 101.0;

/// Errors from the constraint solver
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    #[error("Unsatisfiable constraint: {constraint}")]
    Unsatisfiable {
        constraint: Box<LayoutConstraint>,
        /// Constraints accepted before the failing one, in insertion order
        accepted: Vec<LayoutConstraint>,
    },

    #[error("Constraint '{constraint}' refers to unknown node '{node}'")]
    MissingNode {
        node: String,
        constraint: Box<LayoutConstraint>,
    },

    #[error("Internal solver error: {0}")]
    Internal(String),
}

/// Solved node coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    positions: IndexMap<String, Point>,
}

impl Solution {
    pub fn get(&self, node: &str) -> Option<Point> {
        self.positions.get(node).copied()
    }

    /// Coordinates as a tuple, for [`LayoutConstraint::is_satisfied_by`]
    pub fn coords(&self, node: &str) -> Option<(f64, f64)> {
        self.get(node).map(|p| (p.x, p.y))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Point)> {
        self.positions.iter().map(|(id, p)| (id.as_str(), *p))
    }
}

/// Incremental feasibility checker over one fixed node set
pub struct ConstraintValidator {
    solver: KasuariSolver,
    /// Node id -> (x, y)
    variables: IndexMap<String, (Variable, Variable)>,
    /// Last value reported for each variable
    values: IndexMap<Variable, f64>,
    accepted: Vec<LayoutConstraint>,
}

impl ConstraintValidator {
    /// Create a validator with variables for every node.
    ///
    /// When the configuration has a canvas, each node is kept inside it with
    /// STRONG (non-required) bounds.
    pub fn new<'a>(
        node_ids: impl IntoIterator<Item = &'a str>,
        config: &LayoutConfig,
    ) -> Result<Self, SolverError> {
        let mut validator = Self {
            solver: KasuariSolver::new(),
            variables: IndexMap::new(),
            values: IndexMap::new(),
            accepted: Vec::new(),
        };

        for id in node_ids {
            validator
                .variables
                .entry(id.to_string())
                .or_insert_with(|| (Variable::new(), Variable::new()));
        }

        // Distinct weak pulls towards the origin make the optimum unique, so
        // the solved point does not depend on the solver's internal ordering
        let vars: Vec<(Variable, Variable)> = validator.variables.values().copied().collect();
        for (index, (x, y)) in vars.into_iter().enumerate() {
            let strength = Strength::WEAK * ANCHOR_DECAY.powi(index as i32);
            for var in [x, y] {
                validator
                    .solver
                    .add_constraint(var | EQ(strength) | 0.0)
                    .map_err(|e| SolverError::Internal(format!("Failed to anchor node: {}", e)))?;
            }
        }

        if let Some(canvas) = config.canvas {
            let vars: Vec<(Variable, Variable)> = validator.variables.values().copied().collect();
            for (x, y) in vars {
                for (var, limit) in [(x, canvas.width), (y, canvas.height)] {
                    let bounds = [
                        var | GE(Strength::STRONG) | 0.0,
                        var | LE(Strength::STRONG) | limit,
                    ];
                    for bound in bounds {
                        validator.solver.add_constraint(bound).map_err(|e| {
                            SolverError::Internal(format!("Failed to add canvas bound: {}", e))
                        })?;
                    }
                }
            }
        }

        Ok(validator)
    }

    fn vars(
        &self,
        node: &str,
        constraint: &LayoutConstraint,
    ) -> Result<(Variable, Variable), SolverError> {
        self.variables
            .get(node)
            .copied()
            .ok_or_else(|| SolverError::MissingNode {
                node: node.to_string(),
                constraint: Box::new(constraint.clone()),
            })
    }

    /// Convert a kasuari error to a SolverError with context
    fn convert_kasuari_error(
        &self,
        e: kasuari::AddConstraintError,
        constraint: &LayoutConstraint,
    ) -> SolverError {
        match e {
            kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable {
                constraint: Box::new(constraint.clone()),
                accepted: self.accepted.clone(),
            },
            kasuari::AddConstraintError::DuplicateConstraint => {
                SolverError::Internal(format!("Duplicate constraint: {}", constraint))
            }
            kasuari::AddConstraintError::InternalSolverError(msg) => {
                SolverError::Internal(format!("Internal solver error for {}: {}", constraint, msg))
            }
        }
    }

    /// Add one constraint; on failure the previously accepted ones stay in place
    pub fn add_constraint(&mut self, constraint: &LayoutConstraint) -> Result<(), SolverError> {
        let [a, b] = constraint.node_ids();
        let (ax, ay) = self.vars(a, constraint)?;
        let (bx, by) = self.vars(b, constraint)?;

        let kasuari_constraint = match constraint {
            // y(bottom) >= y(top) + d
            LayoutConstraint::Top { min_distance, .. } => {
                let top: Expression = ay.into();
                by | GE(Strength::REQUIRED) | top + *min_distance
            }
            // x(right) >= x(left) + d
            LayoutConstraint::Left { min_distance, .. } => {
                let left: Expression = ax.into();
                bx | GE(Strength::REQUIRED) | left + *min_distance
            }
            LayoutConstraint::Alignment { axis: Axis::X, .. } => ax | EQ(Strength::REQUIRED) | bx,
            LayoutConstraint::Alignment { axis: Axis::Y, .. } => ay | EQ(Strength::REQUIRED) | by,
        };

        self.solver
            .add_constraint(kasuari_constraint)
            .map_err(|e| self.convert_kasuari_error(e, constraint))?;
        trace!(constraint = %constraint, "Accepted constraint");
        self.accepted.push(constraint.clone());
        Ok(())
    }

    /// Add constraints in order, stopping at the first failure
    pub fn add_all<'c>(
        &mut self,
        constraints: impl IntoIterator<Item = &'c LayoutConstraint>,
    ) -> Result<(), SolverError> {
        for constraint in constraints {
            self.add_constraint(constraint)?;
        }
        Ok(())
    }

    /// Constraints accepted so far
    pub fn accepted(&self) -> &[LayoutConstraint] {
        &self.accepted
    }

    /// Read back node coordinates from the solver
    pub fn solve(&mut self) -> Solution {
        // kasuari only reports variables whose value changed since the last fetch
        for (var, value) in self.solver.fetch_changes() {
            self.values.insert(*var, *value);
        }

        let value = |var: &Variable| self.values.get(var).copied().unwrap_or(0.0);
        let positions = self
            .variables
            .iter()
            .map(|(id, (x, y))| (id.clone(), Point::new(value(x), value(y))))
            .collect();

        Solution { positions }
    }

    /// Check a whole constraint set against a fresh solver
    pub fn check<'a>(
        node_ids: impl IntoIterator<Item = &'a str>,
        constraints: &[LayoutConstraint],
        config: &LayoutConfig,
    ) -> Result<Solution, SolverError> {
        let mut validator = Self::new(node_ids, config)?;
        validator.add_all(constraints)?;
        Ok(validator.solve())
    }
}

/// Non-overlap constraints for nodes forced onto one line by alignment.
///
/// Nodes joined by alignment constraints on the same axis form equivalence
/// classes (transitive closure). Each class is ordered by its solved coordinate
/// on the other axis, and every adjacent pair gets a Top (x-aligned) or Left
/// (y-aligned) constraint with `alignment_padding` separation.
pub fn implicit_alignment_constraints(
    constraints: &[LayoutConstraint],
    solution: &Solution,
    config: &LayoutConfig,
) -> Vec<LayoutConstraint> {
    let mut implicit = Vec::new();

    for axis in [Axis::X, Axis::Y] {
        for class in alignment_classes(constraints, axis) {
            let mut members: Vec<(String, Point)> = class
                .into_iter()
                .filter_map(|id| solution.get(&id).map(|p| (id, p)))
                .collect();
            // x-aligned nodes form a column, ordered by y; y-aligned nodes a row, ordered by x
            let along = |p: &Point| match axis {
                Axis::X => p.y,
                Axis::Y => p.x,
            };
            members.sort_by(|(_, a), (_, b)| along(a).total_cmp(&along(b)));

            let source = ConstraintSource::ImplicitAlignment { axis };
            for pair in members.windows(2) {
                let (first, second) = (&pair[0].0, &pair[1].0);
                implicit.push(match axis {
                    Axis::X => LayoutConstraint::top(
                        first.clone(),
                        second.clone(),
                        config.alignment_padding,
                        source.clone(),
                    ),
                    Axis::Y => LayoutConstraint::left(
                        first.clone(),
                        second.clone(),
                        config.alignment_padding,
                        source.clone(),
                    ),
                });
            }
        }
    }

    implicit
}

/// Transitive closure of alignment pairs on one axis, in first-seen order
fn alignment_classes(constraints: &[LayoutConstraint], on: Axis) -> Vec<Vec<String>> {
    let mut classes: Vec<Vec<String>> = Vec::new();

    for constraint in constraints {
        let LayoutConstraint::Alignment {
            axis, node1, node2, ..
        } = constraint
        else {
            continue;
        };
        if *axis != on || node1 == node2 {
            continue;
        }

        let find = |classes: &[Vec<String>], id: &str| {
            classes.iter().position(|c| c.iter().any(|n| n == id))
        };
        match (find(&classes, node1), find(&classes, node2)) {
            (Some(i), Some(j)) if i == j => {}
            (Some(i), Some(j)) => {
                let (keep, merge) = (i.min(j), i.max(j));
                let moved = classes.remove(merge);
                classes[keep].extend(moved);
            }
            (Some(i), None) => classes[i].push(node2.clone()),
            (None, Some(j)) => classes[j].push(node1.clone()),
            (None, None) => classes.push(vec![node1.clone(), node2.clone()]),
        }
    }

    classes
}
