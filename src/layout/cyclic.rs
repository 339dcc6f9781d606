//! Cyclic orientation constraints
//!
//! A linear solver cannot say "these nodes sit on a circle in this order",
//! because the relative position of two nodes on a circle depends on where the
//! circle starts. Cyclic rules are therefore split into path fragments; each
//! fragment is placed at equally spaced angles with some rotation offset, the
//! angular layout is turned into ordinary Left/Top/Alignment constraints, and a
//! backtracking search looks for offsets that are jointly satisfiable with
//! everything else.

use std::f64::consts::TAU;
use std::ops::ControlFlow;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::instance::{AtomId, Instance};
use crate::selector::{Selection, SelectorEvaluator};
use crate::spec::{CyclicOrientation, RotationDirection};

use super::config::LayoutConfig;
use super::constraints::{Axis, ConstraintSource, LayoutConstraint};
use super::error::LayoutError;
use super::solver::{ConstraintValidator, SolverError};
use super::unsat::diagnose;

/// Coordinate differences below this are treated as equal
const POSITION_EPSILON: f64 = 1e-6;

/// Atom -> successors, in selection order
pub type SuccessorMap = IndexMap<AtomId, Vec<AtomId>>;

/// Successors of every atom in a binary (or wider) selection
pub fn successor_map(selection: &Selection) -> SuccessorMap {
    let mut successors = SuccessorMap::new();
    let mut link = |from: &AtomId, to: &AtomId| {
        let next = successors.entry(from.clone()).or_default();
        if !next.contains(to) {
            next.push(to.clone());
        }
    };

    for (from, to) in selection.selected_pairs() {
        link(&from, &to);
    }
    for tuple in selection.selected_tuples_all() {
        if tuple.len() > 2 {
            if let (Some(from), Some(to)) = (tuple.first(), tuple.last()) {
                link(from, to);
            }
        }
    }
    successors
}

/// All maximal paths and closed loops, starting from every atom in turn.
///
/// Returns `None` as soon as more than `limit` paths have been found.
pub fn enumerate_paths(successors: &SuccessorMap, limit: usize) -> Option<Vec<Vec<AtomId>>> {
    fn record(found: &mut Vec<Vec<AtomId>>, path: &[AtomId], limit: usize) -> ControlFlow<()> {
        if found.len() >= limit {
            return ControlFlow::Break(());
        }
        found.push(path.to_vec());
        ControlFlow::Continue(())
    }

    fn walk(
        successors: &SuccessorMap,
        path: &mut Vec<AtomId>,
        found: &mut Vec<Vec<AtomId>>,
        limit: usize,
    ) -> ControlFlow<()> {
        let Some(last) = path.last().cloned() else {
            return ControlFlow::Continue(());
        };
        let mut ended = false;
        for next in successors.get(&last).into_iter().flatten() {
            if *next == path[0] {
                record(found, path, limit)?;
                ended = true;
            } else if !path.contains(next) {
                path.push(next.clone());
                let flow = walk(successors, path, found, limit);
                path.pop();
                flow?;
                ended = true;
            }
        }
        if !ended {
            record(found, path, limit)?;
        }
        ControlFlow::Continue(())
    }

    let mut starts: Vec<&AtomId> = successors.keys().collect();
    for targets in successors.values() {
        for target in targets {
            if !starts.contains(&target) {
                starts.push(target);
            }
        }
    }

    let mut found = Vec::new();
    for start in starts {
        let mut path = vec![start.clone()];
        if walk(successors, &mut path, &mut found, limit).is_break() {
            return None;
        }
    }
    Some(found)
}

/// Whether `needle` occurs contiguously in `haystack` read as a cycle
pub fn is_sub_path(needle: &[AtomId], haystack: &[AtomId]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return needle.is_empty();
    }
    let unrolled: Vec<&AtomId> = haystack.iter().chain(haystack.iter()).collect();
    unrolled
        .windows(needle.len())
        .any(|window| window.iter().zip(needle).all(|(a, b)| *a == b))
}

/// Independent path fragments of a successor map, or `None` past `limit` paths.
///
/// Mutually cyclic sub-paths (rotations of one loop) keep only the first
/// representative, then any path contained in another retained path is dropped.
pub fn fragments(successors: &SuccessorMap, limit: usize) -> Option<Vec<Vec<AtomId>>> {
    let mut representatives: Vec<Vec<AtomId>> = Vec::new();
    for path in enumerate_paths(successors, limit)? {
        let duplicate = representatives
            .iter()
            .any(|kept| is_sub_path(&path, kept) && is_sub_path(kept, &path));
        if !duplicate {
            representatives.push(path);
        }
    }

    let independent = representatives
        .iter()
        .enumerate()
        .filter(|(i, path)| {
            !representatives.iter().enumerate().any(|(j, other)| {
                *i != j && is_sub_path(path, other) && !is_sub_path(other, path)
            })
        })
        .map(|(_, path)| path.clone())
        .collect();
    Some(independent)
}

/// One fragment of one cyclic rule
#[derive(Debug, Clone, PartialEq)]
pub struct CyclicFragment {
    pub selector: String,
    pub direction: RotationDirection,
    pub nodes: Vec<AtomId>,
}

impl CyclicFragment {
    fn source(&self) -> ConstraintSource {
        ConstraintSource::Cyclic {
            selector: self.selector.clone(),
            direction: self.direction,
        }
    }

    /// Number of distinct rotations worth trying
    pub fn rotations(&self) -> usize {
        self.nodes.len().max(1)
    }

    /// Constraints placing the fragment on a circle, rotated by `perturbation` steps.
    ///
    /// Clockwise is the order of increasing angle with y growing downwards.
    pub fn constraints(&self, perturbation: usize, config: &LayoutConfig) -> Vec<LayoutConstraint> {
        let n = self.nodes.len();
        if n < 2 {
            return Vec::new();
        }

        let mut order: Vec<&AtomId> = self.nodes.iter().collect();
        if self.direction == RotationDirection::Counterclockwise {
            order.reverse();
        }

        let step = TAU / n as f64;
        let placed: Vec<(&AtomId, f64, f64)> = order
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let angle = (i + perturbation) as f64 * step;
                (id, config.cyclic_radius * angle.cos(), config.cyclic_radius * angle.sin())
            })
            .collect();

        let source = self.source();
        let (width, height) = (config.min_sep_width, config.min_sep_height);
        let mut constraints = Vec::new();
        for (i, (a, ax, ay)) in placed.iter().enumerate() {
            for (b, bx, by) in &placed[i + 1..] {
                let dx = bx - ax;
                if dx.abs() < POSITION_EPSILON {
                    constraints.push(LayoutConstraint::alignment(Axis::X, *a, *b, source.clone()));
                } else if dx > 0.0 {
                    constraints.push(LayoutConstraint::left(*a, *b, width, source.clone()));
                } else {
                    constraints.push(LayoutConstraint::left(*b, *a, width, source.clone()));
                }

                let dy = by - ay;
                if dy.abs() < POSITION_EPSILON {
                    constraints.push(LayoutConstraint::alignment(Axis::Y, *a, *b, source.clone()));
                } else if dy > 0.0 {
                    constraints.push(LayoutConstraint::top(*a, *b, height, source.clone()));
                } else {
                    constraints.push(LayoutConstraint::top(*b, *a, height, source.clone()));
                }
            }
        }
        constraints
    }
}

/// Resolve every cyclic rule into its fragments
pub fn cyclic_fragments(
    rules: &[CyclicOrientation],
    evaluator: &dyn SelectorEvaluator,
    instance: &Instance,
    config: &LayoutConfig,
) -> Result<Vec<CyclicFragment>, LayoutError> {
    let mut all = Vec::new();
    for rule in rules {
        let selection = evaluator.evaluate(&rule.selector, instance)?;
        let found = fragments(&successor_map(&selection), config.max_cyclic_paths).ok_or_else(|| {
            LayoutError::PathBudgetExhausted {
                selector: rule.selector.clone(),
                limit: config.max_cyclic_paths,
            }
        })?;
        debug!(
            selector = rule.selector.as_str(),
            fragments = found.len(),
            "Resolved cyclic rule"
        );
        all.extend(found.into_iter().map(|nodes| CyclicFragment {
            selector: rule.selector.clone(),
            direction: rule.direction,
            nodes,
        }));
    }
    Ok(all)
}

/// Backtracking search over fragment rotations
pub struct CyclicSearch<'a> {
    node_ids: &'a [&'a str],
    config: &'a LayoutConfig,
    attempts: usize,
    /// Most recent rejected trial, for diagnostics
    last_failure: Option<(String, SolverError)>,
}

impl<'a> CyclicSearch<'a> {
    pub fn new(node_ids: &'a [&'a str], config: &'a LayoutConfig) -> Self {
        Self {
            node_ids,
            config,
            attempts: 0,
            last_failure: None,
        }
    }

    /// Trials made so far
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Find a rotation for every fragment that is satisfiable together with `base`.
    ///
    /// Returns `base` followed by the constraints of every fragment at its
    /// chosen rotation.
    pub fn solve(
        &mut self,
        base: &[LayoutConstraint],
        fragments: &[CyclicFragment],
    ) -> Result<Vec<LayoutConstraint>, LayoutError> {
        if let Some(found) = self.search(base, fragments)? {
            debug!(attempts = self.attempts, "Cyclic search succeeded");
            return Ok(found);
        }

        match self.last_failure.take() {
            Some((selector, error)) => match diagnose(error, self.node_ids, self.config) {
                LayoutError::Conflict(conflict) => Err(LayoutError::CyclicSearchExhausted {
                    selector,
                    conflict,
                }),
                other => Err(other),
            },
            None => Err(LayoutError::Solver(SolverError::Internal(
                "cyclic search failed without a rejected trial".to_string(),
            ))),
        }
    }

    fn search(
        &mut self,
        accepted: &[LayoutConstraint],
        fragments: &[CyclicFragment],
    ) -> Result<Option<Vec<LayoutConstraint>>, LayoutError> {
        let Some((fragment, rest)) = fragments.split_first() else {
            return Ok(Some(accepted.to_vec()));
        };

        for perturbation in 0..fragment.rotations() {
            self.attempts += 1;
            if self.attempts > self.config.max_cyclic_attempts {
                return Err(LayoutError::SearchBudgetExhausted {
                    attempts: self.config.max_cyclic_attempts,
                });
            }

            let mut trial = accepted.to_vec();
            trial.extend(fragment.constraints(perturbation, self.config));
            trace!(
                selector = fragment.selector.as_str(),
                perturbation,
                attempt = self.attempts,
                "Trying cyclic rotation"
            );

            match ConstraintValidator::check(self.node_ids.iter().copied(), &trial, self.config) {
                Ok(_) => {
                    if let Some(found) = self.search(&trial, rest)? {
                        return Ok(Some(found));
                    }
                }
                Err(error @ SolverError::Unsatisfiable { .. }) => {
                    self.last_failure = Some((fragment.selector.clone(), error));
                }
                Err(error) => return Err(diagnose(error, self.node_ids, self.config)),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Direction;

    fn ids(path: &[&str]) -> Vec<AtomId> {
        path.iter().map(|s| s.to_string()).collect()
    }

    fn successors(pairs: &[(&str, &str)]) -> SuccessorMap {
        let selection = Selection::new(pairs.iter().map(|(a, b)| ids(&[a, b])).collect());
        successor_map(&selection)
    }

    fn fragment(nodes: &[&str], direction: RotationDirection) -> CyclicFragment {
        CyclicFragment {
            selector: "ring".to_string(),
            direction,
            nodes: ids(nodes),
        }
    }

    #[test]
    fn test_cycle_is_one_fragment() {
        let found = fragments(&successors(&[("a", "b"), ("b", "c"), ("c", "a")]), 100).unwrap();
        assert_eq!(found, vec![ids(&["a", "b", "c"])]);
    }

    #[test]
    fn test_chain_keeps_longest_path() {
        let found = fragments(&successors(&[("a", "b"), ("b", "c")]), 100).unwrap();
        assert_eq!(found, vec![ids(&["a", "b", "c"])]);
    }

    #[test]
    fn test_disjoint_cycles() {
        let found = fragments(
            &successors(&[("a", "b"), ("b", "a"), ("x", "y"), ("y", "x")]),
            100,
        )
        .unwrap();
        assert_eq!(found, vec![ids(&["a", "b"]), ids(&["x", "y"])]);
    }

    #[test]
    fn test_dense_relation_stops_at_path_limit() {
        let atoms = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let pairs: Vec<(&str, &str)> = atoms
            .iter()
            .flat_map(|a| atoms.iter().filter(move |b| *b != a).map(move |b| (*a, *b)))
            .collect();
        let dense = successors(&pairs);

        assert!(enumerate_paths(&dense, 500).is_none());
        assert!(fragments(&dense, 500).is_none());
        // Exactly at the limit is still fine
        let ring = successors(&[("a", "b"), ("b", "a")]);
        assert_eq!(enumerate_paths(&ring, 2).map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_sub_path_wraps_around() {
        assert!(is_sub_path(&ids(&["c", "a"]), &ids(&["a", "b", "c"])));
        assert!(!is_sub_path(&ids(&["a", "c"]), &ids(&["a", "b", "c"])));
    }

    #[test]
    fn test_square_constraints() {
        let config = LayoutConfig::default();
        let constraints =
            fragment(&["a", "b", "c", "d"], RotationDirection::Clockwise).constraints(0, &config);

        // a(r,0) b(0,r) c(-r,0) d(0,-r)
        assert!(constraints.contains(&LayoutConstraint::alignment(
            Axis::Y,
            "a",
            "c",
            ConstraintSource::Cyclic {
                selector: "ring".to_string(),
                direction: RotationDirection::Clockwise,
            }
        )));
        assert!(constraints.iter().any(|c| matches!(
            c,
            LayoutConstraint::Top { top, bottom, .. } if top == "a" && bottom == "b"
        )));
        assert!(constraints.iter().any(|c| matches!(
            c,
            LayoutConstraint::Left { left, right, .. } if left == "b" && right == "a"
        )));
    }

    #[test]
    fn test_counterclockwise_reverses_winding() {
        let config = LayoutConfig::default();
        let square = ["a", "b", "c", "d"];
        let cw = fragment(&square, RotationDirection::Clockwise).constraints(0, &config);
        let ccw = fragment(&square, RotationDirection::Counterclockwise).constraints(0, &config);

        // Clockwise puts d north of a (east); counterclockwise puts a north of d
        let d_above_a = |cs: &[LayoutConstraint]| {
            cs.iter().any(|c| matches!(
                c,
                LayoutConstraint::Top { top, bottom, .. } if top == "d" && bottom == "a"
            ))
        };
        assert!(d_above_a(&cw));
        assert!(!d_above_a(&ccw));
    }

    #[test]
    fn test_single_node_fragment_is_free() {
        let config = LayoutConfig::default();
        assert!(fragment(&["a"], RotationDirection::Clockwise)
            .constraints(0, &config)
            .is_empty());
    }

    #[test]
    fn test_search_finds_rotation_around_fixed_constraint() {
        let config = LayoutConfig::default();
        let nodes = ["a", "b", "c", "d"];
        // Forces a to the right of c, which rotation 0 satisfies; rotation 2 would not
        let base = vec![LayoutConstraint::left(
            "c",
            "a",
            15.0,
            ConstraintSource::Relative {
                selector: "r".to_string(),
                directions: vec![Direction::Right],
            },
        )];
        let mut search = CyclicSearch::new(&nodes, &config);
        let found = search
            .solve(&base, &[fragment(&nodes, RotationDirection::Clockwise)])
            .unwrap();

        assert_eq!(found[0], base[0]);
        assert!(found.len() > 1);
    }

    #[test]
    fn test_search_exhaustion_reports_conflict() {
        let config = LayoutConfig::default();
        let nodes = ["a", "b"];
        // a and b pinned to the same spot; no rotation of a 2-cycle can satisfy that
        let source = ConstraintSource::Relative {
            selector: "pin".to_string(),
            directions: vec![Direction::DirectlyRight],
        };
        let base = vec![
            LayoutConstraint::alignment(Axis::X, "a", "b", source.clone()),
            LayoutConstraint::alignment(Axis::Y, "a", "b", source),
        ];
        let mut search = CyclicSearch::new(&nodes, &config);
        let err = search
            .solve(&base, &[fragment(&nodes, RotationDirection::Clockwise)])
            .unwrap_err();

        match err {
            LayoutError::CyclicSearchExhausted { selector, conflict } => {
                assert_eq!(selector, "ring");
                assert!(!conflict.minimal_conflicting.is_empty());
            }
            other => panic!("Expected CyclicSearchExhausted, got {:?}", other),
        }
        assert_eq!(search.attempts(), 2);
    }

    #[test]
    fn test_search_budget() {
        let config = LayoutConfig::default().with_max_cyclic_attempts(1);
        let nodes = ["a", "b"];
        let source = ConstraintSource::Relative {
            selector: "pin".to_string(),
            directions: vec![Direction::DirectlyRight],
        };
        let base = vec![
            LayoutConstraint::alignment(Axis::X, "a", "b", source.clone()),
            LayoutConstraint::alignment(Axis::Y, "a", "b", source),
        ];
        let err = CyclicSearch::new(&nodes, &config)
            .solve(&base, &[fragment(&nodes, RotationDirection::Clockwise)])
            .unwrap_err();
        assert!(matches!(err, LayoutError::SearchBudgetExhausted { attempts: 1 }));
    }
}
