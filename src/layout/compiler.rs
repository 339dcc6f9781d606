//! Compile relative orientation rules into geometric constraints

use tracing::debug;

use crate::instance::{AtomId, Instance};
use crate::selector::{Selection, SelectorEvaluator};
use crate::spec::{Direction, RelativeOrientation};

use super::config::LayoutConfig;
use super::constraints::{Axis, ConstraintSource, LayoutConstraint};
use super::error::LayoutError;
use super::graph::{GraphEdge, LayoutGraph};
use super::types::ALIGNMENT_PREFIX;

/// Constraints for one (source, target) pair under one direction.
///
/// `left` and `above` place the target before the source; `right` and `below`
/// place it after. The `directly*` forms also align the pair on the other axis.
pub fn direction_constraints(
    source_atom: &str,
    target_atom: &str,
    direction: Direction,
    origin: &ConstraintSource,
    config: &LayoutConfig,
) -> Vec<LayoutConstraint> {
    let (s, t) = (source_atom, target_atom);
    let positional = match direction.relaxed() {
        Direction::Left => LayoutConstraint::left(t, s, config.min_sep_width, origin.clone()),
        Direction::Right => LayoutConstraint::left(s, t, config.min_sep_width, origin.clone()),
        Direction::Above => LayoutConstraint::top(t, s, config.min_sep_height, origin.clone()),
        _ => LayoutConstraint::top(s, t, config.min_sep_height, origin.clone()),
    };

    if !direction.is_direct() {
        return vec![positional];
    }
    let axis = match direction.relaxed() {
        Direction::Left | Direction::Right => Axis::Y,
        _ => Axis::X,
    };
    vec![positional, LayoutConstraint::alignment(axis, s, t, origin.clone())]
}

fn selected_pairs(selection: &Selection) -> Vec<(AtomId, AtomId)> {
    let mut pairs = selection.selected_pairs();
    if pairs.is_empty() {
        pairs = selection
            .selected_tuples_all()
            .into_iter()
            .filter_map(|t| Some((t.first()?.clone(), t.last()?.clone())))
            .collect();
    }
    pairs
}

/// Compile every relative orientation rule, in order.
///
/// Returns the next graph snapshot, which gains an `_alignment_` edge for each
/// directly-oriented pair that has no edge yet (when enabled in `config`).
pub fn compile_relative(
    graph: &LayoutGraph,
    rules: &[RelativeOrientation],
    evaluator: &dyn SelectorEvaluator,
    instance: &Instance,
    config: &LayoutConfig,
) -> Result<(LayoutGraph, Vec<LayoutConstraint>), LayoutError> {
    let mut builder = graph.to_builder();
    let mut constraints: Vec<LayoutConstraint> = Vec::new();

    for rule in rules {
        rule.validate()?;
        let selection = evaluator.evaluate(&rule.selector, instance)?;
        let origin = ConstraintSource::Relative {
            selector: rule.selector.clone(),
            directions: rule.directions.clone(),
        };

        let pairs = selected_pairs(&selection);
        debug!(
            selector = rule.selector.as_str(),
            pairs = pairs.len(),
            "Compiling orientation rule"
        );

        for (source, target) in pairs {
            for &direction in &rule.directions {
                let compiled = direction_constraints(&source, &target, direction, &origin, config);
                for constraint in compiled {
                    if !constraints.contains(&constraint) {
                        constraints.push(constraint);
                    }
                }

                if direction.is_direct()
                    && config.alignment_edges
                    && !graph.has_edge_between(&source, &target)
                {
                    let id = format!("{}{}_{}_", ALIGNMENT_PREFIX, source, target);
                    if !builder.has_edge(&id) {
                        builder.add_edge(GraphEdge {
                            id,
                            source: source.clone(),
                            target: target.clone(),
                            relation_name: String::new(),
                            label: String::new(),
                            tuple: vec![source.clone(), target.clone()],
                        });
                    }
                }
            }
        }
    }

    Ok((builder.build(), constraints))
}
