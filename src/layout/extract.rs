//! Attribute, group and inferred-edge extraction
//!
//! Each phase reads one [`LayoutGraph`] snapshot and returns the next one
//! together with whatever it pulled out of the graph.

use indexmap::IndexMap;
use tracing::debug;

use crate::instance::{AtomId, Instance};
use crate::selector::{Selection, SelectorEvaluator};
use crate::spec::{Directives, GroupByField, GroupBySelector, InferredEdge, SpecError};

use super::error::LayoutError;
use super::graph::{GraphEdge, LayoutGraph};
use super::types::{EdgeKind, LayoutGroup, INFERRED_PREFIX};

/// Node id -> (edge label -> attribute values)
pub type AttributeMap = IndexMap<AtomId, IndexMap<String, Vec<String>>>;

/// Move attribute-field edges into per-node attribute maps.
///
/// Fails before touching the graph when a relation is both an attribute and a
/// hidden field.
pub fn extract_attributes(
    graph: &LayoutGraph,
    directives: &Directives,
) -> Result<(LayoutGraph, AttributeMap), LayoutError> {
    directives.validate_fields()?;

    let mut attributes = AttributeMap::new();
    for edge in graph.edges() {
        if directives.is_attribute_field(&edge.relation_name) {
            attributes
                .entry(edge.source.clone())
                .or_default()
                .entry(edge.label.clone())
                .or_default()
                .push(edge.target.clone());
        }
    }

    let mut builder = graph.to_builder();
    builder.retain_edges(|e| !directives.is_attribute_field(&e.relation_name));
    debug!(nodes = attributes.len(), "Extracted attributes");
    Ok((builder.build(), attributes))
}

/// Pairs of a selection, taking first and last atom of wider tuples
fn endpoint_pairs(selection: &Selection) -> Vec<(AtomId, AtomId)> {
    let mut pairs = selection.selected_pairs();
    for tuple in selection.selected_tuples_all() {
        if tuple.len() > 2 {
            if let (Some(first), Some(last)) = (tuple.first(), tuple.last()) {
                pairs.push((first.clone(), last.clone()));
            }
        }
    }
    pairs
}

/// Add an `_inferred_<name>_<i>` edge for every pair each rule selects
pub fn add_inferred_edges(
    graph: &LayoutGraph,
    rules: &[InferredEdge],
    evaluator: &dyn SelectorEvaluator,
    instance: &Instance,
) -> Result<LayoutGraph, LayoutError> {
    let mut builder = graph.to_builder();

    for rule in rules {
        let selection = evaluator.evaluate(&rule.selector, instance)?;
        let pairs = endpoint_pairs(&selection)
            .into_iter()
            .filter(|(s, t)| graph.contains_node(s) && graph.contains_node(t));
        for (i, (source, target)) in pairs.enumerate() {
            builder.add_edge(GraphEdge {
                id: format!("{}{}_{}", INFERRED_PREFIX, rule.name, i),
                tuple: vec![source.clone(), target.clone()],
                source,
                target,
                relation_name: rule.name.clone(),
                label: rule.name.clone(),
            });
        }
    }

    Ok(builder.build())
}

struct FieldGroup {
    group: LayoutGroup,
    edge: GraphEdge,
}

/// Group tuple components by the atom at `group_on`.
///
/// Every key gets a group `relation[key]` holding the atoms at `add_to_group`.
/// The relation's edges for that key collapse into a single group edge from
/// the key node to the first member.
pub fn group_by_field(
    graph: &LayoutGraph,
    rules: &[GroupByField],
    instance: &Instance,
) -> Result<(LayoutGraph, Vec<LayoutGroup>), LayoutError> {
    let mut builder = graph.to_builder();
    let mut groups = Vec::new();

    for rule in rules {
        rule.validate()?;
        let Some(relation) = instance.relations().find(|r| r.name == rule.field) else {
            debug!(field = rule.field.as_str(), "Grouped relation not in instance");
            continue;
        };
        let arity = relation.arity();
        for index in [rule.group_on, rule.add_to_group] {
            if index >= arity {
                return Err(SpecError::InvalidGroupIndex {
                    field: rule.field.clone(),
                    reason: format!("index {} is out of range for arity {}", index, arity),
                }
                .into());
            }
        }

        let mut by_key: IndexMap<AtomId, FieldGroup> = IndexMap::new();
        for edge in graph.edges() {
            if edge.relation_name != rule.field || edge.tuple.len() != arity {
                continue;
            }
            let key = &edge.tuple[rule.group_on];
            let member = &edge.tuple[rule.add_to_group];

            let entry = by_key.entry(key.clone()).or_insert_with(|| {
                let rest: Vec<&str> = edge
                    .tuple
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != rule.group_on && *i != rule.add_to_group)
                    .map(|(_, a)| a.as_str())
                    .collect();
                let name = format!("{}[{}]", rule.field, key);
                FieldGroup {
                    edge: GraphEdge {
                        id: EdgeKind::group_edge_id(rule.group_on, rule.add_to_group, &name),
                        source: key.clone(),
                        target: member.clone(),
                        relation_name: rule.field.clone(),
                        label: if rest.is_empty() {
                            rule.field.clone()
                        } else {
                            rest.join(", ")
                        },
                        tuple: edge.tuple.clone(),
                    },
                    group: LayoutGroup {
                        name,
                        node_ids: Vec::new(),
                        key_node_id: key.clone(),
                        show_label: rule.show_label,
                    },
                }
            });
            if !entry.group.contains(member) {
                entry.group.node_ids.push(member.clone());
            }
        }

        builder.retain_edges(|e| {
            e.relation_name != rule.field
                || e.tuple.len() != arity
                || !by_key.contains_key(&e.tuple[rule.group_on])
        });
        for (key, field_group) in by_key {
            builder.add_node(&key);
            for member in &field_group.group.node_ids {
                builder.add_node(member);
            }
            builder.add_edge(field_group.edge);
            groups.push(field_group.group);
        }
    }

    Ok((builder.build(), groups))
}

/// Build groups from selector results.
///
/// A binary selection `(key, member)` yields one group `name[key]` per key plus
/// a group edge from the key. A unary selection yields a single group `name`
/// whose key node is its lexicographically first member.
pub fn group_by_selector(
    graph: &LayoutGraph,
    rules: &[GroupBySelector],
    evaluator: &dyn SelectorEvaluator,
    instance: &Instance,
) -> Result<(LayoutGraph, Vec<LayoutGroup>), LayoutError> {
    let mut builder = graph.to_builder();
    let mut groups = Vec::new();

    for rule in rules {
        let selection = evaluator.evaluate(&rule.selector, instance)?;

        if selection.arity() == Some(1) {
            let members: Vec<AtomId> = selection
                .selected_atoms()
                .into_iter()
                .filter(|a| graph.contains_node(a))
                .collect();
            let Some(key) = members.iter().min().cloned() else {
                continue;
            };
            groups.push(LayoutGroup {
                name: rule.name.clone(),
                node_ids: members,
                key_node_id: key,
                show_label: rule.show_label,
            });
            continue;
        }

        let mut by_key: IndexMap<AtomId, LayoutGroup> = IndexMap::new();
        for (key, member) in endpoint_pairs(&selection) {
            if !graph.contains_node(&member) {
                continue;
            }
            let group = by_key.entry(key.clone()).or_insert_with(|| LayoutGroup {
                name: format!("{}[{}]", rule.name, key),
                node_ids: Vec::new(),
                key_node_id: key.clone(),
                show_label: rule.show_label,
            });
            if !group.contains(&member) {
                group.node_ids.push(member);
            }
        }

        for (key, group) in by_key {
            let id = EdgeKind::group_edge_id(0, 1, &group.name);
            if !builder.has_edge(&id) {
                builder.add_node(&key);
                builder.add_edge(GraphEdge {
                    id,
                    source: key.clone(),
                    target: group.node_ids[0].clone(),
                    relation_name: rule.name.clone(),
                    label: rule.name.clone(),
                    tuple: vec![key.clone(), group.node_ids[0].clone()],
                });
            }
            groups.push(group);
        }
    }

    Ok((builder.build(), groups))
}
