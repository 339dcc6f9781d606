//! Directed multigraph of visible atoms and relation tuples
//!
//! Each layout phase (attribute extraction, grouping, inferred and alignment
//! edges) takes a [`LayoutGraph`] snapshot and produces a new one through a
//! [`GraphBuilder`], so the effect of every phase can be inspected on its own.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::instance::{AtomId, Instance};
use crate::spec::Directives;

use super::types::HIDDEN_PREFIX;

/// An edge of the working graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// Unique per tuple; encodes the routing category in its prefix
    pub id: String,
    pub source: AtomId,
    pub target: AtomId,
    pub relation_name: String,
    pub label: String,
    /// The full relation tuple the edge was built from
    pub tuple: Vec<AtomId>,
}

/// An immutable snapshot of the working graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutGraph {
    nodes: Vec<AtomId>,
    edges: Vec<GraphEdge>,
}

impl LayoutGraph {
    /// Build the graph of an instance.
    ///
    /// Every tuple of arity two or more becomes an edge from its first to its
    /// last atom. Tuples of hidden fields get `_h_` ids. An atom without
    /// incident edges is dropped when `hide_disconnected` is set, or when
    /// `hide_disconnected_builtins` is set and its type is built in. Edges of
    /// attribute fields are kept for extraction but do not count as incident.
    pub fn from_instance(instance: &Instance, directives: &Directives) -> Self {
        let mut builder = GraphBuilder::default();

        for relation in instance.relations() {
            let hidden = directives.is_hidden_field(&relation.name);
            for tuple in &relation.tuples {
                let (Some(source), Some(target)) = (tuple.first(), tuple.last()) else {
                    continue;
                };
                if tuple.len() < 2 {
                    continue;
                }
                let mut id = format!("{}<:{}", relation.id, tuple.join("->"));
                if hidden {
                    id.insert_str(0, HIDDEN_PREFIX);
                }
                builder.add_edge(GraphEdge {
                    id,
                    source: source.clone(),
                    target: target.clone(),
                    relation_name: relation.name.clone(),
                    label: edge_label(&relation.name, tuple),
                    tuple: tuple.clone(),
                });
            }
        }

        let connected: HashSet<&str> = builder
            .edges
            .iter()
            .filter(|e| !directives.is_attribute_field(&e.relation_name))
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();

        let mut nodes = Vec::new();
        for atom in instance.atoms() {
            if connected.contains(atom.as_str()) {
                nodes.push(atom.clone());
                continue;
            }
            let builtin = match instance.is_builtin(atom) {
                Some(builtin) => builtin,
                None => {
                    warn!(atom = atom.as_str(), "Failed to identify atom type; showing atom");
                    false
                }
            };
            let hide = directives.hide_disconnected
                || (directives.hide_disconnected_builtins && builtin);
            if hide {
                debug!(atom = atom.as_str(), "Hiding disconnected atom");
            } else {
                nodes.push(atom.clone());
            }
        }

        // Atoms that appear in tuples but were never declared
        for edge in &builder.edges {
            if directives.is_attribute_field(&edge.relation_name) {
                continue;
            }
            for atom in [&edge.source, &edge.target] {
                if !nodes.contains(atom) {
                    nodes.push(atom.clone());
                }
            }
        }

        builder.nodes = nodes;
        builder.build()
    }

    pub fn nodes(&self) -> &[AtomId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }

    /// Whether any edge joins `a` and `b`, in either direction
    pub fn has_edge_between(&self, a: &str, b: &str) -> bool {
        self.edges.iter().any(|e| {
            (e.source == a && e.target == b) || (e.source == b && e.target == a)
        })
    }

    /// Start a new snapshot from this one
    pub fn to_builder(&self) -> GraphBuilder {
        GraphBuilder {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}

/// Accumulates changes for the next [`LayoutGraph`] snapshot
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<AtomId>,
    edges: Vec<GraphEdge>,
}

impl GraphBuilder {
    pub fn add_node(&mut self, id: &str) {
        if !self.nodes.iter().any(|n| n == id) {
            self.nodes.push(id.to_string());
        }
    }

    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.push(edge);
    }

    pub fn has_edge(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.id == id)
    }

    /// Keep only the edges matching `keep`
    pub fn retain_edges(&mut self, keep: impl FnMut(&GraphEdge) -> bool) {
        self.edges.retain(keep);
    }

    /// Replace the id of the edge with id `from`
    pub fn rename_edge(&mut self, from: &str, to: String) {
        if let Some(edge) = self.edges.iter_mut().find(|e| e.id == from) {
            edge.id = to;
        }
    }

    pub fn build(self) -> LayoutGraph {
        LayoutGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

/// `name` for binary tuples, `name[middle, atoms]` for wider ones
fn edge_label(name: &str, tuple: &[AtomId]) -> String {
    if tuple.len() <= 2 {
        name.to_string()
    } else {
        format!("{}[{}]", name, tuple[1..tuple.len() - 1].join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> Instance {
        Instance::new()
            .with_type("Node", ["a", "b", "lonely"], ["univ"])
            .with_builtin_type("Int", ["0", "1"])
            .with_relation("next", [["a", "b"]])
            .with_relation("weight", [["a", "0", "b"]])
    }

    fn directives(hide_disconnected: bool, hide_disconnected_builtins: bool) -> Directives {
        Directives {
            hide_disconnected,
            hide_disconnected_builtins,
            ..Directives::default()
        }
    }

    #[test]
    fn test_edges_join_first_and_last_atom() {
        let g = LayoutGraph::from_instance(&instance(), &directives(false, true));
        let weight = g.edges().iter().find(|e| e.relation_name == "weight").unwrap();
        assert_eq!(weight.source, "a");
        assert_eq!(weight.target, "b");
        assert_eq!(weight.label, "weight[0]");
        assert_eq!(weight.id, "weight<:a->0->b");
    }

    #[test]
    fn test_hide_disconnected_builtins_only() {
        let g = LayoutGraph::from_instance(&instance(), &directives(false, true));
        assert!(g.contains_node("lonely"));
        assert!(!g.contains_node("1"));
        // "0" only sits in the middle of a ternary tuple
        assert!(!g.contains_node("0"));
    }

    #[test]
    fn test_hide_all_disconnected() {
        let g = LayoutGraph::from_instance(&instance(), &directives(true, false));
        assert_eq!(g.nodes(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_show_everything() {
        let g = LayoutGraph::from_instance(&instance(), &directives(false, false));
        assert_eq!(g.nodes().len(), 5);
    }

    #[test]
    fn test_hidden_fields_get_prefix() {
        let mut d = directives(false, true);
        d.hidden_fields.push("next".to_string());
        let g = LayoutGraph::from_instance(&instance(), &d);
        let next = g.edges().iter().find(|e| e.relation_name == "next").unwrap();
        assert!(next.id.starts_with("_h_"));
    }

    #[test]
    fn test_attribute_edges_do_not_connect() {
        let mut d = directives(true, false);
        d.attribute_fields.push("next".to_string());
        let g = LayoutGraph::from_instance(&instance(), &d);
        // a and b stay connected through weight; the edge itself is kept for extraction
        assert!(g.contains_node("a"));
        assert!(g.edges().iter().any(|e| e.relation_name == "next"));

        let only_attributes = Instance::new()
            .with_type("Person", ["alice"], ["univ"])
            .with_builtin_type("Int", ["30"])
            .with_relation("age", [["alice", "30"]]);
        let mut d = directives(false, true);
        d.attribute_fields.push("age".to_string());
        let g = LayoutGraph::from_instance(&only_attributes, &d);
        assert!(g.contains_node("alice"));
        assert!(!g.contains_node("30"));
    }

    #[test]
    fn test_default_directives_keep_builtins() {
        let g = LayoutGraph::from_instance(&instance(), &Directives::default());
        assert!(g.contains_node("0"));
        assert!(g.contains_node("1"));
    }

    #[test]
    fn test_builder_produces_new_snapshot() {
        let g = LayoutGraph::from_instance(&instance(), &directives(false, true));
        let mut builder = g.to_builder();
        builder.retain_edges(|e| e.relation_name != "next");
        let trimmed = builder.build();

        assert_eq!(g.edges().len(), 2);
        assert_eq!(trimmed.edges().len(), 1);
        assert!(g.has_edge_between("b", "a"));
    }
}
