//! Layout computation engine
//!
//! [`LayoutInstance::generate_layout`] runs the whole pipeline for one
//! instance and one set of projection choices:
//!
//! 1. **Projection**: collapse projected types to their chosen atom
//! 2. **Graph**: build the visible graph, then add inferred edges
//! 3. **Extraction**: move attribute fields into node attributes, build groups
//! 4. **Compilation**: turn orientation rules into constraints
//! 5. **Validation**: check group nesting, then solve without cyclic rules
//! 6. **Cyclic search**: find a rotation for every cyclic fragment
//! 7. **Final solve**: drop hidden edges, re-validate everything, write positions
//!
//! Every phase fails fast; no partial layout is returned.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::instance::{AtomId, Instance, UNIV};
use crate::selector::SelectorEvaluator;
use crate::spec::{Directives, LayoutSpec};

use super::compiler::compile_relative;
use super::config::LayoutConfig;
use super::cyclic::{cyclic_fragments, CyclicSearch};
use super::error::LayoutError;
use super::extract::{
    add_inferred_edges, extract_attributes, group_by_field, group_by_selector, AttributeMap,
};
use super::graph::LayoutGraph;
use super::groups::validate_group_nesting;
use super::solver::{implicit_alignment_constraints, ConstraintValidator};
use super::types::*;
use super::unsat::diagnose;

/// Colours handed out by type when no directive names one
const PALETTE: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

/// A layout specification bound to a selector evaluator
pub struct LayoutInstance<'a> {
    spec: &'a LayoutSpec,
    evaluator: &'a dyn SelectorEvaluator,
    config: LayoutConfig,
}

impl<'a> LayoutInstance<'a> {
    pub fn new(spec: &'a LayoutSpec, evaluator: &'a dyn SelectorEvaluator) -> Self {
        Self {
            spec,
            evaluator,
            config: LayoutConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute the layout of `instance`.
    ///
    /// `projections` maps projected types to the atom the caller wants shown;
    /// types without an entry use their first atom.
    pub fn generate_layout(
        &self,
        instance: &Instance,
        projections: &IndexMap<String, AtomId>,
    ) -> Result<LayoutResult, LayoutError> {
        let directives = &self.spec.directives;
        let constraints_block = &self.spec.constraints;
        let config = &self.config;

        let (instance, projection_choices) =
            instance.project(&directives.projections, projections)?;

        let graph = LayoutGraph::from_instance(&instance, directives);
        debug!(nodes = graph.nodes().len(), edges = graph.edges().len(), "Built graph");
        let graph = add_inferred_edges(
            &graph,
            &directives.inferred_edges,
            self.evaluator,
            &instance,
        )?;

        let (graph, attributes) = extract_attributes(&graph, directives)?;
        let (graph, mut groups) =
            group_by_field(&graph, &constraints_block.grouping.byfield, &instance)?;
        let (graph, selector_groups) = group_by_selector(
            &graph,
            &constraints_block.grouping.byselector,
            self.evaluator,
            &instance,
        )?;
        groups.extend(selector_groups);
        debug!(groups = groups.len(), "Extracted groups");

        let (graph, mut constraints) = compile_relative(
            &graph,
            &constraints_block.orientation.relative,
            self.evaluator,
            &instance,
            config,
        )?;
        debug!(constraints = constraints.len(), "Compiled orientation constraints");

        validate_group_nesting(&groups)?;

        let node_ids: Vec<&str> = graph.nodes().iter().map(String::as_str).collect();
        let solution = ConstraintValidator::check(node_ids.iter().copied(), &constraints, config)
            .map_err(|e| diagnose(e, &node_ids, config))?;
        constraints.extend(implicit_alignment_constraints(&constraints, &solution, config));

        let fragments = cyclic_fragments(
            &constraints_block.orientation.cyclic,
            self.evaluator,
            &instance,
            config,
        )?;
        let mut search = CyclicSearch::new(&node_ids, config);
        let constraints = search.solve(&constraints, &fragments)?;

        let edges = filter_hidden_edges(graph.edges().iter().map(to_layout_edge).collect());

        let solution = ConstraintValidator::check(node_ids.iter().copied(), &constraints, config)
            .map_err(|e| diagnose(e, &node_ids, config))?;
        debug!(constraints = constraints.len(), "Final layout validated");

        let nodes = self
            .build_nodes(&graph, &instance, &attributes, &groups)?
            .into_iter()
            .map(|mut node| {
                if let Some(position) = solution.get(&node.id) {
                    node.position = position;
                }
                node
            })
            .collect();

        Ok(LayoutResult {
            layout: InstanceLayout {
                nodes,
                edges,
                constraints,
                groups,
            },
            projections: projection_choices,
        })
    }

    fn build_nodes(
        &self,
        graph: &LayoutGraph,
        instance: &Instance,
        attributes: &AttributeMap,
        groups: &[LayoutGroup],
    ) -> Result<Vec<LayoutNode>, LayoutError> {
        let directives = &self.spec.directives;

        // Evaluate each size selector once
        let mut sized: Vec<(Vec<AtomId>, Size)> = Vec::with_capacity(directives.sizes.len());
        for directive in &directives.sizes {
            let selection = self.evaluator.evaluate(&directive.selector, instance)?;
            sized.push((
                selection.selected_atoms(),
                Size {
                    width: directive.width,
                    height: directive.height,
                },
            ));
        }
        let default_size = Size {
            width: self.config.node_size.0,
            height: self.config.node_size.1,
        };

        let nodes = graph
            .nodes()
            .iter()
            .map(|id| {
                let types = instance.type_chain(id).unwrap_or_default();
                let size = sized
                    .iter()
                    .rev()
                    .find(|(atoms, _)| atoms.contains(id))
                    .map(|(_, size)| *size)
                    .unwrap_or(default_size);

                LayoutNode {
                    id: id.clone(),
                    color: self.node_color(id, instance, &types, directives),
                    size,
                    icon: node_icon(&types, directives),
                    attributes: attributes.get(id).cloned().unwrap_or_default(),
                    groups: groups
                        .iter()
                        .filter(|g| g.contains(id))
                        .map(|g| g.name.clone())
                        .collect(),
                    most_specific_type: types.first().cloned().unwrap_or_else(|| UNIV.to_string()),
                    types,
                    position: Point::default(),
                }
            })
            .collect();
        Ok(nodes)
    }

    /// Most specific colour directive along the type chain, else a palette colour for the type
    fn node_color(
        &self,
        id: &str,
        instance: &Instance,
        types: &[String],
        directives: &Directives,
    ) -> String {
        let Some(most_specific) = types.first() else {
            warn!(atom = id, "Failed to resolve type for colouring; using default colour");
            return self.config.default_color.clone();
        };

        for ty in types {
            if let Some(directive) = directives.colors.iter().find(|c| c.type_id == *ty) {
                return directive.color.clone();
            }
        }

        match instance.types.get_index_of(most_specific) {
            Some(index) => PALETTE[index % PALETTE.len()].to_string(),
            None => self.config.default_color.clone(),
        }
    }
}

fn node_icon(types: &[String], directives: &Directives) -> Option<NodeIcon> {
    types.iter().find_map(|ty| {
        directives
            .icons
            .iter()
            .find(|icon| icon.type_id == *ty)
            .map(|icon| NodeIcon {
                path: icon.path.clone(),
                show_labels: icon.show_labels,
            })
    })
}

fn to_layout_edge(edge: &super::graph::GraphEdge) -> LayoutEdge {
    LayoutEdge {
        source: edge.source.clone(),
        target: edge.target.clone(),
        relation_name: edge.relation_name.clone(),
        label: edge.label.clone(),
        id: edge.id.clone(),
    }
}
