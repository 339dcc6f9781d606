//! CnD Layout - constraint-based layout for relational model instances
//!
//! This library lays out the atoms and tuples of a relational model instance
//! according to a declarative specification of orientation, grouping and
//! cyclic rules. It computes node positions with a linear constraint solver and
//! explains infeasible specifications in terms of the rules that conflict.
//!
//! # Example
//!
//! ```rust
//! use cnd_layout::spec::{Direction, LayoutSpec};
//! use cnd_layout::{generate_layout, Instance, LayoutConfig, RelationSelector};
//! use indexmap::IndexMap;
//!
//! let instance = Instance::new()
//!     .with_type("Node", ["a", "b"], ["univ"])
//!     .with_relation("next", [["a", "b"]]);
//! let spec = LayoutSpec::new().with_relative("next", &[Direction::Right]);
//!
//! let result = generate_layout(
//!     &instance,
//!     &spec,
//!     &RelationSelector,
//!     &LayoutConfig::default(),
//!     &IndexMap::new(),
//! )
//! .unwrap();
//!
//! let a = result.layout.node("a").unwrap().position;
//! let b = result.layout.node("b").unwrap().position;
//! assert!(b.x >= a.x + 15.0 - 1e-6);
//! ```

pub mod instance;
pub mod layout;
pub mod selector;
pub mod spec;

pub use instance::{AtomId, Instance, ProjectionChoice, ProjectionError};
pub use layout::{
    InstanceLayout, LayoutConfig, LayoutConstraint, LayoutError, LayoutInstance, LayoutResult,
    PositionalConflict,
};
pub use selector::{RelationSelector, Selection, SelectorError, SelectorEvaluator};
pub use spec::{LayoutSpec, SpecError};

use indexmap::IndexMap;

/// Lay out `instance` according to `spec`
///
/// Convenience wrapper around [`LayoutInstance::generate_layout`]. `projections`
/// maps each projected type to the atom that should represent it.
pub fn generate_layout(
    instance: &Instance,
    spec: &LayoutSpec,
    evaluator: &dyn SelectorEvaluator,
    config: &LayoutConfig,
    projections: &IndexMap<String, AtomId>,
) -> Result<LayoutResult, LayoutError> {
    LayoutInstance::new(spec, evaluator)
        .with_config(config.clone())
        .generate_layout(instance, projections)
}
