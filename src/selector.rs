//! Boundary to the selector expression evaluator
//!
//! Layout rules name the atoms and tuples they apply to through opaque selector
//! strings. The engine never interprets those strings itself: it hands them to a
//! [`SelectorEvaluator`] and consumes the resulting [`Selection`].

use std::collections::HashSet;

use thiserror::Error;

use crate::instance::{AtomId, Instance};

/// Errors reported by a selector evaluator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectorError {
    #[error("unknown selector '{0}'")]
    Unknown(String),

    #[error("selector '{selector}' could not be evaluated: {message}")]
    Evaluation { selector: String, message: String },
}

/// The tuples a selector resolved to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    tuples: Vec<Vec<AtomId>>,
}

impl Selection {
    pub fn new(tuples: Vec<Vec<AtomId>>) -> Self {
        Self { tuples }
    }

    pub fn from_atoms(atoms: impl IntoIterator<Item = AtomId>) -> Self {
        Self::new(atoms.into_iter().map(|a| vec![a]).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Arity of the selection, taken from its first tuple
    pub fn arity(&self) -> Option<usize> {
        self.tuples.first().map(Vec::len)
    }

    /// Atoms of unary tuples, de-duplicated in selection order
    pub fn selected_atoms(&self) -> Vec<AtomId> {
        let mut seen = HashSet::new();
        self.tuples
            .iter()
            .filter(|t| t.len() == 1)
            .filter(|t| seen.insert(t[0].clone()))
            .map(|t| t[0].clone())
            .collect()
    }

    /// Binary tuples as (first, second) pairs
    pub fn selected_pairs(&self) -> Vec<(AtomId, AtomId)> {
        self.tuples
            .iter()
            .filter(|t| t.len() == 2)
            .map(|t| (t[0].clone(), t[1].clone()))
            .collect()
    }

    /// Every tuple of arity two or more
    pub fn selected_tuples_all(&self) -> Vec<Vec<AtomId>> {
        self.tuples.iter().filter(|t| t.len() >= 2).cloned().collect()
    }
}

/// Resolves selector strings against an instance.
///
/// Implementations must be pure and deterministic in `(selector, instance)`.
pub trait SelectorEvaluator {
    fn evaluate(&self, selector: &str, instance: &Instance) -> Result<Selection, SelectorError>;
}

/// Evaluator that understands relation and type names.
///
/// - `rel` selects every tuple of the relation named `rel`
/// - `~rel` selects the transpose of a binary relation
/// - `Type` selects every atom of the type, including subtype atoms
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationSelector;

impl SelectorEvaluator for RelationSelector {
    fn evaluate(&self, selector: &str, instance: &Instance) -> Result<Selection, SelectorError> {
        let selector = selector.trim();

        if let Some(name) = selector.strip_prefix('~') {
            let relation = instance
                .relations()
                .find(|r| r.name == name)
                .ok_or_else(|| SelectorError::Unknown(selector.to_string()))?;
            if relation.arity() != 2 {
                return Err(SelectorError::Evaluation {
                    selector: selector.to_string(),
                    message: format!(
                        "transpose needs a binary relation, '{}' has arity {}",
                        name,
                        relation.arity()
                    ),
                });
            }
            let tuples = relation
                .tuples
                .iter()
                .map(|t| t.iter().rev().cloned().collect())
                .collect();
            return Ok(Selection::new(tuples));
        }

        if let Some(relation) = instance.relations().find(|r| r.name == selector) {
            return Ok(Selection::new(relation.tuples.clone()));
        }

        if instance.types.contains_key(selector) {
            return Ok(Selection::from_atoms(instance.atoms_of_type(selector)));
        }

        Err(SelectorError::Unknown(selector.to_string()))
    }
}
