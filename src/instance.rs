//! Relational model instances: typed atoms and n-ary relation tuples
//!
//! An [`Instance`] is read-only input to the layout engine. Every atom belongs to
//! exactly one most-specific type, and each type carries its chain of supertypes
//! ending at the universal type [`UNIV`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a single atom
pub type AtomId = String;

/// The universal type every type chain ends with
pub const UNIV: &str = "univ";

/// Types that are built into the modelling language rather than declared by a user
const BUILTIN_TYPES: &[&str] = &["Int", "seq/Int", "String", "univ", "none"];

/// A type (signature) together with the atoms whose most-specific type it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomType {
    pub id: String,
    #[serde(default)]
    pub atoms: Vec<AtomId>,
    /// Supertypes from the immediate parent upwards
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub builtin: bool,
}

impl AtomType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            atoms: Vec::new(),
            supertypes: Vec::new(),
            builtin: false,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin || BUILTIN_TYPES.contains(&self.id.as_str())
    }
}

/// A relation: a named set of tuples over atoms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub name: String,
    /// Column types, when known
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub tuples: Vec<Vec<AtomId>>,
}

impl Relation {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            types: Vec::new(),
            tuples: Vec::new(),
        }
    }

    /// Arity from the declared column types, falling back to the first tuple
    pub fn arity(&self) -> usize {
        if !self.types.is_empty() {
            return self.types.len();
        }
        self.tuples.first().map(Vec::len).unwrap_or(0)
    }
}

/// A relational model instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub types: IndexMap<String, AtomType>,
    #[serde(default)]
    pub relations: IndexMap<String, Relation>,
}

/// Errors raised while projecting an instance
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("cannot project over unknown type '{0}'")]
    UnknownType(String),

    #[error("atom '{atom}' is not an atom of projected type '{type_id}'")]
    AtomNotInType { atom: AtomId, type_id: String },
}

/// The atom picked to represent a projected type, plus the alternatives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionChoice {
    pub type_id: String,
    pub projected_atom: Option<AtomId>,
    pub atoms: Vec<AtomId>,
}

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type with its atoms and supertype chain
    pub fn with_type<A, S>(mut self, id: &str, atoms: A, supertypes: S) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let mut ty = AtomType::new(id);
        ty.atoms = atoms.into_iter().map(Into::into).collect();
        ty.supertypes = supertypes.into_iter().map(Into::into).collect();
        self.types.insert(id.to_string(), ty);
        self
    }

    /// Mark a declared type as built-in
    pub fn with_builtin_type<A>(mut self, id: &str, atoms: A) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let mut ty = AtomType::new(id);
        ty.atoms = atoms.into_iter().map(Into::into).collect();
        ty.builtin = true;
        self.types.insert(id.to_string(), ty);
        self
    }

    /// Add a relation with its tuples
    pub fn with_relation<T, A>(mut self, name: &str, tuples: T) -> Self
    where
        T: IntoIterator<Item = A>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let mut relation = Relation::new(name);
        relation.tuples = tuples
            .into_iter()
            .map(|tuple| tuple.into_iter().map(Into::into).collect())
            .collect();
        self.relations.insert(name.to_string(), relation);
        self
    }

    /// All atoms in declaration order
    pub fn atoms(&self) -> impl Iterator<Item = &AtomId> {
        self.types.values().flat_map(|ty| ty.atoms.iter())
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// The most-specific type of an atom
    pub fn atom_type(&self, atom: &str) -> Option<&AtomType> {
        self.types
            .values()
            .find(|ty| ty.atoms.iter().any(|a| a == atom))
    }

    /// Whether an atom's most-specific type is built in
    pub fn is_builtin(&self, atom: &str) -> Option<bool> {
        self.atom_type(atom).map(AtomType::is_builtin)
    }

    /// Most-specific type first, ending at [`UNIV`]
    pub fn type_chain(&self, atom: &str) -> Option<Vec<String>> {
        let ty = self.atom_type(atom)?;
        let mut chain = Vec::with_capacity(ty.supertypes.len() + 2);
        chain.push(ty.id.clone());
        chain.extend(ty.supertypes.iter().cloned());
        if chain.last().map(String::as_str) != Some(UNIV) {
            chain.push(UNIV.to_string());
        }
        Some(chain)
    }

    /// Atoms whose type chain includes `type_id`
    pub fn atoms_of_type(&self, type_id: &str) -> Vec<AtomId> {
        self.types
            .values()
            .filter(|ty| ty.id == type_id || ty.supertypes.iter().any(|s| s == type_id))
            .flat_map(|ty| ty.atoms.iter().cloned())
            .collect()
    }

    /// Project the instance over the given types.
    ///
    /// `choices` maps a type to the caller's preferred atom; types without a
    /// choice are represented by their first atom. Tuples mentioning the chosen
    /// atom lose that column, tuples mentioning any other atom of the projected
    /// type are dropped, and the projected type's atoms leave the instance.
    pub fn project(
        &self,
        types: &[String],
        choices: &IndexMap<String, AtomId>,
    ) -> Result<(Instance, Vec<ProjectionChoice>), ProjectionError> {
        let mut projected = self.clone();
        let mut made = Vec::with_capacity(types.len());

        for type_id in types {
            if !projected.types.contains_key(type_id) {
                return Err(ProjectionError::UnknownType(type_id.clone()));
            }
            let atoms = projected.atoms_of_type(type_id);
            let chosen = match choices.get(type_id) {
                Some(atom) if atoms.contains(atom) => Some(atom.clone()),
                Some(atom) => {
                    return Err(ProjectionError::AtomNotInType {
                        atom: atom.clone(),
                        type_id: type_id.clone(),
                    })
                }
                None => atoms.first().cloned(),
            };

            projected.remove_projected(type_id, &atoms, chosen.as_deref());
            made.push(ProjectionChoice {
                type_id: type_id.clone(),
                projected_atom: chosen,
                atoms,
            });
        }

        Ok((projected, made))
    }

    /// `type_id` and every type below it
    fn subtypes_of(&self, type_id: &str) -> Vec<String> {
        self.types
            .values()
            .filter(|ty| ty.id == type_id || ty.supertypes.iter().any(|s| s == type_id))
            .map(|ty| ty.id.clone())
            .collect()
    }

    fn remove_projected(&mut self, type_id: &str, atoms: &[AtomId], chosen: Option<&str>) {
        let projected_types = self.subtypes_of(type_id);
        for relation in self.relations.values_mut() {
            relation.tuples = std::mem::take(&mut relation.tuples)
                .into_iter()
                .filter(|tuple| {
                    tuple
                        .iter()
                        .all(|a| !atoms.contains(a) || Some(a.as_str()) == chosen)
                })
                .map(|tuple| {
                    tuple
                        .into_iter()
                        .filter(|a| Some(a.as_str()) != chosen)
                        .collect::<Vec<_>>()
                })
                .filter(|tuple| !tuple.is_empty())
                .collect();
            relation.types.retain(|t| !projected_types.contains(t));
        }
        self.relations.retain(|_, r| !r.tuples.is_empty() || r.arity() > 0);

        for ty in self.types.values_mut() {
            ty.atoms.retain(|a| !atoms.contains(a));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Instance {
        Instance::new()
            .with_type("Node", ["Node0", "Node1"], ["univ"])
            .with_type("Time", ["T0", "T1"], ["univ"])
            .with_builtin_type("Int", ["0", "1"])
            .with_relation(
                "next",
                [
                    ["T0", "Node0", "Node1"],
                    ["T1", "Node1", "Node0"],
                ],
            )
    }

    #[test]
    fn test_type_chain_ends_at_univ() {
        let inst = Instance::new().with_type("Leaf", ["l"], ["Tree"]);
        assert_eq!(
            inst.type_chain("l").unwrap(),
            vec!["Leaf".to_string(), "Tree".to_string(), "univ".to_string()]
        );
    }

    #[test]
    fn test_builtin_lookup() {
        let inst = sample();
        assert_eq!(inst.is_builtin("0"), Some(true));
        assert_eq!(inst.is_builtin("Node0"), Some(false));
        assert_eq!(inst.is_builtin("missing"), None);
    }

    #[test]
    fn test_projection_defaults_to_first_atom() {
        let inst = sample();
        let (projected, choices) = inst
            .project(&["Time".to_string()], &IndexMap::new())
            .unwrap();

        assert_eq!(choices[0].projected_atom.as_deref(), Some("T0"));
        assert_eq!(choices[0].atoms, vec!["T0".to_string(), "T1".to_string()]);
        assert_eq!(
            projected.relations["next"].tuples,
            vec![vec!["Node0".to_string(), "Node1".to_string()]]
        );
        assert!(projected.atom_type("T0").is_none());
    }

    #[test]
    fn test_projection_drops_subtype_columns() {
        let mut inst = Instance::new()
            .with_type("Time", [] as [&str; 0], ["univ"])
            .with_type("Tick", ["T0", "T1"], ["Time", "univ"])
            .with_type("Node", ["Node0", "Node1"], ["univ"]);
        let mut next = Relation::new("next");
        next.types = vec!["Tick".to_string(), "Node".to_string(), "Node".to_string()];
        next.tuples = vec![
            vec!["T0".to_string(), "Node0".to_string(), "Node1".to_string()],
            vec!["T1".to_string(), "Node1".to_string(), "Node0".to_string()],
        ];
        inst.relations.insert("next".to_string(), next);

        let (projected, _) = inst
            .project(&["Time".to_string()], &IndexMap::new())
            .unwrap();
        let next = &projected.relations["next"];

        assert_eq!(next.types, vec!["Node".to_string(), "Node".to_string()]);
        assert_eq!(next.arity(), 2);
        assert!(next.tuples.iter().all(|t| t.len() == next.arity()));
    }

    #[test]
    fn test_projection_with_choice() {
        let inst = sample();
        let mut choices = IndexMap::new();
        choices.insert("Time".to_string(), "T1".to_string());
        let (projected, _) = inst.project(&["Time".to_string()], &choices).unwrap();
        assert_eq!(
            projected.relations["next"].tuples,
            vec![vec!["Node1".to_string(), "Node0".to_string()]]
        );
    }

    #[test]
    fn test_projection_rejects_foreign_atom() {
        let inst = sample();
        let mut choices = IndexMap::new();
        choices.insert("Time".to_string(), "Node0".to_string());
        let err = inst.project(&["Time".to_string()], &choices).unwrap_err();
        assert!(matches!(err, ProjectionError::AtomNotInType { .. }));
    }

    #[test]
    fn test_projection_unknown_type() {
        let err = sample()
            .project(&["Nope".to_string()], &IndexMap::new())
            .unwrap_err();
        assert_eq!(err, ProjectionError::UnknownType("Nope".to_string()));
    }
}
