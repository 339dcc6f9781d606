//! Typed layout specification
//!
//! A [`LayoutSpec`] is the already-parsed form of a layout document: orientation
//! and grouping constraints plus per-atom directives. The structure mirrors the
//! document's two blocks, `constraints` and `directives`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a tuple's target should sit relative to its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Above,
    Below,
    Left,
    Right,
    DirectlyAbove,
    DirectlyBelow,
    DirectlyLeft,
    DirectlyRight,
}

impl Direction {
    /// The non-strict counterpart of a `directly*` direction
    pub fn relaxed(self) -> Direction {
        match self {
            Direction::DirectlyAbove => Direction::Above,
            Direction::DirectlyBelow => Direction::Below,
            Direction::DirectlyLeft => Direction::Left,
            Direction::DirectlyRight => Direction::Right,
            other => other,
        }
    }

    pub fn is_direct(self) -> bool {
        self.relaxed() != self
    }

    fn opposite(self) -> Direction {
        match self.relaxed() {
            Direction::Above => Direction::Below,
            Direction::Below => Direction::Above,
            Direction::Left => Direction::Right,
            _ => Direction::Left,
        }
    }

    /// Whether two directions may appear together in one rule
    pub fn compatible_with(self, other: Direction) -> bool {
        if self == other {
            return true;
        }
        if self.is_direct() || other.is_direct() {
            return self.relaxed() == other.relaxed();
        }
        self.opposite() != other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::DirectlyAbove => "directlyAbove",
            Direction::DirectlyBelow => "directlyBelow",
            Direction::DirectlyLeft => "directlyLeft",
            Direction::DirectlyRight => "directlyRight",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Winding order for cyclic layouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationDirection {
    #[default]
    Clockwise,
    Counterclockwise,
}

impl fmt::Display for RotationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationDirection::Clockwise => f.write_str("clockwise"),
            RotationDirection::Counterclockwise => f.write_str("counterclockwise"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeOrientation {
    pub selector: String,
    pub directions: Vec<Direction>,
}

impl RelativeOrientation {
    pub fn new(selector: impl Into<String>, directions: &[Direction]) -> Self {
        Self {
            selector: selector.into(),
            directions: directions.to_vec(),
        }
    }

    /// Reject mutually exclusive direction combinations
    pub fn validate(&self) -> Result<(), SpecError> {
        for (i, first) in self.directions.iter().enumerate() {
            for second in &self.directions[i + 1..] {
                if !first.compatible_with(*second) {
                    return Err(SpecError::ConflictingDirections {
                        selector: self.selector.clone(),
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclicOrientation {
    pub selector: String,
    #[serde(default)]
    pub direction: RotationDirection,
}

impl CyclicOrientation {
    pub fn new(selector: impl Into<String>, direction: RotationDirection) -> Self {
        Self {
            selector: selector.into(),
            direction,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationBlock {
    #[serde(default)]
    pub relative: Vec<RelativeOrientation>,
    #[serde(default)]
    pub cyclic: Vec<CyclicOrientation>,
}

fn default_true() -> bool {
    true
}

fn default_add_to_group() -> usize {
    1
}

/// Group tuple components by the atom at one tuple position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupByField {
    pub field: String,
    /// Tuple position of the key atom
    #[serde(default)]
    pub group_on: usize,
    /// Tuple position of the member atom
    #[serde(default = "default_add_to_group")]
    pub add_to_group: usize,
    #[serde(default = "default_true")]
    pub show_label: bool,
}

impl GroupByField {
    pub fn new(field: impl Into<String>, group_on: usize, add_to_group: usize) -> Self {
        Self {
            field: field.into(),
            group_on,
            add_to_group,
            show_label: true,
        }
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.group_on == self.add_to_group {
            return Err(SpecError::InvalidGroupIndex {
                field: self.field.clone(),
                reason: format!(
                    "groupOn and addToGroup must differ (both are {})",
                    self.group_on
                ),
            });
        }
        Ok(())
    }
}

/// Group atoms selected by an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBySelector {
    pub selector: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub show_label: bool,
}

impl GroupBySelector {
    pub fn new(selector: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            name: name.into(),
            show_label: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupingBlock {
    #[serde(default)]
    pub byfield: Vec<GroupByField>,
    #[serde(default)]
    pub byselector: Vec<GroupBySelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintBlock {
    #[serde(default)]
    pub orientation: OrientationBlock,
    #[serde(default)]
    pub grouping: GroupingBlock,
}

/// Colour for every atom whose type chain contains `type_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomColor {
    pub type_id: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomSize {
    pub selector: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomIcon {
    pub type_id: String,
    pub path: String,
    #[serde(default)]
    pub show_labels: bool,
}

/// Extra edges drawn between every selected pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredEdge {
    pub name: String,
    pub selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directives {
    #[serde(default)]
    pub colors: Vec<AtomColor>,
    #[serde(default)]
    pub sizes: Vec<AtomSize>,
    #[serde(default)]
    pub icons: Vec<AtomIcon>,
    /// Relations rendered as node attributes instead of edges
    #[serde(default)]
    pub attribute_fields: Vec<String>,
    /// Relations laid out but not drawn
    #[serde(default)]
    pub hidden_fields: Vec<String>,
    /// Types represented by a single chosen atom
    #[serde(default)]
    pub projections: Vec<String>,
    #[serde(default)]
    pub inferred_edges: Vec<InferredEdge>,
    #[serde(default)]
    pub hide_disconnected: bool,
    #[serde(default)]
    pub hide_disconnected_builtins: bool,
}

impl Directives {
    pub fn is_attribute_field(&self, relation: &str) -> bool {
        self.attribute_fields.iter().any(|f| f == relation)
    }

    pub fn is_hidden_field(&self, relation: &str) -> bool {
        self.hidden_fields.iter().any(|f| f == relation)
    }

    /// A relation may not be both an attribute and a hidden field
    pub fn validate_fields(&self) -> Result<(), SpecError> {
        match self
            .attribute_fields
            .iter()
            .find(|f| self.is_hidden_field(f))
        {
            Some(field) => Err(SpecError::AttributeHiddenOverlap {
                field: field.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// A parsed layout specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    #[serde(default)]
    pub constraints: ConstraintBlock,
    #[serde(default)]
    pub directives: Directives,
}

impl LayoutSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relative(mut self, selector: &str, directions: &[Direction]) -> Self {
        self.constraints
            .orientation
            .relative
            .push(RelativeOrientation::new(selector, directions));
        self
    }

    pub fn with_cyclic(mut self, selector: &str, direction: RotationDirection) -> Self {
        self.constraints
            .orientation
            .cyclic
            .push(CyclicOrientation::new(selector, direction));
        self
    }

    pub fn with_group_by_field(
        mut self,
        field: &str,
        group_on: usize,
        add_to_group: usize,
    ) -> Self {
        self.constraints
            .grouping
            .byfield
            .push(GroupByField::new(field, group_on, add_to_group));
        self
    }

    pub fn with_group_by_selector(mut self, selector: &str, name: &str) -> Self {
        self.constraints
            .grouping
            .byselector
            .push(GroupBySelector::new(selector, name));
        self
    }

    pub fn with_attribute_field(mut self, field: &str) -> Self {
        self.directives.attribute_fields.push(field.to_string());
        self
    }

    pub fn with_hidden_field(mut self, field: &str) -> Self {
        self.directives.hidden_fields.push(field.to_string());
        self
    }

    pub fn with_projection(mut self, type_id: &str) -> Self {
        self.directives.projections.push(type_id.to_string());
        self
    }

    pub fn with_hide_disconnected_builtins(mut self, hide: bool) -> Self {
        self.directives.hide_disconnected_builtins = hide;
        self
    }

    /// Check every internal-consistency rule that needs no instance
    pub fn validate(&self) -> Result<(), SpecError> {
        self.directives.validate_fields()?;
        for rule in &self.constraints.orientation.relative {
            rule.validate()?;
        }
        for rule in &self.constraints.grouping.byfield {
            rule.validate()?;
        }
        Ok(())
    }
}

/// Configuration errors found in a layout specification
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error(
        "orientation constraint on '{selector}' requests incompatible directions \
         {first} and {second}"
    )]
    ConflictingDirections {
        selector: String,
        first: Direction,
        second: Direction,
    },

    #[error("relation '{field}' cannot be both an attribute and a hidden field")]
    AttributeHiddenOverlap { field: String },

    #[error("invalid grouping on field '{field}': {reason}")]
    InvalidGroupIndex { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_directions_conflict() {
        let rule = RelativeOrientation::new("r", &[Direction::Above, Direction::Below]);
        assert!(matches!(
            rule.validate(),
            Err(SpecError::ConflictingDirections { .. })
        ));

        let rule = RelativeOrientation::new("r", &[Direction::DirectlyLeft, Direction::Right]);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_direct_only_with_own_counterpart() {
        let ok = RelativeOrientation::new("r", &[Direction::DirectlyAbove, Direction::Above]);
        assert!(ok.validate().is_ok());

        let bad = RelativeOrientation::new("r", &[Direction::DirectlyAbove, Direction::Left]);
        assert!(bad.validate().is_err());

        let bad = RelativeOrientation::new(
            "r",
            &[Direction::DirectlyAbove, Direction::DirectlyLeft],
        );
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_orthogonal_directions_allowed() {
        let rule = RelativeOrientation::new("r", &[Direction::Above, Direction::Left]);
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_attribute_hidden_overlap() {
        let spec = LayoutSpec::new()
            .with_attribute_field("age")
            .with_hidden_field("age");
        assert_eq!(
            spec.validate(),
            Err(SpecError::AttributeHiddenOverlap {
                field: "age".to_string()
            })
        );
    }

    #[test]
    fn test_group_indices_must_differ() {
        let spec = LayoutSpec::new().with_group_by_field("contents", 1, 1);
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InvalidGroupIndex { .. })
        ));
    }

    #[test]
    fn test_directives_default_shows_everything() {
        assert!(!Directives::default().hide_disconnected_builtins);
        assert!(!Directives::default().hide_disconnected);

        let spec = LayoutSpec::new().with_hide_disconnected_builtins(true);
        assert!(spec.directives.hide_disconnected_builtins);
    }
}
