//! Geometric constraints between pairs of nodes
//!
//! Every [`LayoutConstraint`] remembers the rule it was compiled from through a
//! [`ConstraintSource`], so solver failures can be explained both in terms of
//! node pairs and in terms of the specification the user wrote.

use std::fmt;

use serde::Serialize;

use crate::spec::{Direction, RotationDirection};

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// The specification rule a constraint was derived from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConstraintSource {
    /// A relative orientation rule
    Relative {
        selector: String,
        directions: Vec<Direction>,
    },
    /// A cyclic orientation rule
    Cyclic {
        selector: String,
        direction: RotationDirection,
    },
    /// Spacing between nodes forced onto one line by alignment
    ImplicitAlignment { axis: Axis },
}

impl fmt::Display for ConstraintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSource::Relative {
                selector,
                directions,
            } => {
                let directions: Vec<&str> = directions.iter().map(|d| d.as_str()).collect();
                write!(
                    f,
                    "orientation of '{}' is [{}]",
                    selector,
                    directions.join(", ")
                )
            }
            ConstraintSource::Cyclic {
                selector,
                direction,
            } => write!(f, "'{}' is laid out {}", selector, direction),
            ConstraintSource::ImplicitAlignment { axis } => write!(
                f,
                "nodes aligned on the {} axis must not overlap",
                axis
            ),
        }
    }
}

/// A constraint in the layout system
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutConstraint {
    /// `y(bottom) - y(top) >= min_distance`
    #[serde(rename_all = "camelCase")]
    Top {
        top: String,
        bottom: String,
        min_distance: f64,
        source: ConstraintSource,
    },

    /// `x(right) - x(left) >= min_distance`
    #[serde(rename_all = "camelCase")]
    Left {
        left: String,
        right: String,
        min_distance: f64,
        source: ConstraintSource,
    },

    /// Equal coordinates on `axis`
    #[serde(rename_all = "camelCase")]
    Alignment {
        axis: Axis,
        node1: String,
        node2: String,
        source: ConstraintSource,
    },
}

impl LayoutConstraint {
    pub fn top(
        top: impl Into<String>,
        bottom: impl Into<String>,
        min_distance: f64,
        source: ConstraintSource,
    ) -> Self {
        Self::Top {
            top: top.into(),
            bottom: bottom.into(),
            min_distance,
            source,
        }
    }

    pub fn left(
        left: impl Into<String>,
        right: impl Into<String>,
        min_distance: f64,
        source: ConstraintSource,
    ) -> Self {
        Self::Left {
            left: left.into(),
            right: right.into(),
            min_distance,
            source,
        }
    }

    pub fn alignment(
        axis: Axis,
        node1: impl Into<String>,
        node2: impl Into<String>,
        source: ConstraintSource,
    ) -> Self {
        Self::Alignment {
            axis,
            node1: node1.into(),
            node2: node2.into(),
            source,
        }
    }

    /// Get the source of this constraint
    pub fn source(&self) -> &ConstraintSource {
        match self {
            LayoutConstraint::Top { source, .. } => source,
            LayoutConstraint::Left { source, .. } => source,
            LayoutConstraint::Alignment { source, .. } => source,
        }
    }

    /// The two nodes a constraint relates
    pub fn node_ids(&self) -> [&str; 2] {
        match self {
            LayoutConstraint::Top { top, bottom, .. } => [top.as_str(), bottom.as_str()],
            LayoutConstraint::Left { left, right, .. } => [left.as_str(), right.as_str()],
            LayoutConstraint::Alignment { node1, node2, .. } => [node1.as_str(), node2.as_str()],
        }
    }

    /// Whether the coordinates returned by `position` satisfy the constraint within `tolerance`
    pub fn is_satisfied_by(
        &self,
        position: impl Fn(&str) -> Option<(f64, f64)>,
        tolerance: f64,
    ) -> bool {
        let [a, b] = self.node_ids();
        let (Some(pa), Some(pb)) = (position(a), position(b)) else {
            return false;
        };
        match self {
            LayoutConstraint::Top { min_distance, .. } => pb.1 - pa.1 >= min_distance - tolerance,
            LayoutConstraint::Left { min_distance, .. } => pb.0 - pa.0 >= min_distance - tolerance,
            LayoutConstraint::Alignment { axis: Axis::X, .. } => (pa.0 - pb.0).abs() <= tolerance,
            LayoutConstraint::Alignment { axis: Axis::Y, .. } => (pa.1 - pb.1).abs() <= tolerance,
        }
    }
}

impl fmt::Display for LayoutConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutConstraint::Top { top, bottom, .. } => write!(f, "{} is above {}", top, bottom),
            LayoutConstraint::Left { left, right, .. } => {
                write!(f, "{} is to the left of {}", left, right)
            }
            LayoutConstraint::Alignment {
                axis: Axis::X,
                node1,
                node2,
                ..
            } => write!(f, "{} is vertically aligned with {}", node1, node2),
            LayoutConstraint::Alignment {
                axis: Axis::Y,
                node1,
                node2,
                ..
            } => write!(f, "{} is horizontally aligned with {}", node1, node2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative() -> ConstraintSource {
        ConstraintSource::Relative {
            selector: "next".to_string(),
            directions: vec![Direction::Right, Direction::DirectlyRight],
        }
    }

    #[test]
    fn test_node_level_text() {
        let c = LayoutConstraint::left("a", "b", 15.0, relative());
        assert_eq!(c.to_string(), "a is to the left of b");

        let c = LayoutConstraint::alignment(Axis::X, "a", "b", relative());
        assert_eq!(c.to_string(), "a is vertically aligned with b");

        let c = LayoutConstraint::alignment(Axis::Y, "a", "b", relative());
        assert_eq!(c.to_string(), "a is horizontally aligned with b");
    }

    #[test]
    fn test_source_text() {
        assert_eq!(
            relative().to_string(),
            "orientation of 'next' is [right, directlyRight]"
        );
        let cyclic = ConstraintSource::Cyclic {
            selector: "ring".to_string(),
            direction: RotationDirection::Counterclockwise,
        };
        assert_eq!(cyclic.to_string(), "'ring' is laid out counterclockwise");
    }

    #[test]
    fn test_is_satisfied_by() {
        let c = LayoutConstraint::top("a", "b", 15.0, relative());
        let positions = |id: &str| match id {
            "a" => Some((0.0, 0.0)),
            "b" => Some((0.0, 20.0)),
            _ => None,
        };
        assert!(c.is_satisfied_by(positions, 1e-6));

        let c = LayoutConstraint::top("b", "a", 15.0, relative());
        assert!(!c.is_satisfied_by(positions, 1e-6));
    }
}
