//! Configuration for the layout engine

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read layout configuration: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse layout configuration TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Soft bounds nodes are kept inside of
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

/// Configuration options for layout computation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum horizontal separation for left/right constraints
    pub min_sep_width: f64,

    /// Minimum vertical separation for above/below constraints
    pub min_sep_height: f64,

    /// Radius of the circle cyclic fragments are laid out on
    pub cyclic_radius: f64,

    /// Gap kept between neighbours of an alignment class
    pub alignment_padding: f64,

    /// Default node size (width, height)
    pub node_size: (f64, f64),

    /// Colour used when a node's type cannot be resolved
    pub default_color: String,

    /// Add `_alignment_` edges for directly-oriented pairs without an edge
    pub alignment_edges: bool,

    /// Upper bound on cyclic backtracking trials
    pub max_cyclic_attempts: usize,

    /// Upper bound on paths enumerated for a single cyclic rule
    pub max_cyclic_paths: usize,

    pub canvas: Option<Canvas>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_sep_width: 15.0,
            min_sep_height: 15.0,
            cyclic_radius: 100.0,
            alignment_padding: 15.0,
            node_size: (100.0, 60.0),
            default_color: "black".to_string(),
            alignment_edges: true,
            max_cyclic_attempts: 10_000,
            max_cyclic_paths: 2_000,
            canvas: None,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load overrides from a TOML string; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the minimum separation on both axes
    pub fn with_min_separation(mut self, width: f64, height: f64) -> Self {
        self.min_sep_width = width;
        self.min_sep_height = height;
        self
    }

    pub fn with_cyclic_radius(mut self, radius: f64) -> Self {
        self.cyclic_radius = radius;
        self
    }

    pub fn with_alignment_edges(mut self, enabled: bool) -> Self {
        self.alignment_edges = enabled;
        self
    }

    pub fn with_max_cyclic_attempts(mut self, attempts: usize) -> Self {
        self.max_cyclic_attempts = attempts;
        self
    }

    pub fn with_max_cyclic_paths(mut self, paths: usize) -> Self {
        self.max_cyclic_paths = paths;
        self
    }

    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas = Some(Canvas { width, height });
        self
    }
}
