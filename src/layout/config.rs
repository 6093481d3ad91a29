//! Configuration for the scene graph

/// Defaults applied when an object leaves a parameter unset
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Smallest box that still has room for a one-unit border on each side
    pub min_box_size: f64,

    /// Arrowhead length as a fraction of the arrow length
    pub arrow_head_ratio: f64,

    /// Dash (and gap) length of dotted lines
    pub dash_length: f64,

    /// Distance between grid lines
    pub grid_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_box_size: 2.0,
            arrow_head_ratio: 0.2,
            dash_length: 10.0,
            grid_spacing: 100.0,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arrow_head_ratio(mut self, ratio: f64) -> Self {
        self.arrow_head_ratio = ratio;
        self
    }

    pub fn with_dash_length(mut self, length: f64) -> Self {
        self.dash_length = length;
        self
    }

    pub fn with_grid_spacing(mut self, spacing: f64) -> Self {
        self.grid_spacing = spacing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LayoutConfig::default();
        assert_eq!(config.min_box_size, 2.0);
        assert_eq!(config.arrow_head_ratio, 0.2);
        assert_eq!(config.dash_length, 10.0);
        assert_eq!(config.grid_spacing, 100.0);
    }

    #[test]
    fn test_builder_pattern() {
        let config = LayoutConfig::new()
            .with_dash_length(4.0)
            .with_grid_spacing(25.0);
        assert_eq!(config.dash_length, 4.0);
        assert_eq!(config.grid_spacing, 25.0);
        assert_eq!(config.arrow_head_ratio, 0.2);
    }
}
