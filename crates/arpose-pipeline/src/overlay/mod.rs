//! AR overlay: shape templates, drawing, and the overlay configuration.

mod render;
mod shapes;

pub use render::{draw_line, draw_marker, OverlayStyle, RenderContext};
pub use shapes::{default_scene, ColorRole, Segment, ShapeSpec, ShapeTemplate};

use serde::{Deserialize, Serialize};

use crate::pose::PoseSolverOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub style: OverlayStyle,
    /// Shapes drawn on every frame with a pose.
    pub shapes: Vec<ShapeSpec>,
    /// Log rvec/tvec on every frame whose index is a multiple of this,
    /// counting frames without a pose too; `0` disables.
    pub pose_log_interval: u64,
    /// Also mark the detected corners.
    pub draw_corners: bool,
    pub pose: PoseSolverOptions,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            style: OverlayStyle::default(),
            shapes: default_scene(),
            pose_log_interval: 5,
            draw_corners: false,
            pose: PoseSolverOptions::default(),
        }
    }
}

impl OverlayConfig {
    pub fn templates(&self) -> Vec<ShapeTemplate> {
        self.shapes.iter().map(ShapeSpec::template).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: OverlayConfig =
            serde_json::from_str(r#"{"shapes":[{"kind":"axes"},{"kind":"rect_prism"}]}"#).unwrap();
        assert_eq!(cfg.shapes, vec![ShapeSpec::Axes, ShapeSpec::RectPrism]);
        assert_eq!(cfg.pose_log_interval, 5);
        assert_eq!(cfg.style.thickness, 2);
    }

    #[test]
    fn default_scene_is_three_fish() {
        let cfg = OverlayConfig::default();
        let templates = cfg.templates();
        assert_eq!(templates.len(), 3);
        assert!(templates.iter().all(|t| t.segments.len() == 16));
    }
}
