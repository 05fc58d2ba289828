//! Static line-segment shapes in target units.
//!
//! All templates are authored in the target frame: `+x` along a row, `-y`
//! down the rows, `+z` out of the board towards the camera side.

use arpose_core::{Pt3, Real};
use serde::{Deserialize, Serialize};

/// Palette slot a segment is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRole {
    Primary,
    Secondary,
    Tertiary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from: usize,
    pub to: usize,
    pub role: ColorRole,
}

/// Points plus the segments joining them.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTemplate {
    pub points: Vec<Pt3>,
    pub segments: Vec<Segment>,
}

impl ShapeTemplate {
    fn empty() -> Self {
        Self {
            points: Vec::new(),
            segments: Vec::new(),
        }
    }

    /// Append a closed polygon through `corners`.
    fn push_loop(&mut self, corners: &[Pt3], role: ColorRole) {
        let base = self.points.len();
        self.points.extend_from_slice(corners);
        let n = corners.len();
        for i in 0..n {
            self.segments.push(Segment {
                from: base + i,
                to: base + (i + 1) % n,
                role,
            });
        }
    }

    /// Coordinate triad: x primary, y secondary, z tertiary. Unit length.
    pub fn axes() -> Self {
        let points = vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(1.0, 0.0, 0.0),
            Pt3::new(0.0, -1.0, 0.0),
            Pt3::new(0.0, 0.0, 1.0),
        ];
        let segments = [ColorRole::Primary, ColorRole::Secondary, ColorRole::Tertiary]
            .into_iter()
            .enumerate()
            .map(|(i, role)| Segment {
                from: 0,
                to: i + 1,
                role,
            })
            .collect();
        Self { points, segments }
    }

    /// 4 x 1 x 3 box standing on the board corner.
    pub fn rect_prism() -> Self {
        let points = vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(0.0, 0.0, 3.0),
            Pt3::new(4.0, 0.0, 3.0),
            Pt3::new(4.0, 0.0, 0.0),
            Pt3::new(0.0, -1.0, 0.0),
            Pt3::new(0.0, -1.0, 3.0),
            Pt3::new(4.0, -1.0, 3.0),
            Pt3::new(4.0, -1.0, 0.0),
        ];
        let mut segments = Vec::with_capacity(12);
        for i in 0..4 {
            let next = (i + 1) % 4;
            segments.push(Segment {
                from: i,
                to: next,
                role: ColorRole::Primary,
            });
            segments.push(Segment {
                from: i,
                to: i + 4,
                role: ColorRole::Secondary,
            });
            segments.push(Segment {
                from: i + 4,
                to: next + 4,
                role: ColorRole::Tertiary,
            });
        }
        Self { points, segments }
    }

    /// Fish outline standing upright in the board plane offset by `y`, nose at `x`.
    ///
    /// Four closed quads: body, upper fin, tail and lower fin.
    pub fn fish(x: Real, y: Real, role: ColorRole) -> Self {
        const CZ: Real = 0.5;
        let quad = |pts: [(Real, Real); 4]| pts.map(|(dx, z)| Pt3::new(x + dx, y, z));

        let mut shape = Self::empty();
        shape.push_loop(
            &quad([(0.0, CZ), (0.5, CZ + 0.4), (1.1, CZ), (0.6, CZ - 0.4)]),
            role,
        );
        shape.push_loop(
            &quad([
                (0.4, CZ + 0.4),
                (0.75, CZ + 0.7),
                (1.1, CZ + 0.4),
                (0.85, CZ + 0.1),
            ]),
            role,
        );
        shape.push_loop(
            &quad([(1.1, CZ), (1.7, CZ + 0.4), (1.4, CZ), (1.7, CZ - 0.4)]),
            role,
        );
        shape.push_loop(
            &quad([
                (0.6, CZ - 0.4),
                (0.9, CZ - 0.2),
                (1.1, CZ - 0.4),
                (0.95, CZ - 0.5),
            ]),
            role,
        );
        shape
    }
}

/// Serialisable description of one shape in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeSpec {
    Axes,
    RectPrism,
    Fish { x: Real, y: Real, color: ColorRole },
}

impl ShapeSpec {
    pub fn template(&self) -> ShapeTemplate {
        match *self {
            ShapeSpec::Axes => ShapeTemplate::axes(),
            ShapeSpec::RectPrism => ShapeTemplate::rect_prism(),
            ShapeSpec::Fish { x, y, color } => ShapeTemplate::fish(x, y, color),
        }
    }
}

/// Three fish swimming over the board.
pub fn default_scene() -> Vec<ShapeSpec> {
    vec![
        ShapeSpec::Fish {
            x: 3.0,
            y: 0.0,
            color: ColorRole::Primary,
        },
        ShapeSpec::Fish {
            x: 1.0,
            y: -2.0,
            color: ColorRole::Secondary,
        },
        ShapeSpec::Fish {
            x: 6.0,
            y: -4.0,
            color: ColorRole::Tertiary,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(shape: &ShapeTemplate) -> bool {
        shape
            .segments
            .iter()
            .all(|s| s.from < shape.points.len() && s.to < shape.points.len() && s.from != s.to)
    }

    #[test]
    fn axes_triad() {
        let axes = ShapeTemplate::axes();
        assert_eq!(axes.points[0], Pt3::origin());
        assert_eq!(axes.points[2], Pt3::new(0.0, -1.0, 0.0));
        assert_eq!(axes.segments.len(), 3);
        assert!(axes.segments.iter().all(|s| s.from == 0));
        assert!(valid(&axes));
    }

    #[test]
    fn prism_has_twelve_edges_four_per_colour() {
        let prism = ShapeTemplate::rect_prism();
        assert_eq!(prism.points.len(), 8);
        assert_eq!(prism.segments.len(), 12);
        for role in [ColorRole::Primary, ColorRole::Secondary, ColorRole::Tertiary] {
            assert_eq!(prism.segments.iter().filter(|s| s.role == role).count(), 4);
        }
        assert!(valid(&prism));
    }

    #[test]
    fn fish_lies_in_its_plane() {
        let fish = ShapeTemplate::fish(3.0, -2.0, ColorRole::Tertiary);
        assert_eq!(fish.points.len(), 16);
        assert_eq!(fish.segments.len(), 16);
        assert!(fish.points.iter().all(|p| p.y == -2.0));
        assert!(fish.points.iter().all(|p| p.x >= 3.0 && p.x <= 4.7 + 1e-12));
        assert!(fish.points.iter().all(|p| p.z >= 0.0 && p.z <= 1.2 + 1e-12));
        assert!(valid(&fish));
    }

    #[test]
    fn shape_spec_json() {
        let spec: ShapeSpec =
            serde_json::from_str(r#"{"kind":"fish","x":1.0,"y":-2.0,"color":"secondary"}"#).unwrap();
        assert_eq!(
            spec,
            ShapeSpec::Fish {
                x: 1.0,
                y: -2.0,
                color: ColorRole::Secondary
            }
        );
        let axes: ShapeSpec = serde_json::from_str(r#"{"kind":"axes"}"#).unwrap();
        assert_eq!(axes.template(), ShapeTemplate::axes());
    }
}
