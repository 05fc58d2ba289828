//! Rasterising projected shapes and detected corners onto RGB frames.

use arpose_core::{ExtrinsicPose, IntrinsicModel, Pt2, Real};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use super::shapes::{ColorRole, ShapeTemplate};

/// Endpoints further than this from the origin are not rasterised.
const MAX_PIXEL_COORD: Real = 1.0e5;

/// Colours and line width for overlay drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub primary: [u8; 3],
    pub secondary: [u8; 3],
    pub tertiary: [u8; 3],
    /// Detected-corner markers and the row-major polyline joining them.
    pub corners: [u8; 3],
    pub thickness: u32,
    pub corner_radius: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            primary: [255, 0, 0],
            secondary: [0, 255, 0],
            tertiary: [0, 0, 255],
            corners: [255, 255, 0],
            thickness: 2,
            corner_radius: 3,
        }
    }
}

impl OverlayStyle {
    pub fn color(&self, role: ColorRole) -> Rgb<u8> {
        Rgb(match role {
            ColorRole::Primary => self.primary,
            ColorRole::Secondary => self.secondary,
            ColorRole::Tertiary => self.tertiary,
        })
    }
}

/// Everything a draw call needs besides the frame and the pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub model: IntrinsicModel,
    pub style: OverlayStyle,
}

impl RenderContext {
    pub fn new(model: IntrinsicModel, style: OverlayStyle) -> Self {
        Self { model, style }
    }

    /// Project `shape` through `pose` and draw its segments.
    ///
    /// Segments with an endpoint on or behind the camera plane are skipped.
    /// Returns the number of segments drawn.
    pub fn draw_shape(&self, img: &mut RgbImage, shape: &ShapeTemplate, pose: &ExtrinsicPose) -> usize {
        let projected: Vec<Option<Pt2>> = shape
            .points
            .iter()
            .map(|p| {
                let pc = pose.transform_point(p);
                (pc.z > 0.0).then(|| self.model.project(&pc))
            })
            .collect();

        let mut drawn = 0;
        for seg in &shape.segments {
            let (Some(Some(a)), Some(Some(b))) = (projected.get(seg.from), projected.get(seg.to))
            else {
                continue;
            };
            if draw_line(img, a, b, self.style.color(seg.role), self.style.thickness) {
                drawn += 1;
            }
        }
        drawn
    }

    /// Draw detected corners as markers joined in row-major order.
    pub fn draw_corners(&self, img: &mut RgbImage, corners: &[Pt2]) {
        let color = Rgb(self.style.corners);
        for pair in corners.windows(2) {
            draw_line(img, &pair[0], &pair[1], color, 1);
        }
        for c in corners {
            draw_marker(img, c, self.style.corner_radius, color);
        }
    }
}

fn to_pixel(p: &Pt2) -> Option<(i64, i64)> {
    let ok = |v: Real| v.is_finite() && v.abs() < MAX_PIXEL_COORD;
    (ok(p.x) && ok(p.y)).then(|| (p.x.round() as i64, p.y.round() as i64))
}

#[inline]
fn set_pixel(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line; thickness > 1 stamps a square brush at every step.
///
/// Returns `false` if an endpoint is non-finite or absurdly far away.
pub fn draw_line(img: &mut RgbImage, a: &Pt2, b: &Pt2, color: Rgb<u8>, thickness: u32) -> bool {
    let (Some((mut x0, mut y0)), Some((x1, y1))) = (to_pixel(a), to_pixel(b)) else {
        return false;
    };

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;
    let half = i64::from(thickness.max(1) / 2);

    loop {
        for oy in -half..=half {
            for ox in -half..=half {
                set_pixel(img, x0 + ox, y0 + oy, color);
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
    true
}

/// Hollow square marker centred on `p`.
pub fn draw_marker(img: &mut RgbImage, p: &Pt2, radius: u32, color: Rgb<u8>) {
    let Some((cx, cy)) = to_pixel(p) else {
        return;
    };
    let r = i64::from(radius);
    for d in -r..=r {
        set_pixel(img, cx + d, cy - r, color);
        set_pixel(img, cx + d, cy + r, color);
        set_pixel(img, cx - r, cy + d, color);
        set_pixel(img, cx + r, cy + d, color);
    }
}
