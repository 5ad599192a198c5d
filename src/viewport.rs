//! Viewport rectangles and layout presets.
//!
//! A viewport is one rectangular screen region showing one orthogonal
//! display plane. Rectangles are kept in normalized bottom-left-origin
//! coordinates; pixel extents derive from the current screen size.

use crate::enums::{LayoutPreset, ViewPlane};

/// One entry of a layout preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSpec {
    /// Normalized `(xmin, ymin, xmax, ymax)`.
    pub rect: (f64, f64, f64, f64),
    pub plane: ViewPlane,
}

impl ViewportSpec {
    const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, plane: ViewPlane) -> Self {
        Self {
            rect: (xmin, ymin, xmax, ymax),
            plane,
        }
    }
}

/// Expand a layout preset into its ordered viewport list.
///
/// `V` presets split the screen left/right, `H` presets top/bottom. In
/// the `Ab` presets each plane appears twice; the second viewport of a
/// plane takes the source-primary role (tracked by the orchestrator).
pub fn layout(preset: LayoutPreset) -> Vec<ViewportSpec> {
    use LayoutPreset::{
        AbXyV, AbXyXzV, AbXzV, AbYzV, XyXzH, XyXzV, XyXzYz, XyYzH, XyYzV, XzYzH, XzYzV,
    };
    use ViewPlane::{Xy, Xz, Yz};
    match preset {
        LayoutPreset::Xy => vec![ViewportSpec::new(0.0, 0.0, 1.0, 1.0, Xy)],
        LayoutPreset::Xz => vec![ViewportSpec::new(0.0, 0.0, 1.0, 1.0, Xz)],
        LayoutPreset::Yz => vec![ViewportSpec::new(0.0, 0.0, 1.0, 1.0, Yz)],
        XyXzV => vec![
            ViewportSpec::new(0.0, 0.0, 0.5, 1.0, Xy),
            ViewportSpec::new(0.5, 0.0, 1.0, 1.0, Xz),
        ],
        XyYzV => vec![
            ViewportSpec::new(0.0, 0.0, 0.5, 1.0, Xy),
            ViewportSpec::new(0.5, 0.0, 1.0, 1.0, Yz),
        ],
        XzYzV => vec![
            ViewportSpec::new(0.0, 0.0, 0.5, 1.0, Xz),
            ViewportSpec::new(0.5, 0.0, 1.0, 1.0, Yz),
        ],
        XyXzH => vec![
            ViewportSpec::new(0.0, 0.5, 1.0, 1.0, Xy),
            ViewportSpec::new(0.0, 0.0, 1.0, 0.5, Xz),
        ],
        XyYzH => vec![
            ViewportSpec::new(0.0, 0.5, 1.0, 1.0, Xy),
            ViewportSpec::new(0.0, 0.0, 1.0, 0.5, Yz),
        ],
        XzYzH => vec![
            ViewportSpec::new(0.0, 0.5, 1.0, 1.0, Xz),
            ViewportSpec::new(0.0, 0.0, 1.0, 0.5, Yz),
        ],
        XyXzYz => vec![
            ViewportSpec::new(0.0, 0.0, 1.0 / 3.0, 1.0, Xy),
            ViewportSpec::new(1.0 / 3.0, 0.0, 2.0 / 3.0, 1.0, Xz),
            ViewportSpec::new(2.0 / 3.0, 0.0, 1.0, 1.0, Yz),
        ],
        AbXyV => vec![
            ViewportSpec::new(0.0, 0.0, 0.5, 1.0, Xy),
            ViewportSpec::new(0.5, 0.0, 1.0, 1.0, Xy),
        ],
        AbXzV => vec![
            ViewportSpec::new(0.0, 0.0, 0.5, 1.0, Xz),
            ViewportSpec::new(0.5, 0.0, 1.0, 1.0, Xz),
        ],
        AbYzV => vec![
            ViewportSpec::new(0.0, 0.0, 0.5, 1.0, Yz),
            ViewportSpec::new(0.5, 0.0, 1.0, 1.0, Yz),
        ],
        AbXyXzV => vec![
            ViewportSpec::new(0.0, 0.5, 0.5, 1.0, Xy),
            ViewportSpec::new(0.5, 0.5, 1.0, 1.0, Xy),
            ViewportSpec::new(0.0, 0.0, 0.5, 0.5, Xz),
            ViewportSpec::new(0.5, 0.0, 1.0, 0.5, Xz),
        ],
    }
}

/// A viewport bound to the current screen size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub spec: ViewportSpec,
    pub screen: (u32, u32),
}

impl Viewport {
    pub fn new(spec: ViewportSpec, screen: (u32, u32)) -> Self {
        Self { spec, screen }
    }

    pub fn plane(&self) -> ViewPlane {
        self.spec.plane
    }

    /// Pixel width of the viewport region.
    pub fn width(&self) -> usize {
        let (xmin, _, xmax, _) = self.spec.rect;
        (((xmax - xmin) * self.screen.0 as f64).round() as usize).max(1)
    }

    /// Pixel height of the viewport region.
    pub fn height(&self) -> usize {
        let (_, ymin, _, ymax) = self.spec.rect;
        (((ymax - ymin) * self.screen.1 as f64).round() as usize).max(1)
    }

    /// Whether a normalized screen position lies inside the viewport.
    pub fn contains(&self, nx: f64, ny: f64) -> bool {
        let (xmin, ymin, xmax, ymax) = self.spec.rect;
        nx >= xmin && nx < xmax && ny >= ymin && ny < ymax
    }

    /// Map a normalized screen position to viewport-local pixel
    /// coordinates.
    pub fn to_local(&self, nx: f64, ny: f64) -> (f64, f64) {
        let (xmin, ymin, xmax, ymax) = self.spec.rect;
        (
            (nx - xmin) / (xmax - xmin) * self.width() as f64,
            (ny - ymin) / (ymax - ymin) * self.height() as f64,
        )
    }

    /// Bottom-left pixel position of the viewport on screen.
    pub fn pixel_origin(&self) -> (usize, usize) {
        let (xmin, ymin, _, _) = self.spec.rect;
        (
            (xmin * self.screen.0 as f64).round() as usize,
            (ymin * self.screen.1 as f64).round() as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_tile_the_screen() {
        for preset in [
            LayoutPreset::Xy,
            LayoutPreset::XyXzV,
            LayoutPreset::XyXzH,
            LayoutPreset::XyXzYz,
            LayoutPreset::AbXyXzV,
        ] {
            let area: f64 = layout(preset)
                .iter()
                .map(|s| {
                    let (x1, y1, x2, y2) = s.rect;
                    (x2 - x1) * (y2 - y1)
                })
                .sum();
            assert!((area - 1.0).abs() < 1e-12, "{preset:?} does not tile");
        }
    }

    #[test]
    fn hit_testing_matches_rect() {
        let vp = Viewport::new(layout(LayoutPreset::XyXzV)[1], (400, 300));
        assert!(vp.contains(0.75, 0.5));
        assert!(!vp.contains(0.25, 0.5));
        assert_eq!(vp.width(), 200);
        assert_eq!(vp.height(), 300);
    }

    #[test]
    fn local_mapping_spans_pixel_extent() {
        let vp = Viewport::new(layout(LayoutPreset::XyXzV)[1], (400, 300));
        let (x, y) = vp.to_local(0.5, 0.0);
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
        let (x, _) = vp.to_local(1.0, 1.0);
        assert!((x - 200.0).abs() < 1e-9);
    }
}
