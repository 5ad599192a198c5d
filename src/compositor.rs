//! Blending of per-viewport rasters into displayable color buffers.
//!
//! Pure per-pixel: the output at (i, j) depends only on the raster
//! samples and lookup tables at (i, j), so scanlines are composited in
//! parallel and processing order never changes the result. Viewports
//! whose primary role is the source swap rasters and tables before the
//! mode switch, which callers do via [`CompositeInputs::swapped`].

use crate::enums::ViewMode;
use crate::lookup_table::{Color, LookupTable};
use crate::segment_table::SegmentTable;

use ndarray::ArrayView2;
use rayon::prelude::*;

/// Everything one viewport's composite depends on.
pub struct CompositeInputs<'a> {
    pub target: ArrayView2<'a, f64>,
    pub source: ArrayView2<'a, f64>,
    /// Raw label raster; negative means no label.
    pub segmentation: Option<ArrayView2<'a, f64>>,
    /// Positive voxels receive the selection highlight.
    pub selection: Option<ArrayView2<'a, f64>>,
    pub target_lut: &'a LookupTable,
    pub source_lut: &'a LookupTable,
    pub subtraction_lut: &'a LookupTable,
    pub segment_table: &'a SegmentTable,
    pub view_mode: ViewMode,
    pub view_mix: f64,
}

impl<'a> CompositeInputs<'a> {
    /// Swap target and source rasters and tables (source-primary panes).
    pub fn swapped(self) -> Self {
        Self {
            target: self.source,
            source: self.target,
            target_lut: self.source_lut,
            source_lut: self.target_lut,
            ..self
        }
    }
}

/// Composite one viewport into `out` (row-major, `height * width`).
pub fn composite(inputs: &CompositeInputs<'_>, out: &mut [Color]) {
    let (height, width) = inputs.target.dim();
    debug_assert_eq!(inputs.source.dim(), (height, width));
    debug_assert_eq!(out.len(), height * width);
    if height == 0 || width == 0 {
        return;
    }

    out.par_chunks_mut(width).enumerate().for_each(|(j, row)| {
        for (i, pixel) in row.iter_mut().enumerate() {
            *pixel = blend(inputs, i, j, width, height);
            overlay(inputs, i, j, pixel);
        }
    });
}

fn blend(inputs: &CompositeInputs<'_>, i: usize, j: usize, width: usize, height: usize) -> Color {
    let t = inputs.target[[j, i]];
    let s = inputs.source[[j, i]];
    let lut1 = inputs.target_lut;
    let lut2 = inputs.source_lut;
    match inputs.view_mode {
        ViewMode::Target => lut1.at(t),
        ViewMode::Source => lut2.at(s),
        ViewMode::VerticalShutter => {
            if (i as f64) < inputs.view_mix * width as f64 {
                lut1.at(t)
            } else {
                lut2.at(s)
            }
        }
        ViewMode::HorizontalShutter => {
            if (j as f64) < inputs.view_mix * height as f64 {
                lut1.at(t)
            } else {
                lut2.at(s)
            }
        }
        ViewMode::Subtraction => {
            if t >= 0.0 && s >= 0.0 {
                inputs.subtraction_lut.at(t - s)
            } else {
                Color::BLACK
            }
        }
        ViewMode::Checkerboard => {
            let a = inputs.view_mix;
            let b = 1.0 - a;
            let c1 = lut1.at(t);
            let c2 = lut2.at(s);
            Color::opaque(
                (a * c1.r as f64 + b * c2.r as f64) as u8,
                (a * c1.g as f64 + b * c2.g as f64) as u8,
                (a * c1.b as f64 + b * c2.b as f64) as u8,
            )
        }
        ViewMode::TargetOverSource => {
            let c1 = lut1.at(t);
            let c2 = lut2.at(s);
            let a = c1.alpha();
            Color::opaque(
                (a * c1.r as f64 + (1.0 - a) * c2.r as f64) as u8,
                (a * c1.g as f64 + (1.0 - a) * c2.g as f64) as u8,
                (a * c1.b as f64 + (1.0 - a) * c2.b as f64) as u8,
            )
        }
        ViewMode::SourceOverTarget => {
            let c1 = lut1.at(t);
            let c2 = lut2.at(s);
            let a = c2.alpha();
            Color::opaque(
                ((1.0 - a) * c1.r as f64 + a * c2.r as f64) as u8,
                ((1.0 - a) * c1.g as f64 + a * c2.g as f64) as u8,
                ((1.0 - a) * c1.b as f64 + a * c2.b as f64) as u8,
            )
        }
    }
}

fn overlay(inputs: &CompositeInputs<'_>, i: usize, j: usize, pixel: &mut Color) {
    if let Some(segmentation) = &inputs.segmentation {
        let value = segmentation[[j, i]];
        if value >= 0.0 {
            let label = value.round() as i32;
            if let Some(segment) = inputs.segment_table.get(label) {
                if segment.visible {
                    let a = segment.opacity;
                    let b = 1.0 - a;
                    pixel.r = (b * pixel.r as f64 + a * segment.color.r as f64) as u8;
                    pixel.g = (b * pixel.g as f64 + a * segment.color.g as f64) as u8;
                    pixel.b = (b * pixel.b as f64 + a * segment.color.b as f64) as u8;
                }
            }
        }
    }

    if let Some(selection) = &inputs.selection {
        if selection[[j, i]] > 0.0 {
            // Fixed yellow highlight over whatever was composited.
            pixel.r = (0.5 * pixel.r as f64 + 0.5 * 255.0) as u8;
            pixel.g = (0.5 * pixel.g as f64 + 0.5 * 255.0) as u8;
            pixel.b = (0.5 * pixel.b as f64) as u8;
        }
    }
}
