//! The resampling pipeline: one pass per (viewport, role).
//!
//! Every sample of the display-space raster is mapped to world space,
//! pushed through the active transform (directly, inverted, or via the
//! shared displacement cache) and interpolated from the input volume.
//! Raw samples are rescaled by a per-role affine derived from the input
//! volume's intensity range so lookup tables always operate over one
//! stable domain; samples without support receive the padding value
//! unscaled. Rows are independent and processed in parallel.

use crate::displacement_cache::DisplacementCache;
use crate::enums::InterpolationMode;
use crate::interpolate;
use crate::transform::Transform;
use crate::volume::Volume;

use nalgebra::Point3;
use ndarray::parallel::prelude::*;
use ndarray::{Axis, s};

/// Per-role settings of one resampling pass.
#[derive(Debug, Clone)]
pub struct ResampleParams {
    pub interpolation: InterpolationMode,
    /// Written verbatim wherever the input has no support.
    pub padding: f64,
    /// Applied to every interpolated sample as `scale * v + offset`.
    pub scale: f64,
    pub offset: f64,
    /// Map through the inverse of the transform instead.
    pub invert: bool,
    /// Input frame to sample.
    pub frame: usize,
    pub t_src: f64,
    pub t_dst: f64,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMode::NearestNeighbor,
            padding: 0.0,
            scale: 1.0,
            offset: 0.0,
            invert: false,
            frame: 0,
            t_src: 0.0,
            t_dst: 0.0,
        }
    }
}

/// Fill frame 0 of `output` by sampling `input` through `transform`.
/// Display rasters are single-slice; the source export path passes a
/// full 3-D grid.
///
/// When `cache` is given it must already be updated for this transform;
/// displacements are then read from it instead of reevaluating the
/// transform per sample.
pub fn resample(
    input: &Volume,
    output: &mut Volume,
    transform: &Transform,
    cache: Option<&DisplacementCache>,
    params: &ResampleParams,
) {
    if output.is_empty() {
        return;
    }
    if input.is_empty() {
        output.data_mut().fill(params.padding);
        return;
    }

    let i2w = output.geometry().image_to_world_matrix();
    let w2i = input.geometry().world_to_image_matrix();
    let cache = cache.filter(|c| c.is_active());

    let mut volume = output.data_mut().slice_mut(s![0, .., .., ..]);
    for (k, mut plane) in volume.outer_iter_mut().enumerate() {
        plane
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(j, mut row)| {
                for (i, out) in row.iter_mut().enumerate() {
                    let w = i2w.transform_point(&Point3::new(i as f64, j as f64, k as f64));
                    let q = match cache {
                        Some(cache) => w + cache.displacement(w),
                        None => {
                            if params.invert {
                                transform.apply_inverse(w, params.t_src, params.t_dst)
                            } else {
                                transform.apply(w, params.t_src, params.t_dst)
                            }
                        }
                    };
                    let g = w2i.transform_point(&q);
                    *out = match interpolate::sample(input, g, params.frame, params.interpolation)
                    {
                        Some(v) => params.scale.mul_add(v, params.offset),
                        None => params.padding,
                    };
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ScalarKind;
    use crate::volume::VolumeGeometry;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn ramp_input() -> Volume {
        let geometry = VolumeGeometry::new(
            (9, 9, 9, 1),
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        let mut v = Volume::allocate(geometry, ScalarKind::Short);
        for z in 0..9 {
            for y in 0..9 {
                for x in 0..9 {
                    v.put(x, y, z, 0, (x + y) as f64);
                }
            }
        }
        v
    }

    fn raster(w: usize, h: usize) -> Volume {
        Volume::allocate(
            VolumeGeometry::new((w, h, 1, 1), Point3::origin(), Vector3::new(1.0, 1.0, 1.0)),
            ScalarKind::Short,
        )
    }

    #[test]
    fn identity_resample_reproduces_center_slice() {
        let input = ramp_input();
        let mut output = raster(5, 5);
        resample(
            &input,
            &mut output,
            &Transform::default(),
            None,
            &ResampleParams {
                interpolation: InterpolationMode::Linear,
                padding: -1.0,
                ..ResampleParams::default()
            },
        );
        // Raster (2,2) sits at world origin, which is input voxel (4,4,4).
        assert_relative_eq!(output.get(2, 2, 0, 0), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_input_leaves_raster_at_padding() {
        let input = Volume::default();
        let mut output = raster(4, 3);
        resample(
            &input,
            &mut output,
            &Transform::default(),
            None,
            &ResampleParams {
                padding: -7.0,
                ..ResampleParams::default()
            },
        );
        assert!(output.plane_view().iter().all(|&v| v == -7.0));
    }

    #[test]
    fn scale_and_offset_rescale_samples() {
        let input = ramp_input();
        let mut output = raster(5, 5);
        resample(
            &input,
            &mut output,
            &Transform::default(),
            None,
            &ResampleParams {
                interpolation: InterpolationMode::Linear,
                scale: 10.0,
                offset: 3.0,
                padding: -1.0,
                ..ResampleParams::default()
            },
        );
        assert_relative_eq!(output.get(2, 2, 0, 0), 83.0, epsilon = 1e-9);
    }

    #[test]
    fn cached_and_direct_application_agree() {
        use crate::displacement_cache::DisplacementCache;
        use crate::transform::AffineTransform;

        let mut affine = AffineTransform::identity();
        affine.put(0, 1.0);
        let transform = Transform::Affine(affine);

        let input = ramp_input();
        let params = ResampleParams {
            interpolation: InterpolationMode::Linear,
            padding: -1.0,
            ..ResampleParams::default()
        };

        let mut direct = raster(5, 5);
        resample(&input, &mut direct, &transform, None, &params);

        let mut cache = DisplacementCache::new();
        cache.initialize(input.geometry().clone());
        cache.update(&transform, false, 0.0, 0.0);
        let mut cached = raster(5, 5);
        resample(&input, &mut cached, &transform, Some(&cache), &params);

        for j in 0..5 {
            for i in 0..5 {
                assert_relative_eq!(
                    direct.get(i, j, 0, 0),
                    cached.get(i, j, 0, 0),
                    epsilon = 1e-6
                );
            }
        }
    }
}
