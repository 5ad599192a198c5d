//! Off-grid sampling of volumes.
//!
//! Each interpolation mode declares the support margin it needs inside
//! the volume; [`sample`] returns `None` when the requested position
//! falls outside that support so the resampling pipeline can substitute
//! its padding value.

use crate::enums::InterpolationMode;
use crate::volume::Volume;

use nalgebra::Point3;

/// Half-width of the windowed sinc kernel.
const SINC_RADIUS: i64 = 4;

/// Sample `volume` at continuous grid position `p` in frame `frame`.
///
/// Returns `None` outside the mode's support or for an empty volume.
pub fn sample(volume: &Volume, p: Point3<f64>, frame: usize, mode: InterpolationMode) -> Option<f64> {
    if volume.is_empty() || frame >= volume.t() {
        return None;
    }
    match mode {
        InterpolationMode::NearestNeighbor => nearest(volume, p, frame),
        InterpolationMode::Linear => trilinear(volume, p, frame),
        InterpolationMode::CubicSpline => kernel_sample(volume, p, frame, 2, catmull_rom),
        InterpolationMode::BSpline => kernel_sample(volume, p, frame, 2, cubic_bspline),
        InterpolationMode::Sinc => kernel_sample(volume, p, frame, SINC_RADIUS, hann_sinc),
    }
}

fn nearest(volume: &Volume, p: Point3<f64>, frame: usize) -> Option<f64> {
    let x = p.x.round() as i64;
    let y = p.y.round() as i64;
    let z = p.z.round() as i64;
    if !volume.contains(x, y, z) {
        return None;
    }
    Some(volume.get(x as usize, y as usize, z as usize, frame))
}

fn trilinear(volume: &Volume, p: Point3<f64>, frame: usize) -> Option<f64> {
    let (nx, ny, nz) = (volume.x(), volume.y(), volume.z());
    if p.x < 0.0
        || p.y < 0.0
        || p.z < 0.0
        || p.x > (nx - 1) as f64
        || p.y > (ny - 1) as f64
        || p.z > (nz - 1) as f64
    {
        return None;
    }

    let x0 = p.x.floor() as usize;
    let y0 = p.y.floor() as usize;
    let z0 = p.z.floor() as usize;
    let x1 = (x0 + 1).min(nx - 1);
    let y1 = (y0 + 1).min(ny - 1);
    let z1 = (z0 + 1).min(nz - 1);

    let dx = p.x - x0 as f64;
    let dy = p.y - y0 as f64;
    let dz = p.z - z0 as f64;
    let one_minus_dx = 1.0 - dx;
    let one_minus_dy = 1.0 - dy;

    let plane = |z: usize| {
        let v00 = volume.get(x0, y0, z, frame);
        let v01 = volume.get(x1, y0, z, frame);
        let v10 = volume.get(x0, y1, z, frame);
        let v11 = volume.get(x1, y1, z, frame);
        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);
        v0.mul_add(one_minus_dy, v1 * dy)
    };

    Some(plane(z0).mul_add(1.0 - dz, plane(z1) * dz))
}

/// Separable kernel sum over the `2 * radius` neighborhood.
fn kernel_sample(
    volume: &Volume,
    p: Point3<f64>,
    frame: usize,
    radius: i64,
    kernel: fn(f64) -> f64,
) -> Option<f64> {
    let (nx, ny, nz) = (volume.x() as i64, volume.y() as i64, volume.z() as i64);
    let margin = (radius - 1) as f64;
    if p.x < margin
        || p.y < margin
        || p.z < margin
        || p.x > (nx - radius) as f64
        || p.y > (ny - radius) as f64
        || p.z > (nz - radius) as f64
    {
        return None;
    }

    let x0 = p.x.floor() as i64;
    let y0 = p.y.floor() as i64;
    let z0 = p.z.floor() as i64;

    let mut value = 0.0;
    let mut weight = 0.0;
    for k in (z0 - radius + 1)..=(z0 + radius) {
        let wz = kernel(p.z - k as f64);
        if wz == 0.0 {
            continue;
        }
        for j in (y0 - radius + 1)..=(y0 + radius) {
            let wyz = kernel(p.y - j as f64) * wz;
            if wyz == 0.0 {
                continue;
            }
            for i in (x0 - radius + 1)..=(x0 + radius) {
                let w = kernel(p.x - i as f64) * wyz;
                if w == 0.0 {
                    continue;
                }
                value += w * volume.get(i as usize, j as usize, k as usize, frame);
                weight += w;
            }
        }
    }
    if weight == 0.0 {
        return None;
    }
    Some(value / weight)
}

/// Catmull-Rom cubic kernel (interpolating spline).
fn catmull_rom(x: f64) -> f64 {
    let a = x.abs();
    if a < 1.0 {
        ((1.5 * a - 2.5) * a) * a + 1.0
    } else if a < 2.0 {
        (((-0.5 * a + 2.5) * a) - 4.0) * a + 2.0
    } else {
        0.0
    }
}

/// Cubic B-spline kernel (smoothing spline).
fn cubic_bspline(x: f64) -> f64 {
    let a = x.abs();
    if a < 1.0 {
        (2.0 / 3.0) - a * a + 0.5 * a * a * a
    } else if a < 2.0 {
        let b = 2.0 - a;
        b * b * b / 6.0
    } else {
        0.0
    }
}

/// Hann-windowed sinc kernel with radius [`SINC_RADIUS`].
fn hann_sinc(x: f64) -> f64 {
    let a = x.abs();
    if a >= SINC_RADIUS as f64 {
        return 0.0;
    }
    if a < 1e-12 {
        return 1.0;
    }
    let px = std::f64::consts::PI * x;
    let sinc = px.sin() / px;
    let window = 0.5 * (1.0 + (px / SINC_RADIUS as f64).cos());
    sinc * window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ScalarKind;
    use crate::volume::VolumeGeometry;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn ramp_volume(n: usize) -> Volume {
        let geometry = VolumeGeometry::new(
            (n, n, n, 1),
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        let mut v = Volume::allocate(geometry, ScalarKind::Short);
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    v.put(x, y, z, 0, x as f64);
                }
            }
        }
        v
    }

    #[test]
    fn nearest_rounds_to_voxel() {
        let v = ramp_volume(4);
        let s = sample(&v, Point3::new(1.4, 0.0, 0.0), 0, InterpolationMode::NearestNeighbor);
        assert_eq!(s, Some(1.0));
        let s = sample(&v, Point3::new(1.6, 0.0, 0.0), 0, InterpolationMode::NearestNeighbor);
        assert_eq!(s, Some(2.0));
    }

    #[test]
    fn trilinear_reproduces_linear_ramp() {
        let v = ramp_volume(4);
        let s = sample(&v, Point3::new(1.25, 1.0, 2.0), 0, InterpolationMode::Linear).unwrap();
        assert_relative_eq!(s, 1.25, epsilon = 1e-12);
    }

    #[test]
    fn outside_support_yields_none() {
        let v = ramp_volume(8);
        assert!(sample(&v, Point3::new(-0.6, 0.0, 0.0), 0, InterpolationMode::NearestNeighbor).is_none());
        assert!(sample(&v, Point3::new(-0.1, 1.0, 1.0), 0, InterpolationMode::Linear).is_none());
        assert!(sample(&v, Point3::new(0.5, 4.0, 4.0), 0, InterpolationMode::BSpline).is_none());
        assert!(sample(&v, Point3::new(2.0, 4.0, 4.0), 0, InterpolationMode::Sinc).is_none());
    }

    #[test]
    fn interpolators_match_samples_on_grid() {
        let v = ramp_volume(10);
        let p = Point3::new(5.0, 5.0, 5.0);
        for mode in [
            InterpolationMode::NearestNeighbor,
            InterpolationMode::Linear,
            InterpolationMode::CubicSpline,
            InterpolationMode::Sinc,
        ] {
            let s = sample(&v, p, 0, mode).unwrap();
            assert_relative_eq!(s, 5.0, epsilon = 1e-9);
        }
    }
}
