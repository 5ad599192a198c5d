//! World-to-world geometric transforms applied to the source volume.
//!
//! The source transform is polymorphic over rigid/affine/free-form/
//! multi-level variants; the target transform is always the identity
//! affine. A rigid transform only exists as a parameter set handed in by
//! the transform codec and is upgraded to the general affine
//! representation immediately (see [`AffineTransform::from_rigid`]).

use crate::volume::VolumeGeometry;

use nalgebra::{Matrix4, Point3, Vector3};
use ndarray::Array4;

/// Iteration cap for inverting deformable transforms by fixed point.
const INVERT_MAX_ITERATIONS: usize = 20;
const INVERT_TOLERANCE: f64 = 1e-6;

/// Six-parameter rigid transform as delivered by a transform codec:
/// translations in mm, rotations in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub params: [f64; 6],
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self { params: [0.0; 6] }
    }
}

/// Twelve-parameter affine transform.
///
/// Parameter order: tx ty tz (mm), rx ry rz (degrees), sx sy sz
/// (percent, 100 = unit), sxy syz sxz (shear angles in degrees). The
/// homogeneous matrix is `T * Rz*Ry*Rx * Shear * Scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    params: [f64; 12],
    matrix: Matrix4<f64>,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn identity() -> Self {
        let mut params = [0.0; 12];
        params[6] = 100.0;
        params[7] = 100.0;
        params[8] = 100.0;
        let mut t = Self {
            params,
            matrix: Matrix4::identity(),
        };
        t.rebuild();
        t
    }

    pub fn from_params(params: [f64; 12]) -> Self {
        let mut t = Self {
            params,
            matrix: Matrix4::identity(),
        };
        t.rebuild();
        t
    }

    /// Upgrade a rigid parameter set to the affine representation,
    /// copying the six shared parameters and keeping unit scale.
    pub fn from_rigid(rigid: &RigidTransform) -> Self {
        let mut t = Self::identity();
        for (i, &p) in rigid.params.iter().enumerate() {
            t.params[i] = p;
        }
        t.rebuild();
        t
    }

    pub fn params(&self) -> &[f64; 12] {
        &self.params
    }

    pub fn get(&self, index: usize) -> f64 {
        self.params[index]
    }

    pub fn put(&mut self, index: usize, value: f64) {
        self.params[index] = value;
        self.rebuild();
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    fn rebuild(&mut self) {
        let [tx, ty, tz, rx, ry, rz, sx, sy, sz, sxy, syz, sxz] = self.params;
        let translation = Matrix4::new_translation(&Vector3::new(tx, ty, tz));
        let rotation = nalgebra::Rotation3::from_euler_angles(
            rx.to_radians(),
            ry.to_radians(),
            rz.to_radians(),
        )
        .to_homogeneous();
        let mut shear = Matrix4::identity();
        shear[(0, 1)] = sxy.to_radians().tan();
        shear[(0, 2)] = sxz.to_radians().tan();
        shear[(1, 2)] = syz.to_radians().tan();
        let scale = Matrix4::new_nonuniform_scaling(&Vector3::new(
            sx / 100.0,
            sy / 100.0,
            sz / 100.0,
        ));
        self.matrix = translation * rotation * shear * scale;
    }

    pub fn apply(&self, p: Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(&p)
    }

    pub fn apply_inverse(&self, p: Point3<f64>) -> Point3<f64> {
        self.matrix
            .try_inverse()
            .unwrap_or_else(Matrix4::identity)
            .transform_point(&p)
    }
}

/// Cubic B-spline free-form deformation over a control point lattice.
///
/// Control coefficients are world-space displacements in mm, stored
/// `[component, k, j, i]`.
#[derive(Debug, Clone)]
pub struct FreeFormTransform {
    lattice: VolumeGeometry,
    coefficients: Array4<f64>,
}

impl FreeFormTransform {
    pub fn new(lattice: VolumeGeometry) -> Self {
        let (cx, cy, cz, _) = lattice.dims;
        Self {
            lattice,
            coefficients: Array4::zeros((3, cz, cy, cx)),
        }
    }

    pub fn lattice(&self) -> &VolumeGeometry {
        &self.lattice
    }

    /// Control point spacing in mm.
    pub fn spacing(&self) -> Vector3<f64> {
        self.lattice.spacing
    }

    pub fn parameter_count(&self) -> usize {
        self.coefficients.len()
    }

    fn unravel(&self, index: usize) -> (usize, usize, usize, usize) {
        let (cx, cy, _, _) = self.lattice.dims;
        let c = index % 3;
        let point = index / 3;
        let i = point % cx;
        let j = (point / cx) % cy;
        let k = point / (cx * cy);
        (c, k, j, i)
    }

    pub fn get(&self, index: usize) -> f64 {
        let (c, k, j, i) = self.unravel(index);
        self.coefficients[[c, k, j, i]]
    }

    pub fn put(&mut self, index: usize, value: f64) {
        let (c, k, j, i) = self.unravel(index);
        self.coefficients[[c, k, j, i]] = value;
    }

    /// World displacement at a world point, by cubic B-spline mixing of
    /// the 4x4x4 surrounding control coefficients (border clamped).
    pub fn displacement(&self, p: Point3<f64>) -> Vector3<f64> {
        let (cx, cy, cz, _) = self.lattice.dims;
        if cx == 0 || cy == 0 || cz == 0 {
            return Vector3::zeros();
        }
        let l = self.lattice.world_to_image(p);
        let base = (l.x.floor() as i64, l.y.floor() as i64, l.z.floor() as i64);
        let frac = Vector3::new(l.x - base.0 as f64, l.y - base.1 as f64, l.z - base.2 as f64);

        let wx = bspline_weights(frac.x);
        let wy = bspline_weights(frac.y);
        let wz = bspline_weights(frac.z);

        let clamp = |v: i64, n: usize| v.clamp(0, n as i64 - 1) as usize;
        let mut d = Vector3::zeros();
        for (dk, &wk) in wz.iter().enumerate() {
            let k = clamp(base.2 - 1 + dk as i64, cz);
            for (dj, &wj) in wy.iter().enumerate() {
                let j = clamp(base.1 - 1 + dj as i64, cy);
                let w_jk = wj * wk;
                for (di, &wi) in wx.iter().enumerate() {
                    let i = clamp(base.0 - 1 + di as i64, cx);
                    let w = wi * w_jk;
                    d.x += w * self.coefficients[[0, k, j, i]];
                    d.y += w * self.coefficients[[1, k, j, i]];
                    d.z += w * self.coefficients[[2, k, j, i]];
                }
            }
        }
        d
    }
}

/// Cubic B-spline basis evaluated at offsets -1..2 for fraction `t`.
fn bspline_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        (1.0 - t).powi(3) / 6.0,
        (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
        (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
        t3 / 6.0,
    ]
}

/// Global affine plus a stack of additive free-form levels.
#[derive(Debug, Clone)]
pub struct MultiLevelTransform {
    pub global: AffineTransform,
    pub levels: Vec<FreeFormTransform>,
}

impl MultiLevelTransform {
    pub fn new(global: AffineTransform) -> Self {
        Self {
            global,
            levels: Vec::new(),
        }
    }

    pub fn push_level(&mut self, level: FreeFormTransform) {
        self.levels.push(level);
    }
}

/// The polymorphic source transform.
#[derive(Debug, Clone)]
pub enum Transform {
    Affine(AffineTransform),
    FreeForm(FreeFormTransform),
    MultiLevelFreeForm(MultiLevelTransform),
}

impl Default for Transform {
    fn default() -> Self {
        Transform::Affine(AffineTransform::identity())
    }
}

impl Transform {
    /// Map a world point. The time pair is carried for 4-D volumes; the
    /// 3-D variants implemented here do not depend on it.
    pub fn apply(&self, p: Point3<f64>, _t_src: f64, _t_dst: f64) -> Point3<f64> {
        match self {
            Transform::Affine(a) => a.apply(p),
            Transform::FreeForm(f) => p + f.displacement(p),
            Transform::MultiLevelFreeForm(m) => {
                let mut q = m.global.apply(p);
                for level in &m.levels {
                    q += level.displacement(p);
                }
                q
            }
        }
    }

    /// Map a world point through the inverse transform.
    ///
    /// Affine inverts its matrix; the deformable variants run a fixed
    /// point iteration on `q = p - displacement(q)`.
    pub fn apply_inverse(&self, p: Point3<f64>, t_src: f64, t_dst: f64) -> Point3<f64> {
        match self {
            Transform::Affine(a) => a.apply_inverse(p),
            _ => {
                let mut q = p;
                for _ in 0..INVERT_MAX_ITERATIONS {
                    let err = self.apply(q, t_src, t_dst) - p;
                    if err.norm() < INVERT_TOLERANCE {
                        break;
                    }
                    q -= err;
                }
                q
            }
        }
    }

    /// Whether per-voxel displacements should be cached before
    /// resampling through this transform.
    pub fn requires_caching(&self) -> bool {
        !matches!(self, Transform::Affine(_))
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Transform::Affine(_) => 12,
            Transform::FreeForm(f) => f.parameter_count(),
            Transform::MultiLevelFreeForm(m) => {
                m.levels.iter().map(FreeFormTransform::parameter_count).sum()
            }
        }
    }

    pub fn get(&self, index: usize) -> f64 {
        match self {
            Transform::Affine(a) => a.get(index),
            Transform::FreeForm(f) => f.get(index),
            Transform::MultiLevelFreeForm(m) => {
                let mut index = index;
                for level in &m.levels {
                    if index < level.parameter_count() {
                        return level.get(index);
                    }
                    index -= level.parameter_count();
                }
                0.0
            }
        }
    }

    pub fn put(&mut self, index: usize, value: f64) {
        match self {
            Transform::Affine(a) => a.put(index, value),
            Transform::FreeForm(f) => f.put(index, value),
            Transform::MultiLevelFreeForm(m) => {
                let mut index = index;
                for level in &mut m.levels {
                    if index < level.parameter_count() {
                        level.put(index, value);
                        return;
                    }
                    index -= level.parameter_count();
                }
            }
        }
    }

    /// Human-readable description, one line per level.
    pub fn summary(&self) -> Vec<String> {
        match self {
            Transform::Affine(_) => vec!["Affine transformation (12 DOF)".to_string()],
            Transform::FreeForm(f) => {
                let s = f.spacing();
                vec![format!(
                    "3D B-Spline FFD: {} ({:.2} mm X {:.2} mm X {:.2} mm)",
                    f.parameter_count(),
                    s.x,
                    s.y,
                    s.z
                )]
            }
            Transform::MultiLevelFreeForm(m) => {
                let mut lines = vec!["Affine transformation (12 DOF)".to_string()];
                for level in &m.levels {
                    let s = level.spacing();
                    lines.push(format!(
                        "3D B-Spline FFD: {} ({:.2} mm X {:.2} mm X {:.2} mm)",
                        level.parameter_count(),
                        s.x,
                        s.y,
                        s.z
                    ));
                }
                lines
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rigid_upgrade_keeps_parameters() {
        let rigid = RigidTransform {
            params: [5.0, -3.0, 2.0, 10.0, 0.0, 45.0],
        };
        let affine = AffineTransform::from_rigid(&rigid);
        for i in 0..6 {
            assert_eq!(affine.get(i), rigid.params[i]);
        }
        assert_eq!(affine.get(6), 100.0);
    }

    #[test]
    fn identity_affine_is_identity() {
        let t = Transform::default();
        let p = Point3::new(1.5, -2.0, 3.25);
        let q = t.apply(p, 0.0, 0.0);
        assert_relative_eq!((q - p).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn affine_translation_applies_and_inverts() {
        let mut a = AffineTransform::identity();
        a.put(0, 10.0);
        a.put(1, -4.0);
        let t = Transform::Affine(a);
        let p = Point3::new(0.0, 0.0, 0.0);
        let q = t.apply(p, 0.0, 0.0);
        assert_relative_eq!(q.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(q.y, -4.0, epsilon = 1e-12);
        let back = t.apply_inverse(q, 0.0, 0.0);
        assert_relative_eq!((back - p).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn bspline_weights_partition_unity() {
        for &t in &[0.0, 0.25, 0.5, 0.99] {
            let w = bspline_weights(t);
            assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn ffd_fixed_point_inverse_converges() {
        use crate::volume::VolumeGeometry;
        use nalgebra::Vector3;

        let lattice = VolumeGeometry::new(
            (4, 4, 4, 1),
            Point3::origin(),
            Vector3::new(20.0, 20.0, 20.0),
        );
        let mut ffd = FreeFormTransform::new(lattice);
        // Small smooth displacement on every control point.
        for i in 0..ffd.parameter_count() {
            ffd.put(i, if i % 3 == 0 { 1.5 } else { 0.0 });
        }
        let t = Transform::FreeForm(ffd);
        let p = Point3::new(5.0, 5.0, 5.0);
        let q = t.apply(p, 0.0, 0.0);
        let back = t.apply_inverse(q, 0.0, 0.0);
        assert!((back - p).norm() < 1e-5);
    }
}
