//! Shared cache of per-voxel displacement vectors.
//!
//! Deformable transforms are expensive to evaluate per display sample,
//! and every viewport resamples the source through the same transform.
//! The cache evaluates the transform once per voxel of a declared grid
//! and is reused verbatim until marked modified. It is detached (empty)
//! whenever the source transform is not being applied or does not
//! require caching.

use crate::transform::Transform;
use crate::volume::VolumeGeometry;

use nalgebra::{Point3, Vector3};
use ndarray::Array4;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DisplacementCache {
    geometry: Option<VolumeGeometry>,
    /// Displacement vectors in mm, indexed `[z, y, x, component]`.
    field: Array4<f64>,
    modified: bool,
}

impl Default for DisplacementCache {
    fn default() -> Self {
        Self {
            geometry: None,
            field: Array4::zeros((0, 0, 0, 3)),
            modified: false,
        }
    }
}

impl DisplacementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate storage sized to `geometry` and force recomputation on
    /// the next use.
    pub fn initialize(&mut self, geometry: VolumeGeometry) {
        let (x, y, z, _) = geometry.dims;
        self.field = Array4::zeros((z, y, x, 3));
        self.geometry = Some(geometry);
        self.modified = true;
    }

    /// Detach the cache; it holds no storage until reinitialized.
    pub fn clear(&mut self) {
        self.geometry = None;
        self.field = Array4::zeros((0, 0, 0, 3));
        self.modified = false;
    }

    pub fn is_active(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Force recomputation on the next [`DisplacementCache::update`].
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Recompute the field if marked modified; otherwise reuse it.
    pub fn update(&mut self, transform: &Transform, invert: bool, t_src: f64, t_dst: f64) {
        let Some(geometry) = self.geometry.clone() else {
            return;
        };
        if !self.modified {
            return;
        }
        debug!(dims = ?geometry.dims, invert, "recomputing displacement cache");
        let i2w = geometry.image_to_world_matrix();
        let (x, y, z, _) = geometry.dims;
        for k in 0..z {
            for j in 0..y {
                for i in 0..x {
                    let w = i2w.transform_point(&Point3::new(i as f64, j as f64, k as f64));
                    let q = if invert {
                        transform.apply_inverse(w, t_src, t_dst)
                    } else {
                        transform.apply(w, t_src, t_dst)
                    };
                    let d = q - w;
                    self.field[[k, j, i, 0]] = d.x;
                    self.field[[k, j, i, 1]] = d.y;
                    self.field[[k, j, i, 2]] = d.z;
                }
            }
        }
        self.modified = false;
    }

    /// Trilinearly sampled displacement at a world point, clamped to the
    /// cache grid border.
    pub fn displacement(&self, world: Point3<f64>) -> Vector3<f64> {
        let Some(geometry) = &self.geometry else {
            return Vector3::zeros();
        };
        let (nx, ny, nz, _) = geometry.dims;
        if nx == 0 || ny == 0 || nz == 0 {
            return Vector3::zeros();
        }
        let p = geometry.world_to_image(world);
        let cx = p.x.clamp(0.0, (nx - 1) as f64);
        let cy = p.y.clamp(0.0, (ny - 1) as f64);
        let cz = p.z.clamp(0.0, (nz - 1) as f64);

        let x0 = cx.floor() as usize;
        let y0 = cy.floor() as usize;
        let z0 = cz.floor() as usize;
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let z1 = (z0 + 1).min(nz - 1);
        let dx = cx - x0 as f64;
        let dy = cy - y0 as f64;
        let dz = cz - z0 as f64;

        let mut d = Vector3::zeros();
        for c in 0..3 {
            let corner = |x: usize, y: usize, z: usize| self.field[[z, y, x, c]];
            let v00 = corner(x0, y0, z0) * (1.0 - dx) + corner(x1, y0, z0) * dx;
            let v10 = corner(x0, y1, z0) * (1.0 - dx) + corner(x1, y1, z0) * dx;
            let v01 = corner(x0, y0, z1) * (1.0 - dx) + corner(x1, y0, z1) * dx;
            let v11 = corner(x0, y1, z1) * (1.0 - dx) + corner(x1, y1, z1) * dx;
            let v0 = v00 * (1.0 - dy) + v10 * dy;
            let v1 = v01 * (1.0 - dy) + v11 * dy;
            d[c] = v0 * (1.0 - dz) + v1 * dz;
        }
        d
    }
}
