use crate::enums::{OrientationCode, ScalarKind};
use crate::error::{Result, ViewerError};

use nalgebra::{Matrix4, Point3, Vector3};
use ndarray::{Array4, ArrayView2, s};

const GEOMETRY_EPSILON: f64 = 1e-4;

/// Regular-grid geometry of a volume or resampled raster.
///
/// World mapping follows the image-center convention: `origin` is the
/// world position of the grid center, and grid index `p` maps to
/// `origin + R * S * (p - (dims - 1) / 2)` where the columns of `R` are
/// the (orthonormal) axis direction vectors and `S` scales by the voxel
/// spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    /// Grid extents (x, y, z, t).
    pub dims: (usize, usize, usize, usize),
    pub origin: Point3<f64>,
    /// Voxel spacing in mm along the x/y/z grid axes.
    pub spacing: Vector3<f64>,
    pub xaxis: Vector3<f64>,
    pub yaxis: Vector3<f64>,
    pub zaxis: Vector3<f64>,
    pub time_origin: f64,
    /// Time step between frames; 1.0 when the volume carries no timing.
    pub dt: f64,
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self {
            dims: (0, 0, 0, 0),
            origin: Point3::origin(),
            spacing: Vector3::new(1.0, 1.0, 1.0),
            xaxis: Vector3::x(),
            yaxis: Vector3::y(),
            zaxis: Vector3::z(),
            time_origin: 0.0,
            dt: 1.0,
        }
    }
}

impl VolumeGeometry {
    pub fn new(
        dims: (usize, usize, usize, usize),
        origin: Point3<f64>,
        spacing: Vector3<f64>,
    ) -> Self {
        Self {
            dims,
            origin,
            spacing,
            ..Self::default()
        }
    }

    fn center(&self) -> Vector3<f64> {
        Vector3::new(
            self.dims.0.saturating_sub(1) as f64 / 2.0,
            self.dims.1.saturating_sub(1) as f64 / 2.0,
            self.dims.2.saturating_sub(1) as f64 / 2.0,
        )
    }

    #[rustfmt::skip]
    fn rotation(&self) -> Matrix4<f64> {
        Matrix4::new(
            self.xaxis.x, self.yaxis.x, self.zaxis.x, 0.0,
            self.xaxis.y, self.yaxis.y, self.zaxis.y, 0.0,
            self.xaxis.z, self.yaxis.z, self.zaxis.z, 0.0,
            0.0,          0.0,          0.0,          1.0,
        )
    }

    /// Homogeneous matrix mapping grid indices to world coordinates.
    pub fn image_to_world_matrix(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.origin.coords)
            * self.rotation()
            * Matrix4::new_nonuniform_scaling(&self.spacing)
            * Matrix4::new_translation(&-self.center())
    }

    /// Homogeneous matrix mapping world coordinates to grid indices.
    ///
    /// Relies on the axis vectors being orthonormal, which every grid in
    /// the viewer satisfies (direction cosines, possibly negated).
    pub fn world_to_image_matrix(&self) -> Matrix4<f64> {
        let inv_spacing = Vector3::new(
            1.0 / self.spacing.x,
            1.0 / self.spacing.y,
            1.0 / self.spacing.z,
        );
        Matrix4::new_translation(&self.center())
            * Matrix4::new_nonuniform_scaling(&inv_spacing)
            * self.rotation().transpose()
            * Matrix4::new_translation(&-self.origin.coords)
    }

    pub fn image_to_world(&self, p: Point3<f64>) -> Point3<f64> {
        self.image_to_world_matrix().transform_point(&p)
    }

    pub fn world_to_image(&self, p: Point3<f64>) -> Point3<f64> {
        self.world_to_image_matrix().transform_point(&p)
    }

    pub fn image_to_time(&self, frame: usize) -> f64 {
        self.time_origin + frame as f64 * self.dt
    }

    /// Whether two grids agree on everything but timing.
    ///
    /// This is the comparison applied across a multi-file sequence, where
    /// per-file time offsets are expected to differ.
    pub fn same_grid(&self, other: &VolumeGeometry) -> bool {
        let (sx, sy, sz, _) = self.dims;
        let (ox, oy, oz, _) = other.dims;
        (sx, sy, sz) == (ox, oy, oz)
            && (self.origin - other.origin).norm() < GEOMETRY_EPSILON
            && (self.spacing - other.spacing).norm() < GEOMETRY_EPSILON
            && (self.xaxis - other.xaxis).norm() < GEOMETRY_EPSILON
            && (self.yaxis - other.yaxis).norm() < GEOMETRY_EPSILON
            && (self.zaxis - other.zaxis).norm() < GEOMETRY_EPSILON
    }
}

/// Dense scalar volume over a regular (optionally time-varying) grid.
///
/// Samples are held as `f64` regardless of the declared storage kind;
/// the kind only matters to codecs at the I/O boundary.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Sample array indexed `[t, z, y, x]`.
    data: Array4<f64>,
    geometry: VolumeGeometry,
    kind: ScalarKind,
}

impl Default for Volume {
    fn default() -> Self {
        Self::allocate(VolumeGeometry::default(), ScalarKind::default())
    }
}

impl Volume {
    pub fn new(data: Array4<f64>, geometry: VolumeGeometry, kind: ScalarKind) -> Self {
        debug_assert_eq!(
            data.dim(),
            (geometry.dims.3, geometry.dims.2, geometry.dims.1, geometry.dims.0)
        );
        Self { data, geometry, kind }
    }

    /// Construct from decoded samples with a codec-declared scalar kind
    /// token. An unsupported kind is fatal.
    pub fn from_decoded(
        data: Array4<f64>,
        geometry: VolumeGeometry,
        kind_token: &str,
    ) -> Result<Self> {
        let kind = ScalarKind::from_token(kind_token)
            .ok_or_else(|| ViewerError::UnsupportedScalarKind(kind_token.to_string()))?;
        Ok(Self::new(data, geometry, kind))
    }

    /// Zero-filled volume on the given grid.
    pub fn allocate(geometry: VolumeGeometry, kind: ScalarKind) -> Self {
        let (x, y, z, t) = geometry.dims;
        Self {
            data: Array4::zeros((t, z, y, x)),
            geometry,
            kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array4<f64> {
        &mut self.data
    }

    pub fn x(&self) -> usize {
        self.geometry.dims.0
    }

    pub fn y(&self) -> usize {
        self.geometry.dims.1
    }

    pub fn z(&self) -> usize {
        self.geometry.dims.2
    }

    pub fn t(&self) -> usize {
        self.geometry.dims.3
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize, t: usize) -> f64 {
        self.data[[t, z, y, x]]
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, z: usize, t: usize, value: f64) {
        self.data[[t, z, y, x]] = value;
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.x()
            && (y as usize) < self.y()
            && (z as usize) < self.z()
    }

    /// The in-plane view of a single-slice raster.
    pub fn plane_view(&self) -> ArrayView2<'_, f64> {
        self.data.slice(s![0, 0, .., ..])
    }

    /// Move the grid center without touching orientation or spacing.
    pub fn set_origin(&mut self, origin: Point3<f64>) {
        self.geometry.origin = origin;
    }

    pub fn set_time_origin(&mut self, time_origin: f64) {
        self.geometry.time_origin = time_origin;
    }

    pub fn image_to_world(&self, p: Point3<f64>) -> Point3<f64> {
        self.geometry.image_to_world(p)
    }

    pub fn world_to_image(&self, p: Point3<f64>) -> Point3<f64> {
        self.geometry.world_to_image(p)
    }

    pub fn image_to_time(&self, frame: usize) -> f64 {
        self.geometry.image_to_time(frame)
    }

    /// Minimum and maximum sample value; `(0, 1)` for an empty volume.
    pub fn min_max(&self) -> (f64, f64) {
        if self.is_empty() {
            return (0.0, 1.0);
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in self.data.iter() {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        (min, max)
    }

    /// Anatomical direction code of each grid axis, from its dominant
    /// world component. A zero axis has no code.
    pub fn orientation_codes(&self) -> [Option<OrientationCode>; 3] {
        [
            axis_code(&self.geometry.xaxis),
            axis_code(&self.geometry.yaxis),
            axis_code(&self.geometry.zaxis),
        ]
    }

    /// Merge single-frame volumes into one time series.
    ///
    /// All inputs must share the grid (origin, spacing, axes, extents);
    /// per-file time offsets are ignored. The merged volume takes frame
    /// `i` from input `i` and a unit time step.
    pub fn from_sequence(volumes: Vec<Volume>) -> Result<Volume> {
        let mut iter = volumes.into_iter();
        let first = match iter.next() {
            Some(v) => v,
            None => return Ok(Volume::default()),
        };
        let mut geometry = first.geometry.clone();
        let rest: Vec<Volume> = iter.collect();
        for (i, v) in rest.iter().enumerate() {
            if !geometry.same_grid(v.geometry()) {
                return Err(ViewerError::GeometryMismatch { index: i + 1 });
            }
        }

        let frames = 1 + rest.len();
        let (x, y, z, _) = geometry.dims;
        geometry.dims.3 = frames;
        geometry.time_origin = 0.0;
        geometry.dt = 1.0;

        let mut data = Array4::zeros((frames, z, y, x));
        data.slice_mut(s![0, .., .., ..])
            .assign(&first.data.slice(s![0, .., .., ..]));
        for (i, v) in rest.iter().enumerate() {
            data.slice_mut(s![i + 1, .., .., ..])
                .assign(&v.data.slice(s![0, .., .., ..]));
        }

        Ok(Volume::new(data, geometry, first.kind))
    }
}

fn axis_code(axis: &Vector3<f64>) -> Option<OrientationCode> {
    let ax = axis.x.abs();
    let ay = axis.y.abs();
    let az = axis.z.abs();
    if ax == 0.0 && ay == 0.0 && az == 0.0 {
        return None;
    }
    if ax >= ay && ax >= az {
        Some(if axis.x > 0.0 { OrientationCode::L2R } else { OrientationCode::R2L })
    } else if ay >= az {
        Some(if axis.y > 0.0 { OrientationCode::P2A } else { OrientationCode::A2P })
    } else {
        Some(if axis.z > 0.0 { OrientationCode::I2S } else { OrientationCode::S2I })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_volume(dims: (usize, usize, usize, usize)) -> Volume {
        Volume::allocate(
            VolumeGeometry::new(dims, Point3::origin(), Vector3::new(1.0, 1.0, 1.0)),
            ScalarKind::Short,
        )
    }

    #[test]
    fn world_mapping_round_trips() {
        let mut geometry = VolumeGeometry::new(
            (11, 21, 31, 1),
            Point3::new(4.0, -2.0, 7.5),
            Vector3::new(0.5, 0.75, 2.0),
        );
        geometry.xaxis = Vector3::y();
        geometry.yaxis = -Vector3::x();
        let p = Point3::new(3.0, 14.0, 9.0);
        let back = geometry.world_to_image(geometry.image_to_world(p));
        assert!((back - p).norm() < 1e-9);
    }

    #[test]
    fn grid_center_maps_to_origin() {
        let geometry = VolumeGeometry::new(
            (5, 5, 5, 1),
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        let w = geometry.image_to_world(Point3::new(2.0, 2.0, 2.0));
        assert!((w - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn decoded_volume_rejects_unknown_scalar_kind() {
        let geometry = VolumeGeometry::new(
            (2, 2, 2, 1),
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        let data = Array4::zeros((1, 2, 2, 2));
        let err = Volume::from_decoded(data, geometry, "complex128").unwrap_err();
        assert!(matches!(err, ViewerError::UnsupportedScalarKind(_)));

        let geometry = VolumeGeometry::new(
            (2, 2, 2, 1),
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        let data = Array4::zeros((1, 2, 2, 2));
        let volume = Volume::from_decoded(data, geometry, "float").unwrap();
        assert_eq!(volume.kind(), ScalarKind::Float);
    }

    #[test]
    fn sequence_merge_rejects_mismatched_grid() {
        let a = unit_volume((4, 4, 4, 1));
        let b = unit_volume((4, 4, 5, 1));
        let err = Volume::from_sequence(vec![a, b]).unwrap_err();
        assert!(matches!(err, ViewerError::GeometryMismatch { index: 1 }));
    }

    #[test]
    fn sequence_merge_stacks_frames() {
        let mut a = unit_volume((2, 2, 2, 1));
        a.put(0, 0, 0, 0, 5.0);
        let mut b = unit_volume((2, 2, 2, 1));
        b.put(0, 0, 0, 0, 9.0);
        let merged = Volume::from_sequence(vec![a, b]).unwrap();
        assert_eq!(merged.t(), 2);
        assert_eq!(merged.get(0, 0, 0, 0), 5.0);
        assert_eq!(merged.get(0, 0, 0, 1), 9.0);
    }
}
