//! Interactive voxel-raster annotation.
//!
//! A contour edit owns a selection raster on the target volume's grid,
//! allocated lazily when the first point arrives. Strokes stamp a disk
//! brush along the drawn path, areas bounded by strokes can be flood
//! filled, and region growing marks connected voxels of the reference
//! volume whose intensity lies in a window. Every modifying operation
//! pushes a raster snapshot so it can be undone. The engine is bound to
//! one viewport for the lifetime of the edit; the bound plane fixes the
//! raster axis that slice-constrained operations hold constant.

use crate::enums::RegionGrowingMode;
use crate::volume::{Volume, VolumeGeometry};

use nalgebra::Point3;
use ndarray::Array4;
use std::collections::VecDeque;
use tracing::trace;

#[derive(Debug, Default)]
pub struct VoxelContour {
    /// World points of the open contour, in input order.
    points: Vec<Point3<f64>>,
    /// Selection raster; positive voxels are selected.
    raster: Volume,
    /// Raster states before each modifying operation.
    undo: Vec<Array4<f64>>,
    /// Raster axis held constant by slice-constrained operations.
    normal_axis: usize,
}

impl VoxelContour {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded contour points; zero means no open edit.
    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn raster(&self) -> &Volume {
        &self.raster
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Bind a new edit to the reference grid. No-op while an edit is
    /// already open.
    pub fn initialize(&mut self, reference: &VolumeGeometry, normal_axis: usize) {
        if !self.raster.is_empty() {
            return;
        }
        let mut geometry = reference.clone();
        geometry.dims.3 = 1;
        self.raster = Volume::allocate(geometry, crate::enums::ScalarKind::Short);
        self.normal_axis = normal_axis;
        self.undo.clear();
    }

    /// Start a new point set: stamp a brush disk at `p`.
    pub fn add_point_set(&mut self, p: Point3<f64>, brush_width: u32) {
        if self.raster.is_empty() {
            return;
        }
        self.push_snapshot();
        self.stamp_disk(p, brush_width);
        self.points.push(p);
    }

    /// Continue the stroke: stamp the brush along the segment from the
    /// previous point to `p`.
    pub fn add_point(&mut self, p: Point3<f64>, brush_width: u32) {
        if self.raster.is_empty() {
            return;
        }
        self.push_snapshot();
        match self.points.last().copied() {
            Some(prev) => self.stamp_segment(prev, p, brush_width),
            None => self.stamp_disk(p, brush_width),
        }
        self.points.push(p);
    }

    /// Finish the stroke at `p` and rasterize the closing segment back
    /// to the first point.
    pub fn close(&mut self, p: Point3<f64>, brush_width: u32) {
        if self.raster.is_empty() {
            return;
        }
        self.push_snapshot();
        if let Some(prev) = self.points.last().copied() {
            self.stamp_segment(prev, p, brush_width);
        }
        if let Some(first) = self.points.first().copied() {
            self.stamp_segment(p, first, brush_width);
        }
        self.points.push(p);
    }

    /// Flood fill the unmarked region around `p`, bounded by drawn
    /// strokes, within the bound slice.
    pub fn fill_area(&mut self, p: Point3<f64>) {
        if self.raster.is_empty() {
            return;
        }
        let Some(seed) = self.to_voxel(p) else {
            return;
        };
        if self.raster.get(seed[0], seed[1], seed[2], 0) > 0.0 {
            return;
        }
        self.push_snapshot();
        self.points.push(p);

        let (a, b) = self.plane_axes();
        let mut frontier = VecDeque::new();
        self.raster.put(seed[0], seed[1], seed[2], 0, 1.0);
        frontier.push_back(seed);
        while let Some(v) = frontier.pop_front() {
            for (axis, step) in [(a, -1i64), (a, 1), (b, -1), (b, 1)] {
                let mut n = [v[0] as i64, v[1] as i64, v[2] as i64];
                n[axis] += step;
                if !self.raster.contains(n[0], n[1], n[2]) {
                    continue;
                }
                let n = [n[0] as usize, n[1] as usize, n[2] as usize];
                if self.raster.get(n[0], n[1], n[2], 0) == 0.0 {
                    self.raster.put(n[0], n[1], n[2], 0, 1.0);
                    frontier.push_back(n);
                }
            }
        }
    }

    /// Grow a connected region of `reference` voxels whose intensity at
    /// `frame` lies in `[threshold_min, threshold_max]`, starting at
    /// `seed`. Out-of-bounds or out-of-window seeds are ignored.
    pub fn region_growing(
        &mut self,
        seed: Point3<f64>,
        threshold_min: f64,
        threshold_max: f64,
        mode: RegionGrowingMode,
        reference: &Volume,
        frame: usize,
    ) {
        if self.raster.is_empty() || reference.is_empty() || frame >= reference.t() {
            return;
        }
        let Some(start) = self.to_voxel(seed) else {
            return;
        };
        // Raster grid straight into the reference grid.
        let to_reference =
            reference.geometry().world_to_image_matrix() * self.raster.geometry().image_to_world_matrix();
        let in_window = move |v: [usize; 3]| {
            let g = to_reference.transform_point(&Point3::new(
                v[0] as f64,
                v[1] as f64,
                v[2] as f64,
            ));
            let x = g.x.round() as i64;
            let y = g.y.round() as i64;
            let z = g.z.round() as i64;
            if !reference.contains(x, y, z) {
                return false;
            }
            let value = reference.get(x as usize, y as usize, z as usize, frame);
            value >= threshold_min && value <= threshold_max
        };
        if !in_window(start) {
            trace!(?start, "region growing seed outside intensity window");
            return;
        }

        self.push_snapshot();
        self.points.push(seed);

        let neighbors: Vec<(usize, i64)> = match mode {
            RegionGrowingMode::Slice => {
                let (a, b) = self.plane_axes();
                vec![(a, -1), (a, 1), (b, -1), (b, 1)]
            }
            RegionGrowingMode::Volume => {
                vec![(0, -1), (0, 1), (1, -1), (1, 1), (2, -1), (2, 1)]
            }
        };

        let mut frontier = VecDeque::new();
        self.raster.put(start[0], start[1], start[2], 0, 1.0);
        frontier.push_back(start);
        while let Some(v) = frontier.pop_front() {
            for &(axis, step) in &neighbors {
                let mut n = [v[0] as i64, v[1] as i64, v[2] as i64];
                n[axis] += step;
                if !self.raster.contains(n[0], n[1], n[2]) {
                    continue;
                }
                let n = [n[0] as usize, n[1] as usize, n[2] as usize];
                if self.raster.get(n[0], n[1], n[2], 0) == 0.0 && in_window(n) {
                    self.raster.put(n[0], n[1], n[2], 0, 1.0);
                    frontier.push_back(n);
                }
            }
        }
    }

    /// Restore the raster to its state before the last modifying
    /// operation.
    pub fn undo(&mut self) {
        if let Some(snapshot) = self.undo.pop() {
            *self.raster.data_mut() = snapshot;
            self.points.pop();
        }
    }

    /// Discard the raster, points, and history.
    pub fn clear(&mut self) {
        self.points.clear();
        self.undo.clear();
        self.raster = Volume::default();
    }

    fn push_snapshot(&mut self) {
        self.undo.push(self.raster.data().clone());
    }

    fn plane_axes(&self) -> (usize, usize) {
        match self.normal_axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        }
    }

    fn to_voxel(&self, p: Point3<f64>) -> Option<[usize; 3]> {
        let g = self.raster.world_to_image(p);
        let x = g.x.round() as i64;
        let y = g.y.round() as i64;
        let z = g.z.round() as i64;
        if !self.raster.contains(x, y, z) {
            return None;
        }
        Some([x as usize, y as usize, z as usize])
    }

    fn stamp_disk(&mut self, p: Point3<f64>, brush_width: u32) {
        let Some(center) = self.to_voxel(p) else {
            return;
        };
        let radius = (brush_width.max(1) as f64) / 2.0;
        let reach = radius.ceil() as i64;
        let (a, b) = self.plane_axes();
        for da in -reach..=reach {
            for db in -reach..=reach {
                if (da * da + db * db) as f64 > radius * radius {
                    continue;
                }
                let mut v = [center[0] as i64, center[1] as i64, center[2] as i64];
                v[a] += da;
                v[b] += db;
                if self.raster.contains(v[0], v[1], v[2]) {
                    self.raster
                        .put(v[0] as usize, v[1] as usize, v[2] as usize, 0, 1.0);
                }
            }
        }
    }

    fn stamp_segment(&mut self, from: Point3<f64>, to: Point3<f64>, brush_width: u32) {
        let g0 = self.raster.world_to_image(from);
        let g1 = self.raster.world_to_image(to);
        let steps = ((g1 - g0).norm() * 2.0).ceil() as usize + 1;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            let p = from + (to - from) * t;
            self.stamp_disk(p, brush_width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ScalarKind;
    use nalgebra::Vector3;

    fn reference_grid(n: usize) -> VolumeGeometry {
        VolumeGeometry::new(
            (n, n, n, 1),
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
        )
    }

    fn marked(contour: &VoxelContour) -> usize {
        contour
            .raster()
            .data()
            .iter()
            .filter(|&&v| v > 0.0)
            .count()
    }

    #[test]
    fn first_point_allocates_raster_lazily() {
        let mut contour = VoxelContour::new();
        assert!(contour.raster().is_empty());
        contour.initialize(&reference_grid(8), 2);
        contour.add_point_set(Point3::origin(), 1);
        assert!(!contour.raster().is_empty());
        assert_eq!(marked(&contour), 1);
    }

    #[test]
    fn undo_restores_previous_raster_state() {
        let mut contour = VoxelContour::new();
        contour.initialize(&reference_grid(8), 2);
        contour.add_point_set(Point3::new(-2.0, 0.0, 0.0), 1);
        let after_one = contour.raster().data().clone();
        contour.add_point(Point3::new(2.0, 0.0, 0.0), 1);
        assert!(marked(&contour) > 1);
        contour.undo();
        assert_eq!(contour.raster().data(), &after_one);
        assert_eq!(contour.size(), 1);
    }

    #[test]
    fn fill_area_is_bounded_by_strokes() {
        let mut contour = VoxelContour::new();
        contour.initialize(&reference_grid(9), 2);
        // A closed square of strokes around the slice center.
        contour.add_point_set(Point3::new(-2.0, -2.0, 0.0), 1);
        contour.add_point(Point3::new(2.0, -2.0, 0.0), 1);
        contour.add_point(Point3::new(2.0, 2.0, 0.0), 1);
        contour.close(Point3::new(-2.0, 2.0, 0.0), 1);
        let boundary = marked(&contour);
        contour.fill_area(Point3::origin());
        // Interior of a 5x5 square: 3x3 voxels.
        assert_eq!(marked(&contour), boundary + 9);
    }

    #[test]
    fn region_growing_respects_window_and_mode() {
        let mut reference = Volume::allocate(reference_grid(7), ScalarKind::Short);
        // A bright 3x3x3 block in the center of a dark volume.
        for z in 2..5 {
            for y in 2..5 {
                for x in 2..5 {
                    reference.put(x, y, z, 0, 100.0);
                }
            }
        }

        let mut contour = VoxelContour::new();
        contour.initialize(reference.geometry(), 2);
        contour.region_growing(
            Point3::origin(),
            50.0,
            150.0,
            RegionGrowingMode::Slice,
            &reference,
            0,
        );
        assert_eq!(marked(&contour), 9);

        contour.clear();
        contour.initialize(reference.geometry(), 2);
        contour.region_growing(
            Point3::origin(),
            50.0,
            150.0,
            RegionGrowingMode::Volume,
            &reference,
            0,
        );
        assert_eq!(marked(&contour), 27);
    }

    #[test]
    fn out_of_window_seed_is_a_no_op() {
        let reference = Volume::allocate(reference_grid(7), ScalarKind::Short);
        let mut contour = VoxelContour::new();
        contour.initialize(reference.geometry(), 2);
        contour.region_growing(
            Point3::origin(),
            50.0,
            150.0,
            RegionGrowingMode::Volume,
            &reference,
            0,
        );
        assert_eq!(marked(&contour), 0);
        assert_eq!(contour.size(), 0);
    }
}
