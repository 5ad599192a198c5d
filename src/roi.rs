//! World-space region of interest clamped to the target volume.

use crate::volume::Volume;

use nalgebra::Point3;

/// Which ROI corner an update addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiCorner {
    First,
    Second,
}

/// Axis-aligned (in target grid space) region of interest held as two
/// world corners, kept ordered so `corner1 <= corner2` per grid axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub corner1: Point3<f64>,
    pub corner2: Point3<f64>,
}

impl Default for Roi {
    fn default() -> Self {
        Self {
            corner1: Point3::origin(),
            corner2: Point3::origin(),
        }
    }
}

impl Roi {
    /// Span the full voxel extent of `target`.
    pub fn reset(&mut self, target: &Volume) {
        self.corner1 = target.image_to_world(Point3::new(0.0, 0.0, 0.0));
        self.corner2 = target.image_to_world(Point3::new(
            target.x().saturating_sub(1) as f64,
            target.y().saturating_sub(1) as f64,
            target.z().saturating_sub(1) as f64,
        ));
    }

    /// Move one corner to `world`, clamped to the target voxel bounds
    /// and against the other corner so the ordering never inverts.
    pub fn update_corner(&mut self, target: &Volume, world: Point3<f64>, corner: RoiCorner) {
        if target.is_empty() {
            return;
        }
        let mut moved = target.world_to_image(world);
        let other = target.world_to_image(match corner {
            RoiCorner::First => self.corner2,
            RoiCorner::Second => self.corner1,
        });
        let dims = [target.x() as f64, target.y() as f64, target.z() as f64];

        for axis in 0..3 {
            match corner {
                RoiCorner::First => {
                    if moved[axis].round() < 0.0 {
                        moved[axis] = 0.0;
                    }
                    if moved[axis].round() > other[axis].round() {
                        moved[axis] = other[axis];
                    }
                }
                RoiCorner::Second => {
                    if moved[axis].round() >= dims[axis] {
                        moved[axis] = dims[axis] - 1.0;
                    }
                    if moved[axis].round() < other[axis].round() {
                        moved[axis] = other[axis];
                    }
                }
            }
        }

        let world = target.image_to_world(moved);
        match corner {
            RoiCorner::First => self.corner1 = world,
            RoiCorner::Second => self.corner2 = world,
        }
    }
}
