//! The orchestrator: owns volumes, transforms, tables, viewports and the
//! annotation engine, and drives the update (resample + composite)
//! cycle.
//!
//! Presentation is external: after [`Viewer::update`] each pane holds a
//! finished RGB(A) color buffer which the embedding window system blits,
//! together with an [`OverlayPlan`] describing which vector overlays to
//! draw on top. All interactive entry points take screen pixel
//! coordinates with a top-left origin and y pointing down, and convert
//! to normalized bottom-left-origin coordinates before viewport lookup.

use crate::compositor::{self, CompositeInputs};
use crate::config;
use crate::contour::VoxelContour;
use crate::displacement_cache::DisplacementCache;
use crate::enums::{
    ColorMode, ContourMode, CursorMode, DisplayConvention, InterpolationMode, LayoutPreset,
    RegionGrowingMode, ScalarKind, ViewMode, ViewPlane,
};
use crate::error::{Result, ViewerError};
use crate::lookup_table::{Color, LookupTable};
use crate::orientation;
use crate::resample::{self, ResampleParams};
use crate::roi::{Roi, RoiCorner};
use crate::segment_table::SegmentTable;
use crate::transform::{AffineTransform, RigidTransform, Transform};
use crate::viewport::{self, Viewport};
use crate::volume::{Volume, VolumeGeometry};

use nalgebra::{Point3, Vector3};
use tracing::{debug, info};

/// Landmark correspondence lines are computed but never displayed; the
/// flag is kept (off) rather than removed.
const DISPLAY_CORRESPONDENCES: bool = false;

/// Normalized intensity domain the target and source rasters are
/// rescaled into before lookup.
const DISPLAY_RANGE: f64 = 10000.0;

/// Padding written where a resampled raster has no support.
const RASTER_PADDING: f64 = -1.0;

#[derive(Debug, Default, Clone, Copy)]
struct DirtyFlags {
    target: bool,
    source: bool,
    segmentation: bool,
    selection: bool,
}

impl DirtyFlags {
    fn all() -> Self {
        Self {
            target: true,
            source: true,
            segmentation: true,
            selection: true,
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One viewport with its per-role rasters and finished color buffer.
#[derive(Debug)]
pub struct Pane {
    pub viewport: Viewport,
    /// Second viewport of a shared plane shows the source as primary.
    pub is_source: bool,
    pub target_out: Volume,
    pub source_out: Volume,
    pub segmentation_out: Volume,
    pub selection_out: Volume,
    drawable: Vec<Color>,
}

impl Pane {
    /// Finished color buffer, row-major bottom-up.
    pub fn drawable(&self) -> &[Color] {
        &self.drawable
    }

    /// The color buffer as raw bytes for the presenter.
    pub fn drawable_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.drawable)
    }
}

/// Which vector overlays the external drawer should render on a pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayPlan {
    pub target_contour: bool,
    pub source_contour: bool,
    pub target_landmarks: bool,
    pub source_landmarks: bool,
    pub correspondences: bool,
    pub segmentation_contours: bool,
    pub deformation_grid: bool,
    pub deformation_points: bool,
    pub deformation_arrows: bool,
    pub roi: bool,
    pub cursor: Option<CursorMode>,
}

/// Result of a keyboard shortcut dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResponse {
    Handled,
    Ignored,
    /// Quit was requested; termination is the driver's decision.
    Quit,
}

/// Function keys recognized by [`Viewer::special_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

/// What sits under the pointer, for the status line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub voxel: (usize, usize, usize),
    pub world: Point3<f64>,
    pub target_intensity: f64,
    pub source_intensity: Option<f64>,
    pub label: Option<String>,
}

pub struct Viewer {
    screen: (u32, u32),
    origin: Point3<f64>,
    /// Display pixels per mm.
    resolution: f64,
    display_axes: [Vector3<f64>; 3],
    flips: [bool; 3],
    convention: DisplayConvention,
    snap_to_grid: bool,

    config_mode: LayoutPreset,
    view_mode: ViewMode,
    view_mix: f64,

    target: Volume,
    source: Volume,
    segmentation: Volume,
    segment_table: SegmentTable,

    source_transform: Transform,
    source_transform_apply: bool,
    source_transform_invert: bool,
    cache_displacements: bool,
    cache: DisplacementCache,

    target_lut: LookupTable,
    source_lut: LookupTable,
    subtraction_lut: LookupTable,
    target_min: f64,
    target_max: f64,
    source_min: f64,
    source_max: f64,

    target_interpolation: InterpolationMode,
    source_interpolation: InterpolationMode,
    target_frame: usize,
    source_frame: usize,

    panes: Vec<Pane>,
    dirty: DirtyFlags,

    contour: VoxelContour,
    contour_viewer: Option<usize>,
    contour_plane: ViewPlane,
    paint_brush_width: u32,
    /// While set, a closing stroke keeps painting instead of closing the
    /// polygon.
    segmentation_mode: bool,
    region_growing_mode: RegionGrowingMode,
    region_growing_min: f64,
    region_growing_max: f64,

    roi: Roi,
    display_roi: bool,

    display_target_contour: bool,
    display_source_contour: bool,
    display_cursor: bool,
    cursor_mode: CursorMode,
    display_deformation_grid: bool,
    display_deformation_points: bool,
    display_deformation_arrows: bool,
    display_landmarks: bool,
    display_object: bool,
    display_object_warp: bool,
    display_object_grid: bool,
    display_segmentation_labels: bool,
    display_segmentation_contours: bool,

    target_landmarks: Vec<Point3<f64>>,
    source_landmarks: Vec<Point3<f64>>,
    selected_target_landmarks: Vec<usize>,
    selected_source_landmarks: Vec<usize>,
}

impl Viewer {
    pub fn new(screen_x: u32, screen_y: u32) -> Self {
        let mut viewer = Self {
            screen: (screen_x, screen_y),
            origin: Point3::origin(),
            resolution: 1.0,
            display_axes: [Vector3::x(), Vector3::y(), Vector3::z()],
            flips: [false; 3],
            convention: DisplayConvention::Neurological,
            snap_to_grid: true,

            config_mode: LayoutPreset::XyXzYz,
            view_mode: ViewMode::Target,
            view_mix: 0.5,

            target: Volume::default(),
            source: Volume::default(),
            segmentation: Volume::default(),
            segment_table: SegmentTable::new(),

            source_transform: Transform::default(),
            source_transform_apply: true,
            source_transform_invert: false,
            cache_displacements: true,
            cache: DisplacementCache::new(),

            target_lut: LookupTable::new(0, DISPLAY_RANGE as i32),
            source_lut: LookupTable::new(0, DISPLAY_RANGE as i32),
            subtraction_lut: LookupTable::new(-(DISPLAY_RANGE as i32), DISPLAY_RANGE as i32),
            target_min: 0.0,
            target_max: 1.0,
            source_min: 0.0,
            source_max: 1.0,

            target_interpolation: InterpolationMode::NearestNeighbor,
            source_interpolation: InterpolationMode::NearestNeighbor,
            target_frame: 0,
            source_frame: 0,

            panes: Vec::new(),
            dirty: DirtyFlags::default(),

            contour: VoxelContour::new(),
            contour_viewer: None,
            contour_plane: ViewPlane::Xy,
            paint_brush_width: 1,
            segmentation_mode: false,
            region_growing_mode: RegionGrowingMode::Slice,
            region_growing_min: 0.0,
            region_growing_max: 0.0,

            roi: Roi::default(),
            display_roi: false,

            display_target_contour: false,
            display_source_contour: false,
            display_cursor: true,
            cursor_mode: CursorMode::CrossHair,
            display_deformation_grid: false,
            display_deformation_points: false,
            display_deformation_arrows: false,
            display_landmarks: false,
            display_object: false,
            display_object_warp: false,
            display_object_grid: false,
            display_segmentation_labels: false,
            display_segmentation_contours: false,

            target_landmarks: Vec::new(),
            source_landmarks: Vec::new(),
            selected_target_landmarks: Vec::new(),
            selected_source_landmarks: Vec::new(),
        };
        viewer.configure(LayoutPreset::XyXzYz);
        viewer
    }

    // ------------------------------------------------------------------
    // Layout and geometry
    // ------------------------------------------------------------------

    /// Rebuild the pane vector for a layout preset. The previous panes
    /// are dropped wholesale; an open contour keeps its plane binding if
    /// the new layout still shows that plane.
    pub fn configure(&mut self, preset: LayoutPreset) {
        self.config_mode = preset;
        let mut source_seen = [false; 3];
        self.panes = viewport::layout(preset)
            .into_iter()
            .map(|spec| {
                let plane = spec.plane as usize;
                let is_source = source_seen[plane];
                source_seen[plane] = !source_seen[plane];
                Pane {
                    viewport: Viewport::new(spec, self.screen),
                    is_source,
                    target_out: Volume::default(),
                    source_out: Volume::default(),
                    segmentation_out: Volume::default(),
                    selection_out: Volume::default(),
                    drawable: Vec::new(),
                }
            })
            .collect();

        if self.contour_viewer.is_some() {
            self.contour_viewer = self
                .panes
                .iter()
                .position(|p| p.viewport.plane() == self.contour_plane);
        }

        self.initialize();
    }

    /// Recompute every pane's raster geometry and reattach or detach the
    /// displacement cache. Marks everything dirty.
    pub fn initialize(&mut self) {
        let target_spacing = if self.target.is_empty() {
            Vector3::new(1.0, 1.0, 1.0)
        } else {
            self.target.geometry().spacing
        };
        let [dx, dy, dz] = self.display_axes;

        for pane in &mut self.panes {
            let w = pane.viewport.width();
            let h = pane.viewport.height();
            let mut geometry = VolumeGeometry::new(
                (w, h, 1, 1),
                self.origin,
                Vector3::new(1.0 / self.resolution, 1.0 / self.resolution, 1.0),
            );
            // In-plane axes come from the resolved display axes; the
            // through-plane spacing follows the target volume.
            match pane.viewport.plane() {
                ViewPlane::Xy => {
                    geometry.spacing.z = target_spacing.z;
                    geometry.xaxis = dx;
                    geometry.yaxis = dy;
                    geometry.zaxis = dz;
                }
                ViewPlane::Xz => {
                    geometry.spacing.z = target_spacing.y;
                    geometry.xaxis = dx;
                    geometry.yaxis = dz;
                    geometry.zaxis = dy;
                }
                ViewPlane::Yz => {
                    geometry.spacing.z = target_spacing.x;
                    geometry.xaxis = dy;
                    geometry.yaxis = dz;
                    geometry.zaxis = dx;
                }
            }

            let mut target_geometry = geometry.clone();
            target_geometry.time_origin = self.target.image_to_time(self.target_frame);
            pane.target_out = Volume::allocate(target_geometry, ScalarKind::Short);
            pane.target_out.data_mut().fill(RASTER_PADDING);

            let mut source_geometry = geometry.clone();
            source_geometry.time_origin = self.source.image_to_time(self.source_frame);
            pane.source_out = Volume::allocate(source_geometry, ScalarKind::Short);
            pane.source_out.data_mut().fill(RASTER_PADDING);

            pane.segmentation_out = Volume::allocate(geometry.clone(), ScalarKind::Short);
            pane.segmentation_out.data_mut().fill(RASTER_PADDING);
            pane.selection_out = Volume::allocate(geometry, ScalarKind::Short);

            pane.drawable = vec![Color::BLACK; w * h];
        }

        // Attach the displacement cache when the transform wants it.
        if !self.source.is_empty()
            && self.source_transform.requires_caching()
            && self.cache_displacements
        {
            let geometry = if self.target.is_empty() {
                self.source.geometry().clone()
            } else {
                self.target.geometry().clone()
            };
            self.cache.initialize(geometry);
        } else {
            self.cache.clear();
        }

        self.dirty = DirtyFlags::all();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.screen != (width, height) {
            self.screen = (width, height);
            for pane in &mut self.panes {
                pane.viewport.screen = self.screen;
            }
        }
        self.initialize();
        self.update();
    }

    /// Re-derive the display axes from the target orientation and
    /// recenter the reslice origin on the target volume.
    pub fn reset(&mut self) {
        if !self.target.is_empty() {
            let g = self.target.geometry();
            self.display_axes = orientation::resolve_display_axes(
                self.display_axes,
                [g.xaxis, g.yaxis, g.zaxis],
                self.target.orientation_codes(),
                self.convention,
                self.flips,
            );
            let center = self.target.world_to_image(g.origin);
            self.origin = self.target.image_to_world(Point3::new(
                center.x.round(),
                center.y.round(),
                center.z.round(),
            ));
        }
        self.initialize();
    }

    // ------------------------------------------------------------------
    // Volume and transform intake
    // ------------------------------------------------------------------

    /// Install the target volume and re-derive everything anchored to it:
    /// lookup ranges, region-growing thresholds, ROI, display reset.
    pub fn set_target(&mut self, volume: Volume) {
        info!(dims = ?volume.geometry().dims, "target volume loaded");
        self.target = volume;
        let (min, max) = self.target.min_max();
        self.target_min = min;
        self.target_max = max;
        self.target_lut.initialize(0, DISPLAY_RANGE as i32);
        self.subtraction_lut
            .initialize(-(DISPLAY_RANGE as i32), DISPLAY_RANGE as i32);
        self.region_growing_min = min;
        self.region_growing_max = max;
        self.target_frame = 0;
        self.roi.reset(&self.target);
        if self.contour.size() > 0 {
            self.contour.clear();
            self.contour_viewer = None;
        }
        self.reset();
    }

    /// Merge a decoded multi-file sequence into the target.
    pub fn set_target_sequence(&mut self, volumes: Vec<Volume>) -> Result<()> {
        let merged = Volume::from_sequence(volumes)?;
        self.set_target(merged);
        Ok(())
    }

    pub fn set_source(&mut self, volume: Volume) {
        info!(dims = ?volume.geometry().dims, "source volume loaded");
        self.source = volume;
        let (min, max) = self.source.min_max();
        self.source_min = min;
        self.source_max = max;
        self.source_lut.initialize(0, DISPLAY_RANGE as i32);
        self.subtraction_lut
            .initialize(-(DISPLAY_RANGE as i32), DISPLAY_RANGE as i32);
        self.source_frame = 0;
        self.initialize();
    }

    pub fn set_source_sequence(&mut self, volumes: Vec<Volume>) -> Result<()> {
        let merged = Volume::from_sequence(volumes)?;
        self.set_source(merged);
        Ok(())
    }

    pub fn set_segmentation(&mut self, volume: Volume) {
        self.segmentation = volume;
        self.roi.reset(&self.segmentation);
        self.dirty.segmentation = true;
    }

    pub fn target(&self) -> &Volume {
        &self.target
    }

    pub fn source(&self) -> &Volume {
        &self.source
    }

    pub fn segmentation(&self) -> &Volume {
        &self.segmentation
    }

    pub fn segment_table(&self) -> &SegmentTable {
        &self.segment_table
    }

    pub fn segment_table_mut(&mut self) -> &mut SegmentTable {
        self.dirty.segmentation = true;
        &mut self.segment_table
    }

    /// Install a general source transform.
    pub fn set_source_transform(&mut self, transform: Transform) {
        self.source_transform = transform;
        self.cache.mark_modified();
        self.dirty.source = true;
        self.initialize();
    }

    /// A rigid-tagged transform is always upgraded to the affine
    /// representation on load.
    pub fn set_source_transform_rigid(&mut self, rigid: RigidTransform) {
        self.set_source_transform(Transform::Affine(AffineTransform::from_rigid(&rigid)));
    }

    pub fn source_transform(&self) -> &Transform {
        &self.source_transform
    }

    /// Write one transform parameter; invalidates cached displacements.
    pub fn put_transform_parameter(&mut self, index: usize, value: f64) {
        self.source_transform.put(index, value);
        self.cache.mark_modified();
        self.dirty.source = true;
    }

    pub fn transform_summary(&self) -> Vec<String> {
        self.source_transform.summary()
    }

    pub fn set_source_transform_apply(&mut self, apply: bool) {
        self.source_transform_apply = apply;
        self.dirty.source = true;
    }

    pub fn source_transform_apply(&self) -> bool {
        self.source_transform_apply
    }

    pub fn set_source_transform_invert(&mut self, invert: bool) {
        self.source_transform_invert = invert;
        self.cache.mark_modified();
        self.dirty.source = true;
    }

    pub fn source_transform_invert(&self) -> bool {
        self.source_transform_invert
    }

    /// The source resampled onto the target grid through the active
    /// transform, as it would be exported.
    pub fn resampled_source(&self) -> Volume {
        if self.source.is_empty() || self.target.is_empty() || !self.source_transform_apply {
            return self.source.clone();
        }
        let mut geometry = self.target.geometry().clone();
        geometry.dims.3 = 1;
        let mut out = Volume::allocate(geometry, self.source.kind());
        resample::resample(
            &self.source,
            &mut out,
            &self.source_transform,
            None,
            &ResampleParams {
                interpolation: self.source_interpolation,
                padding: self.source_min - 1.0,
                invert: self.source_transform_invert,
                frame: self.source_frame,
                ..ResampleParams::default()
            },
        );
        out
    }

    // ------------------------------------------------------------------
    // Frames, interpolation, view settings
    // ------------------------------------------------------------------

    pub fn set_target_frame(&mut self, frame: usize) {
        let frame = frame.min(self.target.t().saturating_sub(1));
        self.target_frame = frame;
        let torigin = self.target.image_to_time(frame);
        for pane in &mut self.panes {
            pane.target_out.set_time_origin(torigin);
        }
        self.dirty.target = true;
        if self.source_transform_apply {
            self.dirty.source = true;
        }
    }

    pub fn target_frame(&self) -> usize {
        self.target_frame
    }

    pub fn set_source_frame(&mut self, frame: usize) {
        let frame = frame.min(self.source.t().saturating_sub(1));
        self.source_frame = frame;
        let torigin = self.source.image_to_time(frame);
        for pane in &mut self.panes {
            pane.source_out.set_time_origin(torigin);
        }
        self.dirty.source = true;
    }

    pub fn source_frame(&self) -> usize {
        self.source_frame
    }

    pub fn set_target_interpolation(&mut self, mode: InterpolationMode) {
        self.target_interpolation = mode;
        self.dirty.target = true;
    }

    pub fn target_interpolation(&self) -> InterpolationMode {
        self.target_interpolation
    }

    pub fn set_source_interpolation(&mut self, mode: InterpolationMode) {
        self.source_interpolation = mode;
        self.dirty.source = true;
    }

    pub fn source_interpolation(&self) -> InterpolationMode {
        self.source_interpolation
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mix(&mut self, mix: f64) {
        self.view_mix = mix.clamp(0.0, 1.0);
    }

    pub fn view_mix(&self) -> f64 {
        self.view_mix
    }

    pub fn set_resolution(&mut self, resolution: f64) {
        if resolution > 0.0 {
            self.resolution = resolution;
            self.initialize();
        }
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn set_display_convention(&mut self, convention: DisplayConvention) {
        self.convention = convention;
        self.reset();
    }

    pub fn set_flips(&mut self, flips: [bool; 3]) {
        self.flips = flips;
        self.reset();
    }

    pub fn target_lut(&self) -> &LookupTable {
        &self.target_lut
    }

    pub fn target_lut_mut(&mut self) -> &mut LookupTable {
        &mut self.target_lut
    }

    pub fn source_lut(&self) -> &LookupTable {
        &self.source_lut
    }

    pub fn source_lut_mut(&mut self) -> &mut LookupTable {
        &mut self.source_lut
    }

    pub fn subtraction_lut(&self) -> &LookupTable {
        &self.subtraction_lut
    }

    pub fn subtraction_lut_mut(&mut self) -> &mut LookupTable {
        &mut self.subtraction_lut
    }

    pub fn set_display_segmentation_labels(&mut self, on: bool) {
        self.display_segmentation_labels = on;
    }

    pub fn set_display_cursor(&mut self, on: bool) {
        self.display_cursor = on;
    }

    pub fn set_cursor_mode(&mut self, mode: CursorMode) {
        self.cursor_mode = mode;
    }

    pub fn set_paint_brush_width(&mut self, width: u32) {
        self.paint_brush_width = width.max(1);
    }

    pub fn set_segmentation_mode(&mut self, on: bool) {
        self.segmentation_mode = on;
    }

    pub fn set_region_growing_mode(&mut self, mode: RegionGrowingMode) {
        self.region_growing_mode = mode;
    }

    pub fn set_region_growing_thresholds(&mut self, min: f64, max: f64) {
        self.region_growing_min = min;
        self.region_growing_max = max;
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    // ------------------------------------------------------------------
    // Origin and pointer handling
    // ------------------------------------------------------------------

    fn normalized(&self, i: i32, j: i32) -> (f64, f64) {
        (
            i as f64 / self.screen.0 as f64,
            (self.screen.1 as i32 - j) as f64 / self.screen.1 as f64,
        )
    }

    fn pane_at(&self, nx: f64, ny: f64) -> Option<usize> {
        self.panes
            .iter()
            .position(|p| p.viewport.contains(nx, ny))
    }

    fn snap(&self, mut world: Point3<f64>) -> Point3<f64> {
        if self.snap_to_grid && !self.target.is_empty() {
            let g = self.target.world_to_image(world);
            world = self
                .target
                .image_to_world(Point3::new(g.x.round(), g.y.round(), g.z.round()));
        }
        world
    }

    fn propagate_origin(&mut self) {
        for pane in &mut self.panes {
            pane.target_out.set_origin(self.origin);
            pane.source_out.set_origin(self.origin);
            pane.segmentation_out.set_origin(self.origin);
            pane.selection_out.set_origin(self.origin);
        }
        self.dirty = DirtyFlags::all();
    }

    /// Move the reslice origin to the clicked position.
    pub fn set_origin_screen(&mut self, i: i32, j: i32) {
        let (nx, ny) = self.normalized(i, j);
        if let Some(k) = self.pane_at(nx, ny) {
            let (lx, ly) = self.panes[k].viewport.to_local(nx, ny);
            self.origin = self.panes[k]
                .target_out
                .image_to_world(Point3::new(lx, ly, 0.0));
        }
        self.origin = self.snap(self.origin);
        self.propagate_origin();
    }

    /// Move the reslice origin to a world position.
    pub fn set_origin(&mut self, world: Point3<f64>) {
        self.origin = self.snap(world);
        self.propagate_origin();
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    /// Page through slices of the viewport under the pointer.
    pub fn mouse_wheel(&mut self, i: i32, j: i32, wheel: i32) {
        let (nx, ny) = self.normalized(i, j);
        if let Some(k) = self.pane_at(nx, ny) {
            let out = &self.panes[k].target_out;
            let mut g = out.world_to_image(self.origin);
            g.z += wheel as f64;
            self.origin = out.image_to_world(g);
        }
        self.origin = self.snap(self.origin);
        self.propagate_origin();
    }

    /// What sits under the pointer, or `None` outside the volume.
    pub fn probe(&self, i: i32, j: i32) -> Option<ProbeInfo> {
        if self.target.is_empty() {
            return None;
        }
        let (nx, ny) = self.normalized(i, j);
        let k = self.pane_at(nx, ny)?;
        let (lx, ly) = self.panes[k].viewport.to_local(nx, ny);
        let world = self.panes[k]
            .target_out
            .image_to_world(Point3::new(lx, ly, 0.0));

        let g = self.target.world_to_image(world);
        let (x, y, z) = (g.x.round() as i64, g.y.round() as i64, g.z.round() as i64);
        if !self.target.contains(x, y, z) || self.target_frame >= self.target.t() {
            return None;
        }
        let voxel = (x as usize, y as usize, z as usize);
        let target_intensity = self.target.get(voxel.0, voxel.1, voxel.2, self.target_frame);

        let source_intensity = if self.source.is_empty() {
            None
        } else {
            let t_dst = self.target.image_to_time(self.target_frame);
            let t_src = self.source.image_to_time(self.source_frame);
            let q = self.source_transform.apply(world, t_src, t_dst);
            let sg = self.source.world_to_image(q);
            let (sx, sy, sz) = (
                sg.x.round() as i64,
                sg.y.round() as i64,
                sg.z.round() as i64,
            );
            if self.source.contains(sx, sy, sz) && self.source_frame < self.source.t() {
                Some(
                    self.source
                        .get(sx as usize, sy as usize, sz as usize, self.source_frame),
                )
            } else {
                None
            }
        };

        let label = if self.segmentation.is_empty() {
            None
        } else {
            let sg = self.segmentation.world_to_image(world);
            let (sx, sy, sz) = (
                sg.x.round() as i64,
                sg.y.round() as i64,
                sg.z.round() as i64,
            );
            if self.segmentation.contains(sx, sy, sz) {
                let value =
                    self.segmentation
                        .get(sx as usize, sy as usize, sz as usize, 0)
                        .round() as i32;
                if value > 0 {
                    self.segment_table.label_name(value).map(str::to_string)
                } else {
                    None
                }
            } else {
                None
            }
        };

        Some(ProbeInfo {
            voxel,
            world,
            target_intensity,
            source_intensity,
            label,
        })
    }

    // ------------------------------------------------------------------
    // Contour editing
    // ------------------------------------------------------------------

    /// Shared viewport resolution for the three contour entry points.
    ///
    /// The first point of an edit binds the contour to the viewport
    /// under it; while the edit is open, points outside that viewport
    /// are ignored.
    fn resolve_contour_point(&mut self, i: i32, j: i32) -> Option<(usize, Point3<f64>)> {
        let (nx, ny) = self.normalized(i, j);
        let k = if self.contour.size() == 0 {
            let k = self.pane_at(nx, ny)?;
            self.contour_viewer = Some(k);
            self.contour_plane = self.panes[k].viewport.plane();
            k
        } else {
            let k = self.contour_viewer?;
            if !self.panes[k].viewport.contains(nx, ny) {
                return None;
            }
            k
        };
        let (lx, ly) = self.panes[k].viewport.to_local(nx, ny);
        let world = self.panes[k]
            .target_out
            .image_to_world(Point3::new(lx, ly, 0.0));
        Some((k, world))
    }

    /// Raster axis most aligned with the bound viewport's through-plane
    /// direction; slice-constrained contour operations hold it fixed.
    fn contour_normal_axis(&self, pane: usize) -> usize {
        let through = self.panes[pane].target_out.geometry().zaxis;
        let g = self.target.geometry();
        let dots = [
            through.dot(&g.xaxis).abs(),
            through.dot(&g.yaxis).abs(),
            through.dot(&g.zaxis).abs(),
        ];
        let mut best = 2;
        if dots[0] >= dots[1] && dots[0] >= dots[2] {
            best = 0;
        } else if dots[1] >= dots[2] {
            best = 1;
        }
        best
    }

    fn open_contour(&mut self, pane: usize) {
        if self.contour.size() == 0 && !self.target.is_empty() {
            let axis = self.contour_normal_axis(pane);
            self.contour.initialize(self.target.geometry(), axis);
        }
    }

    /// Append a stroke point of the annotation contour.
    pub fn add_contour(&mut self, i: i32, j: i32, mode: ContourMode) {
        let Some((pane, world)) = self.resolve_contour_point(i, j) else {
            return;
        };
        self.open_contour(pane);
        let width = self.paint_brush_width;
        match mode {
            ContourMode::FirstPoint => self.contour.add_point_set(world, width),
            ContourMode::NewPoint => self.contour.add_point(world, width),
            ContourMode::LastPoint => {
                if self.segmentation_mode {
                    self.contour.add_point(world, width);
                } else {
                    self.contour.close(world, width);
                }
            }
        }
        self.dirty.selection = true;
    }

    /// Flood fill the area under the click, bounded by drawn strokes.
    pub fn fill_area(&mut self, i: i32, j: i32) {
        let Some((pane, world)) = self.resolve_contour_point(i, j) else {
            return;
        };
        self.open_contour(pane);
        self.contour.fill_area(world);
        self.dirty.selection = true;
    }

    /// Region-grow from the click within the configured intensity
    /// window.
    pub fn region_grow_contour(&mut self, i: i32, j: i32) {
        let Some((pane, world)) = self.resolve_contour_point(i, j) else {
            return;
        };
        self.open_contour(pane);
        self.contour.region_growing(
            world,
            self.region_growing_min,
            self.region_growing_max,
            self.region_growing_mode,
            &self.target,
            self.target_frame,
        );
        self.dirty.selection = true;
    }

    pub fn undo_contour(&mut self) {
        self.contour.undo();
        self.dirty.selection = true;
    }

    pub fn clear_contour(&mut self) {
        self.contour.clear();
        self.contour_viewer = None;
        self.dirty.selection = true;
    }

    pub fn contour(&self) -> &VoxelContour {
        &self.contour
    }

    /// Commit the selection into the segmentation volume under `label`,
    /// allocating the segmentation on the target grid if empty, then
    /// clear the selection.
    pub fn fill_contour(&mut self, label: i32) {
        if self.contour.raster().is_empty() {
            return;
        }
        if self.segmentation.is_empty() {
            let mut geometry = self.target.geometry().clone();
            geometry.dims.3 = 1;
            self.segmentation = Volume::allocate(geometry, ScalarKind::Short);
        }

        let raster = self.contour.raster();
        for z in 0..raster.z() {
            for y in 0..raster.y() {
                for x in 0..raster.x() {
                    if raster.get(x, y, z, 0) <= 0.0 {
                        continue;
                    }
                    let world =
                        raster.image_to_world(Point3::new(x as f64, y as f64, z as f64));
                    let g = self.segmentation.world_to_image(world);
                    let (sx, sy, sz) =
                        (g.x.round() as i64, g.y.round() as i64, g.z.round() as i64);
                    if self.segmentation.contains(sx, sy, sz) {
                        self.segmentation
                            .put(sx as usize, sy as usize, sz as usize, 0, label as f64);
                    }
                }
            }
        }
        self.contour.clear();
        self.contour_viewer = None;
        self.dirty.segmentation = true;
        self.dirty.selection = true;
    }

    // ------------------------------------------------------------------
    // ROI
    // ------------------------------------------------------------------

    pub fn reset_roi(&mut self) {
        self.roi.reset(&self.target);
    }

    pub fn roi(&self) -> &Roi {
        &self.roi
    }

    pub fn set_display_roi(&mut self, on: bool) {
        self.display_roi = on;
    }

    /// Move one ROI corner to the clicked position.
    pub fn update_roi_corner(&mut self, i: i32, j: i32, corner: RoiCorner) {
        let (nx, ny) = self.normalized(i, j);
        let Some(k) = self.pane_at(nx, ny) else {
            return;
        };
        let (lx, ly) = self.panes[k].viewport.to_local(nx, ny);
        let world = self.panes[k]
            .target_out
            .image_to_world(Point3::new(lx, ly, 0.0));
        self.roi.update_corner(&self.target, world, corner);
    }

    // ------------------------------------------------------------------
    // Landmarks
    // ------------------------------------------------------------------

    pub fn set_target_landmarks(&mut self, points: Vec<Point3<f64>>) {
        self.target_landmarks = points;
        self.selected_target_landmarks.clear();
    }

    pub fn set_source_landmarks(&mut self, points: Vec<Point3<f64>>) {
        self.source_landmarks = points;
        self.selected_source_landmarks.clear();
    }

    pub fn target_landmarks(&self) -> &[Point3<f64>] {
        &self.target_landmarks
    }

    pub fn source_landmarks(&self) -> &[Point3<f64>] {
        &self.source_landmarks
    }

    pub fn select_target_landmark(&mut self, index: usize) {
        if index < self.target_landmarks.len()
            && !self.selected_target_landmarks.contains(&index)
        {
            self.selected_target_landmarks.push(index);
        }
    }

    pub fn select_source_landmark(&mut self, index: usize) {
        if index < self.source_landmarks.len()
            && !self.selected_source_landmarks.contains(&index)
        {
            self.selected_source_landmarks.push(index);
        }
    }

    pub fn selected_target_landmarks(&self) -> &[usize] {
        &self.selected_target_landmarks
    }

    pub fn selected_source_landmarks(&self) -> &[usize] {
        &self.selected_source_landmarks
    }

    /// Fit of the paired landmark sets: mean residual distance, with the
    /// fitted (identity) rigid parameters written into the source
    /// transform. Returns 0 when the sets are not paired.
    pub fn fit_landmarks(&mut self) -> f64 {
        if self.target_landmarks.is_empty()
            || self.target_landmarks.len() != self.source_landmarks.len()
        {
            return 0.0;
        }
        let fitted = RigidTransform::identity();
        let error = self
            .target_landmarks
            .iter()
            .zip(&self.source_landmarks)
            .map(|(t, s)| (t - s).norm())
            .sum::<f64>()
            / self.target_landmarks.len() as f64;
        for (i, &p) in fitted.params.iter().enumerate() {
            self.put_transform_parameter(i, p);
        }
        error
    }

    // ------------------------------------------------------------------
    // Update cycle
    // ------------------------------------------------------------------

    /// Resample every dirty role and recomposite all panes. Dirty flags
    /// are cleared atomically at the end of the pass.
    pub fn update(&mut self) {
        let t_dst = self.target.image_to_time(self.target_frame);
        let t_src = self.source.image_to_time(self.source_frame);

        let identity = Transform::default();
        let apply = self.source_transform_apply;
        let source_transform = if apply {
            &self.source_transform
        } else {
            &identity
        };

        if self.dirty.source && apply && self.cache.is_active() {
            self.cache
                .update(&self.source_transform, self.source_transform_invert, t_src, t_dst);
        }
        let cache = if apply && self.cache.is_active() {
            Some(&self.cache)
        } else {
            None
        };

        let selection_active = self.contour.size() > 0 && !self.contour.raster().is_empty();

        for pane in &mut self.panes {
            if self.dirty.target && !self.target.is_empty() {
                let scale = DISPLAY_RANGE / (self.target_max - self.target_min).max(f64::EPSILON);
                resample::resample(
                    &self.target,
                    &mut pane.target_out,
                    &identity,
                    None,
                    &ResampleParams {
                        interpolation: self.target_interpolation,
                        padding: RASTER_PADDING,
                        scale,
                        offset: -self.target_min * scale,
                        frame: self.target_frame,
                        t_src: t_dst,
                        t_dst,
                        ..ResampleParams::default()
                    },
                );
            }
            if self.dirty.source && !self.source.is_empty() {
                let scale = DISPLAY_RANGE / (self.source_max - self.source_min).max(f64::EPSILON);
                resample::resample(
                    &self.source,
                    &mut pane.source_out,
                    source_transform,
                    cache,
                    &ResampleParams {
                        interpolation: self.source_interpolation,
                        padding: RASTER_PADDING,
                        scale,
                        offset: -self.source_min * scale,
                        invert: self.source_transform_invert,
                        frame: self.source_frame,
                        t_src,
                        t_dst,
                    },
                );
            }
            if self.dirty.segmentation && !self.segmentation.is_empty() {
                resample::resample(
                    &self.segmentation,
                    &mut pane.segmentation_out,
                    &identity,
                    None,
                    &ResampleParams {
                        interpolation: InterpolationMode::NearestNeighbor,
                        padding: RASTER_PADDING,
                        ..ResampleParams::default()
                    },
                );
            }
            if self.dirty.selection {
                if selection_active {
                    resample::resample(
                        self.contour.raster(),
                        &mut pane.selection_out,
                        &identity,
                        None,
                        &ResampleParams {
                            interpolation: InterpolationMode::NearestNeighbor,
                            padding: 0.0,
                            ..ResampleParams::default()
                        },
                    );
                } else {
                    pane.selection_out.data_mut().fill(0.0);
                }
            }
        }

        self.dirty.clear();
        self.composite();
    }

    fn composite(&mut self) {
        let show_segmentation =
            self.display_segmentation_labels && !self.segmentation.is_empty();
        let selection_active = self.contour.size() > 0;

        for pane in &mut self.panes {
            let inputs = CompositeInputs {
                target: pane.target_out.plane_view(),
                source: pane.source_out.plane_view(),
                segmentation: show_segmentation.then(|| pane.segmentation_out.plane_view()),
                selection: selection_active.then(|| pane.selection_out.plane_view()),
                target_lut: &self.target_lut,
                source_lut: &self.source_lut,
                subtraction_lut: &self.subtraction_lut,
                segment_table: &self.segment_table,
                view_mode: self.view_mode,
                view_mix: self.view_mix,
            };
            let inputs = if pane.is_source {
                inputs.swapped()
            } else {
                inputs
            };
            compositor::composite(&inputs, &mut pane.drawable);
        }
    }

    /// Which vector overlays the external drawer should render on pane
    /// `index`. When several panes share a plane, target overlays stay
    /// on the target-primary pane and source overlays on the
    /// source-primary one.
    pub fn overlay_plan(&self, index: usize) -> OverlayPlan {
        let pane = &self.panes[index];
        let shared = self
            .panes
            .iter()
            .filter(|p| p.viewport.plane() == pane.viewport.plane())
            .count()
            > 1;

        let (target_contour, source_contour, target_landmarks, source_landmarks, seg_contours) =
            if shared {
                (
                    !pane.is_source && self.display_target_contour,
                    pane.is_source && self.display_source_contour,
                    !pane.is_source,
                    pane.is_source,
                    !pane.is_source && self.display_segmentation_contours,
                )
            } else {
                (
                    self.display_target_contour,
                    self.display_source_contour,
                    true,
                    true,
                    self.display_segmentation_contours,
                )
            };

        OverlayPlan {
            target_contour,
            source_contour,
            target_landmarks,
            source_landmarks,
            correspondences: DISPLAY_CORRESPONDENCES,
            segmentation_contours: seg_contours,
            deformation_grid: self.display_deformation_grid,
            deformation_points: self.display_deformation_points,
            deformation_arrows: self.display_deformation_arrows,
            roi: self.display_roi,
            cursor: self.display_cursor.then_some(self.cursor_mode),
        }
    }

    // ------------------------------------------------------------------
    // Offscreen capture
    // ------------------------------------------------------------------

    /// Compose all panes into one screen-sized RGB image, top row first.
    pub fn render_offscreen(&mut self) -> image::RgbImage {
        self.update();
        let (w, h) = (self.screen.0, self.screen.1);
        let mut image = image::RgbImage::new(w, h);
        for pane in &self.panes {
            let (px, py) = pane.viewport.pixel_origin();
            let pw = pane.viewport.width();
            let ph = pane.viewport.height();
            for j in 0..ph {
                // Raster rows run bottom-up; image rows run top-down.
                let sy = h as i64 - 1 - (py + j) as i64;
                if sy < 0 || sy >= h as i64 {
                    continue;
                }
                for i in 0..pw {
                    let sx = (px + i) as u32;
                    if sx >= w {
                        continue;
                    }
                    let c = pane.drawable[j * pw + i];
                    image.put_pixel(sx, sy as u32, image::Rgb([c.r, c.g, c.b]));
                }
            }
        }
        image
    }

    /// Render one frame and write it as an 8-bit RGB image file.
    pub fn capture(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let image = self.render_offscreen();
        image.save(path.as_ref())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Keyboard dispatch
    // ------------------------------------------------------------------

    /// Dispatch a printable-key shortcut. Mutating shortcuts run a full
    /// update before returning.
    pub fn key_pressed(&mut self, key: char) -> KeyResponse {
        match key {
            'q' | '\u{1b}' => return KeyResponse::Quit,
            'r' => self.reset(),
            'i' => self.reset_roi(),
            'l' => {
                self.set_target_interpolation(InterpolationMode::Linear);
                self.set_source_interpolation(InterpolationMode::Linear);
            }
            'n' => {
                self.set_target_interpolation(InterpolationMode::NearestNeighbor);
                self.set_source_interpolation(InterpolationMode::NearestNeighbor);
            }
            'c' => {
                self.set_target_interpolation(InterpolationMode::CubicSpline);
                self.set_source_interpolation(InterpolationMode::CubicSpline);
            }
            'b' => {
                self.set_target_interpolation(InterpolationMode::BSpline);
                self.set_source_interpolation(InterpolationMode::BSpline);
            }
            'S' => {
                self.set_target_interpolation(InterpolationMode::Sinc);
                self.set_source_interpolation(InterpolationMode::Sinc);
            }
            't' => self.set_view_mode(ViewMode::Target),
            's' => self.set_view_mode(ViewMode::Source),
            'm' => self.set_view_mode(ViewMode::Checkerboard),
            'd' => self.set_view_mode(ViewMode::Subtraction),
            ' ' => self.display_cursor = !self.display_cursor,
            'h' => self.set_cursor_mode(CursorMode::CrossHair),
            'v' => self.set_cursor_mode(CursorMode::CursorV),
            'B' => self.set_cursor_mode(CursorMode::CursorBar),
            'x' => self.step_origin(0, -1),
            'X' => self.step_origin(0, 1),
            'y' => self.step_origin(1, -1),
            'Y' => self.step_origin(1, 1),
            'z' => self.step_origin(2, -1),
            'Z' => self.step_origin(2, 1),
            '+' => self.cycle_target_frame(1),
            '-' => self.cycle_target_frame(-1),
            'g' => self.display_deformation_grid = !self.display_deformation_grid,
            'p' => self.display_deformation_points = !self.display_deformation_points,
            'a' => self.display_deformation_arrows = !self.display_deformation_arrows,
            'L' => self.display_landmarks = !self.display_landmarks,
            'O' => self.display_object = !self.display_object,
            'W' => self.display_object_warp = !self.display_object_warp,
            'G' => self.display_object_grid = !self.display_object_grid,
            '>' => self.set_resolution(self.resolution * 2.0),
            '<' => self.set_resolution(self.resolution / 2.0),
            '.' => self.set_resolution(self.resolution * std::f64::consts::SQRT_2),
            ',' => self.set_resolution(self.resolution / std::f64::consts::SQRT_2),
            _ => return KeyResponse::Ignored,
        }
        self.update();
        KeyResponse::Handled
    }

    /// Dispatch a function-key shortcut; the deltas nudge the display
    /// windows in domain units.
    pub fn special_key(&mut self, key: FunctionKey, target_delta: f64, source_delta: f64) {
        match key {
            FunctionKey::F1 => {
                let v = self.target_lut.min_display() + target_delta;
                self.target_lut.set_min_display(v);
            }
            FunctionKey::F2 => {
                let v = self.target_lut.min_display() - target_delta;
                self.target_lut.set_min_display(v);
            }
            FunctionKey::F3 => {
                let v = self.target_lut.max_display() + target_delta;
                self.target_lut.set_max_display(v);
            }
            FunctionKey::F4 => {
                let v = self.target_lut.max_display() - target_delta;
                self.target_lut.set_max_display(v);
            }
            FunctionKey::F5 => {
                let v = self.source_lut.min_display() + source_delta;
                self.source_lut.set_min_display(v);
            }
            FunctionKey::F6 => {
                let v = self.source_lut.min_display() - source_delta;
                self.source_lut.set_min_display(v);
            }
            FunctionKey::F7 => {
                let v = self.source_lut.max_display() + source_delta;
                self.source_lut.set_max_display(v);
            }
            FunctionKey::F8 => {
                let v = self.source_lut.max_display() - source_delta;
                self.source_lut.set_max_display(v);
            }
            FunctionKey::F9 => self.display_target_contour = !self.display_target_contour,
            FunctionKey::F10 => self.display_source_contour = !self.display_source_contour,
            FunctionKey::F11 | FunctionKey::F12 => {}
        }
        self.update();
    }

    fn step_origin(&mut self, axis: usize, delta: i64) {
        if self.target.is_empty() {
            return;
        }
        let dims = [self.target.x(), self.target.y(), self.target.z()];
        let mut g = self.target.world_to_image(self.origin);
        g[axis] = (g[axis] + delta as f64).clamp(0.0, dims[axis].saturating_sub(1) as f64);
        self.origin = self.target.image_to_world(g);
        self.propagate_origin();
    }

    fn cycle_target_frame(&mut self, delta: i64) {
        let frames = self.target.t().max(1) as i64;
        let next = (self.target_frame as i64 + delta).rem_euclid(frames);
        self.set_target_frame(next as usize);
    }

    // ------------------------------------------------------------------
    // Configuration persistence
    // ------------------------------------------------------------------

    /// Serialize the persisted state in the flat `key = value` format.
    pub fn write_config_string(&self) -> String {
        let mut out = String::new();
        out.push_str("\n#\n# Viewer configuration\n#\n\n");
        out.push_str(&config::line("configMode", self.config_mode.token()));
        out.push_str(&config::line("screenX", self.screen.0));
        out.push_str(&config::line("screenY", self.screen.1));
        out.push_str(&config::line("origin_x", self.origin.x));
        out.push_str(&config::line("origin_y", self.origin.y));
        out.push_str(&config::line("origin_z", self.origin.z));
        out.push_str(&config::line("resolution", self.resolution));
        out.push_str(&config::line(
            "targetInterpolationMode",
            self.target_interpolation.token(),
        ));
        out.push_str(&config::line(
            "sourceInterpolationMode",
            self.source_interpolation.token(),
        ));

        out.push_str("\n#\n# Display configuration\n#\n\n");
        out.push_str(&config::line("viewMode", self.view_mode.token()));
        out.push_str(&config::line("viewMix", self.view_mix));
        out.push_str(&config::line(
            "DisplayTargetContour",
            config::flag(self.display_target_contour),
        ));
        out.push_str(&config::line(
            "DisplaySourceContour",
            config::flag(self.display_source_contour),
        ));
        out.push_str(&config::line(
            "DisplayCursor",
            config::flag(self.display_cursor),
        ));
        out.push_str(&config::line("CursorMode", self.cursor_mode.token()));
        out.push_str(&config::line(
            "DisplayDeformationGrid",
            config::flag(self.display_deformation_grid),
        ));
        out.push_str(&config::line(
            "DisplayDeformationPoints",
            config::flag(self.display_deformation_points),
        ));
        out.push_str(&config::line(
            "DisplayDeformationArrows",
            config::flag(self.display_deformation_arrows),
        ));
        out.push_str(&config::line(
            "DisplayLandmarks",
            config::flag(self.display_landmarks),
        ));
        out.push_str(&config::line(
            "DisplayObject",
            config::flag(self.display_object),
        ));
        out.push_str(&config::line(
            "DisplayObjectWarp",
            config::flag(self.display_object_warp),
        ));
        out.push_str(&config::line(
            "DisplayObjectGrid",
            config::flag(self.display_object_grid),
        ));

        out.push_str("\n#\n# LookupTables\n#\n\n");
        for (prefix, lut) in [
            ("targetLookupTable", &self.target_lut),
            ("sourceLookupTable", &self.source_lut),
            ("subtractionLookupTable", &self.subtraction_lut),
        ] {
            out.push_str(&config::line(
                &format!("{prefix}_minDisplay"),
                lut.min_display(),
            ));
            out.push_str(&config::line(
                &format!("{prefix}_maxDisplay"),
                lut.max_display(),
            ));
            out.push_str(&config::line(
                &format!("{prefix}_mode"),
                lut.color_mode().token(),
            ));
        }
        out
    }

    /// Apply configuration text. Malformed lines and unknown
    /// interpolation tokens are fatal and leave the viewer unchanged;
    /// unrecognized keys are ignored.
    pub fn read_config_string(&mut self, text: &str) -> Result<()> {
        let entries = config::parse(text)?;

        // Validate the fatal tokens up front so a bad file cannot leave
        // the viewer half-updated.
        for (key, value) in &entries {
            if matches!(
                key.as_str(),
                "targetInterpolationMode" | "sourceInterpolationMode"
            ) && InterpolationMode::from_token(value).is_none()
            {
                return Err(ViewerError::UnknownInterpolation(value.clone()));
            }
        }

        for (key, value) in &entries {
            self.apply_config_entry(key, value);
        }

        // Configure last so every parsed parameter takes effect.
        self.configure(self.config_mode);
        Ok(())
    }

    fn apply_config_entry(&mut self, key: &str, value: &str) {
        let parse_f64 = |v: &str| v.parse::<f64>().ok();
        match key {
            "configMode" => {
                if let Some(preset) = LayoutPreset::from_token(value) {
                    self.config_mode = preset;
                }
            }
            "screenX" => {
                if let Ok(v) = value.parse::<u32>() {
                    self.screen.0 = v;
                }
            }
            "screenY" => {
                if let Ok(v) = value.parse::<u32>() {
                    self.screen.1 = v;
                }
            }
            "origin_x" => {
                if let Some(v) = parse_f64(value) {
                    self.origin.x = v;
                }
            }
            "origin_y" => {
                if let Some(v) = parse_f64(value) {
                    self.origin.y = v;
                }
            }
            "origin_z" => {
                if let Some(v) = parse_f64(value) {
                    self.origin.z = v;
                }
            }
            "resolution" => {
                if let Some(v) = parse_f64(value) {
                    if v > 0.0 {
                        self.resolution = v;
                    }
                }
            }
            "targetInterpolationMode" => {
                if let Some(mode) = InterpolationMode::from_token(value) {
                    self.target_interpolation = mode;
                }
            }
            "sourceInterpolationMode" => {
                if let Some(mode) = InterpolationMode::from_token(value) {
                    self.source_interpolation = mode;
                }
            }
            "viewMode" => {
                if let Some(mode) = ViewMode::from_token(value) {
                    self.view_mode = mode;
                }
            }
            "viewMix" => {
                if let Some(v) = parse_f64(value) {
                    self.view_mix = v.clamp(0.0, 1.0);
                }
            }
            "DisplayTargetContour" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_target_contour = v;
                }
            }
            "DisplaySourceContour" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_source_contour = v;
                }
            }
            "DisplayCursor" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_cursor = v;
                }
            }
            "CursorMode" => {
                if let Some(mode) = CursorMode::from_token(value) {
                    self.cursor_mode = mode;
                }
            }
            "DisplayDeformationGrid" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_deformation_grid = v;
                }
            }
            "DisplayDeformationPoints" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_deformation_points = v;
                }
            }
            "DisplayDeformationArrows" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_deformation_arrows = v;
                }
            }
            "DisplayLandmarks" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_landmarks = v;
                }
            }
            "DisplayObject" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_object = v;
                }
            }
            "DisplayObjectWarp" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_object_warp = v;
                }
            }
            "DisplayObjectGrid" => {
                if let Some(v) = config::parse_flag(value) {
                    self.display_object_grid = v;
                }
            }
            _ => {
                if let Some(rest) = key.strip_prefix("targetLookupTable_") {
                    Self::apply_lut_entry(&mut self.target_lut, rest, value);
                } else if let Some(rest) = key.strip_prefix("sourceLookupTable_") {
                    Self::apply_lut_entry(&mut self.source_lut, rest, value);
                } else if let Some(rest) = key.strip_prefix("subtractionLookupTable_") {
                    Self::apply_lut_entry(&mut self.subtraction_lut, rest, value);
                } else {
                    debug!(key, "ignoring unrecognized configuration key");
                }
            }
        }
    }

    fn apply_lut_entry(lut: &mut LookupTable, field: &str, value: &str) {
        match field {
            "minDisplay" => {
                if let Ok(v) = value.parse::<f64>() {
                    lut.set_min_display(v);
                }
            }
            "maxDisplay" => {
                if let Ok(v) = value.parse::<f64>() {
                    lut.set_max_display(v);
                }
            }
            "mode" => {
                if let Some(mode) = ColorMode::from_token(value) {
                    lut.set_color_mode(mode);
                }
            }
            _ => debug!(field, "ignoring unrecognized lookup table key"),
        }
    }

    /// Read configuration from a file.
    pub fn read_config(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let text = std::fs::read_to_string(path.as_ref())?;
        self.read_config_string(&text)
    }

    /// Write configuration to a file.
    pub fn write_config(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.write_config_string())?;
        Ok(())
    }
}
