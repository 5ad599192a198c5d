//! # regview
//!
//! Rendering and compositing core for an interactive medical-image
//! registration viewer.
//!
//! Two co-registered scalar volumes — a fixed *target* and a movable
//! *source* under an adjustable geometric transform — are resampled
//! into one or more 2-D viewports and blended into displayable color
//! buffers under a selectable view mode (shutters, subtraction,
//! checkerboard, alpha-over). On top of that sit a segmentation overlay
//! driven by a label volume, an interactive voxel annotation editor
//! with undo and region growing, a world-space ROI editor, and flat
//! `key = value` configuration persistence.
//!
//! Window/context creation, the widget toolkit, text and vector overlay
//! drawing, and volume/transform/point-set file codecs are external:
//! the core consumes decoded [`Volume`] and [`Transform`] values and
//! hands back finished pixel buffers plus an overlay plan per viewport.
//!
//! # Examples
//!
//! Resample and composite a volume into the default three-plane layout:
//!
//! ```no_run
//! # use regview::{Viewer, Volume, ViewMode};
//! let mut viewer = Viewer::new(768, 256);
//! # let volume = Volume::default();
//! viewer.set_target(volume);
//! viewer.set_view_mode(ViewMode::Target);
//! viewer.update();
//! for pane in viewer.panes() {
//!     let pixels = pane.drawable_bytes();
//!     // hand the pixels to the presenter
//! #   let _ = pixels;
//! }
//! ```

pub mod compositor;
pub mod config;
pub mod contour;
pub mod displacement_cache;
pub mod enums;
pub mod error;
pub mod interpolate;
pub mod lookup_table;
pub mod orientation;
pub mod resample;
pub mod roi;
pub mod segment_table;
pub mod transform;
pub mod viewer;
pub mod viewport;
pub mod volume;

pub use enums::{
    ColorMode, ContourMode, CursorMode, DisplayConvention, InterpolationMode, LayoutPreset,
    OrientationCode, RasterRole, RegionGrowingMode, ScalarKind, ViewMode, ViewPlane,
};
pub use error::{Result, ViewerError};
pub use lookup_table::{Color, LookupTable};
pub use roi::{Roi, RoiCorner};
pub use segment_table::{Segment, SegmentTable};
pub use transform::{AffineTransform, FreeFormTransform, MultiLevelTransform, RigidTransform, Transform};
pub use viewer::{FunctionKey, KeyResponse, OverlayPlan, Pane, ProbeInfo, Viewer};
pub use volume::{Volume, VolumeGeometry};
