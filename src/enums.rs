//! Closed enumerations shared across the viewer core.
//!
//! The enums that appear in the configuration file carry their exact
//! on-disk token so reading back a written configuration reproduces the
//! value (see [`crate::config`]).

/// How target and source rasters are blended into the displayed image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Only the target image.
    #[default]
    Target,
    /// Only the source image.
    Source,
    /// Target left of the shutter, source right of it.
    VerticalShutter,
    /// Target below the shutter, source above it.
    HorizontalShutter,
    /// Subtraction of source from target through the subtraction table.
    Subtraction,
    /// Per-channel blend weighted by the view mix.
    Checkerboard,
    /// Target composited over source using the target color's alpha.
    TargetOverSource,
    /// Source composited over target using the source color's alpha.
    SourceOverTarget,
}

impl ViewMode {
    pub fn token(self) -> &'static str {
        match self {
            ViewMode::Target => "View_A",
            ViewMode::Source => "View_B",
            ViewMode::VerticalShutter => "View_VShutter",
            ViewMode::HorizontalShutter => "View_HShutter",
            ViewMode::Subtraction => "View_Subtraction",
            ViewMode::Checkerboard => "View_Checkerboard",
            ViewMode::TargetOverSource => "View_AoverB",
            ViewMode::SourceOverTarget => "View_BoverA",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "View_A" => Some(ViewMode::Target),
            "View_B" => Some(ViewMode::Source),
            "View_VShutter" => Some(ViewMode::VerticalShutter),
            "View_HShutter" => Some(ViewMode::HorizontalShutter),
            "View_Subtraction" => Some(ViewMode::Subtraction),
            "View_Checkerboard" => Some(ViewMode::Checkerboard),
            "View_AoverB" => Some(ViewMode::TargetOverSource),
            "View_BoverA" => Some(ViewMode::SourceOverTarget),
            _ => None,
        }
    }
}

/// Color ramp applied by a [`crate::lookup_table::LookupTable`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Red,
    Green,
    Blue,
    #[default]
    Luminance,
    Rainbow,
}

impl ColorMode {
    pub fn token(self) -> &'static str {
        match self {
            ColorMode::Red => "ColorMode_Red",
            ColorMode::Green => "ColorMode_Green",
            ColorMode::Blue => "ColorMode_Blue",
            ColorMode::Luminance => "ColorMode_Luminance",
            ColorMode::Rainbow => "ColorMode_Rainbow",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ColorMode_Red" => Some(ColorMode::Red),
            "ColorMode_Green" => Some(ColorMode::Green),
            "ColorMode_Blue" => Some(ColorMode::Blue),
            "ColorMode_Luminance" => Some(ColorMode::Luminance),
            "ColorMode_Rainbow" => Some(ColorMode::Rainbow),
            _ => None,
        }
    }
}

/// Shape of the cursor drawn at the display origin.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    #[default]
    CrossHair,
    CursorX,
    CursorV,
    CursorBar,
}

impl CursorMode {
    pub fn token(self) -> &'static str {
        match self {
            CursorMode::CrossHair => "CrossHair",
            CursorMode::CursorX => "CursorX",
            CursorMode::CursorV => "CursorV",
            CursorMode::CursorBar => "CursorBar",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "CrossHair" => Some(CursorMode::CrossHair),
            "CursorX" => Some(CursorMode::CursorX),
            "CursorV" => Some(CursorMode::CursorV),
            "CursorBar" => Some(CursorMode::CursorBar),
            _ => None,
        }
    }
}

/// Radiological/neurological display convention for the resolved axes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DisplayConvention {
    /// Volume axes used as stored.
    Native,
    #[default]
    Neurological,
    Radiological,
}

/// Interpolation kernel used when sampling a volume off-grid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    #[default]
    NearestNeighbor,
    Linear,
    CubicSpline,
    BSpline,
    Sinc,
}

impl InterpolationMode {
    pub fn token(self) -> &'static str {
        match self {
            InterpolationMode::NearestNeighbor => "Interpolation_NN",
            InterpolationMode::Linear => "Interpolation_Linear",
            InterpolationMode::CubicSpline => "Interpolation_C1Spline",
            InterpolationMode::BSpline => "Interpolation_BSpline",
            InterpolationMode::Sinc => "Interpolation_Sinc",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Interpolation_NN" => Some(InterpolationMode::NearestNeighbor),
            "Interpolation_Linear" => Some(InterpolationMode::Linear),
            "Interpolation_C1Spline" => Some(InterpolationMode::CubicSpline),
            "Interpolation_BSpline" => Some(InterpolationMode::BSpline),
            "Interpolation_Sinc" => Some(InterpolationMode::Sinc),
            _ => None,
        }
    }
}

/// Connectivity domain for region growing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RegionGrowingMode {
    /// Grow within the slice of the bound viewport only.
    #[default]
    Slice,
    /// Grow through the full volume.
    Volume,
}

/// Phase of an interactive contour stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourMode {
    FirstPoint,
    NewPoint,
    LastPoint,
}

/// Orthogonal display plane shown by one viewport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ViewPlane {
    #[default]
    Xy,
    Xz,
    Yz,
}

/// Viewport layout presets selectable via `configMode`.
///
/// The `Ab` presets pair a target and a source viewport showing the same
/// plane; `V` presets split left/right, `H` presets top/bottom.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPreset {
    Xy,
    Xz,
    Yz,
    XyXzV,
    XyYzV,
    XzYzV,
    XyXzH,
    XyYzH,
    XzYzH,
    #[default]
    XyXzYz,
    AbXyV,
    AbXzV,
    AbYzV,
    AbXyXzV,
}

impl LayoutPreset {
    pub fn token(self) -> &'static str {
        match self {
            LayoutPreset::Xy => "View_XY",
            LayoutPreset::Xz => "View_XZ",
            LayoutPreset::Yz => "View_YZ",
            LayoutPreset::XyXzV => "View_XY_XZ_v",
            LayoutPreset::XyYzV => "View_XY_YZ_v",
            LayoutPreset::XzYzV => "View_XZ_YZ_v",
            LayoutPreset::XyXzH => "View_XY_XZ_h",
            LayoutPreset::XyYzH => "View_XY_YZ_h",
            LayoutPreset::XzYzH => "View_XZ_YZ_h",
            LayoutPreset::XyXzYz => "View_XY_XZ_YZ",
            LayoutPreset::AbXyV => "View_AB_XY_v",
            LayoutPreset::AbXzV => "View_AB_XZ_v",
            LayoutPreset::AbYzV => "View_AB_YZ_v",
            LayoutPreset::AbXyXzV => "View_AB_XY_XZ_v",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "View_XY" => Some(LayoutPreset::Xy),
            "View_XZ" => Some(LayoutPreset::Xz),
            "View_YZ" => Some(LayoutPreset::Yz),
            "View_XY_XZ_v" => Some(LayoutPreset::XyXzV),
            "View_XY_YZ_v" => Some(LayoutPreset::XyYzV),
            "View_XZ_YZ_v" => Some(LayoutPreset::XzYzV),
            "View_XY_XZ_h" => Some(LayoutPreset::XyXzH),
            "View_XY_YZ_h" => Some(LayoutPreset::XyYzH),
            "View_XZ_YZ_h" => Some(LayoutPreset::XzYzH),
            "View_XY_XZ_YZ" => Some(LayoutPreset::XyXzYz),
            // Horizontal AB splits collapse onto the vertical presets.
            "View_AB_XY_v" | "View_AB_XY_h" => Some(LayoutPreset::AbXyV),
            "View_AB_XZ_v" | "View_AB_XZ_h" => Some(LayoutPreset::AbXzV),
            "View_AB_YZ_v" | "View_AB_YZ_h" => Some(LayoutPreset::AbYzV),
            "View_AB_XY_XZ_v" | "View_AB_XY_XZ_h" => Some(LayoutPreset::AbXyXzV),
            _ => None,
        }
    }
}

/// Anatomical direction a volume axis runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationCode {
    L2R,
    R2L,
    P2A,
    A2P,
    I2S,
    S2I,
}

/// Scalar storage kind declared at the I/O boundary.
///
/// Pixel data is held internally as `f64`; the kind records what a codec
/// decoded or what a writer should encode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Char,
    UChar,
    #[default]
    Short,
    UShort,
    Float,
    Double,
}

impl ScalarKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "char" => Some(ScalarKind::Char),
            "uchar" => Some(ScalarKind::UChar),
            "short" => Some(ScalarKind::Short),
            "ushort" => Some(ScalarKind::UShort),
            "float" => Some(ScalarKind::Float),
            "double" => Some(ScalarKind::Double),
            _ => None,
        }
    }
}

/// Resampled raster roles tracked by one dirty flag each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterRole {
    Target,
    Source,
    Segmentation,
    Selection,
}
