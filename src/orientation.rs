//! Display-axis resolution from volume orientation.
//!
//! Each physical axis of the target volume carries an anatomical
//! direction code; the display convention decides which display slot
//! (left-right, posterior-anterior, inferior-superior) that axis feeds
//! and whether its direction vector is negated. Requested per-display-
//! axis flips are applied last.

use crate::enums::{DisplayConvention, OrientationCode};

use nalgebra::Vector3;
use tracing::warn;

/// Resolve the display x/y/z direction vectors.
///
/// `current` seeds the result; a physical axis without a resolvable code
/// leaves its display slot unchanged (and is reported).
pub fn resolve_display_axes(
    current: [Vector3<f64>; 3],
    volume_axes: [Vector3<f64>; 3],
    codes: [Option<OrientationCode>; 3],
    convention: DisplayConvention,
    flips: [bool; 3],
) -> [Vector3<f64>; 3] {
    let mut display = current;

    match convention {
        DisplayConvention::Native => {
            display = volume_axes;
        }
        DisplayConvention::Neurological | DisplayConvention::Radiological => {
            let neurological = convention == DisplayConvention::Neurological;
            for (axis_index, (&axis, &code)) in volume_axes.iter().zip(codes.iter()).enumerate() {
                let Some(code) = code else {
                    warn!(axis = axis_index, "cannot resolve axis orientation");
                    continue;
                };
                // Display slot and sign per code. The left-right slot is
                // where the two conventions disagree.
                let (slot, negate) = match code {
                    OrientationCode::L2R => (0, neurological),
                    OrientationCode::R2L => (0, !neurological),
                    OrientationCode::P2A => (1, false),
                    OrientationCode::A2P => (1, true),
                    OrientationCode::I2S => (2, false),
                    OrientationCode::S2I => (2, true),
                };
                display[slot] = if negate { -axis } else { axis };
            }
        }
    }

    for (slot, &flip) in flips.iter().enumerate() {
        if flip {
            display[slot] = -display[slot];
        }
    }

    display
}
