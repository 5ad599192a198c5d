use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use regview::viewer::FunctionKey;
use regview::{
    DisplayConvention, KeyResponse, LayoutPreset, ScalarKind, ViewMode, ViewPlane, Viewer, Volume,
    VolumeGeometry,
};

fn gradient_volume(n: usize) -> Volume {
    let geometry = VolumeGeometry::new(
        (n, n, n, 1),
        Point3::origin(),
        Vector3::new(1.0, 1.0, 1.0),
    );
    let mut v = Volume::allocate(geometry, ScalarKind::Short);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                v.put(x, y, z, 0, (x + y + z) as f64);
            }
        }
    }
    v
}

fn viewer() -> Viewer {
    let mut viewer = Viewer::new(64, 64);
    viewer.set_display_convention(DisplayConvention::Native);
    viewer.configure(LayoutPreset::Xy);
    viewer.set_target(gradient_volume(16));
    viewer
}

#[test]
fn layout_presets_build_the_expected_panes() {
    let mut v = Viewer::new(300, 100);
    v.configure(LayoutPreset::XyXzYz);
    let planes: Vec<ViewPlane> = v.panes().iter().map(|p| p.viewport.plane()).collect();
    assert_eq!(planes, vec![ViewPlane::Xy, ViewPlane::Xz, ViewPlane::Yz]);
    assert!(v.panes().iter().all(|p| !p.is_source));

    v.configure(LayoutPreset::AbXyXzV);
    let sources: Vec<bool> = v.panes().iter().map(|p| p.is_source).collect();
    assert_eq!(sources, vec![false, true, false, true]);
}

#[test]
fn pane_rasters_match_viewport_pixel_dims() {
    let mut v = Viewer::new(300, 100);
    v.configure(LayoutPreset::XyXzYz);
    for pane in v.panes() {
        assert_eq!(pane.target_out.x(), pane.viewport.width());
        assert_eq!(pane.target_out.y(), pane.viewport.height());
        assert_eq!(pane.drawable().len(), pane.viewport.width() * pane.viewport.height());
    }
}

#[test]
fn origin_clicks_snap_to_the_voxel_grid() {
    let mut v = viewer();
    v.set_origin_screen(20, 27);
    let g = v.target().world_to_image(v.origin());
    assert_relative_eq!(g.x, g.x.round(), epsilon = 1e-9);
    assert_relative_eq!(g.y, g.y.round(), epsilon = 1e-9);
    assert_relative_eq!(g.z, g.z.round(), epsilon = 1e-9);
}

#[test]
fn mouse_wheel_steps_one_slice() {
    let mut v = viewer();
    let before = v.target().world_to_image(v.origin());
    v.mouse_wheel(32, 32, 1);
    let after = v.target().world_to_image(v.origin());
    // The XY pane pages along the display z axis, which in native
    // orientation is the volume z axis.
    assert_relative_eq!(after.z - before.z, 1.0, epsilon = 1e-9);
    assert_relative_eq!(after.x, before.x, epsilon = 1e-9);
}

#[test]
fn keyboard_shortcuts_dispatch() {
    let mut v = viewer();
    assert_eq!(v.key_pressed('m'), KeyResponse::Handled);
    assert_eq!(v.view_mode(), ViewMode::Checkerboard);

    assert_eq!(v.key_pressed('q'), KeyResponse::Quit);
    assert_eq!(v.key_pressed('\u{7}'), KeyResponse::Ignored);

    let before = v.resolution();
    v.key_pressed('>');
    assert_relative_eq!(v.resolution(), before * 2.0, epsilon = 1e-12);
}

#[test]
fn function_keys_nudge_the_display_window() {
    let mut v = viewer();
    let before = v.target_lut().min_display();
    v.special_key(FunctionKey::F1, 100.0, 10.0);
    assert_relative_eq!(v.target_lut().min_display(), before + 100.0, epsilon = 1e-9);
    v.special_key(FunctionKey::F2, 100.0, 10.0);
    assert_relative_eq!(v.target_lut().min_display(), before, epsilon = 1e-9);

    assert!(!v.overlay_plan(0).target_contour);
    v.special_key(FunctionKey::F9, 0.0, 0.0);
    assert!(v.overlay_plan(0).target_contour);
}

#[test]
fn probe_reports_the_intensity_under_the_pointer() {
    let mut v = viewer();
    v.update();
    let probe = v.probe(32, 32).unwrap();
    let (x, y, z) = probe.voxel;
    assert_eq!(
        probe.target_intensity,
        v.target().get(x, y, z, 0)
    );
    assert!(probe.source_intensity.is_none());
    assert!(probe.label.is_none());
}

#[test]
fn overlay_plan_splits_roles_on_shared_planes() {
    let mut v = Viewer::new(64, 64);
    v.configure(LayoutPreset::AbXyV);
    let first = v.overlay_plan(0);
    let second = v.overlay_plan(1);
    assert!(first.target_landmarks && !first.source_landmarks);
    assert!(!second.target_landmarks && second.source_landmarks);
    // The correspondence display stays forced off.
    assert!(!first.correspondences && !second.correspondences);
}

#[test]
fn offscreen_render_covers_the_screen() {
    let mut v = viewer();
    let image = v.render_offscreen();
    assert_eq!(image.dimensions(), (64, 64));
    assert!(image.pixels().any(|p| p.0 != [0, 0, 0]));
}

#[test]
fn capture_writes_an_image_file() {
    let mut v = viewer();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    v.capture(&path).unwrap();
    let reloaded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(reloaded.dimensions(), (64, 64));
}

#[test]
fn fit_landmarks_reports_the_mean_residual() {
    let mut v = viewer();
    v.set_target_landmarks(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
    ]);
    v.set_source_landmarks(vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(5.0, 0.0, 0.0),
    ]);
    let error = v.fit_landmarks();
    assert_relative_eq!(error, 2.0, epsilon = 1e-12);
    // The fitted parameters land in the source transform.
    for i in 0..6 {
        assert_eq!(v.source_transform().get(i), 0.0);
    }
}

#[test]
fn unpaired_landmark_sets_fit_to_zero() {
    let mut v = viewer();
    v.set_target_landmarks(vec![Point3::origin()]);
    v.set_source_landmarks(vec![]);
    assert_eq!(v.fit_landmarks(), 0.0);
}

#[test]
fn transform_summary_names_the_type() {
    let v = viewer();
    assert_eq!(
        v.transform_summary(),
        vec!["Affine transformation (12 DOF)".to_string()]
    );
}
