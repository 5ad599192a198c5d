use regview::{
    ColorMode, CursorMode, InterpolationMode, LayoutPreset, ViewMode, Viewer, ViewerError,
};

fn customized_viewer() -> Viewer {
    let mut viewer = Viewer::new(640, 480);
    viewer.configure(LayoutPreset::AbXyV);
    viewer.set_view_mode(ViewMode::Checkerboard);
    viewer.set_view_mix(0.25);
    viewer.set_target_interpolation(InterpolationMode::BSpline);
    viewer.set_source_interpolation(InterpolationMode::Linear);
    viewer.set_display_cursor(false);
    viewer.set_cursor_mode(CursorMode::CursorBar);
    viewer.target_lut_mut().set_min_display(1500.0);
    viewer.target_lut_mut().set_max_display(8500.0);
    viewer.target_lut_mut().set_color_mode(ColorMode::Rainbow);
    viewer.source_lut_mut().set_color_mode(ColorMode::Red);
    viewer.source_lut_mut().set_max_display(6000.0);
    viewer.subtraction_lut_mut().set_min_display(-4000.0);
    viewer.subtraction_lut_mut().set_color_mode(ColorMode::Blue);
    viewer
}

#[test]
fn write_then_read_reproduces_the_configuration() {
    let original = customized_viewer();
    let written = original.write_config_string();

    let mut restored = Viewer::new(100, 100);
    restored.read_config_string(&written).unwrap();

    assert_eq!(restored.view_mode(), ViewMode::Checkerboard);
    assert_eq!(restored.view_mix(), 0.25);
    assert_eq!(
        restored.target_interpolation(),
        InterpolationMode::BSpline
    );
    assert_eq!(restored.source_interpolation(), InterpolationMode::Linear);
    assert_eq!(restored.target_lut().min_display(), 1500.0);
    assert_eq!(restored.target_lut().max_display(), 8500.0);
    assert_eq!(restored.target_lut().color_mode(), ColorMode::Rainbow);
    assert_eq!(restored.source_lut().color_mode(), ColorMode::Red);
    assert_eq!(restored.source_lut().max_display(), 6000.0);
    assert_eq!(restored.subtraction_lut().min_display(), -4000.0);
    assert_eq!(restored.subtraction_lut().color_mode(), ColorMode::Blue);
    // Two panes of the same plane, second one source-primary.
    assert_eq!(restored.panes().len(), 2);
    assert!(!restored.panes()[0].is_source);
    assert!(restored.panes()[1].is_source);

    // The rewritten text is byte-identical.
    assert_eq!(restored.write_config_string(), written);
}

#[test]
fn round_trip_through_a_file() {
    let original = customized_viewer();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viewer.cfg");
    original.write_config(&path).unwrap();

    let mut restored = Viewer::new(100, 100);
    restored.read_config(&path).unwrap();
    assert_eq!(restored.write_config_string(), original.write_config_string());
}

#[test]
fn unrecognized_keys_are_ignored() {
    let mut viewer = Viewer::new(100, 100);
    viewer
        .read_config_string("someFutureKey = 42\nviewMix = 0.75\n")
        .unwrap();
    assert_eq!(viewer.view_mix(), 0.75);
}

#[test]
fn line_without_equals_is_fatal() {
    let mut viewer = Viewer::new(100, 100);
    let err = viewer
        .read_config_string("viewMix = 0.75\nbroken line\n")
        .unwrap_err();
    assert!(matches!(err, ViewerError::ConfigSyntax { line: 2, .. }));
}

#[test]
fn unknown_interpolation_token_aborts_without_side_effects() {
    let mut viewer = Viewer::new(100, 100);
    let before = viewer.write_config_string();
    let err = viewer
        .read_config_string("viewMix = 0.9\ntargetInterpolationMode = Interpolation_Quintic\n")
        .unwrap_err();
    assert!(matches!(err, ViewerError::UnknownInterpolation(_)));
    // The earlier viewMix line must not have been applied either.
    assert_eq!(viewer.write_config_string(), before);
}

#[test]
fn comments_blank_lines_and_cr_are_tolerated() {
    let mut viewer = Viewer::new(100, 100);
    viewer
        .read_config_string("# header\r\n\r\nviewMode = View_B\r\n")
        .unwrap();
    assert_eq!(viewer.view_mode(), ViewMode::Source);
}
