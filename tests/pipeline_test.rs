use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use regview::{
    AffineTransform, DisplayConvention, FreeFormTransform, LayoutPreset, ScalarKind, Transform,
    Viewer, Volume, VolumeGeometry,
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
    let mut viewer = Viewer::new(32, 32);
    viewer.set_display_convention(DisplayConvention::Native);
    viewer.configure(LayoutPreset::Xy);
    viewer.set_target(gradient_volume(16));
    viewer
}

fn source_raster(viewer: &Viewer) -> Vec<f64> {
    viewer.panes()[0]
        .source_out
        .plane_view()
        .iter()
        .copied()
        .collect()
}

fn translation(tx: f64) -> Transform {
    let mut a = AffineTransform::identity();
    a.put(0, tx);
    Transform::Affine(a)
}

#[test]
fn missing_source_leaves_the_raster_at_padding() {
    let mut v = viewer();
    v.update();
    assert!(source_raster(&v).iter().all(|&s| s == -1.0));
}

#[test]
fn samples_are_rescaled_to_the_display_domain() {
    let mut v = viewer();
    v.update();
    let raster = v.panes()[0].target_out.plane_view().to_owned();
    // Gradient range is 0..45; the raster must stay in the normalized
    // display domain (padding aside).
    for &s in raster.iter() {
        assert!(s == -1.0 || (0.0..=10000.0).contains(&s));
    }
    // Center pixel (16,16) sits half a voxel off the volume center and
    // rounds to voxel (9,9,8) under nearest-neighbor interpolation.
    let center = raster[[16, 16]];
    assert_relative_eq!(center, 26.0 * 10000.0 / 45.0, epsilon = 1e-9);
}

#[test]
fn apply_flag_off_bypasses_the_transform() {
    let mut v = viewer();
    v.set_source(gradient_volume(16));
    v.update();
    let identity_raster = source_raster(&v);

    v.set_source_transform(translation(3.0));
    v.update();
    let transformed = source_raster(&v);
    assert_ne!(identity_raster, transformed);

    v.set_source_transform_apply(false);
    v.update();
    assert_eq!(source_raster(&v), identity_raster);
}

#[test]
fn inverting_a_translation_matches_its_opposite() {
    let mut a = viewer();
    a.set_source(gradient_volume(16));
    a.set_source_transform(translation(2.0));
    a.set_source_transform_invert(true);
    a.update();

    let mut b = viewer();
    b.set_source(gradient_volume(16));
    b.set_source_transform(translation(-2.0));
    b.update();

    let ra = source_raster(&a);
    let rb = source_raster(&b);
    for (x, y) in ra.iter().zip(&rb) {
        assert_relative_eq!(x, y, epsilon = 1e-6);
    }
}

fn small_ffd(extent: f64) -> Transform {
    let lattice = VolumeGeometry::new(
        (4, 4, 4, 1),
        Point3::origin(),
        Vector3::new(extent, extent, extent),
    );
    let mut ffd = FreeFormTransform::new(lattice);
    for i in 0..ffd.parameter_count() {
        if i % 3 == 0 {
            ffd.put(i, 0.75);
        }
    }
    Transform::FreeForm(ffd)
}

#[test]
fn cached_deformable_resampling_is_deterministic() {
    let mut v = viewer();
    v.set_source(gradient_volume(16));
    v.set_source_transform(small_ffd(8.0));
    v.update();
    let first = source_raster(&v);

    // The cache is unmodified now; a second pass must reproduce the
    // raster exactly.
    v.update();
    assert_eq!(source_raster(&v), first);
}

#[test]
fn transform_parameter_writes_invalidate_the_cache() {
    let mut v = viewer();
    v.set_source(gradient_volume(16));
    v.set_source_transform(small_ffd(8.0));
    v.update();
    let before = source_raster(&v);

    v.put_transform_parameter(0, 5.0);
    v.update();
    assert_ne!(source_raster(&v), before);
}

#[test]
fn resampled_source_export_covers_the_target_grid() {
    let mut v = viewer();
    v.set_source(gradient_volume(16));
    v.set_source_transform(translation(1.0));
    let exported = v.resampled_source();
    assert_eq!(
        (exported.x(), exported.y(), exported.z()),
        (16, 16, 16)
    );
    // Voxel (8,8,8) samples the source at x+1.
    assert_relative_eq!(exported.get(8, 8, 8, 0), 25.0, epsilon = 1e-9);
}

#[test]
fn subtraction_of_identical_volumes_is_uniform() {
    let mut v = viewer();
    v.set_source(gradient_volume(16));
    v.update();
    let target: Vec<f64> = v.panes()[0]
        .target_out
        .plane_view()
        .iter()
        .copied()
        .collect();
    let source = source_raster(&v);
    for (t, s) in target.iter().zip(&source) {
        if *t >= 0.0 && *s >= 0.0 {
            assert_relative_eq!(t, s, epsilon = 1e-6);
        }
    }
}
