//! End-to-end tracer behaviour: failures, mirrors, bundles and backends.

use approx::assert_abs_diff_eq;
use lensray_compute::{CpuBackend, SerialBackend};
use lensray_core::system::{ElementId, MediumId, SurfaceBuilder};
use lensray_core::trace::{Distribution, FieldPoint, RayBundleSpec, TraceResults};
use lensray_core::{
    trace_bundle, trace_ray, LightRay, OpticalSystem, Prescription, SurfaceSpec, SystemBuilder,
    TraceError,
};
use lensray_geometry::{Curve, Shape, Transform3, Vec3};

fn singlet() -> OpticalSystem {
    Prescription::new(vec![
        SurfaceSpec::spherical(50.0, 5.0)
            .with_material("N-BK7")
            .with_semi_diameter(8.0),
        SurfaceSpec::spherical(-50.0, 48.0).with_semi_diameter(8.0),
        SurfaceSpec::image(),
    ])
    .build()
    .unwrap()
}

fn bundle(pupil_radius: f64) -> RayBundleSpec {
    RayBundleSpec {
        field: FieldPoint::on_axis(),
        wavelengths: vec![486.13, 587.56, 656.27],
        distribution: Distribution::Hexapolar { rings: 4 },
        pupil_radius,
        aim: [0.0, 0.0],
    }
}

#[test]
fn test_trace_is_deterministic() {
    let system = singlet();
    let ray = LightRay::new(Vec3::new(0.3, -2.0, -10.0), Vec3::new(0.01, 0.02, 1.0), 550.0);
    let a = trace_ray(&system, &ray).unwrap();
    let b = trace_ray(&system, &ray).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_backends_agree() {
    let system = singlet();
    let spec = bundle(6.0);
    let serial = trace_bundle(&system, &spec, &SerialBackend);
    let parallel = trace_bundle(&system, &spec, &CpuBackend::with_threads(3).unwrap());
    assert_eq!(serial.len(), 3 * 61);
    assert_eq!(serial, parallel);
}

#[test]
fn test_bundle_statistics() {
    let system = singlet();
    let results: TraceResults = trace_bundle(&system, &bundle(6.0), &SerialBackend);
    assert_eq!(results.failure_counts().total(), 0);
    assert_eq!(results.successes().count(), results.len());

    let image = system.image();
    let centroid = results.centroid(image).unwrap();
    // Rotational symmetry puts the centroid on the axis.
    assert_abs_diff_eq!(centroid.x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(centroid.y, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(centroid.z, 53.0, epsilon = 1e-12);
    let rms = results.rms_radius(image).unwrap();
    eprintln!("spot rms radius = {rms:.4e} mm");
    assert!(rms > 0.0 && rms < 1.0);
    let peak = results.max_intensity(image).unwrap();
    assert!(peak <= 1.0 && peak > 0.99);
}

#[test]
fn test_oversized_bundle_is_clipped() {
    let system = singlet();
    let results = trace_bundle(&system, &bundle(10.0), &SerialBackend);
    let counts = results.failure_counts();
    // Only the outer ring (r = 10) falls outside the 8 mm clear aperture.
    assert_eq!(counts.obstructed, 3 * 24);
    assert_eq!(counts.missed + counts.total_internal_reflection + counts.medium, 0);
    for error in results.failures() {
        assert_eq!(error.surface(), system.sequence()[0]);
    }
}

#[test]
fn test_total_internal_reflection_in_prism() {
    // Glass block whose exit face is tilted by 45 degrees.
    let system = Prescription::new(vec![
        SurfaceSpec::flat(5.0).with_material("1.5"),
        SurfaceSpec::flat(5.0).with_tilt([45.0, 0.0, 0.0]),
        SurfaceSpec::image(),
    ])
    .build()
    .unwrap();
    let ray = LightRay::new(Vec3::new(0.0, 0.0, -1.0), Vec3::z(), 550.0);
    match trace_ray(&system, &ray).unwrap_err() {
        TraceError::TotalInternalReflection {
            surface,
            incident,
            normal,
            n_in,
            n_out,
        } => {
            assert_eq!(surface, system.sequence()[1]);
            assert_abs_diff_eq!(incident, Vec3::z(), epsilon = 1e-15);
            let s = std::f64::consts::FRAC_1_SQRT_2;
            assert_abs_diff_eq!(normal, Vec3::new(0.0, -s, s), epsilon = 1e-12);
            assert_eq!((n_in, n_out), (1.5, 1.0));
        }
        other => panic!("expected total internal reflection, got {other:?}"),
    }

    // A gentler tilt lets the ray out.
    let system = Prescription::new(vec![
        SurfaceSpec::flat(5.0).with_material("1.5"),
        SurfaceSpec::flat(5.0).with_tilt([30.0, 0.0, 0.0]),
        SurfaceSpec::image(),
    ])
    .build()
    .unwrap();
    assert!(trace_ray(&system, &ray).is_ok());
}

#[test]
fn test_fold_mirror() {
    let mut b = SystemBuilder::new();
    let root = b.root();
    let mirror = b
        .add_surface(
            root,
            "fold",
            Transform3::from_tilt_degrees([45.0, 0.0, 0.0], Vec3::new(0.0, 0.0, 10.0)),
            SurfaceBuilder::mirror(Curve::Flat, MediumId::AMBIENT)
                .shape(Shape::Ellipse {
                    semi_x: 5.0,
                    semi_y: 7.5,
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    // Image plane facing +y, level with the mirror vertex.
    let image = b
        .add_surface(
            root,
            "image",
            Transform3::from_tilt_degrees([-90.0, 0.0, 0.0], Vec3::new(0.0, 20.0, 10.0)),
            SurfaceBuilder::image().build().unwrap(),
        )
        .unwrap();
    let system = b.build().unwrap();
    assert_eq!(system.sequence(), &[mirror, image]);

    let ray = LightRay::new(Vec3::new(1.0, 0.5, 0.0), Vec3::z(), 550.0);
    let traced = trace_ray(&system, &ray).unwrap();
    let at_mirror = &traced.segments[0];
    assert_abs_diff_eq!(at_mirror.point, Vec3::new(1.0, 0.5, 10.5), epsilon = 1e-12);
    assert_abs_diff_eq!(at_mirror.direction, Vec3::y(), epsilon = 1e-12);
    let at_image = &traced.segments[1];
    assert_abs_diff_eq!(at_image.point, Vec3::new(1.0, 20.0, 10.5), epsilon = 1e-12);
    assert_abs_diff_eq!(at_image.local_point, Vec3::new(1.0, -0.5, 0.0), epsilon = 1e-12);
    assert_abs_diff_eq!(at_image.optical_path, 30.0, epsilon = 1e-12);
}

#[test]
fn test_missed_surface() {
    let system = Prescription::new(vec![
        SurfaceSpec::spherical(5.0, 2.0).with_material("1.5"),
        SurfaceSpec::flat(10.0),
        SurfaceSpec::image(),
    ])
    .build()
    .unwrap();
    let first = system.sequence()[0];

    // Outside the sphere's hemisphere.
    let ray = LightRay::new(Vec3::new(0.0, 6.0, -1.0), Vec3::z(), 550.0);
    assert_eq!(
        trace_ray(&system, &ray).unwrap_err(),
        TraceError::MissedSurface { surface: first }
    );
    // Parallel to the vertex plane.
    let ray = LightRay::new(Vec3::new(0.0, 0.0, -1.0), Vec3::x(), 550.0);
    assert!(matches!(
        trace_ray(&system, &ray),
        Err(TraceError::MissedSurface { .. })
    ));
}

#[test]
fn test_pass_unobstructed_ignores_aperture() {
    let mut rows = vec![
        SurfaceSpec::flat(5.0).with_semi_diameter(1.0),
        SurfaceSpec::flat(5.0),
        SurfaceSpec::image(),
    ];
    let ray = LightRay::new(Vec3::new(0.0, 3.0, -1.0), Vec3::z(), 550.0);
    let blocked = Prescription::new(rows.clone()).build().unwrap();
    assert!(matches!(
        trace_ray(&blocked, &ray),
        Err(TraceError::ObstructedByAperture { .. })
    ));
    rows[0].pass_unobstructed = true;
    let open = Prescription::new(rows).build().unwrap();
    assert!(trace_ray(&open, &ray).is_ok());
}

#[test]
fn test_transform_cache_round_trips() {
    let system = Prescription::new(vec![
        SurfaceSpec::spherical(40.0, 4.0)
            .with_material("F2")
            .with_decenter(0.2, -0.1),
        SurfaceSpec::spherical(-60.0, 10.0).with_tilt([1.0, -2.0, 0.5]),
        SurfaceSpec::stop(3.0, 10.0).with_decenter(0.0, 0.4),
        SurfaceSpec::image(),
    ])
    .build()
    .unwrap();
    let cache = system.cache();
    let ids: Vec<ElementId> = (0..system.elements().len()).map(ElementId).collect();
    for &a in &ids {
        let global = cache.global(a).unwrap();
        assert!(global.compose(cache.global_inverse(a).unwrap()).is_identity(1e-12));
        for &b in &ids {
            let there = cache.relative(a, b).unwrap();
            let back = cache.relative(b, a).unwrap();
            assert!(there.compose(&back).is_identity(1e-12), "{a} <-> {b}");
        }
    }
}

#[test]
fn test_finite_object_point() {
    let system = singlet();
    let field = FieldPoint::Point {
        position: [0.0, 0.0, -200.0],
    };
    let ray = field.ray_through(&system, 0.0, 4.0, 587.56);
    assert_abs_diff_eq!(ray.origin, Vec3::new(0.0, 0.0, -200.0), epsilon = 1e-15);
    let traced = trace_ray(&system, &ray).unwrap();
    assert_abs_diff_eq!(traced.segments[0].local_point.y, 4.0, epsilon = 1e-2);
    // A closer object focuses further back, so the ray is still converging.
    assert!(traced.image().unwrap().point.y > 0.0);
}
