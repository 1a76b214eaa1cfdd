use approx::assert_abs_diff_eq;
use ice_ray_analytics::units::SPEED_OF_LIGHT;
use ice_ray_analytics::{MediumProfile, RayTracer2D, SolutionType};
use proptest::prelude::*;

fn tracer() -> RayTracer2D {
    RayTracer2D::new(MediumProfile::new(1.78, 0.48, 77.))
}

fn same(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn scalar_and_batch_trajectories_agree(
        z in -800f64..0.,
        c0 in 0.6f64..5.,
        c1 in -200f64..200.,
    ) {
        let r2d = tracer();
        let scalar = r2d.y_with_z_mirror(z, c0, c1);
        let (batch, unmirrored) = r2d.y_with_z_mirror_batch(&[z], c0, c1);
        prop_assert_eq!(batch.len(), 1);
        prop_assert!(same(scalar, batch[0]), "{} != {}", scalar, batch[0]);
        prop_assert_eq!(unmirrored[0], r2d.z_unmirrored(z, c0));
    }

    #[test]
    fn scalar_and_batch_profiles_agree(
        zs in proptest::collection::vec(-500f64..-1., 1..20),
        c0 in 0.6f64..5.,
    ) {
        let r2d = tracer();
        let gammas: Vec<f64> = zs.iter().map(|&z| r2d.gamma(z)).collect();
        let batch = r2d.y_batch(&gammas, c0, 1.5);
        for (g, y) in gammas.iter().zip(batch) {
            prop_assert!(same(r2d.y(*g, c0, 1.5), y));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn solutions_close_on_both_points(
        z1 in -1500f64..-20.,
        rise in 0f64..0.95,
        y2 in 1f64..800.,
    ) {
        let r2d = tracer();
        let x1 = [0., z1];
        let x2 = [y2, z1 * (1. - rise)];
        let solutions = r2d.find_solutions(x1, x2);
        prop_assert!(solutions.len() <= 3);
        for (k, s) in solutions.iter().enumerate() {
            let y1 = r2d.y_with_z_mirror(x1[1], s.c0, s.c1);
            prop_assert!((y1 - x1[0]).abs() < 1e-6, "C1 closure: {}", y1);
            let delta = r2d.delta_y(s.c0, x1, x2);
            prop_assert!(delta.abs() < 1e-4, "delta y: {}", delta);
            prop_assert_eq!(s.solution_type, r2d.solution_type(x1, x2, s.c0));
            for other in &solutions[..k] {
                prop_assert!((other.c0 * 1e3).round() != (s.c0 * 1e3).round());
            }
        }
    }
}

#[test]
fn turning_point_above_surface_behaves_as_reflection() {
    let r2d = tracer();
    let c0_surface = 1. / r2d.medium().n_surface();
    for &c0 in &[c0_surface + 1e-3, 0.9, 1.5, 10.] {
        let raw = r2d.turning_point(r2d.c(c0));
        assert!(raw.z >= 0.);
        let turn = r2d.clamped_turning_point(c0);
        assert_eq!(turn.z, 0.);
        assert_eq!(turn.gamma, r2d.gamma(0.));
        // mirrored about the surface
        let y_turn = r2d.y(turn.gamma, c0, 0.);
        let down = r2d.y_with_z_mirror(-30., c0, 0.);
        let up = r2d.y_with_z_mirror(30., c0, 0.);
        assert_abs_diff_eq!(down + up, 2. * y_turn, epsilon = 1e-9);
        assert_eq!(r2d.z_unmirrored(30., c0), -30.);
    }
    let (x1, x2) = ([0., -100.], [200., -50.]);
    let reflected = r2d
        .find_solutions(x1, x2)
        .into_iter()
        .filter(|s| r2d.turning_point(r2d.c(s.c0)).z >= 0.)
        .collect::<Vec<_>>();
    assert!(!reflected.is_empty());
    for s in reflected {
        assert_eq!(s.solution_type, SolutionType::Reflected);
    }
}

#[test]
fn equal_depth_pairs() {
    let r2d = tracer();
    for &(z, dy) in &[(-50., 40.), (-100., 100.), (-300., 150.), (-1200., 80.)] {
        let (x1, x2) = ([0., z], [dy, z]);
        let solutions = r2d.find_solutions(x1, x2);
        assert!(!solutions.is_empty(), "z = {}", z);
        for s in &solutions {
            assert_ne!(s.solution_type, SolutionType::Direct);
            assert!(r2d.delta_y(s.c0, x1, x2).abs() < 1e-4);
            let turn = r2d.clamped_turning_point(s.c0);
            assert_abs_diff_eq!(r2d.y(turn.gamma, s.c0, s.c1), 0.5 * dy, epsilon = 1e-3);
            if s.solution_type == SolutionType::Refracted {
                let length = r2d.path_length(x1, x2, s.c0);
                assert!(length > dy && length < 1.001 * dy, "{}", length);
            }
        }
        if z > -500. {
            assert!(solutions
                .iter()
                .any(|s| s.solution_type == SolutionType::Refracted));
        }
    }
}

#[test]
fn pulser_scenario() {
    let r2d = tracer();
    let (x1, x2) = ([0., -100.], [200., -50.]);
    let solutions = r2d.find_solutions(x1, x2);
    assert!(!solutions.is_empty());
    for s in &solutions {
        assert!(r2d.delta_y(s.c0, x1, x2).abs() < 1e-4);
        assert!(r2d.travel_time(x1, x2, s.c0) > r2d.path_length(x1, x2, s.c0) / SPEED_OF_LIGHT);
    }
}

#[test]
fn shadow_zone() {
    let r2d = tracer();
    assert!(r2d.find_solutions([0., -200.], [1000., -10.]).is_empty());
}
