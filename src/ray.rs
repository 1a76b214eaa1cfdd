use super::{
    Arithmetic, MediumProfile, Point2D, RayTracer2D, RayTracingError, Result, Solution,
    SolutionType, Vector,
};
use nalgebra::{Rotation3, Vector3};
use rayon::prelude::*;
use std::fmt;
use tracing::level_filters::LevelFilter;

/// # Ray tracer between two points in 3D
///
/// The medium is invariant by rotation around the vertical axis, so the two points are
/// brought into the vertical plane $(y,z)$ of [`RayTracer2D`](crate::RayTracer2D) by a rotation
/// around $z$, and the solutions are lifted back to 3D with the inverse rotation.
/// If `x2` is deeper than `x1`, the points are swapped internally but every result is given for
/// the ray going from `x1` to `x2`.
///
/// All the solutions are computed at construction.
#[derive(Debug, Clone)]
pub struct RayTracer {
    x1: Vector,
    x2: Vector,
    swap: bool,
    rotation: Rotation3<f64>,
    x1_2d: Point2D,
    x2_2d: Point2D,
    solver: RayTracer2D,
    solutions: Vec<Solution>,
    log_level: LevelFilter,
}
/// # Ray tracer builder
///
/// Build a new [`RayTracer`](crate::RayTracer)
#[derive(Debug, Clone, Copy)]
pub struct NewRayTracer {
    /// Ice refractive index profile
    pub medium: MediumProfile,
    /// Verbosity of the ray tracers
    pub log_level: LevelFilter,
}
impl From<MediumProfile> for NewRayTracer {
    fn from(medium: MediumProfile) -> Self {
        Self {
            medium,
            log_level: LevelFilter::WARN,
        }
    }
}
impl NewRayTracer {
    /// Set the [`RayTracer`](crate::RayTracer) verbosity
    pub fn log_level(self, log_level: LevelFilter) -> Self {
        Self { log_level, ..self }
    }
    /// Build the [`RayTracer`](crate::RayTracer) from `x1` to `x2`
    ///
    /// A non finite coordinate is logged and gives a ray tracer without solution.
    pub fn build(self, x1: Vector, x2: Vector) -> RayTracer {
        match check_finite(x1, x2) {
            Ok(()) => RayTracer::solve(self, x1, x2),
            Err(e) => {
                event_if!(self.log_level, "ray_tracing", ERROR, "{}", e);
                RayTracer::reduce(self, x1, x2)
            }
        }
    }
    /// Build the [`RayTracer`](crate::RayTracer) from `x1` to `x2`, failing on a non finite coordinate
    pub fn try_build(self, x1: Vector, x2: Vector) -> Result<RayTracer> {
        check_finite(x1, x2)?;
        Ok(RayTracer::solve(self, x1, x2))
    }
    /// Build a [`RayTracer`](crate::RayTracer) for each pair of points, in parallel
    pub fn build_pairs(self, pairs: &[(Vector, Vector)]) -> Vec<RayTracer> {
        pairs
            .par_iter()
            .map(|&(x1, x2)| self.build(x1, x2))
            .collect()
    }
}
/// Create a [`NewRayTracer`](crate::NewRayTracer) for the given medium, logging warnings and errors
pub fn new_ray_tracer(medium: MediumProfile) -> NewRayTracer {
    NewRayTracer::from(medium)
}
/// Traces the rays between each pair of points, in parallel
///
/// The ray tracers are returned in the order of the pairs.
pub fn trace_pairs(pairs: &[(Vector, Vector)], medium: &MediumProfile) -> Vec<RayTracer> {
    new_ray_tracer(*medium).build_pairs(pairs)
}

fn check_finite(x1: Vector, x2: Vector) -> Result<()> {
    for &(point, x) in [("x1", x1), ("x2", x2)].iter() {
        if let Some(&value) = x.iter().find(|v| !v.is_finite()) {
            return Err(RayTracingError::NonFiniteCoordinate { point, value });
        }
    }
    Ok(())
}
fn to_array(v: Vector3<f64>) -> Vector {
    [v.x, v.y, v.z]
}

impl RayTracer {
    /// Creates a new `RayTracer` from `x1` to `x2`
    pub fn new(x1: Vector, x2: Vector, medium: &MediumProfile) -> Self {
        new_ray_tracer(*medium).build(x1, x2)
    }
    /// Creates a new `RayTracer` from `x1` to `x2`, failing on a non finite coordinate
    pub fn try_new(x1: Vector, x2: Vector, medium: &MediumProfile) -> Result<Self> {
        new_ray_tracer(*medium).try_build(x1, x2)
    }
    fn reduce(builder: NewRayTracer, x1: Vector, x2: Vector) -> Self {
        let swap = x2[2] < x1[2];
        let (p1, p2) = if swap { (x2, x1) } else { (x1, x2) };
        let d = p2.sub(p1);
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), -d[1].atan2(d[0]));
        let d_rotated = rotation * Vector3::new(d[0], d[1], 0f64);
        Self {
            x1,
            x2,
            swap,
            rotation,
            x1_2d: [p1[0], p1[2]],
            x2_2d: [p1[0] + d_rotated.x, p2[2]],
            solver: RayTracer2D::new(builder.medium).log_level(builder.log_level),
            solutions: vec![],
            log_level: builder.log_level,
        }
    }
    fn solve(builder: NewRayTracer, x1: Vector, x2: Vector) -> Self {
        let mut this = Self::reduce(builder, x1, x2);
        if this.swap {
            event_if!(this.log_level, "ray_tracing", DEBUG, "swapping points x1 and x2");
        }
        this.solutions = this.solver.find_solutions(this.x1_2d, this.x2_2d);
        event_if!(
            this.log_level,
            "ray_tracing",
            INFO,
            "{} solution(s) from {:?} to {:?}",
            this.solutions.len(),
            this.x1,
            this.x2
        );
        this
    }
    fn solution(&self, i: usize) -> Result<&Solution> {
        self.solutions.get(i).ok_or_else(|| {
            let e = RayTracingError::SolutionIndexOutOfRange {
                index: i,
                count: self.solutions.len(),
            };
            event_if!(self.log_level, "ray_tracing", ERROR, "{}", e);
            e
        })
    }
    /// Point of origin of the ray in the reference frame of the points (after the swap)
    fn origin(&self) -> Vector {
        if self.swap {
            self.x2
        } else {
            self.x1
        }
    }
    /// Maps a direction of the vertical plane to the reference frame of the points
    fn unrotate(&self, u: Vector) -> Vector {
        to_array(self.rotation.inverse() * Vector3::new(u[0], u[1], u[2]))
    }

    pub fn medium(&self) -> &MediumProfile {
        self.solver.medium()
    }
    pub fn has_solution(&self) -> bool {
        !self.solutions.is_empty()
    }
    pub fn get_number_of_solutions(&self) -> usize {
        self.solutions.len()
    }
    pub fn get_results(&self) -> &[Solution] {
        &self.solutions
    }
    /// Type of the solution `i`
    pub fn solution_type(&self, i: usize) -> Result<SolutionType> {
        self.solution(i).map(|s| s.solution_type)
    }
    /// Zenith angle of the solution `i` at `x1`
    pub fn launch_angle(&self, i: usize) -> Result<f64> {
        let c0 = self.solution(i)?.c0;
        Ok(if self.swap {
            self.solver.receive_angle(self.x1_2d, self.x2_2d, c0)
        } else {
            self.solver.launch_angle(self.x1_2d, c0)
        })
    }
    /// Zenith angle at `x2` of the direction the solution `i` arrives from
    pub fn receive_angle(&self, i: usize) -> Result<f64> {
        let c0 = self.solution(i)?.c0;
        Ok(if self.swap {
            self.solver.launch_angle(self.x1_2d, c0)
        } else {
            self.solver.receive_angle(self.x1_2d, self.x2_2d, c0)
        })
    }
    /// Unit vector of the direction of the solution `i` at `x1`
    pub fn get_launch_vector(&self, i: usize) -> Result<Vector> {
        let alpha = self.launch_angle(i)?;
        let sign = if self.swap { -1f64 } else { 1f64 };
        Ok(self.unrotate([sign * alpha.sin(), 0f64, alpha.cos()]))
    }
    /// Unit vector at `x2` pointing toward where the solution `i` comes from
    pub fn get_receive_vector(&self, i: usize) -> Result<Vector> {
        let alpha = self.receive_angle(i)?;
        let sign = if self.swap { 1f64 } else { -1f64 };
        Ok(self.unrotate([sign * alpha.sin(), 0f64, alpha.cos()]))
    }
    /// Length of the solution `i`
    pub fn get_path_length(&self, i: usize) -> Result<f64> {
        let c0 = self.solution(i)?.c0;
        Ok(self.solver.path_length(self.x1_2d, self.x2_2d, c0))
    }
    /// Propagation time along the solution `i`
    pub fn get_travel_time(&self, i: usize) -> Result<f64> {
        let c0 = self.solution(i)?.c0;
        Ok(self.solver.travel_time(self.x1_2d, self.x2_2d, c0))
    }
    /// Amplitude attenuation factors along the solution `i` for each of the `frequencies`
    pub fn get_attenuation(&self, i: usize, frequencies: &[f64]) -> Result<Vec<f64>> {
        let c0 = self.solution(i)?.c0;
        Ok(self
            .solver
            .attenuation_along_path(self.x1_2d, self.x2_2d, c0, frequencies))
    }
    /// Samples the solution `i` from `x1` to `x2` at `n_points` points
    pub fn path(&self, i: usize, n_points: usize) -> Result<Vec<Vector>> {
        let c0 = self.solution(i)?.c0;
        let (ys, zs) = self.solver.path(self.x1_2d, self.x2_2d, c0, n_points);
        let origin = self.origin();
        let mut points: Vec<Vector> = ys
            .into_iter()
            .zip(zs)
            .map(|(y, z)| {
                let p = self.unrotate([y - self.x1_2d[0], 0f64, 0f64]);
                [origin[0] + p[0], origin[1] + p[1], z]
            })
            .collect();
        if self.swap {
            points.reverse();
        }
        Ok(points)
    }
    /// Start point in the vertical plane of the solver
    pub fn x1_2d(&self) -> Point2D {
        self.x1_2d
    }
    /// End point in the vertical plane of the solver
    pub fn x2_2d(&self) -> Point2D {
        self.x2_2d
    }
    /// Whether `x1` and `x2` are swapped in the vertical plane of the solver
    pub fn is_swapped(&self) -> bool {
        self.swap
    }
}
impl fmt::Display for RayTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{:+.1},{:+.1},{:+.1}] -> [{:+.1},{:+.1},{:+.1}]: {} solution(s)",
            self.x1[0],
            self.x1[1],
            self.x1[2],
            self.x2[0],
            self.x2[1],
            self.x2[2],
            self.solutions.len()
        )?;
        for (i, s) in self.solutions.iter().enumerate() {
            writeln!(
                f,
                " #{} {:>9}: C0 = {:.6} ; C1 = {:+.3}",
                i, s.solution_type, s.c0, s.c1
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::FRAC_1_SQRT_2;

    fn medium() -> MediumProfile {
        MediumProfile::new(1.78, 0.48, 77.)
    }

    #[test]
    fn reduction_to_vertical_plane() {
        let rays = RayTracer::new([10., 20., -100.], [-110., 180., -50.], &medium());
        assert!(!rays.is_swapped());
        assert_eq!(rays.x1_2d(), [10., -100.]);
        let x2 = rays.x2_2d();
        assert_relative_eq!(x2[0], 10. + 200., max_relative = 1e-12);
        assert_relative_eq!(x2[1], -50.);
        let swapped = RayTracer::new([-110., 180., -50.], [10., 20., -100.], &medium());
        assert!(swapped.is_swapped());
        assert_eq!(swapped.x1_2d(), rays.x1_2d());
        assert_eq!(swapped.x2_2d(), rays.x2_2d());
    }

    #[test]
    fn rotation_invariance() {
        let a = RayTracer::new([0., 0., -100.], [200., 0., -50.], &medium());
        let b = RayTracer::new([5., 5., -100.], [5., -195., -50.], &medium());
        assert_eq!(a.get_number_of_solutions(), b.get_number_of_solutions());
        for i in 0..a.get_number_of_solutions() {
            assert_eq!(a.solution_type(i).unwrap(), b.solution_type(i).unwrap());
            assert_relative_eq!(
                a.get_path_length(i).unwrap(),
                b.get_path_length(i).unwrap(),
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn straight_line_vectors() {
        let x1 = [0., 0., -3000.];
        let x2 = [100. * FRAC_1_SQRT_2, 100. * FRAC_1_SQRT_2, -2900.];
        let rays = RayTracer::new(x1, x2, &medium());
        let i = (0..rays.get_number_of_solutions())
            .find(|&i| rays.solution_type(i).unwrap() == SolutionType::Direct)
            .unwrap();
        let u = rays.get_launch_vector(i).unwrap();
        let v = rays.get_receive_vector(i).unwrap();
        for (ui, ei) in u.iter().zip(&[0.5, 0.5, FRAC_1_SQRT_2]) {
            assert_abs_diff_eq!(ui, ei, epsilon = 1e-6);
        }
        for (vi, ei) in v.iter().zip(&[-0.5, -0.5, -FRAC_1_SQRT_2]) {
            assert_abs_diff_eq!(vi, ei, epsilon = 1e-6);
        }
    }

    #[test]
    fn vectors_are_unit() {
        let rays = RayTracer::new([30., -40., -100.], [150., 120., -50.], &medium());
        assert!(rays.has_solution());
        for i in 0..rays.get_number_of_solutions() {
            assert_abs_diff_eq!(rays.get_launch_vector(i).unwrap().norm(), 1., epsilon = 1e-12);
            assert_abs_diff_eq!(rays.get_receive_vector(i).unwrap().norm(), 1., epsilon = 1e-12);
        }
    }

    #[test]
    fn swap_exchanges_launch_and_receive() {
        let (p, q) = ([0., 0., -100.], [120., 160., -50.]);
        let pq = RayTracer::new(p, q, &medium());
        let qp = RayTracer::new(q, p, &medium());
        assert!(qp.is_swapped());
        assert_eq!(pq.get_number_of_solutions(), qp.get_number_of_solutions());
        for i in 0..pq.get_number_of_solutions() {
            assert_eq!(pq.get_launch_vector(i).unwrap(), qp.get_receive_vector(i).unwrap());
            assert_eq!(pq.get_receive_vector(i).unwrap(), qp.get_launch_vector(i).unwrap());
            assert_eq!(pq.launch_angle(i).unwrap(), qp.receive_angle(i).unwrap());
            assert_eq!(pq.get_path_length(i).unwrap(), qp.get_path_length(i).unwrap());
            assert_eq!(pq.get_travel_time(i).unwrap(), qp.get_travel_time(i).unwrap());
        }
    }

    #[test]
    fn path_in_3d() {
        let (x1, x2) = ([30., -40., -50.], [-90., 150., -100.]);
        let rays = RayTracer::new(x1, x2, &medium());
        assert!(rays.is_swapped());
        for i in 0..rays.get_number_of_solutions() {
            let path = rays.path(i, 200).unwrap();
            assert_eq!(path.len(), 200);
            for (a, b) in path[0].iter().zip(&x1) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-3);
            }
            for (a, b) in path[199].iter().zip(&x2) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-3);
            }
            // stays in the vertical plane of the points
            let normal = [190., 120., 0.];
            for p in &path {
                assert_abs_diff_eq!(p.sub(x1).dot(&normal), 0., epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn index_out_of_range() {
        let rays = RayTracer::new([0., 0., -100.], [200., 0., -50.], &medium());
        let n = rays.get_number_of_solutions();
        assert_eq!(
            rays.get_path_length(n),
            Err(RayTracingError::SolutionIndexOutOfRange { index: n, count: n })
        );
        assert!(rays.get_launch_vector(n + 3).is_err());
        assert!(rays.get_attenuation(n, &[0.3]).is_err());
        assert!(rays.path(n, 10).is_err());
    }

    #[test]
    fn non_finite_points() {
        let x2 = [200., 0., std::f64::NAN];
        match RayTracer::try_new([0., 0., -100.], x2, &medium()) {
            Err(RayTracingError::NonFiniteCoordinate { point, .. }) => assert_eq!(point, "x2"),
            other => panic!("unexpected {:?}", other.map(|r| r.get_number_of_solutions())),
        }
        let rays = RayTracer::new([0., 0., -100.], x2, &medium());
        assert!(!rays.has_solution());
        assert!(rays.solution_type(0).is_err());
    }

    #[test]
    fn parallel_pairs_keep_order() {
        let pairs: Vec<(Vector, Vector)> = (1..9)
            .map(|k| ([0., 0., -200.], [50. * k as f64, 0., -60.]))
            .collect();
        let rays = trace_pairs(&pairs, &medium());
        assert_eq!(rays.len(), pairs.len());
        for (r, (x1, x2)) in rays.iter().zip(&pairs) {
            let serial = RayTracer::new(*x1, *x2, &medium());
            assert_eq!(r.get_results(), serial.get_results());
            assert_eq!(r.x2_2d(), [x2[0], x2[2]]);
        }
    }

    #[test]
    fn builder_sets_verbosity() {
        let rays = new_ray_tracer(medium())
            .log_level(LevelFilter::OFF)
            .build([0., 0., -100.], [200., 0., -50.]);
        assert_eq!(rays.log_level, LevelFilter::OFF);
        assert!(format!("{}", rays).contains("solution(s)"));
    }
}
