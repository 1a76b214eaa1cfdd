//!
//! # Analytic Ray Tracing in Ice
//!
//! Radio propagation paths through a medium whose refractive index follows
//! $$n(z) = n_{ice} - \Delta_n e^{z/z_0},$$
//! with $z\le 0$ below the surface.
//! Rays are solved in closed form: a one-parameter family of trajectories indexed by $C_0$
//! is searched for every member connecting two points (direct, refracted or reflected),
//! then path length, travel time and attenuation are integrated along each solution.
//!
//! ```no_run
//! use ice_ray_analytics::{MediumProfile, RayTracer};
//!
//! let medium = MediumProfile::south_pole_simple();
//! let rays = RayTracer::new([0., 0., -100.], [200., 0., -50.], &medium);
//! for i in 0..rays.get_number_of_solutions() {
//!     println!("{:?}: {:.2}m", rays.solution_type(i).unwrap(), rays.get_path_length(i).unwrap());
//! }
//! ```

/// Emits a `tracing` event if the instance verbosity `$filter` admits `$level`
macro_rules! event_if {
    ($filter:expr, $target:expr, $level:ident, $($arg:tt)+) => {
        if $filter >= tracing::Level::$level {
            tracing::event!(target: $target, tracing::Level::$level, $($arg)+);
        }
    };
}

pub mod analytic;
pub mod attenuation;
pub mod error;
pub mod medium;
pub mod quadrature;
pub mod ray;
pub mod roots;
pub mod units;
pub use analytic::{RayTracer2D, Solution, SolutionType, TurningPoint};
pub use error::{RayTracingError, Result};
pub use medium::MediumProfile;
pub use ray::{new_ray_tracer, trace_pairs, NewRayTracer, RayTracer};

/// 3D cartesian coordinates `[x, y, z]`, z pointing up with the surface at z=0
pub type Vector = [f64; 3];
/// Coordinates `[y, z]` in the vertical plane of the 2D solver
pub type Point2D = [f64; 2];

pub trait Arithmetic {
    fn dot(&self, other: &[f64]) -> f64;
    fn norm_square(&self) -> f64;
    fn norm(&self) -> f64;
    fn normalize(&mut self) -> Self;
    fn add(&self, other: Self) -> Self;
    fn sub(&self, other: Self) -> Self;
    fn scale(&self, s: f64) -> Self;
    fn neg(&self) -> Self;
}
impl Arithmetic for Vector {
    fn dot(&self, other: &[f64]) -> f64 {
        self[0] * other[0] + self[1] * other[1] + self[2] * other[2]
    }
    fn norm_square(&self) -> f64 {
        self.dot(self)
    }
    fn norm(&self) -> f64 {
        self.norm_square().sqrt()
    }
    fn normalize(&mut self) -> Self {
        let n = self.norm();
        self[0] /= n;
        self[1] /= n;
        self[2] /= n;
        *self
    }
    fn add(&self, other: Self) -> Self {
        [self[0] + other[0], self[1] + other[1], self[2] + other[2]]
    }
    fn sub(&self, other: Self) -> Self {
        [self[0] - other[0], self[1] - other[1], self[2] - other[2]]
    }
    fn scale(&self, s: f64) -> Self {
        [self[0] * s, self[1] * s, self[2] * s]
    }
    fn neg(&self) -> Self {
        self.scale(-1f64)
    }
}
