//! # Analytic 2D ray tracing
//!
//! In the vertical plane $(y,z)$ the ray equation for
//! $n(z) = n_{ice} - \gamma(z)$, $\gamma(z) = \Delta_n e^{z/z_0}$, has the closed form solution
//! $$y(\gamma) = \frac{z_0}{\sqrt{n_{ice}^2C_0^2-1}}\ln\left(\frac{\gamma}{2\sqrt{c}\sqrt{\gamma^2-b\gamma+c}-b\gamma+2c}\right) + C_1,$$
//! with $b=2n_{ice}$ and $c=n_{ice}^2-C_0^{-2}$.
//! $C_0\in]1/n_{ice},\infty[$ selects the ray family and $C_1$ translates it along $y$.
//!
//! A ray climbs until its turning point $\gamma_{turn}=b/2-\sqrt{b^2/4-c}$ where $dy/dz$ diverges,
//! then bends back down. The closed form only describes the climbing part; beyond the turning
//! point the trajectory is the mirror image of the climbing part. Rays whose turning point is
//! above the surface are reflected at $z=0$.

use super::attenuation::attenuation_length;
use super::quadrature::integrate;
use super::roots::{least_squares, Probe};
use super::units::SPEED_OF_LIGHT;
use super::{MediumProfile, Point2D};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use tracing::level_filters::LevelFilter;

/// Initial guess of the seed solve in the $\ln(C_0-1/n_{ice})$ coordinate
pub const SEED_LOG_C0: f64 = -1.;
/// The seed is a solution if $\Delta y^2$ is below this value
pub const SEED_ACCEPTANCE: f64 = 1e-5;
/// Offset from the seed where the probes start
pub const PROBE_STEP: f64 = 1e-4;
/// Upper bound of the upward probe
pub const LOG_C0_MAX: f64 = 100.;
/// Lower bound of the downward probe
pub const LOG_C0_MIN: f64 = -100.;

const PATH_EPSREL: f64 = 1e-6;
const ATTENUATION_EPSREL: f64 = 0.05;
const N_ATTENUATION_SAMPLES: usize = 4;

/// Ray path classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionType {
    /// Reaches the end point before its turning point
    Direct,
    /// Reaches the end point after turning below the surface
    Refracted,
    /// Reaches the end point after a reflection at the surface
    Reflected,
}
impl fmt::Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionType::Direct => f.pad("direct"),
            SolutionType::Refracted => f.pad("refracted"),
            SolutionType::Reflected => f.pad("reflected"),
        }
    }
}

/// Ray connecting two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    #[serde(rename = "type")]
    pub solution_type: SolutionType,
    #[serde(rename = "C0")]
    pub c0: f64,
    #[serde(rename = "C1")]
    pub c1: f64,
}

/// Apex of a ray: $(\gamma_{turn}, z_{turn})$
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurningPoint {
    pub gamma: f64,
    pub z: f64,
}

/// # Analytic ray tracer
///
/// Points are `[y, z]` in the vertical plane, rays always propagate toward increasing $y$
/// and the start point `x1` must not be shallower than the end point `x2`.
#[derive(Debug, Clone, Copy)]
pub struct RayTracer2D {
    medium: MediumProfile,
    b: f64,
    log_level: LevelFilter,
}
impl RayTracer2D {
    /// Creates a new `RayTracer2D` logging warnings and errors
    pub fn new(medium: MediumProfile) -> Self {
        Self {
            medium,
            b: 2f64 * medium.n_ice,
            log_level: LevelFilter::WARN,
        }
    }
    /// Sets the verbosity of this instance
    pub fn log_level(self, log_level: LevelFilter) -> Self {
        Self { log_level, ..self }
    }
    pub fn medium(&self) -> &MediumProfile {
        &self.medium
    }
    /// Refractive index at depth $z$
    pub fn n(&self, z: f64) -> f64 {
        self.medium.n(z)
    }
    pub fn gamma(&self, z: f64) -> f64 {
        self.medium.gamma(z)
    }
    /// $$c = n_{ice}^2 - C_0^{-2}$$
    pub fn c(&self, c0: f64) -> f64 {
        self.medium.n_ice * self.medium.n_ice - c0.powi(-2)
    }
    /// Maps the search coordinate $\ln(C_0 - 1/n_{ice})$ back to $C_0$
    pub fn c0_from_log(&self, log_c0: f64) -> f64 {
        log_c0.exp() + 1f64 / self.medium.n_ice
    }
    /// Turning point of the rays with parameter `c`, possibly above the surface
    ///
    /// The depth is $-\infty$ if $\gamma_{turn}\le 0$.
    pub fn turning_point(&self, c: f64) -> TurningPoint {
        let gamma = self.b * 0.5 - (0.25 * self.b * self.b - c).sqrt();
        let z = if gamma > 0f64 {
            (gamma / self.medium.delta_n).ln() * self.medium.z_0
        } else {
            std::f64::NEG_INFINITY
        };
        TurningPoint { gamma, z }
    }
    /// Turning point of the ray $C_0$, moved to the surface if it is above it
    pub fn clamped_turning_point(&self, c0: f64) -> TurningPoint {
        let turn = self.turning_point(self.c(c0));
        if turn.z >= 0f64 {
            event_if!(self.log_level, "ray_tracing_2d", DEBUG, "signal reflects off surface");
            TurningPoint {
                gamma: self.gamma(0f64),
                z: 0f64,
            }
        } else {
            turn
        }
    }

    fn y_scale(&self, c0: f64) -> f64 {
        self.medium.z_0 * (self.medium.n_ice.powi(2) * c0 * c0 - 1f64).powf(-0.5)
    }
    fn log_argument(&self, gamma: f64, c: f64) -> f64 {
        // |.| guards the root against rounding errors near the turning point
        let root = (gamma * gamma - gamma * self.b + c).abs();
        gamma / (2f64 * c.sqrt() * root.sqrt() - self.b * gamma + 2f64 * c)
    }
    /// Horizontal position $y(\gamma)$ on the climbing part of the ray $(C_0,C_1)$
    pub fn y(&self, gamma: f64, c0: f64, c1: f64) -> f64 {
        let log_argument = self.log_argument(gamma, self.c(c0));
        if log_argument <= 0f64 {
            event_if!(
                self.log_level,
                "ray_tracing_2d",
                DEBUG,
                "log argument {:e} <= 0 at gamma = {:e}, C0 = {:.4}",
                log_argument,
                gamma,
                c0
            );
        }
        self.y_scale(c0) * log_argument.ln() + c1
    }
    /// Horizontal positions $y(\gamma)$ on the climbing part of the ray $(C_0,C_1)$
    pub fn y_batch(&self, gammas: &[f64], c0: f64, c1: f64) -> Vec<f64> {
        let c = self.c(c0);
        let scale = self.y_scale(c0);
        let log_arguments: Vec<f64> = gammas.iter().map(|&g| self.log_argument(g, c)).collect();
        let n_invalid = log_arguments.iter().filter(|&&l| l <= 0f64).count();
        if n_invalid > 0 {
            event_if!(
                self.log_level,
                "ray_tracing_2d",
                DEBUG,
                "{} log arguments <= 0 for C0 = {:.4}",
                n_invalid,
                c0
            );
        }
        log_arguments.into_iter().map(|l| scale * l.ln() + c1).collect()
    }
    /// Horizontal position at depth $z$, mirrored beyond the turning point
    pub fn y_with_z_mirror(&self, z: f64, c0: f64, c1: f64) -> f64 {
        let turn = self.clamped_turning_point(c0);
        let y_turn = self.y(turn.gamma, c0, c1);
        if z < turn.z {
            self.y(self.gamma(z), c0, c1)
        } else {
            2f64 * y_turn - self.y(self.gamma(2f64 * turn.z - z), c0, c1)
        }
    }
    /// Horizontal positions at depths `zs`, mirrored beyond the turning point
    ///
    /// Returns the positions and the depths at which the closed form was evaluated.
    pub fn y_with_z_mirror_batch(&self, zs: &[f64], c0: f64, c1: f64) -> (Vec<f64>, Vec<f64>) {
        let turn = self.clamped_turning_point(c0);
        let y_turn = self.y(turn.gamma, c0, c1);
        let climbing: Vec<bool> = zs.iter().map(|&z| z < turn.z).collect();
        let unmirrored: Vec<f64> = zs
            .iter()
            .zip(&climbing)
            .map(|(&z, &up)| if up { z } else { 2f64 * turn.z - z })
            .collect();
        let gammas: Vec<f64> = unmirrored.iter().map(|&z| self.gamma(z)).collect();
        let ys = self
            .y_batch(&gammas, c0, c1)
            .into_iter()
            .zip(&climbing)
            .map(|(y, &up)| if up { y } else { 2f64 * y_turn - y })
            .collect();
        event_if!(
            self.log_level,
            "ray_tracing_2d",
            DEBUG,
            "turning points for C_0 = {:.2}, b = {:.2}, gamma = {:.4}, z = {:.1}, y_turn = {:.0}",
            c0,
            self.b,
            turn.gamma,
            turn.z,
            y_turn
        );
        (ys, unmirrored)
    }
    /// $C_1$ such as the ray $C_0$ goes through `x1`
    pub fn c1(&self, x1: Point2D, c0: f64) -> f64 {
        x1[0] - self.y_with_z_mirror(x1[1], c0, 0f64)
    }
    /// Slope $dy/dz$ at depth `z_raw`, negative on the descending part of the ray
    ///
    /// $$\frac{dy}{dz} = \frac{1}{C_0\sqrt{\gamma^2-b\gamma+c}}$$
    pub fn y_diff(&self, z_raw: f64, c0: f64) -> f64 {
        let z = self.z_unmirrored(z_raw, c0);
        let c = self.c(c0);
        let gamma = self.gamma(z);
        let slope = 1f64 / (c0 * (gamma * gamma - self.b * gamma + c).abs().sqrt());
        if z != z_raw {
            -slope
        } else {
            slope
        }
    }
    /// End point `x2` in the mirrored depth coordinate along the ray from `x1`
    ///
    /// Beyond the turning point the depth keeps increasing by the distance traveled down.
    pub fn z_mirrored(&self, x1: Point2D, x2: Point2D, c0: f64) -> Point2D {
        let c1 = self.c1(x1, c0);
        let turn = self.clamped_turning_point(c0);
        let y_turn = self.y(turn.gamma, c0, c1);
        let z_stop = if y_turn < x2[0] {
            x1[1] + (turn.z - x1[1]).abs() + (turn.z - x2[1]).abs()
        } else {
            x2[1]
        };
        [x2[0], z_stop]
    }
    /// Depth of the mirrored depth coordinate `z`
    pub fn z_unmirrored(&self, z: f64, c0: f64) -> f64 {
        let turn = self.clamped_turning_point(c0);
        if z > turn.z {
            2f64 * turn.z - z
        } else {
            z
        }
    }

    /// Integrates `integrand(z, dy/dz)` along the ray from `x1` to `x2`
    ///
    /// The path is split at the turning point and each piece is integrated in $s$ with
    /// $z = z_{turn} - s^2$, which regularizes the $1/\sqrt{z_{turn}-z}$ divergence of $dy/dz$.
    fn integrate_along_path<F>(&self, x1: Point2D, x2: Point2D, c0: f64, epsrel: f64, integrand: F) -> f64
    where
        F: Fn(f64, f64) -> f64,
    {
        let raw = self.turning_point(self.c(c0));
        let turn = self.clamped_turning_point(c0);
        let y_turn = self.y(turn.gamma, c0, self.c1(x1, c0));
        let segments = if y_turn < x2[0] {
            vec![(x1[1], turn.z), (x2[1], turn.z)]
        } else {
            vec![(x1[1], x2[1])]
        };
        let gamma_gap = raw.gamma - turn.gamma;
        let z_0 = self.medium.z_0;
        segments
            .into_iter()
            .map(|(z_a, z_b)| {
                let s_a = (turn.z - z_a).max(0f64).sqrt();
                let s_b = (turn.z - z_b).max(0f64).sqrt();
                let ds = |s: f64| {
                    let s2 = s * s;
                    let shrink = -(-s2 / z_0).exp_m1();
                    let gamma = turn.gamma * (1f64 - shrink);
                    let root = (gamma_gap + turn.gamma * shrink) * (self.b - raw.gamma - gamma);
                    let slope = 1f64 / (c0 * root.abs().sqrt());
                    2f64 * s * integrand(turn.z - s2, slope)
                };
                integrate(ds, s_b, s_a, 0f64, epsrel).value
            })
            .sum()
    }
    /// Length of the ray $C_0$ from `x1` to `x2`
    pub fn path_length(&self, x1: Point2D, x2: Point2D, c0: f64) -> f64 {
        let length = self.integrate_along_path(x1, x2, c0, PATH_EPSREL, |_, slope| {
            (slope * slope + 1f64).sqrt()
        });
        event_if!(
            self.log_level,
            "ray_tracing_2d",
            INFO,
            "calculating path length from ({:.0}, {:.0}) to ({:.0}, {:.0}) = {:.2} m",
            x1[0],
            x1[1],
            x2[0],
            x2[1],
            length
        );
        length
    }
    /// Propagation time along the ray $C_0$ from `x1` to `x2`
    pub fn travel_time(&self, x1: Point2D, x2: Point2D, c0: f64) -> f64 {
        let time = self.integrate_along_path(x1, x2, c0, PATH_EPSREL, |z, slope| {
            (slope * slope + 1f64).sqrt() * self.n(z) / SPEED_OF_LIGHT
        });
        event_if!(
            self.log_level,
            "ray_tracing_2d",
            INFO,
            "calculating travel time from ({:.0}, {:.0}) to ({:.0}, {:.0}) = {:.2} ns",
            x1[0],
            x1[1],
            x2[0],
            x2[1],
            time
        );
        time
    }
    /// Fraction of the signal amplitude surviving ice absorption along the ray $C_0$
    ///
    /// The optical depth is integrated at 4 frequencies spanning the positive `frequencies`
    /// and linearly interpolated in between. Non-positive frequencies are not attenuated.
    pub fn attenuation_along_path(
        &self,
        x1: Point2D,
        x2: Point2D,
        c0: f64,
        frequencies: &[f64],
    ) -> Vec<f64> {
        let mut attenuation = vec![1f64; frequencies.len()];
        let (f_min, f_max) = frequencies
            .iter()
            .filter(|&&f| f > 0f64)
            .fold((std::f64::INFINITY, 0f64), |(lo, hi), &f| (lo.min(f), hi.max(f)));
        if f_max == 0f64 {
            return attenuation;
        }
        let optical_depth = |frequency: f64| {
            self.integrate_along_path(x1, x2, c0, ATTENUATION_EPSREL, |z, slope| {
                (slope * slope + 1f64).sqrt() / attenuation_length(z, frequency)
            })
        };
        let samples: Vec<(f64, f64)> = if f_min == f_max {
            vec![(f_min, optical_depth(f_min))]
        } else {
            (0..N_ATTENUATION_SAMPLES)
                .map(|k| {
                    let f = f_min + (f_max - f_min) * k as f64 / (N_ATTENUATION_SAMPLES - 1) as f64;
                    (f, optical_depth(f))
                })
                .collect()
        };
        attenuation
            .iter_mut()
            .zip(frequencies)
            .filter(|(_, &f)| f > 0f64)
            .for_each(|(a, &f)| *a = (-interpolate(&samples, f)).exp());
        event_if!(
            self.log_level,
            "ray_tracing_2d",
            INFO,
            "calculating attenuation from ({:.0}, {:.0}) to ({:.0}, {:.0}) = a factor {:?}",
            x1[0],
            x1[1],
            x2[0],
            x2[1],
            attenuation.iter().map(|a| 1f64 / a).collect::<Vec<f64>>()
        );
        attenuation
    }
    fn angle(&self, x: Point2D, x_start: Point2D, c0: f64) -> f64 {
        let z = self.z_mirrored(x_start, x, c0)[1];
        let angle = self.y_diff(z, c0).atan();
        if angle < 0f64 {
            PI + angle
        } else {
            angle
        }
    }
    /// Zenith angle of the ray $C_0$ at `x1`
    pub fn launch_angle(&self, x1: Point2D, c0: f64) -> f64 {
        self.angle(x1, x1, c0)
    }
    /// Zenith angle at `x2` of the direction the ray $C_0$ from `x1` arrives from
    pub fn receive_angle(&self, x1: Point2D, x2: Point2D, c0: f64) -> f64 {
        PI - self.angle(x2, x1, c0)
    }
    /// Samples the ray $C_0$ between `x1` and `x2` at `n_points` points
    ///
    /// Returns the $y$ and $z$ coordinates; the result is meaningful only if $C_0$ is a
    /// solution for `x1` and `x2`.
    pub fn path(&self, x1: Point2D, x2: Point2D, c0: f64, n_points: usize) -> (Vec<f64>, Vec<f64>) {
        let c1 = self.c1(x1, c0);
        let z_start = x1[1];
        let z_stop = self.z_mirrored(x1, x2, c0)[1];
        let zs: Vec<f64> = match n_points {
            0 => vec![],
            1 => vec![z_start],
            n => (0..n)
                .map(|k| z_start + (z_stop - z_start) * k as f64 / (n - 1) as f64)
                .collect(),
        };
        self.y_with_z_mirror_batch(&zs, c0, c1)
    }

    /// Signed horizontal distance at `x2` between `x2` and the ray $C_0$ through `x1`
    ///
    /// Returns $+\infty$ if $C_0<1/n_{ice}$ and $-\infty$ if the ray turns below `x2`.
    pub fn delta_y(&self, c0: f64, x1: Point2D, x2: Point2D) -> f64 {
        let c0_min = 1f64 / self.medium.n_ice;
        if !(c0 >= c0_min) {
            event_if!(
                self.log_level,
                "ray_tracing_2d",
                DEBUG,
                "C0 = {:.4} out of range {:.4} - inf",
                c0,
                c0_min
            );
            return std::f64::INFINITY;
        }
        // a reflection is a turning point at z=0
        let turn = self.clamped_turning_point(c0);
        if turn.z < x2[1] {
            event_if!(
                self.log_level,
                "ray_tracing_2d",
                DEBUG,
                "turning point (z_turn = {:.0}) is deeper than x2 position z2 = {:.0}",
                turn.z,
                x2[1]
            );
            return std::f64::NEG_INFINITY;
        }
        let c1 = self.c1(x1, c0);
        let y_turn = self.y(turn.gamma, c0, c1);
        event_if!(
            self.log_level,
            "ray_tracing_2d",
            DEBUG,
            "C_0 = {:.4}, C_1 = {:.1}, turning point at z = {:.1}, y = {:.1}",
            c0,
            c1,
            turn.z,
            y_turn
        );
        let y2_raw = self.y(self.gamma(x2[1]), c0, c1);
        if y_turn > x2[0] {
            x2[0] - y2_raw
        } else {
            -(x2[0] - (2f64 * y_turn - y2_raw))
        }
    }
    /// [`delta_y`](RayTracer2D::delta_y) in the $\ln(C_0-1/n_{ice})$ coordinate
    pub fn obj_delta_y(&self, log_c0: f64, x1: Point2D, x2: Point2D) -> f64 {
        self.delta_y(self.c0_from_log(log_c0), x1, x2)
    }
    /// Squared [`obj_delta_y`](RayTracer2D::obj_delta_y)
    pub fn obj_delta_y_square(&self, log_c0: f64, x1: Point2D, x2: Point2D) -> f64 {
        self.obj_delta_y(log_c0, x1, x2).powi(2)
    }
    /// Classifies the ray $C_0$ from `x1` to `x2`
    pub fn solution_type(&self, x1: Point2D, x2: Point2D, c0: f64) -> SolutionType {
        let turn = self.clamped_turning_point(c0);
        let y_turn = self.y(turn.gamma, c0, self.c1(x1, c0));
        if x2[0] < y_turn {
            SolutionType::Direct
        } else if turn.z == 0f64 {
            SolutionType::Reflected
        } else {
            SolutionType::Refracted
        }
    }
    /// Finds all the rays from `x1` to `x2`
    ///
    /// `x2` must be at the right of and not deeper than `x1`.
    /// A least-squares solve from $\ln(C_0-1/n_{ice})=-1$ gives a first solution, then one
    /// more solution is looked for on each side of it. This assumes that there is at most one
    /// root on each side, which holds for the exponential profile but is not proven in general.
    pub fn find_solutions(&self, x1: Point2D, x2: Point2D) -> Vec<Solution> {
        let objective = |log_c0: f64| self.obj_delta_y(log_c0, x1, x2);
        event_if!(
            self.log_level,
            "ray_tracing_2d",
            DEBUG,
            "starting optimization with x0 = {:.2} -> C0 = {:.3}",
            SEED_LOG_C0,
            self.c0_from_log(SEED_LOG_C0)
        );
        let seed = least_squares(&objective, SEED_LOG_C0);
        let mut solutions = Vec::with_capacity(3);
        if seed.residual < SEED_ACCEPTANCE {
            self.push_solution(&mut solutions, x1, x2, seed.x);
        }
        let probes = [
            ('>', Probe::new(seed.x + PROBE_STEP, LOG_C0_MAX)),
            ('<', Probe::new(seed.x - PROBE_STEP, LOG_C0_MIN)),
        ];
        for &(side, probe) in probes.iter() {
            match probe.run(&objective).root() {
                Some(log_c0) => {
                    event_if!(
                        self.log_level,
                        "ray_tracing_2d",
                        INFO,
                        "solution with logC0 {} {:.3} exists",
                        side,
                        seed.x
                    );
                    self.push_solution(&mut solutions, x1, x2, log_c0);
                }
                None => event_if!(
                    self.log_level,
                    "ray_tracing_2d",
                    INFO,
                    "no solution with logC0 {} {:.3} exists",
                    side,
                    seed.x
                ),
            }
        }
        solutions
    }
    fn push_solution(&self, solutions: &mut Vec<Solution>, x1: Point2D, x2: Point2D, log_c0: f64) {
        let c0 = self.c0_from_log(log_c0);
        if solutions.iter().any(|s| round3(s.c0) == round3(c0)) {
            event_if!(
                self.log_level,
                "ray_tracing_2d",
                DEBUG,
                "solution C0 = {:.3} already found",
                c0
            );
            return;
        }
        let solution_type = self.solution_type(x1, x2, c0);
        event_if!(
            self.log_level,
            "ray_tracing_2d",
            INFO,
            "found {} solution C0 = {:.2}",
            solution_type,
            c0
        );
        solutions.push(Solution {
            solution_type,
            c0,
            c1: self.c1(x1, c0),
        });
    }
}

fn round3(x: f64) -> f64 {
    (x * 1e3).round() / 1e3
}
/// Piecewise linear interpolation of `samples`, extrapolated beyond the end segments
fn interpolate(samples: &[(f64, f64)], x: f64) -> f64 {
    if samples.len() < 2 {
        return samples.first().map_or(0f64, |s| s.1);
    }
    let k = samples[1..samples.len() - 1]
        .iter()
        .take_while(|s| s.0 < x)
        .count();
    let ((x0, y0), (x1, y1)) = (samples[k], samples[k + 1]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
