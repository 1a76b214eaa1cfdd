//! Globally adaptive Gauss-Kronrod quadrature
//!
//! The interval is integrated with the 15 points Kronrod rule, the embedded 7 points Gauss
//! rule giving the error estimate. The subinterval with the largest error is bisected until
//! the total error meets the tolerance or the subinterval budget is spent.

use std::cmp::Ordering;

/// Maximum number of subintervals
pub const LIMIT: usize = 100;

const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144845693013,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.000000000000000000000000000000000,
];
const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];
const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

/// Result of a quadrature
#[derive(Debug, Clone, Copy)]
pub struct Integral {
    /// Integral estimate
    pub value: f64,
    /// Absolute error estimate
    pub error: f64,
    /// Number of subintervals used
    pub n_intervals: usize,
}
impl Integral {
    /// Whether the error estimate meets the tolerance
    pub fn converged(&self, epsabs: f64, epsrel: f64) -> bool {
        self.error <= epsabs.max(epsrel * self.value.abs())
    }
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}
impl Interval {
    fn new<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> Self {
        let center = 0.5 * (a + b);
        let half_length = 0.5 * (b - a);
        let fc = f(center);
        let mut kronrod = fc * WGK[7];
        let mut gauss = fc * WG[3];
        for j in 0..7 {
            let dx = half_length * XGK[j];
            let sum = f(center - dx) + f(center + dx);
            kronrod += WGK[j] * sum;
            if j % 2 == 1 {
                gauss += WG[j / 2] * sum;
            }
        }
        Self {
            a,
            b,
            value: kronrod * half_length,
            error: ((kronrod - gauss) * half_length).abs(),
        }
    }
    fn bisect<F: Fn(f64) -> f64>(&self, f: &F) -> (Self, Self) {
        let m = 0.5 * (self.a + self.b);
        (Self::new(f, self.a, m), Self::new(f, m, self.b))
    }
}

/// Integrates `f` from `a` to `b` to within `max(epsabs, epsrel |I|)`
pub fn integrate<F>(f: F, a: f64, b: f64, epsabs: f64, epsrel: f64) -> Integral
where
    F: Fn(f64) -> f64,
{
    integrate_with_limit(f, a, b, epsabs, epsrel, LIMIT)
}
/// Integrates `f` from `a` to `b` with at most `limit` subintervals
pub fn integrate_with_limit<F>(
    f: F,
    a: f64,
    b: f64,
    epsabs: f64,
    epsrel: f64,
    limit: usize,
) -> Integral
where
    F: Fn(f64) -> f64,
{
    if a == b {
        return Integral {
            value: 0f64,
            error: 0f64,
            n_intervals: 0,
        };
    }
    let mut intervals = vec![Interval::new(&f, a, b)];
    loop {
        let integral = Integral {
            value: intervals.iter().map(|i| i.value).sum(),
            error: intervals.iter().map(|i| i.error).sum(),
            n_intervals: intervals.len(),
        };
        if integral.converged(epsabs, epsrel) || intervals.len() >= limit.max(1) {
            return integral;
        }
        let worst = intervals
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.error.partial_cmp(&y.error).unwrap_or(Ordering::Equal))
            .map(|(k, _)| k)
            .unwrap_or(0);
        let (left, right) = intervals.swap_remove(worst).bisect(&f);
        intervals.push(left);
        intervals.push(right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn polynomial_is_exact() {
        let i = integrate(|x| 3. * x * x - 2. * x + 1., -1., 2., 0., 1e-12);
        assert_relative_eq!(i.value, 9., max_relative = 1e-13);
        assert_eq!(i.n_intervals, 1);
    }

    #[test]
    fn oscillating() {
        let i = integrate(|x| (10. * x).sin().powi(2), 0., PI, 0., 1e-10);
        assert_relative_eq!(i.value, PI / 2., max_relative = 1e-10);
        assert!(i.converged(0., 1e-10));
    }

    #[test]
    fn reversed_bounds() {
        let i = integrate(f64::exp, 1., 0., 0., 1e-12);
        assert_relative_eq!(i.value, 1. - std::f64::consts::E, max_relative = 1e-12);
    }

    #[test]
    fn inverse_square_root_singularity() {
        let i = integrate(|x| 1. / x.sqrt(), 0., 1., 0., 1e-6);
        assert_relative_eq!(i.value, 2., max_relative = 1e-4);
    }

    #[test]
    fn budget_is_bounded() {
        let i = integrate_with_limit(|x| (1. / x).sin() / x, 1e-6, 1., 0., 1e-14, 20);
        assert!(i.n_intervals <= 21);
    }
}
