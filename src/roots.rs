//! Scalar root finding
//!
//! Two tools are combined to find the roots of a residual $f(x)$ that may take infinite
//! values outside of its domain:
//!  - a Gauss-Newton least-squares solve of $\min f(x)^2$ from an initial guess,
//!  - a [`Probe`] that looks for a sign change of $f$ between two abscissas and bisects it.

/// Residual below which the least-squares iteration stops
pub const LEAST_SQUARES_FTOL: f64 = 1e-9;
/// Residual above which a bisected sign change is not a root but a discontinuity
pub const ROOT_TOLERANCE: f64 = 1e-4;

const MAX_ITERATIONS: usize = 100;
const MAX_BACKTRACKS: usize = 40;
const MAX_STEP: f64 = 2.;
const DERIVATIVE_STEP: f64 = 1e-6;
const XTOL: f64 = 1e-14;
const MAX_BISECTIONS: usize = 200;
const BISECTION_XTOL: f64 = 1e-13;

/// Sign of `x`: -1, 0 or 1, `None` for NaN
pub fn sign(x: f64) -> Option<i8> {
    if x.is_nan() {
        None
    } else if x > 0f64 {
        Some(1)
    } else if x < 0f64 {
        Some(-1)
    } else {
        Some(0)
    }
}

/// Outcome of [`least_squares`]
#[derive(Debug, Clone, Copy)]
pub struct LeastSquares {
    /// Final abscissa
    pub x: f64,
    /// $f(x)^2$
    pub residual: f64,
    /// Number of Gauss-Newton steps
    pub iterations: usize,
}

/// Minimizes $f(x)^2$ starting from `x0`
///
/// Gauss-Newton steps $-f/f'$, with a central difference derivative, clamped and halved
/// until the residual decreases. Where $f'$ vanishes or is infinite, steps of the maximum
/// length are tried on both sides instead. The iteration stops at a root or when no step
/// decreases the residual; the last point is returned in any case.
pub fn least_squares<F>(f: &F, x0: f64) -> LeastSquares
where
    F: Fn(f64) -> f64,
{
    let mut x = x0;
    let mut fx = f(x);
    let mut iterations = 0;
    while iterations < MAX_ITERATIONS {
        if !fx.is_finite() || fx.abs() < LEAST_SQUARES_FTOL {
            break;
        }
        iterations += 1;
        let h = DERIVATIVE_STEP * x.abs().max(1f64);
        let dfdx = (f(x + h) - f(x - h)) / (2f64 * h);
        let next = if dfdx.is_finite() && dfdx.abs() * h > f64::EPSILON * fx.abs() {
            backtrack(f, x, fx, (-fx / dfdx).max(-MAX_STEP).min(MAX_STEP))
        } else {
            // stationary point: full steps on both sides
            match (backtrack(f, x, fx, MAX_STEP), backtrack(f, x, fx, -MAX_STEP)) {
                (Some(up), Some(down)) => Some(if up.1.abs() <= down.1.abs() { up } else { down }),
                (up, down) => up.or(down),
            }
        };
        match next {
            Some((x_next, f_next)) => {
                let dx = x_next - x;
                x = x_next;
                fx = f_next;
                if dx.abs() < XTOL {
                    break;
                }
            }
            None => break,
        }
    }
    LeastSquares {
        x,
        residual: fx * fx,
        iterations,
    }
}
fn backtrack<F>(f: &F, x: f64, fx: f64, step: f64) -> Option<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let mut lambda = 1f64;
    for _ in 0..MAX_BACKTRACKS {
        let x_next = x + lambda * step;
        let f_next = f(x_next);
        if f_next.is_finite() && f_next.abs() < fx.abs() {
            return Some((x_next, f_next));
        }
        lambda *= 0.5;
    }
    None
}

/// Bisects the sign change of `f` between `a` and `b`
///
/// Returns the end of the final bracket with the smallest $|f|$.
pub fn bisect<F>(f: &F, mut a: f64, mut fa: f64, mut b: f64, mut fb: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    for _ in 0..MAX_BISECTIONS {
        if (b - a).abs() <= BISECTION_XTOL * a.abs().max(1f64) {
            break;
        }
        let m = 0.5 * (a + b);
        let fm = f(m);
        if fm == 0f64 {
            return m;
        }
        if sign(fm) == sign(fa) {
            a = m;
            fa = fm;
        } else {
            b = m;
            fb = fm;
        }
    }
    if fa.abs() < fb.abs() {
        a
    } else {
        b
    }
}

/// # Root probe
///
/// Looks for one root of $f$ between `from` and `to`:
///
/// `Searching` → `Bracketed` | `NoRoot`, `Bracketed` → `Converged` | `NoRoot`
///
/// A probe finds at most one root: if the interval holds an even number of roots there is
/// no sign change and the probe ends in `NoRoot`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    /// Sign of $f$ at both ends still to be compared
    Searching { from: f64, to: f64 },
    /// $f$ changes sign between `a` and `b`
    Bracketed { a: f64, fa: f64, b: f64, fb: f64 },
    /// Root found
    Converged(f64),
    /// No sign change, or the sign change is a discontinuity
    NoRoot,
}
impl Probe {
    pub fn new(from: f64, to: f64) -> Self {
        Probe::Searching { from, to }
    }
    pub fn is_terminal(&self) -> bool {
        matches!(self, Probe::Converged(_) | Probe::NoRoot)
    }
    /// Advances the probe by one state
    pub fn step<F>(self, f: &F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        match self {
            Probe::Searching { from, to } => {
                let (f_from, f_to) = (f(from), f(to));
                match (sign(f_from), sign(f_to)) {
                    (Some(s_from), Some(s_to)) if s_from != s_to => Probe::Bracketed {
                        a: from,
                        fa: f_from,
                        b: to,
                        fb: f_to,
                    },
                    _ => Probe::NoRoot,
                }
            }
            Probe::Bracketed { a, fa, b, fb } => {
                let root = bisect(f, a, fa, b, fb);
                if f(root).abs() < ROOT_TOLERANCE {
                    Probe::Converged(root)
                } else {
                    Probe::NoRoot
                }
            }
            terminal => terminal,
        }
    }
    /// Steps the probe to completion
    pub fn run<F>(self, f: &F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let mut probe = self;
        while !probe.is_terminal() {
            probe = probe.step(f);
        }
        probe
    }
    /// The root of a converged probe
    pub fn root(&self) -> Option<f64> {
        match self {
            Probe::Converged(root) => Some(*root),
            _ => None,
        }
    }
}
