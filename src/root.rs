//! Bracketing scalar root finders over fallible objective functions.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AiyagariError, Result};

/// Root-finding algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootMethod {
    /// Halves the bracket every iteration.
    Bisection,
    /// Brent's method: inverse quadratic interpolation guarded by bisection.
    Brent,
}

/// Stopping rules and iteration budget for a bracketing root finder.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RootOptions {
    /// Algorithm.
    pub method: RootMethod,
    /// Stop when the bracket is narrower than this.
    pub xtol: f64,
    /// Stop when `|f(x)|` falls to this level.
    pub ftol: f64,
    /// Maximum number of function evaluations after the two endpoints.
    pub max_iterations: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            method: RootMethod::Brent,
            xtol: 1e-8,
            ftol: 1e-10,
            max_iterations: 100,
        }
    }
}

/// Root estimate together with the final bracket.
#[derive(Clone, Debug, Serialize)]
pub struct RootResult {
    /// Best estimate of the root.
    pub root: f64,
    /// Function value at `root`.
    pub residual: f64,
    /// Number of evaluations after the two endpoints.
    pub iterations: usize,
    /// Final bracket, `lower <= upper`, with a sign change unless `residual` hit `ftol`.
    pub lower: f64,
    pub upper: f64,
    /// Function values at the final bracket ends.
    pub f_lower: f64,
    pub f_upper: f64,
}

impl RootResult {
    /// Width of the final bracket.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Finds a root of `f` on `[lower, upper]`.
///
/// Fails with [`AiyagariError::NoSignChange`] when `f(lower)` and `f(upper)`
/// share a strict sign, and [`AiyagariError::RootDidNotConverge`] when the
/// budget runs out. Negative or NaN tolerances are rejected before `f` is
/// evaluated. Errors from `f` itself propagate unchanged.
pub fn find_root<F>(
    mut f: F,
    lower: f64,
    upper: f64,
    options: &RootOptions,
) -> Result<RootResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    if !(lower < upper) {
        return Err(AiyagariError::invalid_parameter(
            "upper",
            upper,
            "bracket upper end must exceed the lower end",
        ));
    }
    if options.xtol.is_nan() || options.xtol < 0.0 {
        return Err(AiyagariError::invalid_parameter(
            "xtol",
            options.xtol,
            "bracket tolerance must be non-negative",
        ));
    }
    if options.ftol.is_nan() || options.ftol < 0.0 {
        return Err(AiyagariError::invalid_parameter(
            "ftol",
            options.ftol,
            "residual tolerance must be non-negative",
        ));
    }
    let f_lower = f(lower)?;
    let f_upper = f(upper)?;
    if f_lower.is_nan() || f_upper.is_nan() {
        return Err(AiyagariError::NumericalError {
            context: "root bracket evaluation",
        });
    }
    if f_lower.abs() <= options.ftol {
        return Ok(endpoint(lower, f_lower, lower, upper, f_lower, f_upper));
    }
    if f_upper.abs() <= options.ftol {
        return Ok(endpoint(upper, f_upper, lower, upper, f_lower, f_upper));
    }
    if f_lower.signum() == f_upper.signum() {
        return Err(AiyagariError::NoSignChange {
            lower,
            upper,
            f_lower,
            f_upper,
        });
    }

    match options.method {
        RootMethod::Bisection => bisection(f, lower, upper, f_lower, f_upper, options),
        RootMethod::Brent => brent(f, lower, upper, f_lower, f_upper, options),
    }
}

fn endpoint(
    root: f64,
    residual: f64,
    lower: f64,
    upper: f64,
    f_lower: f64,
    f_upper: f64,
) -> RootResult {
    RootResult {
        root,
        residual,
        iterations: 0,
        lower,
        upper,
        f_lower,
        f_upper,
    }
}

fn bisection<F>(
    mut f: F,
    mut lower: f64,
    mut upper: f64,
    mut f_lower: f64,
    mut f_upper: f64,
    options: &RootOptions,
) -> Result<RootResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    for iteration in 1..=options.max_iterations {
        let mid = 0.5 * (lower + upper);
        let f_mid = f(mid)?;
        debug!("bisection iteration {iteration}: x = {mid}, f = {f_mid}");
        if f_mid.signum() == f_lower.signum() {
            lower = mid;
            f_lower = f_mid;
        } else {
            upper = mid;
            f_upper = f_mid;
        }
        if f_mid.abs() <= options.ftol || upper - lower < options.xtol {
            let (root, residual) = if f_lower.abs() <= f_upper.abs() {
                (lower, f_lower)
            } else {
                (upper, f_upper)
            };
            return Ok(RootResult {
                root,
                residual,
                iterations: iteration,
                lower,
                upper,
                f_lower,
                f_upper,
            });
        }
    }

    Err(AiyagariError::RootDidNotConverge {
        iterations: options.max_iterations,
        width: upper - lower,
    })
}

fn brent<F>(
    mut f: F,
    lower: f64,
    upper: f64,
    f_lower: f64,
    f_upper: f64,
    options: &RootOptions,
) -> Result<RootResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    // `b` is the current estimate, `c` the opposite bracket end, `a` the previous `b`.
    let (mut a, mut b) = (lower, upper);
    let (mut fa, mut fb) = (f_lower, f_upper);
    let (mut c, mut fc) = (a, fa);
    let mut d = b - a;
    let mut e = d;

    for iteration in 1..=options.max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * options.xtol;
        let half = 0.5 * (c - b);
        if half.abs() <= tol || fb.abs() <= options.ftol {
            let (lower, upper, f_lower, f_upper) = if b <= c {
                (b, c, fb, fc)
            } else {
                (c, b, fc, fb)
            };
            return Ok(RootResult {
                root: b,
                residual: fb,
                iterations: iteration - 1,
                lower,
                upper,
                f_lower,
                f_upper,
            });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * half * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * half * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let interpolation_limit = 3.0 * half * q - (tol * q).abs();
            let step_limit = (e * q).abs();
            if 2.0 * p < interpolation_limit.min(step_limit) {
                e = d;
                d = p / q;
            } else {
                d = half;
                e = d;
            }
        } else {
            d = half;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(half) };
        fb = f(b)?;
        debug!("brent iteration {iteration}: x = {b}, f = {fb}");
    }

    Err(AiyagariError::RootDidNotConverge {
        iterations: options.max_iterations,
        width: (c - b).abs(),
    })
}
