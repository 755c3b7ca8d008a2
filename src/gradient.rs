use crate::error::{RegistrationError, Result};
use crate::my_types::*;
use crate::similarity::Evaluation;

/// Default finite difference step
pub const DEFAULT_STEP: f64 = 1e-3;

/// Anything carrying the scalar a gradient is taken of
pub trait Scored {
    fn score(&self) -> f64;
}

impl Scored for f64 {
    fn score(&self) -> f64 {
        *self
    }
}

impl Scored for Evaluation {
    fn score(&self) -> f64 {
        self.score
    }
}

/// Central finite difference gradient of `f` at `x`.
///
/// `g[k] = (f(x + h/2 e_k) - f(x - h/2 e_k)) / h`, so `2 * x.len()` evaluations.
/// `x` is left untouched, every evaluation gets its own copy.
pub fn ngradient<F, S>(mut f: F, x: &Vectord, h: f64) -> Result<Vectord>
where
    F: FnMut(&Vectord) -> Result<S>,
    S: Scored,
{
    if !(h > 0. && h.is_finite()) {
        return Err(RegistrationError::invalid_parameter(format!(
            "finite difference step must be positive, got {h}"
        )));
    }

    let mut g = Vectord::zeros(x.len());
    for k in 0..x.len() {
        let mut x_plus = x.clone();
        x_plus[k] += h / 2.;
        let mut x_minus = x.clone();
        x_minus[k] -= h / 2.;

        let plus = f(&x_plus)?.score();
        let minus = f(&x_minus)?.score();
        g[k] = (plus - minus) / h;
    }
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_squares() {
        let f = |x: &Vectord| -> Result<f64> { Ok(x.iter().map(|v| v * v).sum()) };
        let x = Vectord::from_vec(vec![1.5, -2.]);
        let g = ngradient(f, &x, DEFAULT_STEP).unwrap();
        assert!((g[0] - 3.).abs() < 1e-6);
        assert!((g[1] + 4.).abs() < 1e-6);
    }

    #[test]
    fn test_second_order_accuracy() {
        let f = |x: &Vectord| -> Result<f64> { Ok(x[0].sin()) };
        let x = Vectord::from_vec(vec![0.7]);
        let err = |h: f64| (ngradient(f, &x, h).unwrap()[0] - 0.7_f64.cos()).abs();
        // halving h quarters the error
        let ratio = err(1e-2) / err(5e-3);
        assert!((ratio - 4.).abs() < 0.1);
    }

    #[test]
    fn test_input_not_mutated() {
        let x = Vectord::from_vec(vec![0.1, 1., 1., 0., 0., 0.02, -0.03]);
        let before = x.clone();
        let mut calls = 0;
        let f = |p: &Vectord| -> Result<f64> {
            calls += 1;
            Ok(p.sum())
        };
        ngradient(f, &x, DEFAULT_STEP).unwrap();
        assert_eq!(x, before);
        assert_eq!(calls, 14);
    }

    #[test]
    fn test_reads_score_field() {
        let f = |p: &Vectord| -> Result<Evaluation> {
            Ok(Evaluation {
                score: 2. * p[0],
                resampled: crate::image::Image::zeros(1, 1),
                grid: Matrixd::zeros(3, 1),
            })
        };
        let g = ngradient(f, &Vectord::zeros(1), DEFAULT_STEP).unwrap();
        assert!((g[0] - 2.).abs() < 1e-9);
    }

    #[test]
    fn test_error_propagates() {
        let f = |_: &Vectord| -> Result<f64> { Err(RegistrationError::degenerate_image("flat")) };
        assert!(ngradient(f, &Vectord::zeros(2), DEFAULT_STEP).is_err());
        let ok = |_: &Vectord| -> Result<f64> { Ok(0.) };
        assert!(ngradient(ok, &Vectord::zeros(2), 0.).is_err());
        assert!(ngradient(ok, &Vectord::zeros(2), f64::NAN).is_err());
    }
}
