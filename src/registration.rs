use std::ops::ControlFlow;

use indicatif::ProgressStyle;
use serde::Serialize;
use tracing::{debug, info, instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::error::{RegistrationError, Result};
use crate::gradient::{ngradient, DEFAULT_STEP};
use crate::image::Image;
use crate::my_types::*;
use crate::similarity::Objective;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Initialized,
    Iterating,
    /// all `num_iter` iterations done
    Exhausted,
}

/// Outcome of a single gradient ascent update
#[derive(Clone, Debug)]
pub struct Step {
    /// 1-based
    pub iteration: usize,
    pub params: Vectord,
    pub score: f64,
    pub resampled: Image,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegistrationResult {
    pub params: Vectord,
    pub transform: Matrix3d,
    /// one score per iteration
    pub trajectory: Vec<f64>,
    #[serde(skip)]
    pub resampled: Option<Image>,
}

/// Fixed iteration count gradient ascent on a similarity objective.
///
/// There is no convergence test: the loop always performs `num_iter` updates
/// unless a caller stops it from `run_with`. Once the parameters diverge to
/// NaN every following score is NaN and recorded as such.
pub struct GradientAscent<'a> {
    objective: Objective<'a>,
    params: Vectord,
    learning_rate: f64,
    num_iter: usize,
    gradient_step: f64,
    iteration: usize,
    trajectory: Vec<f64>,
}

impl<'a> GradientAscent<'a> {
    pub fn new(
        objective: Objective<'a>,
        initial: Vectord,
        learning_rate: f64,
        num_iter: usize,
    ) -> Result<Self> {
        objective.kind().validate(&initial)?;
        if !learning_rate.is_finite() {
            return Err(RegistrationError::invalid_parameter(format!(
                "learning rate must be finite, got {learning_rate}"
            )));
        }
        Ok(Self {
            objective,
            params: initial,
            learning_rate,
            num_iter,
            gradient_step: DEFAULT_STEP,
            iteration: 0,
            trajectory: Vec::with_capacity(num_iter),
        })
    }

    /// Start from the identity transform of the objective's kind
    pub fn from_identity(objective: Objective<'a>, learning_rate: f64, num_iter: usize) -> Result<Self> {
        let initial = objective.kind().identity_parameters();
        Self::new(objective, initial, learning_rate, num_iter)
    }

    pub fn with_gradient_step(mut self, h: f64) -> Self {
        self.gradient_step = h;
        self
    }

    pub fn state(&self) -> RegistrationState {
        if self.iteration >= self.num_iter {
            RegistrationState::Exhausted
        } else if self.iteration == 0 {
            RegistrationState::Initialized
        } else {
            RegistrationState::Iterating
        }
    }

    pub fn params(&self) -> &Vectord {
        &self.params
    }

    pub fn trajectory(&self) -> &[f64] {
        &self.trajectory
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn num_iter(&self) -> usize {
        self.num_iter
    }

    pub fn objective_mut(&mut self) -> &mut Objective<'a> {
        &mut self.objective
    }

    /// One update: `x <- x + mu * grad(x)`, then re-evaluate at the new `x`.
    /// Parameters are only committed once the re-evaluation succeeded.
    pub fn step(&mut self) -> Result<Step> {
        if self.state() == RegistrationState::Exhausted {
            return Err(RegistrationError::invalid_parameter(format!(
                "no iterations left, all {} were used",
                self.num_iter
            )));
        }

        let objective = &mut self.objective;
        let g = ngradient(|p| objective.evaluate(p), &self.params, self.gradient_step)?;
        let mut params = self.params.clone();
        params.axpy(self.learning_rate, &g, 1.);

        let evaluation = self.objective.evaluate(&params)?;
        self.params = params;
        self.iteration += 1;
        self.trajectory.push(evaluation.score);
        debug!(
            iteration = self.iteration,
            score = evaluation.score,
            gradient_norm = g.norm(),
            "gradient ascent step"
        );
        Span::current().pb_inc(1);

        Ok(Step {
            iteration: self.iteration,
            params: self.params.clone(),
            score: evaluation.score,
            resampled: evaluation.resampled,
        })
    }

    pub fn run(self) -> Result<RegistrationResult> {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Run the remaining iterations, handing every step to `callback`.
    /// Returning `ControlFlow::Break` stops the loop early.
    #[instrument(skip_all, fields(kind = %self.objective.kind(), measure = %self.objective.measure()))]
    pub fn run_with<F>(mut self, mut callback: F) -> Result<RegistrationResult>
    where
        F: FnMut(&Step) -> ControlFlow<()>,
    {
        info!(
            learning_rate = self.learning_rate,
            num_iter = self.num_iter,
            "starting gradient ascent"
        );
        let span = Span::current();
        span.pb_set_style(&ProgressStyle::default_bar());
        span.pb_set_length(self.num_iter as u64);

        let mut resampled = None;
        while self.state() != RegistrationState::Exhausted {
            let step = self.step()?;
            let stop = callback(&step).is_break();
            resampled = Some(step.resampled);
            if stop {
                info!(iteration = self.iteration, "stopped by caller");
                break;
            }
        }
        self.finish(resampled)
    }

    fn finish(self, resampled: Option<Image>) -> Result<RegistrationResult> {
        let transform = self.objective.transform(&self.params)?;
        info!(
            iterations = self.iteration,
            final_score = self.trajectory.last().copied(),
            "registration finished"
        );
        Ok(RegistrationResult {
            params: self.params,
            transform,
            trajectory: self.trajectory,
            resampled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::shifted_pair;
    use crate::transform::TransformKind;

    #[test]
    fn test_state_machine() {
        let (fixed, moving) = shifted_pair((32, 32), 2);
        let objective = Objective::rigid_corr(&fixed, &moving).unwrap();
        let mut ascent = GradientAscent::from_identity(objective, 0.003, 2).unwrap();
        assert_eq!(ascent.state(), RegistrationState::Initialized);

        let step = ascent.step().unwrap();
        assert_eq!(step.iteration, 1);
        assert_eq!(ascent.state(), RegistrationState::Iterating);
        assert_eq!(&step.params, ascent.params());

        ascent.step().unwrap();
        assert_eq!(ascent.state(), RegistrationState::Exhausted);
        assert_eq!(ascent.trajectory().len(), 2);
        assert!(matches!(
            ascent.step(),
            Err(RegistrationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_update_follows_gradient() {
        let (fixed, moving) = shifted_pair((32, 32), 2);
        let mut objective = Objective::rigid_corr(&fixed, &moving).unwrap();
        let x0 = TransformKind::Rigid.identity_parameters();
        let g = ngradient(|p| objective.evaluate(p), &x0, DEFAULT_STEP).unwrap();

        let objective = Objective::rigid_corr(&fixed, &moving).unwrap();
        let mut ascent = GradientAscent::new(objective, x0.clone(), 0.001, 1).unwrap();
        let step = ascent.step().unwrap();
        let expected = x0 + g * 0.001;
        assert!((step.params - expected).norm() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_setup() {
        let (fixed, moving) = shifted_pair((16, 16), 1);
        let objective = Objective::affine_corr(&fixed, &moving).unwrap();
        assert!(GradientAscent::new(objective, Vectord::zeros(3), 0.1, 5).is_err());

        let objective = Objective::affine_corr(&fixed, &moving).unwrap();
        assert!(GradientAscent::from_identity(objective, f64::INFINITY, 5).is_err());
    }

    #[test]
    fn test_zero_iterations() {
        let (fixed, moving) = shifted_pair((16, 16), 1);
        let objective = Objective::rigid_corr(&fixed, &moving).unwrap();
        let ascent = GradientAscent::from_identity(objective, 0.003, 0).unwrap();
        assert_eq!(ascent.state(), RegistrationState::Exhausted);
        let result = ascent.run().unwrap();
        assert!(result.trajectory.is_empty());
        assert_eq!(result.transform, Matrix3d::identity());
        assert!(result.resampled.is_none());
    }

    #[test]
    fn test_early_stop() {
        let (fixed, moving) = shifted_pair((32, 32), 2);
        let objective = Objective::rigid_corr(&fixed, &moving).unwrap();
        let ascent = GradientAscent::from_identity(objective, 0.003, 50).unwrap();
        let result = ascent
            .run_with(|step| {
                if step.iteration == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(result.trajectory.len(), 3);
        assert!(result.resampled.is_some());
    }

    #[test]
    fn test_nan_reaches_trajectory() {
        let (fixed, mut moving) = shifted_pair((32, 32), 2);
        moving.data[5 * 32 + 5] = f64::NAN;
        let objective = Objective::rigid_corr(&fixed, &moving).unwrap();
        let ascent = GradientAscent::from_identity(objective, 0.003, 3).unwrap();
        let result = ascent.run().unwrap();
        assert_eq!(result.trajectory.len(), 3);
        assert!(result.trajectory.iter().all(|s| s.is_nan()));
        assert!(result.params.iter().all(|p| p.is_nan()));
    }

    #[test]
    fn test_failed_step_keeps_state() {
        let (fixed, moving) = shifted_pair((32, 32), 2);
        let objective = Objective::rigid_corr(&fixed, &moving).unwrap();
        // pushes the moving image far out of view, leaving only background
        let mut ascent = GradientAscent::from_identity(objective, 1e6, 5).unwrap();
        assert!(matches!(
            ascent.step(),
            Err(RegistrationError::DegenerateImage(_))
        ));
        assert_eq!(ascent.params(), &TransformKind::Rigid.identity_parameters());
        assert_eq!(ascent.iteration(), 0);
        assert!(ascent.trajectory().is_empty());
        assert_eq!(ascent.state(), RegistrationState::Initialized);
    }

    #[test]
    fn test_failure_aborts() {
        let fixed = Image::new(4, 4, vec![1.; 16]).unwrap();
        let objective = Objective::rigid_corr(&fixed, &fixed).unwrap();
        let ascent = GradientAscent::from_identity(objective, 0.003, 10).unwrap();
        assert!(matches!(
            ascent.run(),
            Err(RegistrationError::DegenerateImage(_))
        ));
    }
}
