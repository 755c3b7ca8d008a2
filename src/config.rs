use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{RegistrationError, Result};
use crate::gradient::DEFAULT_STEP;
use crate::image::Image;
use crate::resample::Interpolation;
use crate::similarity::{Measure, Objective, DEFAULT_HISTOGRAM_BINS};
use crate::transform::{TransformKind, DEFAULT_TRANSLATION_SCALE};

pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Process-wide configuration, defaults when nothing was set
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

/// Registration task: transform kind plus similarity measure
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Task {
    #[default]
    RigidCorr,
    AffineCorr,
    AffineMi,
}

impl Task {
    pub fn transform_kind(&self) -> TransformKind {
        match self {
            Task::RigidCorr => TransformKind::Rigid,
            Task::AffineCorr | Task::AffineMi => TransformKind::Affine,
        }
    }

    pub fn measure(&self, bins: usize) -> Measure {
        match self {
            Task::RigidCorr | Task::AffineCorr => Measure::Correlation,
            Task::AffineMi => Measure::MutualInformation { bins },
        }
    }

    /// Tuned step size. Mutual information gradients are much larger and
    /// noisier than correlation gradients.
    pub fn learning_rate(&self) -> f64 {
        match self {
            Task::RigidCorr => 0.003,
            Task::AffineCorr => 0.0006,
            Task::AffineMi => 0.00006,
        }
    }

    pub fn num_iter(&self) -> usize {
        match self {
            Task::RigidCorr => 200,
            Task::AffineCorr => 250,
            Task::AffineMi => 50,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::RigidCorr => write!(f, "rigid_corr"),
            Task::AffineCorr => write!(f, "affine_corr"),
            Task::AffineMi => write!(f, "affine_mi"),
        }
    }
}

impl FromStr for Task {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "rigid_corr" => Ok(Task::RigidCorr),
            "affine_corr" => Ok(Task::AffineCorr),
            "affine_mi" => Ok(Task::AffineMi),
            _ => Err(RegistrationError::configuration(format!(
                "unknown task '{s}', expected rigid_corr, affine_corr or affine_mi"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
#[derive(clap::Parser)]
pub struct Config {
    #[clap(long, default_value = "rigid_corr")]
    pub task: Task,

    /// overrides the task's tuned learning rate
    #[clap(long)]
    pub learning_rate: Option<f64>,

    /// overrides the task's tuned iteration count
    #[clap(long)]
    pub num_iter: Option<usize>,

    #[clap(long, default_value = "0.001")]
    pub gradient_step: f64,

    #[clap(long, default_value = "16")]
    pub bins: usize,

    #[clap(long, default_value = "bilinear")]
    pub interpolation: Interpolation,

    #[clap(long, default_value = "100")]
    pub translation_scale: f64,

    #[clap(long, default_value = "0")]
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task: Task::default(),
            learning_rate: None,
            num_iter: None,
            gradient_step: DEFAULT_STEP,
            bins: DEFAULT_HISTOGRAM_BINS,
            interpolation: Interpolation::default(),
            translation_scale: DEFAULT_TRANSLATION_SCALE,
            seed: 0,
        }
    }
}

impl Config {
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate.unwrap_or_else(|| self.task.learning_rate())
    }

    pub fn num_iter(&self) -> usize {
        self.num_iter.unwrap_or_else(|| self.task.num_iter())
    }

    /// Objective for this task bound to the given images
    pub fn objective<'a>(&self, fixed: &'a Image, moving: &'a Image) -> Result<Objective<'a>> {
        Ok(Objective::new(
            fixed,
            moving,
            self.task.transform_kind(),
            self.task.measure(self.bins),
        )?
        .with_translation_scale(self.translation_scale)
        .with_interpolation(self.interpolation))
    }
}
