use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::{RegistrationError, Result};
use crate::image::Image;
use crate::my_types::*;
use crate::resample::{Interpolation, Resampler};
use crate::transform::{TransformKind, DEFAULT_TRANSLATION_SCALE};

pub const DEFAULT_HISTOGRAM_BINS: usize = 16;

fn check_same_shape(a: &Image, b: &Image) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(RegistrationError::shape_mismatch(
            &[a.width, a.height],
            &[b.width, b.height],
        ));
    }
    Ok(())
}

/// Pearson normalized cross-correlation of the flattened images
pub fn correlation(a: &Image, b: &Image) -> Result<f64> {
    check_same_shape(a, b)?;
    let mean_a = a.mean();
    let mean_b = b.mean();

    let mut uv = 0.;
    let mut uu = 0.;
    let mut vv = 0.;
    for (va, vb) in a.data.iter().zip(b.data.iter()) {
        let u = va - mean_a;
        let v = vb - mean_b;
        uv += u * v;
        uu += u * u;
        vv += v * v;
    }

    if uu == 0. || vv == 0. {
        return Err(RegistrationError::degenerate_image(
            "correlation is undefined for an image with zero variance",
        ));
    }
    Ok(uv / (uu.sqrt() * vv.sqrt()))
}

/// Normalized joint intensity histogram, rows indexed by `a`, columns by `b`.
///
/// Both images are quantized over one shared intensity range: `range` when
/// given, otherwise the min/max over both images.
pub fn joint_histogram(
    a: &Image,
    b: &Image,
    num_bins: usize,
    range: Option<(f64, f64)>,
) -> Result<Matrixd> {
    check_same_shape(a, b)?;
    if num_bins == 0 {
        return Err(RegistrationError::invalid_parameter(
            "joint histogram needs at least one bin",
        ));
    }
    if a.is_empty() {
        return Err(RegistrationError::degenerate_image("empty image"));
    }

    let (lo, hi) = range.unwrap_or_else(|| {
        let (lo_a, hi_a) = a.min_max();
        let (lo_b, hi_b) = b.min_max();
        (lo_a.min(lo_b), hi_a.max(hi_b))
    });
    let span = hi - lo;
    let top = (num_bins - 1) as f64;
    let bin = |v: f64| -> usize {
        if span <= 0. {
            return 0;
        }
        let t = ((v - lo) / span * top).round();
        // NaN ends up in bin 0
        t.max(0.).min(top) as usize
    };

    let mut p = Matrixd::zeros(num_bins, num_bins);
    for (va, vb) in a.data.iter().zip(b.data.iter()) {
        p[(bin(*va), bin(*vb))] += 1.;
    }
    p /= a.len() as f64;
    Ok(p)
}

/// Shannon entropy (nats) of any discrete distribution
pub fn entropy<'a>(p: impl IntoIterator<Item = &'a f64>) -> f64 {
    -p.into_iter()
        .filter(|&&v| v > 0.)
        .map(|&v| v * v.ln())
        .sum::<f64>()
}

/// Mutual information from a joint distribution. Empty cells contribute 0.
pub fn mutual_information(p: &Matrixd) -> f64 {
    let p_a = p.column_sum();
    let p_b = p.row_sum();

    let mut mi = 0.;
    for i in 0..p.nrows() {
        for j in 0..p.ncols() {
            let pij = p[(i, j)];
            if pij > 0. {
                mi += pij * (pij / (p_a[i] * p_b[j])).ln();
            }
        }
    }
    mi
}

/// Mutual information as H(A) + H(B) - H(A, B)
pub fn mutual_information_entropy(p: &Matrixd) -> f64 {
    let p_a = p.column_sum();
    let p_b = p.row_sum();
    entropy(p_a.iter()) + entropy(p_b.iter()) - entropy(p.iter())
}

/// Similarity measure, maximized by registration. Correlation lies in
/// [-1, 1], mutual information is non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measure {
    Correlation,
    MutualInformation { bins: usize },
}

impl Measure {
    pub fn compute(&self, fixed: &Image, moving: &Image) -> Result<f64> {
        match *self {
            Measure::Correlation => correlation(fixed, moving),
            Measure::MutualInformation { bins } => {
                joint_histogram(fixed, moving, bins, None).map(|p| mutual_information(&p))
            }
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Correlation => write!(f, "correlation"),
            Measure::MutualInformation { bins } => write!(f, "mutual information ({bins} bins)"),
        }
    }
}

impl FromStr for Measure {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cc" | "corr" | "correlation" => Ok(Measure::Correlation),
            "mi" | "mutual_information" => Ok(Measure::MutualInformation {
                bins: DEFAULT_HISTOGRAM_BINS,
            }),
            _ => Err(RegistrationError::configuration(format!(
                "unknown similarity measure '{s}'"
            ))),
        }
    }
}

/// One objective evaluation
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub score: f64,
    /// moving image resampled into the fixed frame
    pub resampled: Image,
    /// source coordinates of every resampled pixel
    pub grid: Matrixd,
}

/// Similarity between a fixed image and a transformed moving image, as a
/// function of the transform parameters only.
#[derive(Debug)]
pub struct Objective<'a> {
    fixed: &'a Image,
    moving: &'a Image,
    kind: TransformKind,
    measure: Measure,
    translation_scale: f64,
    resampler: Resampler,
}

impl<'a> Objective<'a> {
    pub fn new(
        fixed: &'a Image,
        moving: &'a Image,
        kind: TransformKind,
        measure: Measure,
    ) -> Result<Self> {
        check_same_shape(fixed, moving)?;
        Ok(Self {
            fixed,
            moving,
            kind,
            measure,
            translation_scale: DEFAULT_TRANSLATION_SCALE,
            resampler: Resampler::default(),
        })
    }

    pub fn rigid_corr(fixed: &'a Image, moving: &'a Image) -> Result<Self> {
        Self::new(fixed, moving, TransformKind::Rigid, Measure::Correlation)
    }

    pub fn affine_corr(fixed: &'a Image, moving: &'a Image) -> Result<Self> {
        Self::new(fixed, moving, TransformKind::Affine, Measure::Correlation)
    }

    pub fn affine_mi(fixed: &'a Image, moving: &'a Image) -> Result<Self> {
        Self::new(
            fixed,
            moving,
            TransformKind::Affine,
            Measure::MutualInformation {
                bins: DEFAULT_HISTOGRAM_BINS,
            },
        )
    }

    pub fn with_translation_scale(mut self, translation_scale: f64) -> Self {
        self.translation_scale = translation_scale;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.resampler = Resampler::new(interpolation);
        self
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }

    pub fn translation_scale(&self) -> f64 {
        self.translation_scale
    }

    pub fn transform(&self, params: &Vectord) -> Result<Matrix3d> {
        self.kind.build(params, self.translation_scale)
    }

    pub fn evaluate(&mut self, params: &Vectord) -> Result<Evaluation> {
        let th = self.transform(params)?;
        let (resampled, grid) = self.resampler.resample(self.moving, &th)?;
        let score = self.measure.compute(self.fixed, &resampled)?;
        trace!(score, "objective evaluated");
        Ok(Evaluation {
            score,
            resampled,
            grid,
        })
    }
}
