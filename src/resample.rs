use std::fmt;
use std::str::FromStr;

use crate::error::{RegistrationError, Result};
use crate::image::Image;
use crate::my_types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Nearest => write!(f, "nearest"),
            Interpolation::Bilinear => write!(f, "bilinear"),
        }
    }
}

impl FromStr for Interpolation {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "bilinear" | "linear" => Ok(Interpolation::Bilinear),
            _ => Err(RegistrationError::configuration(format!(
                "unknown interpolation '{s}'"
            ))),
        }
    }
}

/// Homogeneous coordinates (3 x N) of every pixel of an image, in row-major
/// pixel order. Row 0 holds x (column index), row 1 holds y (row index).
#[derive(Clone, Debug)]
pub struct CoordinateGrid {
    shape: ImageShape,
    points: Matrixd,
}

impl CoordinateGrid {
    pub fn new(shape: ImageShape) -> Self {
        let (width, height) = shape;
        let mut points = Matrixd::from_element(3, width * height, 1.);
        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                points[(0, i)] = x as f64;
                points[(1, i)] = y as f64;
            }
        }
        Self { shape, points }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn points(&self) -> &Matrixd {
        &self.points
    }
}

/// Resamples images under homogeneous transforms.
///
/// The transform maps moving-image coordinates into the output frame, so each
/// output pixel `p` reads the source image at `transform^-1 * p` (inverse
/// mapping). Locations outside `[0, w-1] x [0, h-1]` take the background value.
#[derive(Clone, Debug)]
pub struct Resampler {
    interpolation: Interpolation,
    background: f64,
    grid: Option<CoordinateGrid>,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(Interpolation::default())
    }
}

impl Resampler {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            interpolation,
            background: 0.,
            grid: None,
        }
    }

    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Grid for `shape`, rebuilt only when the shape changes
    pub fn grid(&mut self, shape: ImageShape) -> &CoordinateGrid {
        if !matches!(&self.grid, Some(grid) if grid.shape == shape) {
            self.grid = Some(CoordinateGrid::new(shape));
        }
        self.grid.as_ref().unwrap()
    }

    /// Returns the resampled image (same size as `image`) and the source
    /// coordinates every output pixel was sampled from (3 x N).
    ///
    /// A transform with non-finite entries maps every pixel to NaN, so a
    /// diverged run keeps producing NaN scores instead of failing.
    pub fn resample(&mut self, image: &Image, transform: &Matrix3d) -> Result<(Image, Matrixd)> {
        let inverse = if transform.iter().all(|v| v.is_finite()) {
            transform.try_inverse().ok_or_else(|| {
                RegistrationError::invalid_parameter("transform matrix is not invertible")
            })?
        } else {
            Matrix3d::from_element(f64::NAN)
        };
        let interpolation = self.interpolation;
        let background = self.background;
        let grid = self.grid(image.shape()).points();

        let n = grid.ncols();
        let mut mapped = Matrixd::from_element(3, n, 1.);
        let mut data = Vec::with_capacity(n);
        for i in 0..n {
            let (x, y) = (grid[(0, i)], grid[(1, i)]);
            let xs = inverse[(0, 0)] * x + inverse[(0, 1)] * y + inverse[(0, 2)];
            let ys = inverse[(1, 0)] * x + inverse[(1, 1)] * y + inverse[(1, 2)];
            mapped[(0, i)] = xs;
            mapped[(1, i)] = ys;
            data.push(sample(image, xs, ys, interpolation, background));
        }

        Ok((
            Image {
                data,
                width: image.width,
                height: image.height,
            },
            mapped,
        ))
    }
}

/// One-shot resampling without keeping a grid cache around
pub fn transform_image(
    image: &Image,
    transform: &Matrix3d,
    interpolation: Interpolation,
) -> Result<(Image, Matrixd)> {
    Resampler::new(interpolation).resample(image, transform)
}

/// NaN coordinates sample NaN, anything else outside the image is `background`
pub fn sample(image: &Image, x: f64, y: f64, interpolation: Interpolation, background: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        return f64::NAN;
    }
    if !in_bounds(image, x, y) {
        return background;
    }
    match interpolation {
        Interpolation::Nearest => image.value(x.round() as usize, y.round() as usize),
        Interpolation::Bilinear => bilinear(image, x, y),
    }
}

fn in_bounds(image: &Image, x: f64, y: f64) -> bool {
    if image.is_empty() {
        return false;
    }
    x >= 0. && y >= 0. && x <= (image.width - 1) as f64 && y <= (image.height - 1) as f64
}

/// Caller guarantees the location is inside the image
fn bilinear(image: &Image, x: f64, y: f64) -> f64 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = usize::min(x0 + 1, image.width - 1);
    let y1 = usize::min(y0 + 1, image.height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let top = (1. - fx) * image.value(x0, y0) + fx * image.value(x1, y0);
    let bottom = (1. - fx) * image.value(x0, y1) + fx * image.value(x1, y1);
    (1. - fy) * top + fy * bottom
}
