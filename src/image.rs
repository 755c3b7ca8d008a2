use ndarray as nd;
use num_traits::ToPrimitive;

use crate::error::{RegistrationError, Result};
use crate::my_types::*;

/// Row-major grayscale image storage
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
}

impl Image {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Result<Image> {
        if data.len() != width * height {
            return Err(RegistrationError::shape_mismatch(
                &[width * height],
                &[data.len()],
            ));
        }
        Ok(Image {
            data,
            width,
            height,
        })
    }

    /// Create an image filled with zeros
    pub fn zeros(width: usize, height: usize) -> Image {
        Image {
            data: vec![0.; width * height],
            width,
            height,
        }
    }

    pub fn shape(&self) -> ImageShape {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn value(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Value at an integer location, `None` outside the image
    #[inline(always)]
    pub fn get(&self, x: i64, y: i64) -> Option<f64> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.value(x as usize, y as usize))
    }

    #[inline(always)]
    pub fn set_value(&mut self, x: usize, y: usize, value: f64) {
        self.data[y * self.width + x] = value;
    }

    /// Build from a 2D array indexed `[row, col]`, i.e. `[y, x]`
    pub fn from_array<T: ToPrimitive + Copy>(array: &nd::Array2<T>) -> Image {
        let (height, width) = array.dim();
        let data = array
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect();
        Image {
            data,
            width,
            height,
        }
    }

    /// Collapse a `[row, col, channel]` array to grayscale by averaging the channels
    pub fn from_channels<T: ToPrimitive + Copy>(array: &nd::Array3<T>) -> Image {
        let (height, width, channels) = array.dim();
        if channels == 0 {
            return Image::zeros(width, height);
        }
        let mut image = Image::zeros(width, height);
        for y in 0..height {
            for x in 0..width {
                let sum: f64 = (0..channels)
                    .map(|c| array[[y, x, c]].to_f64().unwrap_or(f64::NAN))
                    .sum();
                image.set_value(x, y, sum / channels as f64);
            }
        }
        image
    }

    pub fn to_array(&self) -> nd::Array2<f64> {
        // data length is checked at construction
        nd::Array2::from_shape_vec((self.height, self.width), self.data.clone())
            .unwrap_or_else(|_| nd::Array2::zeros((self.height, self.width)))
    }

    pub fn min_max(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Rescale intensities linearly into [0, 1]. A constant image maps to zeros.
    pub fn normalized(&self) -> Image {
        let (lo, hi) = self.min_max();
        let range = hi - lo;
        let data = if range > 0. {
            self.data.iter().map(|v| (v - lo) / range).collect()
        } else {
            vec![0.; self.data.len()]
        };
        Image {
            data,
            width: self.width,
            height: self.height,
        }
    }
}
