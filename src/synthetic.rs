use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::image::Image;
use crate::my_types::*;

/// Isotropic gaussian intensity bump
#[derive(Clone, Copy, Debug)]
pub struct Blob {
    pub x: f64,
    pub y: f64,
    pub sigma: f64,
    pub amplitude: f64,
}

impl Blob {
    pub fn new(x: f64, y: f64, sigma: f64, amplitude: f64) -> Self {
        Self {
            x,
            y,
            sigma,
            amplitude,
        }
    }
}

pub fn gaussian_blobs(shape: ImageShape, blobs: &[Blob]) -> Image {
    let (width, height) = shape;
    let mut image = Image::zeros(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = blobs
                .iter()
                .map(|b| {
                    let d2 = (x as f64 - b.x).powi(2) + (y as f64 - b.y).powi(2);
                    b.amplitude * (-d2 / (2. * b.sigma * b.sigma)).exp()
                })
                .sum();
            image.set_value(x, y, v);
        }
    }
    image
}

/// Shift content by whole pixels: `out(x, y) = image(x - dx, y - dy)`, zero fill
pub fn translate(image: &Image, dx: i64, dy: i64) -> Image {
    let mut out = Image::zeros(image.width, image.height);
    for y in 0..image.height {
        for x in 0..image.width {
            if let Some(v) = image.get(x as i64 - dx, y as i64 - dy) {
                out.set_value(x, y, v);
            }
        }
    }
    out
}

/// Uniform noise in [0, 1), reproducible for a given seed
pub fn noise(shape: ImageShape, seed: u64) -> Image {
    let (width, height) = shape;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let data = (0..width * height).map(|_| rng.gen::<f64>()).collect();
    Image {
        data,
        width,
        height,
    }
}

/// `image + amplitude * noise`, amplitude 0 returns a copy
pub fn add_noise(image: &Image, amplitude: f64, seed: u64) -> Image {
    let random = noise(image.shape(), seed);
    let data = image
        .data
        .iter()
        .zip(random.data.iter())
        .map(|(v, n)| v + amplitude * n)
        .collect();
    Image {
        data,
        width: image.width,
        height: image.height,
    }
}

/// Two-blob phantom and a copy shifted `shift` pixels to the left. Registering
/// the pair recovers a translation of `+shift` along x.
pub fn shifted_pair(shape: ImageShape, shift: i64) -> (Image, Image) {
    let (width, height) = shape;
    let (w, h) = (width as f64, height as f64);
    let fixed = gaussian_blobs(
        shape,
        &[
            Blob::new(0.44 * w, 0.47 * h, 0.094 * w, 1.),
            Blob::new(0.6 * w, 0.375 * h, 0.078 * w, 0.7),
        ],
    );
    let moving = translate(&fixed, -shift, 0);
    (fixed, moving)
}
