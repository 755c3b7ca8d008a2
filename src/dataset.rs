use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use image::GenericImageView;
use log::{debug, info};
use ndarray as nd;

use crate::image::Image;
use crate::point_based::ControlPoints;

/// Read an image file as grayscale intensities normalized to [0, 1].
/// Color images are collapsed by averaging their channels.
pub fn load_image(path: &Path) -> Result<Image> {
    let decoded = image::open(path).with_context(|| format!("failed to read image {}", path.display()))?;
    let (width, height) = (decoded.width() as usize, decoded.height() as usize);

    let image = if decoded.color().has_color() {
        let rgb = decoded.to_rgb32f().into_raw();
        let array = nd::Array3::from_shape_vec((height, width, 3), rgb)
            .map_err(|e| anyhow!("unexpected pixel layout in {}: {e}", path.display()))?;
        Image::from_channels(&array)
    } else {
        let luma = decoded.to_luma32f().into_raw();
        let array = nd::Array2::from_shape_vec((height, width), luma)
            .map_err(|e| anyhow!("unexpected pixel layout in {}: {e}", path.display()))?;
        Image::from_array(&array)
    };

    info!("loaded {} ({width} x {height})", path.display());
    Ok(image.normalized())
}

pub fn load_control_points(path: &Path) -> Result<ControlPoints> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let points: ControlPoints = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("JSON deserialization failed for {}", path.display()))?;
    debug!("read {} control point pairs", points.fixed.len());
    Ok(points)
}
