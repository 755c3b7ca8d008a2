use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};
use crate::math::c2h;
use crate::my_types::*;

const RANK_EPS: f64 = 1e-9;

/// Corresponding points picked in the fixed and moving images, `[x, y]` each
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlPoints {
    pub fixed: Vec<[f64; 2]>,
    pub moving: Vec<[f64; 2]>,
}

impl ControlPoints {
    /// Homogeneous 3 x N matrices `(fixed, moving)`
    pub fn to_homogeneous(&self) -> Result<(Matrixd, Matrixd)> {
        if self.fixed.len() != self.moving.len() {
            return Err(RegistrationError::shape_mismatch(
                &[self.fixed.len()],
                &[self.moving.len()],
            ));
        }
        let to_matrix = |points: &[[f64; 2]]| -> Result<Matrixd> {
            let cartesian = Matrixd::from_fn(2, points.len(), |r, c| points[c][r]);
            c2h(&cartesian)
        };
        Ok((to_matrix(&self.fixed)?, to_matrix(&self.moving)?))
    }
}

/// Least squares affine `A` such that `A * xm ≈ x`.
///
/// `x` and `xm` are 3 x N homogeneous point sets (fixed and moving) with at
/// least 3 non-collinear points. The result maps moving coordinates into the
/// fixed frame, which is what the resampler expects.
pub fn ls_affine(x: &Matrixd, xm: &Matrixd) -> Result<Matrix3d> {
    if x.nrows() != 3 || xm.nrows() != 3 || x.ncols() != xm.ncols() {
        return Err(RegistrationError::shape_mismatch(
            &[3, x.ncols()],
            &[xm.nrows(), xm.ncols()],
        ));
    }
    let n = x.ncols();
    if n < 3 {
        return Err(RegistrationError::invalid_parameter(format!(
            "an affine fit needs at least 3 point pairs, got {n}"
        )));
    }

    // one least squares problem per output row: xm^T a_r = x_r^T
    let design = xm.transpose();
    let targets = x.rows(0, 2).transpose();
    let svd = design.svd(true, true);
    if svd.rank(RANK_EPS) < 3 {
        return Err(RegistrationError::invalid_parameter(
            "control points are collinear",
        ));
    }
    let solution = svd
        .solve(&targets, RANK_EPS)
        .map_err(RegistrationError::invalid_parameter)?;

    let mut a = Matrix3d::identity();
    for r in 0..2 {
        for c in 0..3 {
            a[(r, c)] = solution[(c, r)];
        }
    }
    Ok(a)
}

/// F-shaped test object (2 x 11), optionally centered on its centroid
pub fn test_object(centered: bool) -> Matrixd {
    let mut x = nalgebra::dmatrix!(
        4., 4., 4.5, 4.5, 6., 6., 4.5, 4.5, 7., 7., 4.;
        10., 4., 4., 7., 7., 7.5, 7.5, 9.5, 9.5, 10., 10.;
    );
    if centered {
        for mut row in x.row_iter_mut() {
            let mean = row.mean();
            row.add_scalar_mut(-mean);
        }
    }
    x
}
