use nalgebra as na;

use crate::error::{RegistrationError, Result};
use crate::my_types::*;

/// Counter-clockwise rotation by `angle` radians
pub fn rotate(angle: f64) -> Matrix2d {
    let (s, c) = angle.sin_cos();
    Matrix2d::new(
        c, -s,
        s, c,
    )
}

pub fn scale(sx: f64, sy: f64) -> Matrix2d {
    Matrix2d::new(
        sx, 0.,
        0., sy,
    )
}

pub fn shear(shx: f64, shy: f64) -> Matrix2d {
    Matrix2d::new(
        1., shx,
        shy, 1.,
    )
}

/// Embed a 2x2 linear part and a translation into a homogeneous transform
/// `[[T, t], [0, 0, 1]]`.
pub fn t2h(t_linear: &Matrix2d, translation: &Vector2d) -> Matrix3d {
    let mut th = Matrix3d::identity();
    th.fixed_view_mut::<2, 2>(0, 0).copy_from(t_linear);
    th.fixed_view_mut::<2, 1>(0, 2).copy_from(translation);
    th
}

/// Cartesian (2 x N) to homogeneous (3 x N) coordinates
pub fn c2h(points: &Matrixd) -> Result<Matrixd> {
    if points.nrows() != 2 {
        return Err(RegistrationError::shape_mismatch(
            &[2, points.ncols()],
            &[points.nrows(), points.ncols()],
        ));
    }
    Ok(points.clone().insert_row(2, 1.))
}

/// Apply a homogeneous transform to a single point
pub fn transform_point(th: &Matrix3d, p: &Vector2d) -> Vector2d {
    let ph = th * na::Vector3::new(p[0], p[1], 1.);
    Vector2d::new(ph[0], ph[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotate() {
        let r = rotate(FRAC_PI_2);
        let p = r * Vector2d::new(1., 0.);
        assert!((p - Vector2d::new(0., 1.)).norm() < 1e-12);
        assert!((rotate(0.3).determinant() - 1.).abs() < 1e-12);
    }

    #[test]
    fn test_t2h() {
        let t = Matrix2d::new(1., 2., 3., 4.);
        let th = t2h(&t, &Vector2d::new(5., 6.));
        assert_eq!(
            th,
            Matrix3d::new(
                1., 2., 5.,
                3., 4., 6.,
                0., 0., 1.,
            )
        );
        assert_eq!(transform_point(&th, &Vector2d::new(1., 1.)), Vector2d::new(8., 13.));
    }

    #[test]
    fn test_c2h() {
        let x = na::dmatrix!(
            1., 2., 3.;
            4., 5., 6.;
        );
        let xh = c2h(&x).unwrap();
        assert_eq!(xh.nrows(), 3);
        assert_eq!(xh.row(0), x.row(0));
        assert_eq!(xh.row(1), x.row(1));
        assert!(xh.row(2).iter().all(|&v| v == 1.));

        assert!(c2h(&Matrixd::zeros(3, 2)).is_err());
    }
}
