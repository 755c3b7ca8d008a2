use std::fmt;
use std::str::FromStr;

use crate::error::{RegistrationError, Result};
use crate::math::*;
use crate::my_types::*;

/// Translation parameters are expressed in units of this many pixels so that
/// all entries of the parameter vector have comparable magnitude.
pub const DEFAULT_TRANSLATION_SCALE: f64 = 100.;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    /// angle, tx, ty
    Rigid,
    /// angle, sx, sy, shx, shy, tx, ty
    Affine,
}

impl TransformKind {
    pub fn parameter_count(&self) -> usize {
        match self {
            TransformKind::Rigid => 3,
            TransformKind::Affine => 7,
        }
    }

    /// Parameters of the identity transform, the usual starting point
    pub fn identity_parameters(&self) -> Vectord {
        match self {
            TransformKind::Rigid => Vectord::zeros(3),
            TransformKind::Affine => Vectord::from_vec(vec![0., 1., 1., 0., 0., 0., 0.]),
        }
    }

    pub fn validate(&self, params: &Vectord) -> Result<()> {
        if params.len() != self.parameter_count() {
            return Err(RegistrationError::invalid_parameter(format!(
                "{} transform expects {} parameters, got {}",
                self,
                self.parameter_count(),
                params.len()
            )));
        }
        Ok(())
    }

    /// Build the homogeneous matrix for `params`. Translation entries are
    /// multiplied by `translation_scale`.
    pub fn build(&self, params: &Vectord, translation_scale: f64) -> Result<Matrix3d> {
        self.validate(params)?;
        let th = match self {
            TransformKind::Rigid => build_rigid(
                params[0],
                params[1] * translation_scale,
                params[2] * translation_scale,
            ),
            TransformKind::Affine => build_affine(
                params[0],
                params[1],
                params[2],
                params[3],
                params[4],
                params[5] * translation_scale,
                params[6] * translation_scale,
            ),
        };
        Ok(th)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Rigid => write!(f, "rigid"),
            TransformKind::Affine => write!(f, "affine"),
        }
    }
}

impl FromStr for TransformKind {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rigid" => Ok(TransformKind::Rigid),
            "affine" => Ok(TransformKind::Affine),
            _ => Err(RegistrationError::configuration(format!(
                "unknown transform kind '{s}'"
            ))),
        }
    }
}

pub fn build_rigid(angle: f64, tx: f64, ty: f64) -> Matrix3d {
    t2h(&rotate(angle), &Vector2d::new(tx, ty))
}

/// Linear part is rotation * scale * shear.
pub fn build_affine(angle: f64, sx: f64, sy: f64, shx: f64, shy: f64, tx: f64, ty: f64) -> Matrix3d {
    let t_linear = rotate(angle) * scale(sx, sy) * shear(shx, shy);
    t2h(&t_linear, &Vector2d::new(tx, ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTTOM: [f64; 3] = [0., 0., 1.];

    fn bottom_row(th: &Matrix3d) -> [f64; 3] {
        [th[(2, 0)], th[(2, 1)], th[(2, 2)]]
    }

    #[test]
    fn test_bottom_row() {
        for &angle in &[-3.0, -0.7, 0., 0.25, 1.5, 6.2] {
            for &t in &[-40., 0., 13.5] {
                assert_eq!(bottom_row(&build_rigid(angle, t, -t)), BOTTOM);
                assert_eq!(
                    bottom_row(&build_affine(angle, 1.3, 0.4, 0.2, -0.1, t, 2. * t)),
                    BOTTOM
                );
            }
        }
    }

    #[test]
    fn test_identity() {
        for kind in [TransformKind::Rigid, TransformKind::Affine] {
            let th = kind
                .build(&kind.identity_parameters(), DEFAULT_TRANSLATION_SCALE)
                .unwrap();
            assert_eq!(th, Matrix3d::identity());
        }
    }

    #[test]
    fn test_rigid_is_rotation_plus_translation() {
        let th = build_rigid(0.5, 3., -2.);
        let linear = th.fixed_view::<2, 2>(0, 0).into_owned();
        assert!((linear.determinant() - 1.).abs() < 1e-12);
        assert!((linear.transpose() * linear - Matrix2d::identity()).norm() < 1e-12);
        assert_eq!(th[(0, 2)], 3.);
        assert_eq!(th[(1, 2)], -2.);
    }

    #[test]
    fn test_affine_composition() {
        let th = build_affine(0., 2., 3., 0., 0., 0., 0.);
        assert_eq!(th[(0, 0)], 2.);
        assert_eq!(th[(1, 1)], 3.);

        let th = build_affine(0., 1., 1., 0.5, 0., 0., 0.);
        assert_eq!(th[(0, 1)], 0.5);
        assert_eq!(th[(1, 0)], 0.);
    }

    #[test]
    fn test_translation_scale() {
        let params = Vectord::from_vec(vec![0., 0.08, -0.02]);
        let th = TransformKind::Rigid.build(&params, DEFAULT_TRANSLATION_SCALE).unwrap();
        assert!((th[(0, 2)] - 8.).abs() < 1e-12);
        assert!((th[(1, 2)] + 2.).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_parameter_count() {
        let err = TransformKind::Rigid
            .build(&Vectord::zeros(7), 1.)
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidParameter(_)));
        assert!(TransformKind::Affine.build(&Vectord::zeros(3), 1.).is_err());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("rigid".parse::<TransformKind>().unwrap(), TransformKind::Rigid);
        assert_eq!("Affine".parse::<TransformKind>().unwrap(), TransformKind::Affine);
        assert!(matches!(
            "projective".parse::<TransformKind>(),
            Err(RegistrationError::Configuration(_))
        ));
    }
}
