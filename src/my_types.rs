use nalgebra as na; 

pub type Vector2d = na::Vector2::<f64>;
pub type Vector3d = na::Vector3::<f64>;
pub type Vectord = nalgebra::DVector::<f64>;

pub type Matrix2d = na::Matrix2::<f64>;
/// 2D transform in homogeneous form
pub type Matrix3d = na::Matrix3::<f64>;
pub type Matrixd = nalgebra::DMatrix::<f64>; 

/// (width, height)
pub type ImageShape = (usize, usize);
