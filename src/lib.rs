pub mod config;
pub mod dataset;
pub mod error;
pub mod gradient;
pub mod image;
pub mod math;
pub mod my_types;
pub mod overlap;
pub mod point_based;
pub mod registration;
pub mod resample;
pub mod similarity;
pub mod synthetic;
pub mod transform;

pub use error::{RegistrationError, Result};
