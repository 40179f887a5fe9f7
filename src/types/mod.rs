//! Type definitions for the image classifier

pub mod image;
pub mod prediction;
pub mod status;

pub use self::image::SelectedImage;
pub use prediction::{Prediction, PredictionList};
pub use status::{StatusMessage, StatusTone};
