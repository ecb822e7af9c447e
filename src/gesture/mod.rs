pub mod classifier;
pub mod types;

pub use classifier::{classify, classify_with, magnitude};
pub use types::{GestureLabel, MotionSample, ParseGestureError};
