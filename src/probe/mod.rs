//! Artifact validation and dynamic-range detection

pub mod dynamic_range;
pub mod validator;

pub use dynamic_range::DynamicRangeDetector;
pub use validator::Validator;
