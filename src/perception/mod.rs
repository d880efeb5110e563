pub mod diff;
pub mod engine;
pub mod geometry;
#[cfg(feature = "ocr")]
pub mod ocr;
pub mod screenshot;
pub mod traits;
pub mod types;
