pub mod decode;

pub use decode::{AudioClip, TARGET_SAMPLE_RATE};
