#![warn(rust_2018_idioms)]

pub mod classifier;
pub mod io;
pub mod nal;

pub use classifier::{FrameClassifier, H264FrameClassifier};
pub use nal::{H264NalHeader, H264NalUnitType, NalUnits};
