#![warn(rust_2018_idioms)]

pub mod error;
pub(crate) mod message;

pub use message::{FrameMessage, TaggedBytes};
