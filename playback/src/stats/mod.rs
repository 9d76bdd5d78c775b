//! Decode-throughput statistics: sliding sample windows, the renderer
//! quality sampler and the momentum estimator built on top of them.

pub(crate) mod momentum;
pub(crate) mod sampler;
pub(crate) mod window;

pub use momentum::{MomentumEstimator, MomentumStats};
pub use sampler::QualitySampler;
pub use window::{InputSample, QualitySample, SampleStore};
