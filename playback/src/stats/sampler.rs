use super::window::QualitySample;
use crate::surface::OutputSurface;
use log::debug;
use std::time::Instant;

/// Reads the renderer's cumulative decode/drop counters once per frame.
///
/// Whether the backend exposes counters at all is probed on first use and
/// cached until [`reset_capability`](QualitySampler::reset_capability) is
/// called for a new backend.
#[derive(Debug, Default)]
pub struct QualitySampler {
    supported: Option<bool>,
}

impl QualitySampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first probe.
    pub fn is_supported(&self) -> Option<bool> {
        self.supported
    }

    pub fn reset_capability(&mut self) {
        self.supported = None;
    }

    pub fn sample_now<S>(&mut self, now: Instant, surface: &S) -> Option<QualitySample>
    where
        S: OutputSurface + ?Sized,
    {
        let supported = *self.supported.get_or_insert_with(|| {
            let supported = surface.supports_playback_quality();
            if !supported {
                debug!("output surface exposes no playback quality counters, momentum disabled");
            }
            supported
        });
        if !supported {
            return None;
        }

        let quality = surface.playback_quality()?;
        Some(QualitySample {
            timestamp: now,
            decoded_frames: quality.decoded_frames,
            dropped_frames: quality.dropped_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{PlaybackQuality, TimeRange};
    use shared::error::Result;
    use std::cell::Cell;

    struct CountersSurface {
        supported: bool,
        probes: Cell<u32>,
        quality: Option<PlaybackQuality>,
    }

    impl OutputSurface for CountersSurface {
        fn append_data(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn request_removal(&mut self, _start: f64, _end: f64) -> Result<()> {
            Ok(())
        }

        fn buffered_ranges(&self) -> Vec<TimeRange> {
            vec![]
        }

        fn supports_playback_quality(&self) -> bool {
            self.probes.set(self.probes.get() + 1);
            self.supported
        }

        fn playback_quality(&self) -> Option<PlaybackQuality> {
            self.quality
        }

        fn force_seek(&mut self, _position: f64) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sample_reads_counters() {
        let surface = CountersSurface {
            supported: true,
            probes: Cell::new(0),
            quality: Some(PlaybackQuality {
                decoded_frames: 42,
                dropped_frames: 3,
            }),
        };
        let mut sampler = QualitySampler::new();
        let now = Instant::now();

        let sample = sampler.sample_now(now, &surface).unwrap();
        assert_eq!(sample.timestamp, now);
        assert_eq!(sample.decoded_frames, 42);
        assert_eq!(sample.dropped_frames, 3);
        assert_eq!(sampler.is_supported(), Some(true));
    }

    #[test]
    fn test_capability_probed_once_per_backend() {
        let surface = CountersSurface {
            supported: false,
            probes: Cell::new(0),
            quality: None,
        };
        let mut sampler = QualitySampler::new();

        for _ in 0..5 {
            assert!(sampler.sample_now(Instant::now(), &surface).is_none());
        }
        assert_eq!(surface.probes.get(), 1);
        assert_eq!(sampler.is_supported(), Some(false));

        sampler.reset_capability();
        assert!(sampler.sample_now(Instant::now(), &surface).is_none());
        assert_eq!(surface.probes.get(), 2);
    }

    #[test]
    fn test_transient_unavailable_keeps_capability() {
        let surface = CountersSurface {
            supported: true,
            probes: Cell::new(0),
            quality: None,
        };
        let mut sampler = QualitySampler::new();

        assert!(sampler.sample_now(Instant::now(), &surface).is_none());
        assert_eq!(sampler.is_supported(), Some(true));
    }
}
