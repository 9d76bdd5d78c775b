use crate::nal::{H264NalHeader, H264NalUnitType, NalUnits};

/// FrameClassifier decides whether a compressed frame can be decoded
/// without reference to any earlier frame.
pub trait FrameClassifier {
    fn is_key_frame(&self, frame: &[u8]) -> bool;
}

impl<F> FrameClassifier for F
where
    F: Fn(&[u8]) -> bool,
{
    fn is_key_frame(&self, frame: &[u8]) -> bool {
        self(frame)
    }
}

/// Classifies Annex-B H.264 access units.
///
/// An access unit is a key frame when it carries a coded slice of an IDR
/// picture. With `with_parameter_sets_as_key` enabled, an access unit that
/// only starts with SPS/PPS (as some encoders emit for open-GOP recovery
/// points) is treated as a key frame as well.
#[derive(Debug, Default, Copy, Clone)]
pub struct H264FrameClassifier {
    parameter_sets_as_key: bool,
}

impl H264FrameClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter_sets_as_key(mut self, enabled: bool) -> Self {
        self.parameter_sets_as_key = enabled;
        self
    }
}

impl FrameClassifier for H264FrameClassifier {
    fn is_key_frame(&self, frame: &[u8]) -> bool {
        NalUnits::new(frame).any(|nal| {
            let unit_type = H264NalHeader::parse(nal[0]).unit_type;
            unit_type == H264NalUnitType::IdrSlice
                || (self.parameter_sets_as_key && unit_type == H264NalUnitType::Sps)
        })
    }
}
