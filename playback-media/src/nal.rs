use std::fmt;

/// Annex-B start code, in its short and long forms.
pub(crate) const START_CODE: [u8; 3] = [0, 0, 1];
pub(crate) const LONG_START_CODE: [u8; 4] = [0, 0, 0, 1];

/// The NAL unit types access-unit grouping and key-frame detection care
/// about. Every other `nal_unit_type` is carried as [`Other`](Self::Other).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum H264NalUnitType {
    NonIdrSlice,
    PartitionA,
    IdrSlice,
    Sei,
    Sps,
    Pps,
    Aud,
    Other(u8),
}

impl H264NalUnitType {
    /// The 5-bit `nal_unit_type` code.
    pub fn code(&self) -> u8 {
        match *self {
            H264NalUnitType::NonIdrSlice => 1,
            H264NalUnitType::PartitionA => 2,
            H264NalUnitType::IdrSlice => 5,
            H264NalUnitType::Sei => 6,
            H264NalUnitType::Sps => 7,
            H264NalUnitType::Pps => 8,
            H264NalUnitType::Aud => 9,
            H264NalUnitType::Other(code) => code,
        }
    }

    /// VCL units whose header starts with `first_mb_in_slice`.
    pub fn is_slice(&self) -> bool {
        matches!(
            self,
            H264NalUnitType::NonIdrSlice | H264NalUnitType::PartitionA | H264NalUnitType::IdrSlice
        )
    }

    /// Units that may only appear before the first slice of an access unit.
    pub fn starts_access_unit(&self) -> bool {
        matches!(
            self,
            H264NalUnitType::Aud | H264NalUnitType::Sps | H264NalUnitType::Pps | H264NalUnitType::Sei
        )
    }
}

impl fmt::Display for H264NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            H264NalUnitType::NonIdrSlice => "NonIdrSlice",
            H264NalUnitType::PartitionA => "PartitionA",
            H264NalUnitType::IdrSlice => "IdrSlice",
            H264NalUnitType::Sei => "SEI",
            H264NalUnitType::Sps => "SPS",
            H264NalUnitType::Pps => "PPS",
            H264NalUnitType::Aud => "AUD",
            H264NalUnitType::Other(_) => "Other",
        };
        write!(f, "{}({})", name, self.code())
    }
}

impl From<u8> for H264NalUnitType {
    fn from(code: u8) -> Self {
        match code & 0x1F {
            1 => H264NalUnitType::NonIdrSlice,
            2 => H264NalUnitType::PartitionA,
            5 => H264NalUnitType::IdrSlice,
            6 => H264NalUnitType::Sei,
            7 => H264NalUnitType::Sps,
            8 => H264NalUnitType::Pps,
            9 => H264NalUnitType::Aud,
            other => H264NalUnitType::Other(other),
        }
    }
}

/// Header fields of a single H.264 NAL unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct H264NalHeader {
    pub forbidden_zero_bit: bool,
    pub ref_idc: u8,
    pub unit_type: H264NalUnitType,
}

impl H264NalHeader {
    /// Splits the one-byte header `f(1) | nal_ref_idc(2) | nal_unit_type(5)`.
    pub fn parse(first_byte: u8) -> Self {
        Self {
            forbidden_zero_bit: first_byte & 0x80 != 0,
            ref_idc: (first_byte >> 5) & 0x03,
            unit_type: H264NalUnitType::from(first_byte),
        }
    }
}

/// Iterator over the NAL units of an Annex-B buffer.
///
/// Yields each NAL unit (header byte + rbsp) without its start code.
/// Trailing zero bytes that belong to the next 4-byte start code are
/// stripped. A buffer without any start code yields nothing.
pub struct NalUnits<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> NalUnits<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let pos = find_start_code(data, 0).map_or(data.len(), |(_, end)| end);
        Self { data, pos }
    }
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.data.len() {
            let start = self.pos;
            let (nal_end, next_pos) = match find_start_code(self.data, start) {
                Some((prefix_start, prefix_end)) => (prefix_start, prefix_end),
                None => (self.data.len(), self.data.len()),
            };
            self.pos = next_pos;

            let mut end = nal_end;
            while end > start && self.data[end - 1] == 0 {
                end -= 1;
            }
            if end > start {
                return Some(&self.data[start..end]);
            }
        }
        None
    }
}

/// Finds the next `00 00 01` start code at or after `from`.
/// Returns the index of the first prefix byte and the index right after it.
pub(crate) fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    data.get(from..)?
        .windows(START_CODE.len())
        .position(|w| w == START_CODE)
        .map(|i| (from + i, from + i + START_CODE.len()))
}
