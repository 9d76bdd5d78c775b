#[cfg(test)]
mod h264_reader_test;

use crate::nal::{H264NalHeader, H264NalUnitType, LONG_START_CODE, START_CODE, find_start_code};
use bytes::{BufMut, Bytes, BytesMut};
use log::trace;
use shared::error::{Error, Result};
use std::io::{ErrorKind, Read};

/// One H.264 NAL unit read from an Annex-B byte stream.
pub struct H264NAL {
    pub forbidden_zero_bit: bool,
    pub ref_idc: u8,
    pub unit_type: H264NalUnitType,

    /// header byte + rbsp, without start code
    pub data: BytesMut,
}

impl H264NAL {
    /// Wraps `data` and decodes its header byte. `data` must not be empty.
    pub fn new(data: BytesMut) -> Self {
        let header = H264NalHeader::parse(data[0]);
        H264NAL {
            forbidden_zero_bit: header.forbidden_zero_bit,
            ref_idc: header.ref_idc,
            unit_type: header.unit_type,
            data,
        }
    }

    /// Returns true when this slice starts a new picture, i.e. its
    /// `first_mb_in_slice` is zero. The field is the first ue(v) of the
    /// slice header, and ue(v) zero is encoded as a single `1` bit.
    pub fn is_first_slice_of_picture(&self) -> bool {
        self.unit_type.is_slice() && self.data.len() > 1 && (self.data[1] & 0x80) != 0
    }
}

/// H264Reader splits an Annex-B byte stream into NAL units.
///
/// The stream is read in chunks of `capacity` bytes; a NAL unit is complete
/// once the next start code (or the end of the stream) has been seen.
pub struct H264Reader<R: Read> {
    reader: R,
    chunk: Box<[u8]>,
    pending: BytesMut,
    started: bool,
    eof: bool,
}

impl<R: Read> H264Reader<R> {
    pub fn new(reader: R, capacity: usize) -> H264Reader<R> {
        H264Reader {
            reader,
            chunk: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pending: BytesMut::new(),
            started: false,
            eof: false,
        }
    }

    /// Appends the next chunk of the stream to `pending`.
    fn fill(&mut self) -> Result<()> {
        let n = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if n == 0 {
            self.eof = true;
        } else {
            self.pending.put_slice(&self.chunk[..n]);
        }
        Ok(())
    }

    /// The stream must open with a start code.
    fn skip_leading_start_code(&mut self) -> Result<()> {
        while self.pending.len() < LONG_START_CODE.len() && !self.eof {
            self.fill()?;
        }

        let prefix_len = if self.pending.starts_with(&LONG_START_CODE) {
            LONG_START_CODE.len()
        } else if self.pending.starts_with(&START_CODE) {
            START_CODE.len()
        } else if self.pending.is_empty() {
            return Err(Error::ErrIoEOF);
        } else {
            return Err(Error::ErrDataIsNotH264Stream);
        };

        let _ = self.pending.split_to(prefix_len);
        self.started = true;
        Ok(())
    }

    /// Returns the next NAL unit, or `Error::ErrIoEOF` when the stream holds
    /// no more.
    pub fn next_nal(&mut self) -> Result<H264NAL> {
        if !self.started {
            self.skip_leading_start_code()?;
        }

        let mut scan_from = 0;
        loop {
            let mut nal = match find_start_code(&self.pending, scan_from) {
                Some((prefix_start, prefix_end)) => {
                    let nal = self.pending.split_to(prefix_start);
                    let _ = self.pending.split_to(prefix_end - prefix_start);
                    scan_from = 0;
                    nal
                }
                None if self.eof => {
                    if self.pending.is_empty() {
                        return Err(Error::ErrIoEOF);
                    }
                    self.pending.split()
                }
                None => {
                    // a start code may straddle the chunk boundary
                    scan_from = self.pending.len().saturating_sub(START_CODE.len() - 1);
                    self.fill()?;
                    continue;
                }
            };

            // zeros before a start code belong to the long start code
            // or are trailing_zero_8bits
            while nal.last() == Some(&0) {
                nal.truncate(nal.len() - 1);
            }
            if !nal.is_empty() {
                return Ok(H264NAL::new(nal));
            }
        }
    }
}

/// AccessUnitReader groups the NAL units of an [`H264Reader`] into access
/// units (one compressed frame each), re-emitted as Annex-B with 4-byte
/// start codes so they can be pushed to a playback surface as-is.
pub struct AccessUnitReader<R: Read> {
    reader: H264Reader<R>,
    pending: Option<H264NAL>,
    eof: bool,
}

impl<R: Read> AccessUnitReader<R> {
    pub fn new(reader: R, capacity: usize) -> Self {
        Self {
            reader: H264Reader::new(reader, capacity),
            pending: None,
            eof: false,
        }
    }

    /// Returns the next access unit, or `Error::ErrIoEOF` once the stream
    /// is exhausted.
    pub fn next_access_unit(&mut self) -> Result<Bytes> {
        let mut access_unit = BytesMut::new();
        let mut has_slice = false;

        loop {
            let nal = match self.pending.take() {
                Some(nal) => nal,
                None if self.eof => break,
                None => match self.reader.next_nal() {
                    Ok(nal) => nal,
                    Err(Error::ErrIoEOF) => {
                        self.eof = true;
                        break;
                    }
                    Err(err) => return Err(err),
                },
            };

            let starts_new = nal.unit_type.starts_access_unit() || nal.is_first_slice_of_picture();
            if has_slice && starts_new {
                self.pending = Some(nal);
                break;
            }

            has_slice |= nal.unit_type.is_slice();
            access_unit.put_slice(&LONG_START_CODE);
            access_unit.put_slice(&nal.data);
        }

        if access_unit.is_empty() {
            return Err(Error::ErrIoEOF);
        }
        if !has_slice {
            trace!("access unit of {} bytes carries no slice", access_unit.len());
        }
        Ok(access_unit.freeze())
    }
}
