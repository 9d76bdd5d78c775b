use super::*;
use std::io::Cursor;

const STREAM: [u8; 39] = [
    0x00, 0x00, 0x00, 0x01, 0x09, 0xF0, // AUD
    0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1F, // SPS
    0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, // PPS
    0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, // IDR, first_mb_in_slice = 0
    0x00, 0x00, 0x00, 0x01, 0x41, 0x9A, // P, first_mb_in_slice = 0
    0x00, 0x00, 0x01, 0x41, 0x9B, 0x02, // P, 3-byte prefix
];

#[test]
fn test_data_does_not_start_with_h264_header() {
    let test_function = |input: &[u8]| {
        let mut reader = H264Reader::new(Cursor::new(input), 1_048_576);
        match reader.next_nal() {
            Err(err) => assert_eq!(err, Error::ErrDataIsNotH264Stream),
            Ok(_) => panic!("should fail"),
        }
    };

    test_function(&[2]);
    test_function(&[0, 2]);
    test_function(&[0, 0, 2]);
    test_function(&[0, 0, 2, 0]);
    test_function(&[0, 0, 0, 2]);
}

#[test]
fn test_empty_stream_is_eof() {
    let mut reader = H264Reader::new(Cursor::new(&[][..]), 1_048_576);
    assert_eq!(reader.next_nal().err(), Some(Error::ErrIoEOF));
}

#[test]
fn test_parse_header() -> Result<()> {
    let mut reader = H264Reader::new(Cursor::new(&STREAM[..]), 1_048_576);

    let expected = [
        H264NalUnitType::Aud,
        H264NalUnitType::Sps,
        H264NalUnitType::Pps,
        H264NalUnitType::IdrSlice,
        H264NalUnitType::NonIdrSlice,
        H264NalUnitType::NonIdrSlice,
    ];
    for unit_type in expected {
        let nal = reader.next_nal()?;
        assert_eq!(nal.unit_type, unit_type);
        assert!(!nal.forbidden_zero_bit);
    }
    assert_eq!(reader.next_nal().err(), Some(Error::ErrIoEOF));

    Ok(())
}

#[test]
fn test_small_read_buffer() -> Result<()> {
    // Force NAL boundaries to straddle buffer refills.
    let mut reader = H264Reader::new(Cursor::new(&STREAM[..]), 3);

    let sps = {
        reader.next_nal()?;
        reader.next_nal()?
    };
    assert_eq!(&sps.data[..], &[0x67, 0x42, 0x00, 0x1F]);

    let pps = reader.next_nal()?;
    assert_eq!(&pps.data[..], &[0x68, 0xCE]);

    Ok(())
}

#[test]
fn test_access_unit_grouping() -> Result<()> {
    let mut reader = AccessUnitReader::new(Cursor::new(&STREAM[..]), 1_048_576);

    let key = reader.next_access_unit()?;
    assert_eq!(
        &key[..],
        &[
            0x00, 0x00, 0x00, 0x01, 0x09, 0xF0, //
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1F, //
            0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, //
            0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84,
        ]
    );

    let p1 = reader.next_access_unit()?;
    assert_eq!(&p1[..], &[0x00, 0x00, 0x00, 0x01, 0x41, 0x9A]);

    let p2 = reader.next_access_unit()?;
    assert_eq!(&p2[..], &[0x00, 0x00, 0x00, 0x01, 0x41, 0x9B, 0x02]);

    assert_eq!(reader.next_access_unit().err(), Some(Error::ErrIoEOF));
    assert_eq!(reader.next_access_unit().err(), Some(Error::ErrIoEOF));

    Ok(())
}

#[test]
fn test_first_slice_of_picture() {
    let nal = H264NAL::new(BytesMut::from(&[0x41, 0x9A][..]));
    assert!(nal.is_first_slice_of_picture());

    // first_mb_in_slice != 0: continuation slice of the same picture
    let nal = H264NAL::new(BytesMut::from(&[0x41, 0x4A][..]));
    assert!(!nal.is_first_slice_of_picture());

    let nal = H264NAL::new(BytesMut::from(&[0x67, 0xFF][..]));
    assert!(!nal.is_first_slice_of_picture());
}
