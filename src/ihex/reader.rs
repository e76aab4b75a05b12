// Streaming hex file reader.
//
// Drives the record codec over a line stream and folds Data records into an
// `Image`. Tracks the extended segment and linear address bases separately;
// a Data record lands at `segment_base + linear_base + record.address`.
// Reading stops at the first well-formed EOF record; any trailing lines are
// ignored for compatibility with tolerant generators.

use std::io::BufRead;

use log::debug;
use thiserror::Error;

use crate::image::{Image, Overlap, StartAddress};

use super::record::{LineOutcome, Record, RecordError, RecordType, decode_line};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for multi-record stream reading.
#[derive(Debug, Error)]
pub enum ReadError {
    /// A single line failed to decode.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Extended segment address record with wrong length or address field.
    #[error("line {line}: invalid extended segment address record")]
    ExtendedSegmentAddress { line: usize },

    /// Extended linear address record with wrong length or address field.
    #[error("line {line}: invalid extended linear address record")]
    ExtendedLinearAddress { line: usize },

    /// Start segment address record with wrong length or address field.
    #[error("line {line}: invalid start segment address record")]
    StartSegmentAddress { line: usize },

    /// Start linear address record with wrong length or address field.
    #[error("line {line}: invalid start linear address record")]
    StartLinearAddress { line: usize },

    /// A second start-address record in one stream.
    #[error("line {line}: duplicate start address record")]
    DuplicateStartAddress { line: usize },

    /// Two records assigned different values to one address under the
    /// `Error` overlap policy.
    #[error("line {line}: data overlapped at address {address:#06X}")]
    AddressOverlap { address: u64, line: usize },

    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for the stream reader.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Policy for records assigning different values to one address.
    pub overlap: Overlap,
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Stateful reader over a line stream.
pub struct HexReader<R> {
    input: R,
    opts: ReadOptions,
    segment_base: u64,
    linear_base: u64,
    saw_start_addr: bool,
    seen_eof: bool,
    records: u64,
}

impl<R: BufRead> HexReader<R> {
    pub fn new(input: R) -> Self {
        Self::with_options(input, ReadOptions::default())
    }

    pub fn with_options(input: R, opts: ReadOptions) -> Self {
        Self {
            input,
            opts,
            segment_base: 0,
            linear_base: 0,
            saw_start_addr: false,
            seen_eof: false,
            records: 0,
        }
    }

    /// Number of records applied so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Whether an EOF record terminated the stream.
    pub fn seen_eof(&self) -> bool {
        self.seen_eof
    }

    /// Read records into `image` until the EOF record or the end of the
    /// stream. Records applied before a failing one remain applied.
    pub fn read_into(&mut self, image: &mut Image) -> Result<(), ReadError> {
        let mut line_buf = String::new();
        let mut line_no = 0usize;
        loop {
            line_buf.clear();
            if self.input.read_line(&mut line_buf)? == 0 {
                break;
            }
            line_no += 1;
            match decode_line(&line_buf, line_no)? {
                LineOutcome::Blank => continue,
                LineOutcome::Eof => {
                    self.seen_eof = true;
                    self.records += 1;
                    break;
                }
                LineOutcome::Record(record) => {
                    self.apply(image, record, line_no)?;
                    self.records += 1;
                }
            }
        }
        debug!(
            "hex read: {} records, {} cells, eof={}",
            self.records,
            image.len(),
            self.seen_eof
        );
        Ok(())
    }

    fn apply(&mut self, image: &mut Image, record: Record, line: usize) -> Result<(), ReadError> {
        match record.kind {
            RecordType::Data => {
                let start = self.segment_base + self.linear_base + u64::from(record.address);
                // Validate before applying, so a failing record leaves no
                // partial mutation behind.
                if self.opts.overlap == Overlap::Error {
                    for (i, &value) in record.data.iter().enumerate() {
                        let address = start + i as u64;
                        if image.byte_at(address).is_some_and(|existing| existing != value) {
                            return Err(ReadError::AddressOverlap { address, line });
                        }
                    }
                }
                for (i, &value) in record.data.iter().enumerate() {
                    let address = start + i as u64;
                    match (image.byte_at(address), self.opts.overlap) {
                        (None, _) | (Some(_), Overlap::Replace) => image.set(address, value),
                        (Some(_), _) => {}
                    }
                }
            }
            RecordType::ExtSegmentAddr => {
                if record.data.len() != 2 || record.address != 0 {
                    return Err(ReadError::ExtendedSegmentAddress { line });
                }
                let value = u64::from(record.data[0]) << 8 | u64::from(record.data[1]);
                self.segment_base = value << 4;
                debug!("line {line}: segment base -> {:#X}", self.segment_base);
            }
            RecordType::ExtLinearAddr => {
                if record.data.len() != 2 || record.address != 0 {
                    return Err(ReadError::ExtendedLinearAddress { line });
                }
                let value = u64::from(record.data[0]) << 8 | u64::from(record.data[1]);
                self.linear_base = value << 16;
                debug!("line {line}: linear base -> {:#X}", self.linear_base);
            }
            RecordType::StartSegmentAddr => {
                if record.data.len() != 4 || record.address != 0 {
                    return Err(ReadError::StartSegmentAddress { line });
                }
                if self.saw_start_addr {
                    return Err(ReadError::DuplicateStartAddress { line });
                }
                self.saw_start_addr = true;
                let cs = u16::from(record.data[0]) << 8 | u16::from(record.data[1]);
                let ip = u16::from(record.data[2]) << 8 | u16::from(record.data[3]);
                image.set_start_addr(Some(StartAddress::Segment { cs, ip }));
            }
            RecordType::StartLinearAddr => {
                if record.data.len() != 4 || record.address != 0 {
                    return Err(ReadError::StartLinearAddress { line });
                }
                if self.saw_start_addr {
                    return Err(ReadError::DuplicateStartAddress { line });
                }
                self.saw_start_addr = true;
                let eip = u32::from_be_bytes([
                    record.data[0],
                    record.data[1],
                    record.data[2],
                    record.data[3],
                ]);
                image.set_start_addr(Some(StartAddress::Linear { eip }));
            }
            // decode_line folds EOF into LineOutcome::Eof.
            RecordType::Eof => unreachable!("EOF records terminate in decode_line"),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Convenience entry points
// ---------------------------------------------------------------------------

/// Read a complete hex stream into a fresh image.
pub fn read_hex<R: BufRead>(input: R, opts: ReadOptions) -> Result<Image, ReadError> {
    let mut image = Image::new();
    HexReader::with_options(input, opts).read_into(&mut image)?;
    Ok(image)
}

/// Read a hex file held in memory.
pub fn read_hex_str(text: &str, opts: ReadOptions) -> Result<Image, ReadError> {
    read_hex(text.as_bytes(), opts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Image {
        read_hex_str(text, ReadOptions::default()).unwrap()
    }

    #[test]
    fn data_records_land_at_absolute_addresses() {
        let ih = read(":0400100041424344E2\n:00000001FF\n");
        assert_eq!(ih.get_bytes(0x10, 4).unwrap(), b"ABCD");
        assert_eq!(ih.len(), 4);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let ih = read("\n:0100000041BE\n\n:00000001FF\n");
        assert_eq!(ih.byte_at(0), Some(0x41));
    }

    #[test]
    fn extended_linear_base_shifts_sixteen() {
        let ih = read(":020000040800F2\n:0100000041BE\n:00000001FF\n");
        assert_eq!(ih.byte_at(0x0800_0000), Some(0x41));
    }

    #[test]
    fn extended_segment_base_shifts_four() {
        let ih = read(":020000021000EC\n:0100000041BE\n:00000001FF\n");
        assert_eq!(ih.byte_at(0x0001_0000), Some(0x41));
    }

    #[test]
    fn segment_and_linear_bases_are_summed() {
        let ih = read(
            ":020000021000EC\n:020000040001F9\n:0100000041BE\n:00000001FF\n",
        );
        assert_eq!(ih.byte_at(0x0002_0000), Some(0x41));
    }

    #[test]
    fn wrong_length_base_records_fail() {
        let err = read_hex_str(":0100000400FB\n", ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ReadError::ExtendedLinearAddress { line: 1 }
        ));
        let err = read_hex_str(":010000020OFD\n", ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ReadError::Record(_)));
        let err = read_hex_str(":01000002AA53\n", ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ReadError::ExtendedSegmentAddress { line: 1 }
        ));
    }

    #[test]
    fn base_record_with_nonzero_address_fails() {
        // Count 2, addr 0x0001, type 4.
        let err = read_hex_str(":020001040000F9\n", ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ReadError::ExtendedLinearAddress { line: 1 }));
    }

    #[test]
    fn start_segment_address_parsed() {
        let ih = read(":0400000312345678E5\n:00000001FF\n");
        assert_eq!(
            ih.start_addr(),
            Some(StartAddress::Segment {
                cs: 0x1234,
                ip: 0x5678
            })
        );
    }

    #[test]
    fn start_linear_address_parsed() {
        let ih = read(":04000005000000CD2A\n:00000001FF\n");
        assert_eq!(ih.start_addr(), Some(StartAddress::Linear { eip: 0xCD }));
    }

    #[test]
    fn duplicate_start_address_fails() {
        let text = ":04000005000000CD2A\n:0400000312345678E5\n:00000001FF\n";
        let err = read_hex_str(text, ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ReadError::DuplicateStartAddress { line: 2 }));
    }

    #[test]
    fn overlap_policies_on_read() {
        // Two records both writing address 0: first 0x41, then 0x42.
        let text = ":0100000041BE\n:0100000042BD\n:00000001FF\n";
        let err = read_hex_str(text, ReadOptions::default()).unwrap_err();
        match err {
            ReadError::AddressOverlap { address, line } => {
                assert_eq!(address, 0);
                assert_eq!(line, 2);
            }
            other => panic!("expected overlap, got {other:?}"),
        }

        let keep = read_hex_str(
            text,
            ReadOptions {
                overlap: Overlap::Ignore,
            },
        )
        .unwrap();
        assert_eq!(keep.byte_at(0), Some(0x41));

        let take = read_hex_str(
            text,
            ReadOptions {
                overlap: Overlap::Replace,
            },
        )
        .unwrap();
        assert_eq!(take.byte_at(0), Some(0x42));
    }

    #[test]
    fn identical_rewrite_is_not_a_conflict() {
        let text = ":0100000041BE\n:0100000041BE\n:00000001FF\n";
        let ih = read(text);
        assert_eq!(ih.byte_at(0), Some(0x41));
    }

    #[test]
    fn lines_after_eof_are_ignored() {
        let ih = read(":0100000041BE\n:00000001FF\n:garbage that never parses\n");
        assert_eq!(ih.byte_at(0), Some(0x41));
        assert_eq!(ih.len(), 1);
    }

    #[test]
    fn missing_eof_record_is_tolerated() {
        let ih = read(":0100000041BE\n");
        assert_eq!(ih.byte_at(0), Some(0x41));
    }

    #[test]
    fn failing_record_applies_no_bytes() {
        // Second record writes addresses 3..=4; address 4 conflicts, so the
        // byte it would have placed at address 3 must not appear either.
        let text = ":0100040011EA\n:020003002233A6\n:00000001FF\n";
        let mut image = Image::new();
        let mut reader = HexReader::new(text.as_bytes());
        let err = reader.read_into(&mut image).unwrap_err();
        assert!(matches!(err, ReadError::AddressOverlap { address: 4, .. }));
        assert_eq!(image.byte_at(3), None);
        assert_eq!(image.byte_at(4), Some(0x11));
    }

    #[test]
    fn partial_state_kept_before_failure() {
        let mut image = Image::new();
        let text = ":0100000041BE\n:0100000142XX\n";
        let mut reader = HexReader::new(text.as_bytes());
        assert!(reader.read_into(&mut image).is_err());
        assert_eq!(image.byte_at(0), Some(0x41));
    }

    #[test]
    fn error_lines_are_one_based() {
        let err = read_hex_str("\n\n:bad\n", ReadOptions::default()).unwrap_err();
        match err {
            ReadError::Record(RecordError::Malformed { line }) => assert_eq!(line, 3),
            other => panic!("expected malformed at line 3, got {other:?}"),
        }
    }
}
