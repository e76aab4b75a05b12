// Intel HEX record codec.
//
// One record per line: `:BBAAAATTDD..DDCC` with byte count, 16-bit
// big-endian address, record type, payload, checksum. The sum of every
// decoded byte (count, address halves, type, payload, checksum) must be
// 0 mod 256.
//
// Validation order matches the classic readers: syntax, then declared
// length, then record type, then checksum. Each failure has its own error
// kind carrying the 1-based line number.

use thiserror::Error;

/// Longest payload a record can declare (the count field is one byte).
pub const MAX_RECORD_DATA: usize = 255;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for single-line record decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Line is not a syntactically valid record (missing `:`, odd or
    /// non-hex digits, too short).
    #[error("line {line}: malformed hex record")]
    Malformed { line: usize },

    /// Declared byte count disagrees with the actual payload length.
    #[error("line {line}: record length mismatch")]
    Length { line: usize },

    /// Record type outside 0..=5.
    #[error("line {line}: unknown record type")]
    Type { line: usize },

    /// Mod-256 checksum failed.
    #[error("line {line}: record checksum mismatch")]
    Checksum { line: usize },

    /// End-of-file record with a non-zero byte count.
    #[error("invalid end-of-file record")]
    Eof,
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// The six record types of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    Data = 0,
    Eof = 1,
    ExtSegmentAddr = 2,
    StartSegmentAddr = 3,
    ExtLinearAddr = 4,
    StartLinearAddr = 5,
}

impl RecordType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Data),
            1 => Some(Self::Eof),
            2 => Some(Self::ExtSegmentAddr),
            3 => Some(Self::StartSegmentAddr),
            4 => Some(Self::ExtLinearAddr),
            5 => Some(Self::StartLinearAddr),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One decoded record. Ephemeral: the reader folds records into an image and
/// never stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 16-bit address field, relative to the current base.
    pub address: u16,
    pub kind: RecordType,
    pub data: Vec<u8>,
}

/// Outcome of decoding one line of a hex stream.
///
/// End of file is a tagged variant rather than an error or a sentinel
/// record, so the reader's line loop can match on it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank line (after stripping the line terminator); skipped.
    Blank,
    /// Well-formed end-of-file record; terminates the stream.
    Eof,
    /// Any other record.
    Record(Record),
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Decode one line. `line_no` is 1-based and is carried by every error.
pub fn decode_line(line: &str, line_no: usize) -> Result<LineOutcome, RecordError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Ok(LineOutcome::Blank);
    }
    let bytes = line.as_bytes();
    if bytes[0] != b':' || bytes.len() % 2 == 0 {
        return Err(RecordError::Malformed { line: line_no });
    }

    let mut decoded = Vec::with_capacity((bytes.len() - 1) / 2);
    for pair in bytes[1..].chunks_exact(2) {
        let hi = hex_nibble(pair[0]);
        let lo = hex_nibble(pair[1]);
        match (hi, lo) {
            (Some(hi), Some(lo)) => decoded.push((hi << 4) | lo),
            _ => return Err(RecordError::Malformed { line: line_no }),
        }
    }
    // Count, two address bytes, type, checksum.
    if decoded.len() < 5 {
        return Err(RecordError::Malformed { line: line_no });
    }

    let count = decoded[0] as usize;
    if decoded.len() != count + 5 {
        return Err(RecordError::Length { line: line_no });
    }

    let address = u16::from(decoded[1]) << 8 | u16::from(decoded[2]);
    let kind = RecordType::from_u8(decoded[3]).ok_or(RecordError::Type { line: line_no })?;

    let sum: u8 = decoded.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(RecordError::Checksum { line: line_no });
    }

    if kind == RecordType::Eof {
        if count != 0 {
            return Err(RecordError::Eof);
        }
        return Ok(LineOutcome::Eof);
    }

    Ok(LineOutcome::Record(Record {
        address,
        kind,
        data: decoded[4..4 + count].to_vec(),
    }))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode one record as canonical uppercase text without a line terminator.
/// The payload length must not exceed [`MAX_RECORD_DATA`]; the writer keeps
/// that invariant.
pub fn encode_record(address: u16, kind: RecordType, data: &[u8]) -> String {
    debug_assert!(data.len() <= MAX_RECORD_DATA);
    let count = data.len() as u8;
    let addr_hi = (address >> 8) as u8;
    let addr_lo = (address & 0xFF) as u8;
    let kind = kind as u8;

    let mut sum = count
        .wrapping_add(addr_hi)
        .wrapping_add(addr_lo)
        .wrapping_add(kind);
    let mut out = String::with_capacity(11 + data.len() * 2);
    out.push(':');
    push_hex(&mut out, count);
    push_hex(&mut out, addr_hi);
    push_hex(&mut out, addr_lo);
    push_hex(&mut out, kind);
    for &b in data {
        sum = sum.wrapping_add(b);
        push_hex(&mut out, b);
    }
    push_hex(&mut out, sum.wrapping_neg());
    out
}

fn push_hex(out: &mut String, b: u8) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    out.push(DIGITS[(b >> 4) as usize] as char);
    out.push(DIGITS[(b & 0xF) as usize] as char);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
