// Streaming hex file writer.
//
// Walks the image's populated addresses in order and splits them into Data
// records of up to `byte_count` contiguous bytes. An Extended Linear Address
// record is emitted whenever the next byte's high 16 bits differ from the
// current base (the base starts at zero, so images below 64 KiB need none).
// A Data record never crosses a 64 KiB low-address boundary.

use std::io::Write;

use log::debug;
use thiserror::Error;

use crate::image::{Image, StartAddress};

use super::record::{MAX_RECORD_DATA, RecordType, encode_record};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for hex file writing.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Requested per-record byte count outside 1..=255.
    #[error("byte count {0} is outside 1..=255")]
    ByteCount(usize),

    /// The image holds an address the format cannot encode.
    #[error("address {0:#X} exceeds the 32-bit record address space")]
    AddressRange(u64),

    /// I/O error from the output stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Line terminator for emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eol {
    #[default]
    Lf,
    CrLf,
}

impl Eol {
    fn as_str(self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::CrLf => "\r\n",
        }
    }
}

/// Configuration for the stream writer.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Maximum data bytes per record (1..=255).
    pub byte_count: usize,
    /// Emit the start-address record if the image carries one.
    pub write_start_addr: bool,
    pub eol: Eol,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            byte_count: 16,
            write_start_addr: true,
            eol: Eol::Lf,
        }
    }
}

// ---------------------------------------------------------------------------
// write_hex
// ---------------------------------------------------------------------------

/// Write `image` as hex records. Returns the number of records emitted,
/// including address, start-address and EOF records.
pub fn write_hex<W: Write>(
    image: &Image,
    out: &mut W,
    opts: &WriteOptions,
) -> Result<u64, WriteError> {
    if opts.byte_count == 0 || opts.byte_count > MAX_RECORD_DATA {
        return Err(WriteError::ByteCount(opts.byte_count));
    }
    let eol = opts.eol.as_str();
    let addrs = image.addresses();
    if let Some(&max) = addrs.last() {
        if max >> 32 != 0 {
            return Err(WriteError::AddressRange(max));
        }
    }

    let mut records = 0u64;
    let mut base: u64 = 0; // high 16 bits of the current linear base
    let mut i = 0usize;
    let mut data = Vec::with_capacity(opts.byte_count);
    while i < addrs.len() {
        let addr = addrs[i];
        let high = addr >> 16;
        if high != base {
            let value = [(high >> 8) as u8, (high & 0xFF) as u8];
            write!(out, "{}{eol}", encode_record(0, RecordType::ExtLinearAddr, &value))?;
            base = high;
            records += 1;
            debug!("emit linear base {:#X}", base << 16);
        }

        let low = addr & 0xFFFF;
        // Contiguous run, capped by the record size and the 64 KiB boundary.
        let cap = opts.byte_count.min((0x1_0000 - low) as usize);
        data.clear();
        while data.len() < cap && i < addrs.len() && addrs[i] == addr + data.len() as u64 {
            data.push(image.get(addrs[i]));
            i += 1;
        }
        write!(
            out,
            "{}{eol}",
            encode_record(low as u16, RecordType::Data, &data)
        )?;
        records += 1;
    }

    if opts.write_start_addr {
        if let Some(start) = image.start_addr() {
            let (kind, value) = match start {
                StartAddress::Segment { cs, ip } => {
                    let mut v = [0u8; 4];
                    v[..2].copy_from_slice(&cs.to_be_bytes());
                    v[2..].copy_from_slice(&ip.to_be_bytes());
                    (RecordType::StartSegmentAddr, v)
                }
                StartAddress::Linear { eip } => (RecordType::StartLinearAddr, eip.to_be_bytes()),
            };
            write!(out, "{}{eol}", encode_record(0, kind, &value))?;
            records += 1;
        }
    }

    write!(out, "{}{eol}", encode_record(0, RecordType::Eof, &[]))?;
    records += 1;
    debug!("hex write: {records} records");
    Ok(records)
}

/// Write to an owned string.
pub fn write_hex_string(image: &Image, opts: &WriteOptions) -> Result<String, WriteError> {
    let mut buf = Vec::new();
    write_hex(image, &mut buf, opts)?;
    Ok(String::from_utf8(buf).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
