// Sparse byte-image store.
//
// An `Image` maps addresses to single byte values. Unset addresses read as
// the padding byte without creating an entry, so firmware images with large
// gaps stay cheap. Addresses are u64: files can only encode 32-bit addresses
// (the writer enforces that), but the store itself accepts larger keys.

use std::collections::BTreeMap;

use thiserror::Error;

/// Default padding byte returned for reads of unset addresses.
pub const DEFAULT_PADDING: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for image store operations.
#[derive(Debug, Error)]
pub enum ImageError {
    /// A contiguous read hit an unset address.
    #[error("not enough data at address {address:#06X} (requested {length} bytes)")]
    NotEnoughData { address: u64, length: usize },

    /// A range argument set is invalid or self-contradictory.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// An operation needing an address extent was called on an empty image.
    #[error("image has no data")]
    EmptyImage,

    /// I/O error from a stream-backed operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Overlap policy
// ---------------------------------------------------------------------------

/// What to do when two sources assign different values to the same address,
/// either across records of one file or between two merged images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlap {
    /// Stop with an address-overlap error.
    #[default]
    Error,
    /// Keep the value already present.
    Ignore,
    /// Take the incoming value.
    Replace,
}

// ---------------------------------------------------------------------------
// Start address
// ---------------------------------------------------------------------------

/// Entry-point metadata a loader should jump to after flashing.
///
/// Carried by start segment address (type 3) and start linear address
/// (type 5) records. An image holds at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAddress {
    /// CS:IP pair from a start segment address record.
    Segment { cs: u16, ip: u16 },
    /// EIP from a start linear address record.
    Linear { eip: u32 },
}

// ---------------------------------------------------------------------------
// Interchange form
// ---------------------------------------------------------------------------

/// Lossless structural interchange form of an image: the populated cells
/// plus the optional start address. Padding is presentation state and is
/// not part of the interchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDict {
    pub cells: BTreeMap<u64, u8>,
    pub start_addr: Option<StartAddress>,
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// Sparse address→byte image with a configurable padding byte.
#[derive(Debug, Clone)]
pub struct Image {
    cells: BTreeMap<u64, u8>,
    padding: u8,
    start_addr: Option<StartAddress>,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Image {
    /// Create an empty image with the default padding byte (0xFF).
    pub fn new() -> Self {
        Self::with_padding(DEFAULT_PADDING)
    }

    /// Create an empty image with an explicit padding byte.
    pub fn with_padding(padding: u8) -> Self {
        Self {
            cells: BTreeMap::new(),
            padding,
            start_addr: None,
        }
    }

    /// Rebuild an image from its interchange form.
    pub fn from_dict(dict: ImageDict) -> Self {
        Self {
            cells: dict.cells,
            padding: DEFAULT_PADDING,
            start_addr: dict.start_addr,
        }
    }

    /// Export the interchange form, including the start address if set.
    pub fn to_dict(&self) -> ImageDict {
        ImageDict {
            cells: self.cells.clone(),
            start_addr: self.start_addr,
        }
    }

    pub fn padding(&self) -> u8 {
        self.padding
    }

    pub fn set_padding(&mut self, padding: u8) {
        self.padding = padding;
    }

    pub fn start_addr(&self) -> Option<StartAddress> {
        self.start_addr
    }

    pub fn set_start_addr(&mut self, start: Option<StartAddress>) {
        self.start_addr = start;
    }

    // -----------------------------------------------------------------------
    // Single-cell access
    // -----------------------------------------------------------------------

    /// Read one byte; unset addresses yield the padding byte and do not
    /// create an entry.
    pub fn get(&self, addr: u64) -> u8 {
        self.cells.get(&addr).copied().unwrap_or(self.padding)
    }

    /// Read one byte only if the address is populated.
    pub fn byte_at(&self, addr: u64) -> Option<u8> {
        self.cells.get(&addr).copied()
    }

    pub fn set(&mut self, addr: u64, value: u8) {
        self.cells.insert(addr, value);
    }

    /// Remove one cell, returning its previous value if it existed.
    pub fn remove(&mut self, addr: u64) -> Option<u8> {
        self.cells.remove(&addr)
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.cells.contains_key(&addr)
    }

    /// Number of populated cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // -----------------------------------------------------------------------
    // Extent
    // -----------------------------------------------------------------------

    /// All populated addresses in ascending order.
    pub fn addresses(&self) -> Vec<u64> {
        self.cells.keys().copied().collect()
    }

    /// Iterate populated `(address, byte)` pairs in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u8)> + '_ {
        self.cells.iter().map(|(&a, &v)| (a, v))
    }

    pub fn min_addr(&self) -> Option<u64> {
        self.cells.keys().next().copied()
    }

    pub fn max_addr(&self) -> Option<u64> {
        self.cells.keys().next_back().copied()
    }

    /// Maximal runs of populated addresses as half-open `(start, end)`
    /// ranges. Neighbors whose gap exceeds `min_gap` start a new segment;
    /// `min_gap == 1` keeps only strictly contiguous addresses together.
    pub fn segments(&self, min_gap: u64) -> Vec<(u64, u64)> {
        let mut out = Vec::new();
        let mut iter = self.cells.keys().copied();
        let Some(first) = iter.next() else {
            return out;
        };
        let mut seg_start = first;
        let mut prev = first;
        for addr in iter {
            if addr - prev > min_gap {
                out.push((seg_start, prev + 1));
                seg_start = addr;
            }
            prev = addr;
        }
        out.push((seg_start, prev + 1));
        out
    }

    // -----------------------------------------------------------------------
    // Range ops
    // -----------------------------------------------------------------------

    /// Resolve optional bounds against the image extent. A range with no
    /// explicit start over an empty image has no effective start and fails.
    fn resolve_bounds(
        &self,
        start: Option<u64>,
        stop: Option<u64>,
        step: u64,
    ) -> Result<(u64, u64), ImageError> {
        if step == 0 {
            return Err(ImageError::InvalidRange("step must be non-zero".into()));
        }
        let start = match start.or_else(|| self.min_addr()) {
            Some(s) => s,
            None => {
                return Err(ImageError::InvalidRange(
                    "fully open range over an empty image".into(),
                ));
            }
        };
        let stop = match stop.or_else(|| self.max_addr().map(|m| m + 1)) {
            Some(s) => s,
            None => {
                return Err(ImageError::InvalidRange(
                    "fully open range over an empty image".into(),
                ));
            }
        };
        Ok((start, stop))
    }

    /// Sub-image of the *existing* cells at `start, start+step, ...` below
    /// `stop`. The result inherits the padding byte but not the start
    /// address.
    pub fn get_range(
        &self,
        start: Option<u64>,
        stop: Option<u64>,
        step: u64,
    ) -> Result<Image, ImageError> {
        let (start, stop) = self.resolve_bounds(start, stop, step)?;
        let mut out = Image::with_padding(self.padding);
        if start >= stop {
            return Ok(out);
        }
        // Walk only the populated cells; the window can be vastly larger
        // than the image.
        for (&addr, &v) in self.cells.range(start..stop) {
            if (addr - start) % step == 0 {
                out.set(addr, v);
            }
        }
        Ok(out)
    }

    /// Write `bytes` onto the lattice `start, start+step, ...` below `stop`.
    /// The byte count must equal the number of lattice points,
    /// `ceil((stop - start) / step)`.
    pub fn set_range(
        &mut self,
        start: u64,
        stop: u64,
        step: u64,
        bytes: &[u8],
    ) -> Result<(), ImageError> {
        if step == 0 {
            return Err(ImageError::InvalidRange("step must be non-zero".into()));
        }
        let span = stop.saturating_sub(start);
        let expected = span.div_ceil(step);
        if bytes.len() as u64 != expected {
            return Err(ImageError::InvalidRange(format!(
                "range [{start:#X}, {stop:#X}) step {step} holds {expected} cells, \
                 got {} bytes",
                bytes.len()
            )));
        }
        let mut addr = start;
        for &b in bytes {
            self.cells.insert(addr, b);
            match addr.checked_add(step) {
                Some(next) => addr = next,
                None => break,
            }
        }
        Ok(())
    }

    /// Delete existing cells on the lattice `start, start+step, ...` below
    /// `stop`. Missing cells are skipped.
    pub fn delete_range(
        &mut self,
        start: Option<u64>,
        stop: Option<u64>,
        step: u64,
    ) -> Result<(), ImageError> {
        let (start, stop) = self.resolve_bounds(start, stop, step)?;
        if start >= stop {
            return Ok(());
        }
        let doomed: Vec<u64> = self
            .cells
            .range(start..stop)
            .map(|(&addr, _)| addr)
            .filter(|addr| (addr - start) % step == 0)
            .collect();
        for addr in doomed {
            self.cells.remove(&addr);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Contiguous string ops
    // -----------------------------------------------------------------------

    /// Read `length` contiguous bytes starting at `addr`. Any hole in the
    /// run fails without partial output.
    pub fn get_bytes(&self, addr: u64, length: usize) -> Result<Vec<u8>, ImageError> {
        let mut out = Vec::with_capacity(length);
        for i in 0..length as u64 {
            match self.byte_at(addr + i) {
                Some(b) => out.push(b),
                None => {
                    return Err(ImageError::NotEnoughData {
                        address: addr,
                        length,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Write a contiguous run of bytes starting at `addr`.
    pub fn put_bytes(&mut self, addr: u64, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.cells.insert(addr + i as u64, b);
        }
    }

    /// Read bytes up to but excluding the first zero byte. Hitting a hole
    /// before the terminator fails.
    pub fn get_zstring(&self, addr: u64) -> Result<Vec<u8>, ImageError> {
        let mut out = Vec::new();
        let mut offset = 0u64;
        loop {
            match self.byte_at(addr + offset) {
                Some(0) => return Ok(out),
                Some(b) => out.push(b),
                None => {
                    return Err(ImageError::NotEnoughData {
                        address: addr,
                        length: out.len() + 1,
                    });
                }
            }
            offset += 1;
        }
    }

    /// Write bytes followed by a terminating zero.
    pub fn put_zstring(&mut self, addr: u64, bytes: &[u8]) {
        self.put_bytes(addr, bytes);
        self.cells.insert(addr + bytes.len() as u64, 0);
    }

    // -----------------------------------------------------------------------
    // Substring search
    // -----------------------------------------------------------------------

    /// Lowest address in `[start, end)` where `needle` occurs inside a
    /// strictly contiguous run of populated bytes. A needle that straddles
    /// a hole never matches.
    pub fn find(&self, needle: &[u8], start: Option<u64>, end: Option<u64>) -> Option<u64> {
        let lo_bound = start.unwrap_or(0);
        let hi_bound = end.unwrap_or(u64::MAX);
        for (seg_start, seg_end) in self.segments(1) {
            let lo = seg_start.max(lo_bound);
            let hi = seg_end.min(hi_bound);
            if lo >= hi {
                continue;
            }
            let window: Vec<u8> = (lo..hi).map(|a| self.get(a)).collect();
            if needle.len() > window.len() {
                continue;
            }
            for pos in 0..=(window.len() - needle.len()) {
                if &window[pos..pos + needle.len()] == needle {
                    return Some(lo + pos as u64);
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from(pairs: &[(u64, u8)]) -> Image {
        let mut ih = Image::new();
        for &(a, v) in pairs {
            ih.set(a, v);
        }
        ih
    }

    #[test]
    fn get_returns_padding_without_creating_entries() {
        let mut ih = Image::new();
        assert_eq!(ih.get(0x1234), 0xFF);
        assert!(ih.is_empty());
        ih.set_padding(0x00);
        assert_eq!(ih.get(0x1234), 0x00);
        assert!(ih.is_empty());
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let mut ih = Image::new();
        ih.set(10, 0xAB);
        assert_eq!(ih.get(10), 0xAB);
        assert_eq!(ih.byte_at(10), Some(0xAB));
        assert_eq!(ih.remove(10), Some(0xAB));
        assert_eq!(ih.byte_at(10), None);
        assert_eq!(ih.remove(10), None);
    }

    #[test]
    fn addresses_sorted_and_extent() {
        let ih = image_from(&[(5, 1), (1, 2), (3, 3)]);
        assert_eq!(ih.addresses(), vec![1, 3, 5]);
        assert_eq!(ih.min_addr(), Some(1));
        assert_eq!(ih.max_addr(), Some(5));
        let empty = Image::new();
        assert_eq!(empty.min_addr(), None);
        assert_eq!(empty.max_addr(), None);
    }

    #[test]
    fn large_addresses_accepted() {
        let mut ih = Image::new();
        ih.set(1u64 << 40, 0x5A);
        assert_eq!(ih.get(1u64 << 40), 0x5A);
        assert_eq!(ih.max_addr(), Some(1u64 << 40));
    }

    #[test]
    fn segments_contiguous_and_gapped() {
        let ih = image_from(&[
            (0x100, 0),
            (0x101, 0),
            (0x200, 0),
            (0x201, 0),
            (0x202, 0),
        ]);
        assert_eq!(ih.segments(1), vec![(0x100, 0x102), (0x200, 0x203)]);
    }

    #[test]
    fn segments_min_gap_coalesces() {
        let ih = image_from(&[(0, 0), (2, 0), (4, 0), (10, 0)]);
        assert_eq!(ih.segments(1), vec![(0, 1), (2, 3), (4, 5), (10, 11)]);
        assert_eq!(ih.segments(2), vec![(0, 5), (10, 11)]);
        assert_eq!(ih.segments(6), vec![(0, 11)]);
    }

    #[test]
    fn segments_single_cell() {
        let ih = image_from(&[(7, 0)]);
        assert_eq!(ih.segments(1), vec![(7, 8)]);
        assert!(Image::new().segments(1).is_empty());
    }

    #[test]
    fn get_range_selects_existing_cells() {
        let ih = image_from(&[(0, 10), (1, 11), (2, 12), (5, 15)]);
        let sub = ih.get_range(Some(1), Some(6), 1).unwrap();
        assert_eq!(sub.addresses(), vec![1, 2, 5]);
        assert_eq!(sub.get(5), 15);
        // Step 2 only visits the lattice.
        let stepped = ih.get_range(Some(0), Some(6), 2).unwrap();
        assert_eq!(stepped.addresses(), vec![0, 2]);
    }

    #[test]
    fn get_range_defaults_to_extent() {
        let ih = image_from(&[(3, 1), (7, 2)]);
        let sub = ih.get_range(None, None, 1).unwrap();
        assert_eq!(sub.addresses(), vec![3, 7]);
    }

    #[test]
    fn open_range_on_empty_image_fails() {
        let ih = Image::new();
        assert!(matches!(
            ih.get_range(None, None, 1),
            Err(ImageError::InvalidRange(_))
        ));
        let mut ih = Image::new();
        assert!(matches!(
            ih.delete_range(None, None, 1),
            Err(ImageError::InvalidRange(_))
        ));
    }

    #[test]
    fn zero_step_fails() {
        let ih = image_from(&[(0, 1)]);
        assert!(matches!(
            ih.get_range(Some(0), Some(1), 0),
            Err(ImageError::InvalidRange(_))
        ));
    }

    #[test]
    fn set_range_length_checked() {
        let mut ih = Image::new();
        // ceil((10 - 0) / 3) == 4 lattice points
        ih.set_range(0, 10, 3, &[1, 2, 3, 4]).unwrap();
        assert_eq!(ih.addresses(), vec![0, 3, 6, 9]);
        assert!(matches!(
            ih.set_range(0, 10, 3, &[1, 2, 3]),
            Err(ImageError::InvalidRange(_))
        ));
    }

    #[test]
    fn delete_range_skips_holes() {
        let mut ih = image_from(&[(0, 1), (2, 2), (4, 3)]);
        ih.delete_range(Some(0), Some(3), 1).unwrap();
        assert_eq!(ih.addresses(), vec![4]);
    }

    #[test]
    fn get_bytes_contiguous_or_error() {
        let ih = image_from(&[(0, 1), (1, 2), (2, 3), (4, 5)]);
        assert_eq!(ih.get_bytes(0, 3).unwrap(), vec![1, 2, 3]);
        match ih.get_bytes(0, 5) {
            Err(ImageError::NotEnoughData { address, length }) => {
                assert_eq!(address, 0);
                assert_eq!(length, 5);
            }
            other => panic!("expected NotEnoughData, got {other:?}"),
        }
    }

    #[test]
    fn put_bytes_writes_run() {
        let mut ih = Image::new();
        ih.put_bytes(0x10, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(ih.get_bytes(0x10, 3).unwrap(), vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn zstring_roundtrip_and_missing_terminator() {
        let mut ih = Image::new();
        ih.put_zstring(0x20, b"hello");
        assert_eq!(ih.get_zstring(0x20).unwrap(), b"hello");
        assert_eq!(ih.byte_at(0x25), Some(0));

        // No terminator before the hole.
        let open = image_from(&[(0, b'h'), (1, b'i')]);
        assert!(matches!(
            open.get_zstring(0),
            Err(ImageError::NotEnoughData { .. })
        ));
    }

    #[test]
    fn find_basic() {
        let mut ih = Image::new();
        ih.put_bytes(0, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(ih.find(&[3, 4, 5, 6], None, None), Some(3));
        assert_eq!(ih.find(&[10], None, None), None);
        assert_eq!(ih.find(&[3], Some(4), None), None);
        assert_eq!(ih.find(&[7], Some(4), Some(8)), Some(7));
        assert_eq!(ih.find(&[7], Some(4), Some(7)), None);
    }

    #[test]
    fn find_never_matches_across_holes() {
        let mut ih = Image::new();
        ih.put_bytes(0, &[1, 2]);
        ih.put_bytes(3, &[3, 4]);
        assert_eq!(ih.find(&[2, 3], None, None), None);
        assert_eq!(ih.find(&[3, 4], None, None), Some(3));
    }

    #[test]
    fn dict_roundtrip_with_start_addr() {
        let mut ih = image_from(&[(0, 1), (9, 2)]);
        ih.set_start_addr(Some(StartAddress::Linear { eip: 0x0800_0000 }));
        let dict = ih.to_dict();
        let back = Image::from_dict(dict.clone());
        assert_eq!(back.to_dict(), dict);
        assert_eq!(
            back.start_addr(),
            Some(StartAddress::Linear { eip: 0x0800_0000 })
        );
    }

    #[test]
    fn sub_image_inherits_padding_not_start_addr() {
        let mut ih = Image::with_padding(0x00);
        ih.set(0, 1);
        ih.set_start_addr(Some(StartAddress::Segment { cs: 1, ip: 2 }));
        let sub = ih.get_range(Some(0), Some(1), 1).unwrap();
        assert_eq!(sub.padding(), 0x00);
        assert_eq!(sub.start_addr(), None);
    }
}
