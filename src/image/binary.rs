// Binary import/export for the sparse image store.
//
// Plain binary has no addressing, so import places bytes sequentially from a
// caller-chosen offset and export pads every hole with the padding byte.
// Export bounds follow the classic tool contract: `end` is inclusive, and at
// most two of start/end/size may be given.

use std::io::{Read, Write};

use super::store::{Image, ImageError};

impl Image {
    /// Import a raw binary stream, placing its bytes at `offset`,
    /// `offset + 1`, ...
    pub fn load_bin<R: Read>(&mut self, mut input: R, offset: u64) -> Result<(), ImageError> {
        let mut addr = offset;
        let mut buf = [0u8; 4096];
        loop {
            let n = input.read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            for &b in &buf[..n] {
                self.set(addr, b);
                addr += 1;
            }
        }
    }

    /// Resolve export bounds to an inclusive `(start, end)` pair.
    fn bin_bounds(
        &self,
        start: Option<u64>,
        end: Option<u64>,
        size: Option<u64>,
    ) -> Result<(u64, u64), ImageError> {
        if start.is_none() && end.is_none() && self.is_empty() {
            return Err(ImageError::EmptyImage);
        }
        match size {
            Some(size) => {
                if start.is_some() && end.is_some() {
                    return Err(ImageError::InvalidRange(
                        "start, end and size cannot all be given".into(),
                    ));
                }
                if size == 0 {
                    return Err(ImageError::InvalidRange("size must be positive".into()));
                }
                if let Some(e) = end {
                    if size > e + 1 {
                        return Err(ImageError::InvalidRange(format!(
                            "size {size} does not fit below end address {e:#X}"
                        )));
                    }
                    return Ok((e + 1 - size, e));
                }
                // No explicit start falls back to the image minimum.
                let s = match start.or_else(|| self.min_addr()) {
                    Some(s) => s,
                    None => return Err(ImageError::EmptyImage),
                };
                Ok((s, s + size - 1))
            }
            None => {
                let s = start.or_else(|| self.min_addr()).ok_or(ImageError::EmptyImage)?;
                let e = end.or_else(|| self.max_addr()).ok_or(ImageError::EmptyImage)?;
                if s > e {
                    return Err(ImageError::InvalidRange(format!(
                        "start {s:#X} is above end {e:#X}"
                    )));
                }
                Ok((s, e))
            }
        }
    }

    /// Export a contiguous byte sequence over the requested bounds, with
    /// holes filled by the padding byte. `end` is inclusive.
    pub fn to_bin_array(
        &self,
        start: Option<u64>,
        end: Option<u64>,
        size: Option<u64>,
    ) -> Result<Vec<u8>, ImageError> {
        let (start, end) = self.bin_bounds(start, end, size)?;
        let mut out = Vec::with_capacity((end - start + 1) as usize);
        for addr in start..=end {
            out.push(self.get(addr));
        }
        Ok(out)
    }

    /// Export the full address extent as contiguous bytes.
    pub fn to_bin_vec(&self) -> Result<Vec<u8>, ImageError> {
        self.to_bin_array(None, None, None)
    }

    /// Write the full address extent to a binary stream.
    pub fn to_bin_file<W: Write>(&self, out: &mut W) -> Result<(), ImageError> {
        let bytes = self.to_bin_vec()?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
