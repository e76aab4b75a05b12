// Hex+ASCII dump rendering.
//
// One row per `width` addresses, aligned to a multiple of the width. Unset
// bytes render as `--` and a blank ASCII cell unless padding substitution is
// requested. Row headers use at least four hex digits and widen as needed,
// so diffs over dumps stay line-stable for a given image extent.

use std::io::Write;

use super::store::{Image, ImageError, StartAddress};

impl Image {
    /// Render the classic two-column hex + ASCII dump.
    ///
    /// `width` is the number of addresses per row and must be positive. With
    /// `with_padding`, unset bytes render as the padding byte instead of
    /// `--`.
    pub fn dump<W: Write>(
        &self,
        out: &mut W,
        width: usize,
        with_padding: bool,
    ) -> Result<(), ImageError> {
        if width == 0 {
            return Err(ImageError::InvalidRange(
                "dump width must be a positive integer".into(),
            ));
        }

        match self.start_addr() {
            Some(StartAddress::Segment { cs, ip }) => {
                writeln!(out, "CS = 0x{cs:04X}, IP = 0x{ip:04X}")?;
            }
            Some(StartAddress::Linear { eip }) => {
                writeln!(out, "EIP = 0x{eip:08X}")?;
            }
            None => {}
        }

        let (Some(min), Some(max)) = (self.min_addr(), self.max_addr()) else {
            return Ok(());
        };
        let width = width as u64;
        let first_row = (min / width) * width;
        let end_row = (max / width + 1) * width;
        let digits = (format!("{end_row:X}").len()).max(4);
        let pad = with_padding.then_some(self.padding());

        let mut row = first_row;
        while row < end_row {
            write!(out, "{row:0digits$X} ")?;
            let mut ascii = String::with_capacity(width as usize);
            for col in 0..width {
                match self.byte_at(row + col).or(pad) {
                    Some(b) => {
                        write!(out, " {b:02X}")?;
                        ascii.push(if (32..127).contains(&b) {
                            b as char
                        } else {
                            '.'
                        });
                    }
                    None => {
                        write!(out, " --")?;
                        ascii.push(' ');
                    }
                }
            }
            writeln!(out, "  |{ascii}|")?;
            row += width;
        }
        Ok(())
    }

    /// Dump to an owned string (dump rows are always ASCII).
    pub fn dump_string(&self, width: usize, with_padding: bool) -> Result<String, ImageError> {
        let mut buf = Vec::new();
        self.dump(&mut buf, width, with_padding)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_row_format() {
        let mut ih = Image::new();
        ih.put_bytes(0, b"Hello");
        ih.set(7, 0x01);
        let text = ih.dump_string(16, false).unwrap();
        assert_eq!(
            text,
            "0000  48 65 6C 6C 6F -- -- 01 -- -- -- -- -- -- -- --  |Hello  .        |\n"
        );
    }

    #[test]
    fn dump_rows_align_to_width() {
        let mut ih = Image::new();
        ih.set(0x12, 0x41);
        let text = ih.dump_string(16, false).unwrap();
        // Single row starting at the aligned address 0x10.
        assert!(text.starts_with("0010 "));
        assert_eq!(text.lines().count(), 1);

        let two = ih.dump_string(8, false).unwrap();
        assert!(two.starts_with("0010 "));
        assert_eq!(two.lines().count(), 1);
    }

    #[test]
    fn dump_with_padding_fills_holes() {
        let mut ih = Image::with_padding(0x20);
        ih.set(0, 0x41);
        ih.set(2, 0x42);
        let text = ih.dump_string(4, true).unwrap();
        assert_eq!(text, "0000  41 20 42 20  |A B |\n");
    }

    #[test]
    fn dump_start_addr_preamble() {
        let mut ih = Image::new();
        ih.set(0, 0x00);
        ih.set_start_addr(Some(StartAddress::Segment {
            cs: 0x1234,
            ip: 0x5678,
        }));
        let text = ih.dump_string(16, false).unwrap();
        assert!(text.starts_with("CS = 0x1234, IP = 0x5678\n"));

        ih.set_start_addr(Some(StartAddress::Linear { eip: 0xDEADBEEF }));
        let text = ih.dump_string(16, false).unwrap();
        assert!(text.starts_with("EIP = 0xDEADBEEF\n"));
    }

    #[test]
    fn dump_empty_image_renders_nothing() {
        let ih = Image::new();
        assert_eq!(ih.dump_string(16, false).unwrap(), "");
    }

    #[test]
    fn dump_wide_addresses_widen_header() {
        let mut ih = Image::new();
        ih.set(0x1_0000, 0xAA);
        let text = ih.dump_string(16, false).unwrap();
        assert!(text.starts_with("10000 "));
    }

    #[test]
    fn zero_width_rejected() {
        let ih = Image::new();
        assert!(matches!(
            ih.dump(&mut Vec::new(), 0, false),
            Err(ImageError::InvalidRange(_))
        ));
    }
}
