// 16-bit little-endian word view over a byte image.
//
// Word address N covers byte addresses 2N (low half) and 2N+1 (high half).
// Intended for 16-bit targets whose toolchains emit word-oriented hex files.

use thiserror::Error;

use super::store::Image;

/// Default padding word returned for reads of fully unset words.
pub const DEFAULT_PADDING_WORD: u16 = 0xFFFF;

/// A word read found exactly one of its two bytes.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot read 16-bit word at address {0:#06X}: one byte is missing")]
pub struct BadAccess16(pub u64);

/// Owning 16-bit view. Wraps a byte `Image` and presents it word-addressed.
#[derive(Debug, Clone)]
pub struct Image16 {
    inner: Image,
    padding_word: u16,
}

impl Default for Image16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Image16 {
    pub fn new() -> Self {
        Self::from_image(Image::new())
    }

    /// Wrap an existing byte image.
    pub fn from_image(inner: Image) -> Self {
        Self {
            inner,
            padding_word: DEFAULT_PADDING_WORD,
        }
    }

    /// Unwrap back into the underlying byte image.
    pub fn into_image(self) -> Image {
        self.inner
    }

    pub fn image(&self) -> &Image {
        &self.inner
    }

    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.inner
    }

    pub fn padding_word(&self) -> u16 {
        self.padding_word
    }

    pub fn set_padding_word(&mut self, padding: u16) {
        self.padding_word = padding;
    }

    /// Read the word at `addr`. A fully unset word yields the padding word;
    /// a word with exactly one byte present fails.
    pub fn get(&self, addr: u64) -> Result<u16, BadAccess16> {
        let lo = self.inner.byte_at(2 * addr);
        let hi = self.inner.byte_at(2 * addr + 1);
        match (lo, hi) {
            (Some(lo), Some(hi)) => Ok(u16::from(lo) | (u16::from(hi) << 8)),
            (None, None) => Ok(self.padding_word),
            _ => Err(BadAccess16(addr)),
        }
    }

    /// Write both halves of the word at `addr`, little-endian.
    pub fn set(&mut self, addr: u64, word: u16) {
        self.inner.set(2 * addr, (word & 0xFF) as u8);
        self.inner.set(2 * addr + 1, (word >> 8) as u8);
    }

    /// Lowest populated word address.
    pub fn min_addr(&self) -> Option<u64> {
        self.inner.min_addr().map(|a| a / 2)
    }

    /// Highest populated word address.
    pub fn max_addr(&self) -> Option<u64> {
        self.inner.max_addr().map(|a| a / 2)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
