// File-level I/O helpers.
//
// Convenience functions wrapping the stream reader/writer with buffered
// file handles. Handles live for the duration of one call; the library
// never keeps them. Optionally computes a SHA-256 digest of exported
// binary content (feature-gated behind `file-io`) for downstream firmware
// packaging, which checks exactly such digests.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::ihex::reader::{HexReader, ReadError, ReadOptions};
use crate::ihex::writer::{WriteError, WriteOptions, write_hex};
use crate::image::{Image, ImageError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Hex stream reading error.
    #[error("read error: {0}")]
    Read(#[from] ReadError),
    /// Hex stream writing error.
    #[error("write error: {0}")]
    Write(#[from] WriteError),
    /// Image export error.
    #[error("image error: {0}")]
    Image(#[from] ImageError),
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `save_hex_file()`.
#[derive(Debug, Clone)]
pub struct HexStats {
    /// Records emitted, including base, start-address and EOF records.
    pub records: u64,
    /// Populated data bytes written.
    pub data_bytes: u64,
}

/// Statistics returned by `save_bin_file()`.
#[derive(Debug, Clone)]
pub struct BinStats {
    /// Exported size in bytes, padding included.
    pub size: u64,
    /// SHA-256 of the exported bytes (if the `file-io` feature is enabled).
    pub sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Hex files
// ---------------------------------------------------------------------------

/// Read a hex file into a fresh image.
pub fn load_hex_file(path: &Path) -> Result<Image, IoError> {
    load_hex_file_with(path, ReadOptions::default())
}

/// Read a hex file with an explicit overlap policy.
pub fn load_hex_file_with(path: &Path, opts: ReadOptions) -> Result<Image, IoError> {
    let file = File::open(path)?;
    let mut image = Image::new();
    HexReader::with_options(BufReader::with_capacity(BUF_SIZE, file), opts)
        .read_into(&mut image)?;
    Ok(image)
}

/// Write an image as a hex file.
pub fn save_hex_file(path: &Path, image: &Image, opts: &WriteOptions) -> Result<HexStats, IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, file);
    let records = write_hex(image, &mut writer, opts)?;
    writer.flush()?;
    Ok(HexStats {
        records,
        data_bytes: image.len() as u64,
    })
}

// ---------------------------------------------------------------------------
// Binary files
// ---------------------------------------------------------------------------

/// Read a raw binary file, placing its bytes at `offset`.
pub fn load_bin_file(path: &Path, offset: u64) -> Result<Image, IoError> {
    let file = File::open(path)?;
    let mut image = Image::new();
    image.load_bin(BufReader::with_capacity(BUF_SIZE, file), offset)?;
    Ok(image)
}

/// Export an image's bytes (padding-filled) to a raw binary file over the
/// requested bounds; `None` bounds use the full extent.
pub fn save_bin_file(
    path: &Path,
    image: &Image,
    start: Option<u64>,
    end: Option<u64>,
    size: Option<u64>,
) -> Result<BinStats, IoError> {
    let bytes = image.to_bin_array(start, end, size)?;

    #[cfg(feature = "file-io")]
    let sha256 = {
        let mut hasher = sha2::Sha256::new();
        hasher.update(&bytes);
        Some(hasher.finalize().into())
    };
    #[cfg(not(feature = "file-io"))]
    let sha256: Option<[u8; 32]> = None;

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(BinStats {
        size: bytes.len() as u64,
        sha256,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hex_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.hex");

        let mut ih = Image::new();
        ih.put_bytes(0x100, b"file roundtrip");
        let stats = save_hex_file(&path, &ih, &WriteOptions::default()).unwrap();
        assert_eq!(stats.data_bytes, 14);
        assert_eq!(stats.records, 2); // one data record + EOF

        let back = load_hex_file(&path).unwrap();
        assert_eq!(back.to_dict(), ih.to_dict());
    }

    #[test]
    fn bin_file_roundtrip_with_offset() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("image.bin");

        let mut ih = Image::new();
        ih.put_bytes(0x40, &[1, 2, 3, 4]);
        let stats = save_bin_file(&bin, &ih, None, None, None).unwrap();
        assert_eq!(stats.size, 4);

        let back = load_bin_file(&bin, 0x40).unwrap();
        assert_eq!(back.to_dict().cells, ih.to_dict().cells);
    }

    #[test]
    fn bin_export_pads_gaps() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("padded.bin");

        let mut ih = Image::new();
        ih.set(0, 0x11);
        ih.set(3, 0x44);
        save_bin_file(&bin, &ih, None, None, None).unwrap();
        assert_eq!(std::fs::read(&bin).unwrap(), vec![0x11, 0xFF, 0xFF, 0x44]);
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn bin_stats_carry_sha256() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("digest.bin");

        let mut ih = Image::new();
        ih.put_bytes(0, b"digest me");
        let stats = save_bin_file(&bin, &ih, None, None, None).unwrap();
        let expected: [u8; 32] = {
            let mut h = sha2::Sha256::new();
            h.update(b"digest me");
            h.finalize().into()
        };
        assert_eq!(stats.sha256, Some(expected));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_hex_file(Path::new("/nonexistent/image.hex")).unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }
}
