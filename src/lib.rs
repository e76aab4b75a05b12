//! Oxihex: Intel HEX firmware images in Rust.
//!
//! The crate provides:
//! - A sparse byte-image store with padding and start-address metadata (`image`)
//! - The Intel HEX wire codec: records, stream reader, stream writer (`ihex`)
//! - Merge and dump-diff of two images (`merge`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use oxihex::image::Image;
//! use oxihex::ihex::{ReadOptions, WriteOptions, read_hex_str, write_hex_string};
//!
//! let mut image = Image::new();
//! image.put_bytes(0x100, b"firmware");
//!
//! let text = write_hex_string(&image, &WriteOptions::default()).unwrap();
//! let back = read_hex_str(&text, ReadOptions::default()).unwrap();
//! assert_eq!(back.to_dict(), image.to_dict());
//! ```

pub mod ihex;
pub mod image;
pub mod io;
pub mod merge;

#[cfg(feature = "cli")]
pub mod cli;
