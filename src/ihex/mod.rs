// Intel HEX wire format.
//
// Colon-prefixed ASCII records, bit-exact with the classic tool chain:
// `:BBAAAATTDD..DDCC` with a mod-256 checksum over every decoded byte.
//
// # Modules
//
// - `record` — single-line codec: decode/encode one record
// - `reader` — multi-record stream reader with base/start-address tracking
// - `writer` — record emission with contiguous-run splitting

pub mod reader;
pub mod record;
pub mod writer;

// Re-export key types for convenience.
pub use reader::{HexReader, ReadError, ReadOptions, read_hex, read_hex_str};
pub use record::{LineOutcome, Record, RecordError, RecordType, decode_line, encode_record};
pub use writer::{Eol, WriteError, WriteOptions, write_hex, write_hex_string};
