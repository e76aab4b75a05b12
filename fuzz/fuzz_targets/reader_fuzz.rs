#![no_main]
use libfuzzer_sys::fuzz_target;

use oxihex::ihex::{ReadOptions, read_hex_str};
use oxihex::image::Overlap;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for overlap in [Overlap::Error, Overlap::Ignore, Overlap::Replace] {
        let _ = read_hex_str(&text, ReadOptions { overlap });
    }
});
