#![no_main]
use libfuzzer_sys::fuzz_target;

use oxihex::ihex::{ReadOptions, WriteOptions, read_hex_str, write_hex_string};
use oxihex::image::Image;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the record size; the rest populates the image as
    // (address-delta, value) pairs so gaps and runs both occur.
    let byte_count = (data[0] as usize % 32) + 1;
    let mut image = Image::new();
    let mut addr = 0u64;
    for pair in data[1..].chunks_exact(2) {
        // Stay inside the 32-bit space the format can encode.
        addr = (addr + u64::from(pair[0])) & 0xFFFF_FFFF;
        image.set(addr, pair[1]);
    }

    let opts = WriteOptions {
        byte_count,
        ..Default::default()
    };
    let text = write_hex_string(&image, &opts).expect("writable image");
    let back = read_hex_str(&text, ReadOptions::default()).expect("own output must parse");
    assert_eq!(back.to_dict(), image.to_dict());
});
