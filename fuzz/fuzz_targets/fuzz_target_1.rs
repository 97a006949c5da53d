#![no_main]

use libfuzzer_sys::fuzz_target;
use saflang_fuzz::verify_repro;

// Raw text: mostly filler, exercises the scanner on arbitrary unicode.
fuzz_target!(|data: (&str, Vec<i64>)| {
    let (source, input) = data;
    verify_repro(source, input);
});
