#![no_main]

use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use saflang_fuzz::{verify_repro, ArbitraryChar};

#[derive(Arbitrary)]
struct FuzzInput {
    program: Vec<ArbitraryChar>,
    input: Vec<i64>,
}

impl FuzzInput {
    fn source(&self) -> String {
        self.program.iter().map(|c| c.0).collect()
    }
}

impl std::fmt::Debug for FuzzInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "FuzzInput {{")?;
        writeln!(f, "    program: {:?},", self.source())?;
        writeln!(f, "    input: {:?},", self.input)?;
        write!(f, "}}")?;
        writeln!(f, "Reproduce with:")?;
        writeln!(f, "#[test]")?;
        writeln!(f, "fn fuzz_repro() {{")?;
        writeln!(f, "    verify_repro({:?}, vec!{:?});", self.source(), self.input)?;
        writeln!(f, "}}")?;
        Ok(())
    }
}

fuzz_target!(|data: FuzzInput| {
    if data.program.is_empty() { return } // uninteresting edge case

    verify_repro(&data.source(), data.input);
});
