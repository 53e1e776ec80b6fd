#![no_main]

use libfuzzer_sys::fuzz_target;
use objwire_fuzz::GraphSpec;

fuzz_target!(|spec: GraphSpec| {
    objwire_fuzz::check_roundtrip(&spec);
});
