#![no_main]

use libfuzzer_sys::fuzz_target;
use tachograph::{schema, Config, Decoder};

fuzz_target!(|data: &[u8]| {
    let schema = schema::vehicle_unit();
    for strict in [false, true] {
        let _ = Decoder::new(
            &schema, Config::new().strict(strict)
        ).decode_slice(data);
    }
});
