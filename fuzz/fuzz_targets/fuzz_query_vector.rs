//! Fuzz target for query validation.
//!
//! Arbitrary floats, NaN and infinities included, either build a valid
//! query or fail with InvalidInput.

#![no_main]

use gf_common::Error;
use gf_core::QueryVector;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|values: [f64; 4]| {
    match QueryVector::from_array(values) {
        Ok(query) => {
            for v in query.scores().to_array() {
                assert!((0.0..=100.0).contains(&v));
            }
        }
        Err(Error::InvalidInput { .. }) => {}
        Err(other) => panic!("unexpected error kind: {other}"),
    }
});
