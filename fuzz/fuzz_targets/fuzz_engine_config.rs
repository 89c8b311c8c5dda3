//! Fuzz target for engine.json configuration parsing.
//!
//! Parsing and validation must reject arbitrary input with an error, never
//! a panic.

#![no_main]

use gf_config::{validate_engine, EngineConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<EngineConfig>(data) {
        let _ = validate_engine(&config);
    }
});
