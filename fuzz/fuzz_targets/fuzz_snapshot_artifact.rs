//! Fuzz target for snapshot artifact loading.
//!
//! Anything that parses is pushed through snapshot construction, which
//! sorts, standardizes and measures the corpus.

#![no_main]

use gf_config::EngineConfig;
use gf_core::{EngineSnapshot, SnapshotArtifact};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(artifact) = SnapshotArtifact::from_json(text) {
        let _ = EngineSnapshot::build(artifact, &EngineConfig::default());
    }
});
