//! Shared helpers for the integration tests.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{fuzz_bytes, generate, json_codec};
//! ```

#![allow(dead_code)]

use schema_roundtrip::{
    default_scheme, BinaryCodec, Customizers, Fill, GenResult, Generator, GeneratorLimits,
    JsonCodec, Scheme,
};
use std::sync::Arc;

/// Size of the buffers produced by [`fuzz_bytes`].
pub const INPUT_LEN: usize = 16384;

/// Number of seeds the exhaustive tests sweep.
pub const SEEDS: u32 = 12;

/// Routes `tracing` output through the test harness's capture. Safe to call
/// from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Deterministic pseudo-random bytes (xorshift32).
pub fn fuzz_bytes(seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9) | 1;
    (0..INPUT_LEN)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// The built-in scheme behind an `Arc`.
pub fn scheme() -> Arc<Scheme> {
    Arc::new(default_scheme())
}

/// The built-in customizers over the built-in scheme.
pub fn customizers() -> Customizers {
    Customizers::with_defaults(JsonCodec::new(scheme()))
}

pub fn json_codec() -> JsonCodec {
    JsonCodec::new(scheme())
}

pub fn binary_codec() -> BinaryCodec {
    BinaryCodec::new(scheme())
}

/// Generates a `T` from `data` with the built-in customizers.
pub fn generate<T: Fill + Default>(data: &[u8]) -> GenResult<T> {
    let customizers = customizers();
    let mut g = Generator::new(data, &customizers, GeneratorLimits::default());
    let mut value = T::default();
    g.generate(&mut value)?;
    Ok(value)
}
