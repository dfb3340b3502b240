//! Deterministic unit values from record identities.
//!
//! The fold is 32-bit FNV-1a over UTF-16 code units with wrapping
//! multiplication, so any implementation using 32-bit unsigned arithmetic
//! reproduces it bit-for-bit.

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Raw 32-bit FNV-1a accumulator over the UTF-16 code units of `text`.
#[must_use]
pub fn fnv1a_32(text: &str) -> u32 {
    text.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Maps `text` to a value in `[0, 1]` by dividing its hash by `2^32 - 1`.
///
/// Only a hash of exactly `u32::MAX` reaches `1.0`, which yields the same
/// angle as `0.0` once scaled by `2π`.
#[must_use]
pub fn hash_to_unit(text: &str) -> f64 {
    f64::from(fnv1a_32(text)) / f64::from(u32::MAX)
}
