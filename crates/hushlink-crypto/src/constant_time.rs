//! Constant-time operations on secret data.
//!
//! Every comparison of nonces, proofs, signatures and stored keys in the
//! handshake goes through this module. Execution time depends only on the
//! input lengths, never on their contents.

use subtle::ConstantTimeEq;

/// Compare two secrets without an early exit on the first differing byte.
///
/// A length mismatch is public information and returns `false` at once.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Timing-safe 32-byte array comparison.
///
/// Used for handshake nonces, proofs, signatures and stored keys.
#[must_use]
#[inline(never)]
pub fn verify_32(a: &[u8; 32], b: &[u8; 32]) -> bool {
    ct_eq(a, b)
}

/// Timing-safe 64-byte array comparison.
///
/// Used for the combined client/server nonce.
#[must_use]
#[inline(never)]
pub fn verify_64(a: &[u8; 64], b: &[u8; 64]) -> bool {
    ct_eq(a, b)
}

/// Byte-wise XOR of two 32-byte arrays.
///
/// Branch-free; used to blind and unblind the client key in proofs.
#[must_use]
pub fn xor_32(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = x ^ y;
    }
    out
}
