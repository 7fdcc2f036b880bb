//! OS-backed randomness for nonces, salts and decoy keys.

use crate::CryptoError;

/// Overwrite `buf` with bytes from the operating system.
///
/// # Errors
///
/// Returns [`CryptoError::RandomFailed`] when `getrandom` reports an error.
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|_| CryptoError::RandomFailed)
}

/// 32 fresh random bytes: a handshake nonce or a salt.
///
/// # Errors
///
/// Returns [`CryptoError::RandomFailed`] when `getrandom` reports an error.
pub fn random_32() -> Result<[u8; 32], CryptoError> {
    let mut buf = [0u8; 32];
    fill_random(&mut buf)?;
    Ok(buf)
}
