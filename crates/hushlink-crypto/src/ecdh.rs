//! Ephemeral ECDH on NIST P-521.
//!
//! Provides key exchange with:
//! - Uncompressed SEC1 encoding only (133 bytes)
//! - On-curve validation of generated and received points
//! - Rejection of other curves, compressed points and the identity
//! - Zeroization of the secret scalar and the shared x-coordinate

use crate::CurveError;
use p521::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// Length of an uncompressed SEC1 P-521 point: `0x04 ‖ X(66) ‖ Y(66)`.
pub const PUBLIC_KEY_SIZE: usize = 133;

/// Length of the big-endian shared x-coordinate.
pub const SHARED_SECRET_SIZE: usize = 66;

/// Length of a P-521 secret scalar.
pub const SECRET_KEY_SIZE: usize = 66;

const UNCOMPRESSED_TAG: u8 = 0x04;

/// Ephemeral P-521 key pair for a single connection.
///
/// Consumed by [`EphemeralKeyPair::diffie_hellman`], which drops (and
/// zeroizes) the secret scalar.
pub struct EphemeralKeyPair {
    secret: p521::SecretKey,
    public: PublicKey,
}

/// P-521 public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(p521::PublicKey);

/// ECDH shared secret: the 66-byte x-coordinate of the shared point.
pub struct SharedSecret(Zeroizing<[u8; SHARED_SECRET_SIZE]>);

impl EphemeralKeyPair {
    /// Generate a fresh key pair from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::OffCurve`] if the derived public point does not
    /// survive a decode of its own encoding.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CurveError> {
        Self::from_secret(p521::SecretKey::random(rng))
    }

    /// Build a key pair from a fixed 66-byte big-endian scalar.
    ///
    /// Intended for deterministic tests and vectors.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::InvalidEncoding`] if the scalar is zero or not
    /// below the group order.
    pub fn from_secret_bytes(bytes: &[u8; SECRET_KEY_SIZE]) -> Result<Self, CurveError> {
        let secret =
            p521::SecretKey::from_slice(bytes).map_err(|_| CurveError::InvalidEncoding)?;
        Self::from_secret(secret)
    }

    fn from_secret(secret: p521::SecretKey) -> Result<Self, CurveError> {
        let public = PublicKey(secret.public_key());
        // A point we cannot decode again would be rejected by the peer.
        let reparsed =
            PublicKey::from_sec1_bytes(&public.to_bytes()).map_err(|_| CurveError::OffCurve)?;
        if reparsed != public {
            return Err(CurveError::OffCurve);
        }
        Ok(Self { secret, public })
    }

    /// The public half of this key pair.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Compute the shared secret with `peer`, consuming the key pair.
    #[must_use]
    pub fn diffie_hellman(self, peer: &PublicKey) -> SharedSecret {
        let shared = p521::elliptic_curve::ecdh::diffie_hellman(
            self.secret.to_nonzero_scalar(),
            peer.0.as_affine(),
        );
        let mut x = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
        x.copy_from_slice(shared.raw_secret_bytes());
        SharedSecret(x)
    }
}

impl PublicKey {
    /// Decode an uncompressed SEC1 P-521 point.
    ///
    /// # Errors
    ///
    /// - [`CurveError::Identity`] for the encoded point at infinity
    /// - [`CurveError::UnsupportedCurve`] for any length other than 133
    /// - [`CurveError::InvalidEncoding`] for a non-uncompressed tag
    /// - [`CurveError::OffCurve`] if the coordinates are not a curve point
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CurveError> {
        if bytes == [0x00] {
            return Err(CurveError::Identity);
        }
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CurveError::UnsupportedCurve(bytes.len()));
        }
        if bytes[0] != UNCOMPRESSED_TAG {
            return Err(CurveError::InvalidEncoding);
        }
        p521::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CurveError::OffCurve)
    }

    /// Encode as an uncompressed SEC1 point (133 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }
}

impl SharedSecret {
    /// Get the shared x-coordinate as bytes.
    ///
    /// # Security
    ///
    /// Must go through a KDF before use as a key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn scalar(last: u8) -> [u8; SECRET_KEY_SIZE] {
        let mut bytes = [0u8; SECRET_KEY_SIZE];
        bytes[SECRET_KEY_SIZE - 1] = last;
        bytes
    }

    #[test]
    fn test_public_key_encoding_length() {
        let pair = EphemeralKeyPair::generate(&mut OsRng).unwrap();
        let encoded = pair.public_key().to_bytes();
        assert_eq!(encoded.len(), PUBLIC_KEY_SIZE);
        assert_eq!(encoded[0], UNCOMPRESSED_TAG);
    }

    #[test]
    fn test_key_exchange_agrees() {
        let alice = EphemeralKeyPair::generate(&mut OsRng).unwrap();
        let bob = EphemeralKeyPair::generate(&mut OsRng).unwrap();

        let alice_public = alice.public_key().clone();
        let bob_public = bob.public_key().clone();

        let a = alice.diffie_hellman(&bob_public);
        let b = bob.diffie_hellman(&alice_public);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_generator_for_scalar_one() {
        let pair = EphemeralKeyPair::from_secret_bytes(&scalar(1)).unwrap();
        let encoded = pair.public_key().to_bytes();
        // Gx begins 0x00c6858e
        assert_eq!(&encoded[..5], &[0x04, 0x00, 0xc6, 0x85, 0x8e]);
    }

    #[test]
    fn test_deterministic_for_fixed_scalars() {
        // 1 * (2G) has the x-coordinate of 2G.
        let one = EphemeralKeyPair::from_secret_bytes(&scalar(1)).unwrap();
        let two = EphemeralKeyPair::from_secret_bytes(&scalar(2)).unwrap();
        let two_public = two.public_key().to_bytes();

        let shared = one.diffie_hellman(&PublicKey::from_sec1_bytes(&two_public).unwrap());
        assert_eq!(&shared.as_bytes()[..], &two_public[1..1 + SHARED_SECRET_SIZE]);
    }

    #[test]
    fn test_zero_scalar_rejected() {
        assert!(EphemeralKeyPair::from_secret_bytes(&[0u8; SECRET_KEY_SIZE]).is_err());
    }

    #[test]
    fn test_reject_identity() {
        assert_eq!(PublicKey::from_sec1_bytes(&[0x00]), Err(CurveError::Identity));
    }

    #[test]
    fn test_reject_other_curve_lengths() {
        // P-256 and P-384 uncompressed, P-521 compressed
        for len in [65usize, 97, 67, 0, 134] {
            let bytes = vec![UNCOMPRESSED_TAG; len];
            assert_eq!(
                PublicKey::from_sec1_bytes(&bytes),
                Err(CurveError::UnsupportedCurve(len))
            );
        }
    }

    #[test]
    fn test_reject_bad_tag() {
        let pair = EphemeralKeyPair::generate(&mut OsRng).unwrap();
        let mut encoded = pair.public_key().to_bytes();
        encoded[0] = 0x02;
        assert_eq!(
            PublicKey::from_sec1_bytes(&encoded),
            Err(CurveError::InvalidEncoding)
        );
    }

    #[test]
    fn test_reject_off_curve_point() {
        let pair = EphemeralKeyPair::generate(&mut OsRng).unwrap();
        let mut encoded = pair.public_key().to_bytes();
        encoded[PUBLIC_KEY_SIZE - 1] ^= 0x01;
        assert_eq!(
            PublicKey::from_sec1_bytes(&encoded),
            Err(CurveError::OffCurve)
        );
    }
}
