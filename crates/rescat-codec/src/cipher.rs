//! # String Cipher
//!
//! Symmetric XOR stream cipher used to obfuscate every variable-length
//! string in a version list, and the same XOR applied to resource payloads
//! whose load type demands in-memory decryption.
//!
//! The key is repeated cyclically starting at `key[0]`. Encryption and
//! decryption are the same length-preserving operation.
//!
//! ## Keys
//!
//! Each serialized file starts with a fresh random 4-byte salt that keys
//! its top-level strings. Strings nested under a resource are keyed by the
//! little-endian bytes of that resource's content hash. Both live in a
//! [`StringKey`] owned by the encode/decode call and zeroed on drop.

use rand::RngCore;
use rescat_core::{ContentHash, Obfuscation, QUICK_ENCRYPT_LENGTH};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length in bytes of every string key.
pub const KEY_LENGTH: usize = 4;

/// A 4-byte string key. Zeroed when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct StringKey([u8; KEY_LENGTH]);

impl StringKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive the per-resource key from a content hash.
    pub fn from_hash(hash: ContentHash) -> Self {
        Self(hash.to_le_bytes())
    }

    /// The key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for StringKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StringKey(..)")
    }
}

/// Generate a fresh random salt for one serialized file.
pub fn random_salt() -> StringKey {
    let mut bytes = [0u8; KEY_LENGTH];
    rand::thread_rng().fill_bytes(&mut bytes);
    StringKey(bytes)
}

/// XOR `bytes` in place with `key` repeated from `key[0]`.
///
/// An empty key leaves the bytes unchanged.
pub fn xor_in_place(bytes: &mut [u8], key: &[u8]) {
    if key.is_empty() {
        return;
    }
    for (b, k) in bytes.iter_mut().zip(key.iter().cycle()) {
        *b ^= k;
    }
}

/// Encrypt a plaintext. Length-preserving.
pub fn encrypt(plain: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = plain.to_vec();
    xor_in_place(&mut out, key);
    out
}

/// Decrypt a ciphertext. Inverse of [`encrypt`].
pub fn decrypt(cipher: &[u8], key: &[u8]) -> Vec<u8> {
    encrypt(cipher, key)
}

/// Apply the payload obfuscation a load type demands, in place.
///
/// `Quick` covers only the first [`QUICK_ENCRYPT_LENGTH`] bytes. Applying
/// the same obfuscation twice restores the original payload.
pub fn obfuscate_payload(bytes: &mut [u8], key: &StringKey, obfuscation: Obfuscation) {
    match obfuscation {
        Obfuscation::None => {}
        Obfuscation::Quick => {
            let end = bytes.len().min(QUICK_ENCRYPT_LENGTH);
            xor_in_place(&mut bytes[..end], key.as_bytes());
        }
        Obfuscation::Full => xor_in_place(bytes, key.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_is_length_preserving() {
        let key = [1, 2, 3, 4];
        assert_eq!(encrypt(b"hello world", &key).len(), 11);
        assert!(encrypt(b"", &key).is_empty());
    }

    #[test]
    fn key_cycles_from_first_byte() {
        let key = [0x01, 0x02, 0x03, 0x04];
        let out = encrypt(&[0u8; 6], &key);
        assert_eq!(out, vec![0x01, 0x02, 0x03, 0x04, 0x01, 0x02]);
    }

    #[test]
    fn decrypt_inverts_encrypt() {
        let key = [0xde, 0xad, 0xbe, 0xef];
        let plain = "Assets/UI/Ünïcode.png".as_bytes();
        assert_eq!(decrypt(&encrypt(plain, &key), &key), plain);
    }

    #[test]
    fn empty_key_is_identity() {
        assert_eq!(encrypt(b"abc", &[]), b"abc");
    }

    #[test]
    fn key_from_hash_uses_little_endian() {
        let key = StringKey::from_hash(ContentHash::from_u32(0x0403_0201));
        assert_eq!(key.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn random_salts_differ() {
        // Four random bytes colliding eight times in a row is not a thing.
        let first = random_salt();
        assert!((0..8).any(|_| random_salt() != first));
    }

    #[test]
    fn quick_obfuscation_covers_prefix_only() {
        let key = StringKey::new([0xff; 4]);
        let mut payload = vec![0u8; QUICK_ENCRYPT_LENGTH + 10];
        obfuscate_payload(&mut payload, &key, Obfuscation::Quick);
        assert!(payload[..QUICK_ENCRYPT_LENGTH].iter().all(|b| *b == 0xff));
        assert!(payload[QUICK_ENCRYPT_LENGTH..].iter().all(|b| *b == 0));
    }

    #[test]
    fn full_obfuscation_round_trips() {
        let key = StringKey::new([9, 8, 7, 6]);
        let original: Vec<u8> = (0..=255).collect();
        let mut payload = original.clone();
        obfuscate_payload(&mut payload, &key, Obfuscation::Full);
        assert_ne!(payload, original);
        obfuscate_payload(&mut payload, &key, Obfuscation::Full);
        assert_eq!(payload, original);
    }

    #[test]
    fn quick_obfuscation_on_short_payload() {
        let key = StringKey::new([1, 1, 1, 1]);
        let mut payload = vec![0u8; 3];
        obfuscate_payload(&mut payload, &key, Obfuscation::Quick);
        assert_eq!(payload, vec![1, 1, 1]);
    }

    #[test]
    fn debug_hides_key_bytes() {
        let key = StringKey::new([1, 2, 3, 4]);
        assert_eq!(format!("{key:?}"), "StringKey(..)");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Decryption with the right key always restores the plaintext.
        #[test]
        fn cipher_round_trip(plain in prop::collection::vec(any::<u8>(), 0..512), key in any::<[u8; 4]>()) {
            prop_assert_eq!(decrypt(&encrypt(&plain, &key), &key), plain);
        }

        /// A different key almost never restores a non-trivial plaintext.
        #[test]
        fn wrong_key_garbles(plain in prop::collection::vec(any::<u8>(), 4..64), key in any::<[u8; 4]>(), flip in 1u8..=255) {
            let mut wrong = key;
            wrong[0] ^= flip;
            prop_assert_ne!(decrypt(&encrypt(&plain, &key), &wrong), plain);
        }
    }
}
