//! # Payload Processing
//!
//! Turns compiled bundle bytes into the forms each output tree stores:
//!
//! 1. Hash the plaintext. The hash doubles as the XOR key.
//! 2. Obfuscate in place when the load type asks for it.
//! 3. Compress the obfuscated bytes when a helper is active, and hash that.
//!
//! Package and Packed trees store the obfuscated bytes; the Full tree and
//! resource packs store the compressed bytes.

use rescat_codec::{cipher, CodecError, StringKey};
use rescat_core::{ContentHash, LoadType, PlatformCode};

use crate::collaborators::CompressionHelper;
use crate::error::{BuildError, BuildResult};

/// A processed bundle payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedPayload {
    /// Lengths and hashes recorded in the catalog.
    pub code: PlatformCode,
    /// Plaintext after obfuscation.
    pub stored: Vec<u8>,
    /// `stored` after compression, or a copy of it without a helper.
    pub compressed: Vec<u8>,
}

fn checked_len(what: &'static str, bytes: &[u8]) -> BuildResult<u32> {
    u32::try_from(bytes.len()).map_err(|_| {
        BuildError::Capacity(CodecError::Capacity {
            what,
            value: bytes.len() as u64,
            max: u64::from(u32::MAX),
        })
    })
}

/// Hash, obfuscate and optionally compress a plaintext payload.
pub fn process_payload(
    plain: Vec<u8>,
    load_type: LoadType,
    compression: Option<&dyn CompressionHelper>,
) -> BuildResult<ProcessedPayload> {
    let length = checked_len("payload length", &plain)?;
    let hash = ContentHash::of(&plain);

    let mut stored = plain;
    cipher::obfuscate_payload(&mut stored, &StringKey::from_hash(hash), load_type.obfuscation());

    let compressed = match compression {
        Some(helper) => helper.compress(&stored).map_err(|e| BuildError::Compression {
            helper: helper.name().to_string(),
            reason: e.to_string(),
        })?,
        None => stored.clone(),
    };
    let compressed_length = checked_len("compressed payload length", &compressed)?;

    Ok(ProcessedPayload {
        code: PlatformCode {
            length,
            hash,
            compressed_length,
            compressed_hash: ContentHash::of(&compressed),
        },
        stored,
        compressed,
    })
}

/// Undo [`process_payload`]: decompress, then de-obfuscate.
pub fn restore_payload(
    compressed: &[u8],
    load_type: LoadType,
    hash: ContentHash,
    compression: Option<&dyn CompressionHelper>,
) -> BuildResult<Vec<u8>> {
    let mut plain = match compression {
        Some(helper) => helper.decompress(compressed).map_err(|e| BuildError::Compression {
            helper: helper.name().to_string(),
            reason: e.to_string(),
        })?,
        None => compressed.to_vec(),
    };
    cipher::obfuscate_payload(&mut plain, &StringKey::from_hash(hash), load_type.obfuscation());
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::GzipCompression;

    fn payload() -> Vec<u8> {
        (0..600u32).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn plain_load_type_stores_plaintext() {
        let processed = process_payload(payload(), LoadType::LoadFromFile, None).unwrap();
        assert_eq!(processed.stored, payload());
        assert_eq!(processed.compressed, payload());
        assert_eq!(processed.code.length, 600);
        assert_eq!(processed.code.hash, ContentHash::of(&payload()));
        assert_eq!(processed.code.compressed_hash, processed.code.hash);
    }

    #[test]
    fn quick_decrypt_obfuscates_prefix() {
        let processed =
            process_payload(payload(), LoadType::LoadFromMemoryAndQuickDecrypt, None).unwrap();
        assert_ne!(processed.stored[..220], payload()[..220]);
        assert_eq!(processed.stored[220..], payload()[220..]);
        // The hash always describes the plaintext.
        assert_eq!(processed.code.hash, ContentHash::of(&payload()));
    }

    #[test]
    fn full_decrypt_with_gzip_restores() {
        let gzip = GzipCompression::default();
        let processed = process_payload(
            payload(),
            LoadType::LoadFromBinaryAndDecrypt,
            Some(&gzip),
        )
        .unwrap();
        assert_ne!(processed.compressed, processed.stored);
        assert_eq!(processed.code.compressed_length as usize, processed.compressed.len());
        let restored = restore_payload(
            &processed.compressed,
            LoadType::LoadFromBinaryAndDecrypt,
            processed.code.hash,
            Some(&gzip),
        )
        .unwrap();
        assert_eq!(restored, payload());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn restore_inverts_process(
                plain in proptest::collection::vec(any::<u8>(), 0..1024),
                tag in 0u8..7,
                gzip in any::<bool>(),
            ) {
                let load_type = LoadType::from_tag(tag).unwrap();
                let helper = GzipCompression::default();
                let compression = gzip.then_some(&helper as &dyn CompressionHelper);
                let processed = process_payload(plain.clone(), load_type, compression).unwrap();
                prop_assert_eq!(processed.code.length as usize, plain.len());
                let restored =
                    restore_payload(&processed.compressed, load_type, processed.code.hash, compression)
                        .unwrap();
                prop_assert_eq!(restored, plain);
            }
        }
    }
}
