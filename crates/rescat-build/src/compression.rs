//! Gzip compression helper, registered as `gzip`.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::collaborators::CompressionHelper;

/// Gzip via `flate2`.
#[derive(Debug, Clone, Copy)]
pub struct GzipCompression {
    level: u32,
}

impl GzipCompression {
    /// A helper at a specific level (0 to 9).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Default for GzipCompression {
    fn default() -> Self {
        Self::with_level(Compression::default().level())
    }
}

impl CompressionHelper for GzipCompression {
    fn name(&self) -> &str {
        "gzip"
    }

    fn compress(&self, bytes: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(bytes)?;
        encoder.finish()
    }

    fn decompress(&self, bytes: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trip() {
        let gzip = GzipCompression::default();
        let payload = b"resource payload ".repeat(64);
        let packed = gzip.compress(&payload).unwrap();
        assert!(packed.len() < payload.len());
        assert_eq!(gzip.decompress(&packed).unwrap(), payload);
    }

    #[test]
    fn empty_payload_round_trips() {
        let gzip = GzipCompression::with_level(1);
        let packed = gzip.compress(&[]).unwrap();
        assert!(gzip.decompress(&packed).unwrap().is_empty());
    }

    #[test]
    fn garbage_fails_to_decompress() {
        assert!(GzipCompression::default().decompress(b"not gzip").is_err());
    }
}
