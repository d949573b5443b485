use crate::artifact::{ArtifactError, ArtifactReader};
use digest::{Digest, Output};
use std::marker::PhantomData;

/// Scratch size used to stage artifact bytes on their way to the digest.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Streams an artifact through digest `D` in fixed-size chunks.
pub struct Hasher<D> {
    chunk_size: usize,
    algorithm: PhantomData<D>,
}

impl<D: Digest> Hasher<D> {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// A zero chunk size is bumped to one byte.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Hasher {
            chunk_size: chunk_size.max(1),
            algorithm: PhantomData,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Digests the whole artifact, front to back. A failed read aborts the
    /// digest; no partial result is ever returned.
    pub fn digest(&self, reader: &mut dyn ArtifactReader) -> Result<Output<D>, ArtifactError> {
        let mut ctx = D::new();
        let mut remaining = reader.len();
        // scratch never outgrows the artifact
        let scratch_len = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; scratch_len];
        let mut offset: u64 = 0;

        while remaining > 0 {
            let frag_len = remaining.min(self.chunk_size as u64) as usize;
            reader.read(&mut buf[..frag_len], offset)?;
            ctx.update(&buf[..frag_len]);
            remaining -= frag_len as u64;
            offset += frag_len as u64;
        }
        Ok(ctx.finalize())
    }
}

impl<D: Digest> Default for Hasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MemoryArtifact;
    use sha1::Sha1;

    // CountingReader wraps a MemoryArtifact and records every read
    struct CountingReader {
        inner: MemoryArtifact,
        reads: Vec<(u64, usize)>,
        fail_at: Option<u64>,
    }

    impl CountingReader {
        fn new(data: Vec<u8>) -> Self {
            CountingReader {
                inner: MemoryArtifact::new(data),
                reads: Vec::new(),
                fail_at: None,
            }
        }
    }

    impl ArtifactReader for CountingReader {
        fn len(&self) -> u64 {
            self.inner.len()
        }

        fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), ArtifactError> {
            self.reads.push((offset, dst.len()));
            if self.fail_at == Some(offset) {
                return Err(ArtifactError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "short read",
                )));
            }
            self.inner.read(dst, offset)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn known_vectors() {
        let hasher = Hasher::<Sha1>::new();
        let digest = hasher.digest(&mut MemoryArtifact::new(b"abc".to_vec())).unwrap();
        assert_eq!(hex::encode(digest), "a9993e364706816aba3e25717850c26c9cd0d89d");
        let digest = hasher.digest(&mut MemoryArtifact::new(Vec::new())).unwrap();
        assert_eq!(hex::encode(digest), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn digest_is_deterministic() {
        let hasher = Hasher::<Sha1>::new();
        let data = pattern(1000);
        let first = hasher.digest(&mut MemoryArtifact::new(data.clone())).unwrap();
        let second = hasher.digest(&mut MemoryArtifact::new(data)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn chunk_size_does_not_change_digest() {
        for len in [0usize, 1, 127, 128, 129, 300, 1000] {
            let data = pattern(len);
            let expected = Sha1::digest(&data);
            for chunk in [1usize, 17, 128, len] {
                let hasher = Hasher::<Sha1>::with_chunk_size(chunk);
                let got = hasher.digest(&mut MemoryArtifact::new(data.clone())).unwrap();
                assert_eq!(got, expected, "len {} chunk {}", len, chunk);
            }
        }
    }

    #[test]
    fn reads_cover_artifact_without_gaps() {
        let mut reader = CountingReader::new(pattern(300));
        Hasher::<Sha1>::new().digest(&mut reader).unwrap();
        assert_eq!(reader.reads, vec![(0, 128), (128, 128), (256, 44)]);
    }

    #[test]
    fn empty_artifact_is_never_read() {
        let mut reader = CountingReader::new(Vec::new());
        Hasher::<Sha1>::with_chunk_size(17).digest(&mut reader).unwrap();
        assert!(reader.reads.is_empty());
    }

    #[test]
    fn huge_chunk_size_on_small_artifact() {
        let mut reader = CountingReader::new(b"abc".to_vec());
        let digest = Hasher::<Sha1>::with_chunk_size(usize::MAX)
            .digest(&mut reader)
            .unwrap();
        assert_eq!(hex::encode(digest), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(reader.reads, vec![(0, 3)]);
    }

    #[test]
    fn read_failure_aborts_digest() {
        let mut reader = CountingReader::new(pattern(300));
        reader.fail_at = Some(128);
        let err = Hasher::<Sha1>::new().digest(&mut reader).unwrap_err();
        assert!(matches!(err, ArtifactError::Io(_)));
        assert_eq!(reader.reads.len(), 2);
    }
}
