//! Whole-stream chunked cipher
//!
//! The pipe reads its entire source before transforming anything and writes
//! the result with a single `write_all`, so a failure in any chunk leaves the
//! sink untouched. Memory use is O(input size).

use rayon::prelude::*;
use std::io::{Read, Write};
use tracing::debug;

use crate::chunk::{ChunkTransformer, OaepDecryptor, OaepEncryptor};
use crate::keys::KeyPair;
use rsapipe_core::{Direction, RsapipeError, RsapipeResult};

/// What one [`CipherPipe::pipe`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeSummary {
    pub chunks: usize,
    pub bytes_in: usize,
    pub bytes_out: usize,
}

/// A chunked RSA-OAEP cipher bound to one key and one direction.
#[derive(Debug, Clone, Copy)]
pub struct CipherPipe<'k> {
    key: &'k KeyPair,
    direction: Direction,
    parallel: bool,
}

impl<'k> CipherPipe<'k> {
    pub fn new(key: &'k KeyPair, direction: Direction) -> Self {
        Self {
            key,
            direction,
            parallel: false,
        }
    }

    pub fn encrypt(key: &'k KeyPair) -> Self {
        Self::new(key, Direction::Encrypt)
    }

    pub fn decrypt(key: &'k KeyPair) -> Self {
        Self::new(key, Direction::Decrypt)
    }

    /// Transform chunks on the rayon pool. Output order is unchanged.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Read all of `source`, transform it, and write the result to `sink`.
    pub fn pipe<R: Read, W: Write>(&self, mut source: R, mut sink: W) -> RsapipeResult<PipeSummary> {
        let mut input = Vec::new();
        source
            .read_to_end(&mut input)
            .map_err(RsapipeError::StreamRead)?;

        let (output, chunks) = self.run(&input)?;

        sink.write_all(&output).map_err(RsapipeError::StreamWrite)?;
        sink.flush().map_err(RsapipeError::StreamWrite)?;

        let summary = PipeSummary {
            chunks,
            bytes_in: input.len(),
            bytes_out: output.len(),
        };
        debug!(
            direction = %self.direction,
            chunks = summary.chunks,
            bytes_in = summary.bytes_in,
            bytes_out = summary.bytes_out,
            parallel = self.parallel,
            "pipe complete"
        );
        Ok(summary)
    }

    /// Transform an in-memory buffer.
    pub fn transform(&self, input: &[u8]) -> RsapipeResult<Vec<u8>> {
        self.run(input).map(|(output, _)| output)
    }

    fn run(&self, input: &[u8]) -> RsapipeResult<(Vec<u8>, usize)> {
        match self.direction {
            Direction::Encrypt => transform_chunks(
                &OaepEncryptor::new(self.key.public_key()),
                input,
                self.parallel,
            ),
            Direction::Decrypt => transform_chunks(
                &OaepDecryptor::new(self.key.private_key()),
                input,
                self.parallel,
            ),
        }
    }
}

/// Split `input` at `chunk_size` boundaries, transform every chunk, and
/// concatenate the outputs in chunk order. Returns the output and the chunk count.
pub fn transform_chunks<T: ChunkTransformer>(
    transformer: &T,
    input: &[u8],
    parallel: bool,
) -> RsapipeResult<(Vec<u8>, usize)> {
    if input.is_empty() {
        return Ok((Vec::new(), 0));
    }

    let chunk_size = transformer.chunk_size();
    if chunk_size == 0 {
        return Err(RsapipeError::ChunkTransform {
            direction: transformer.direction(),
            index: 0,
            reason: "key is too small for OAEP-SHA512 padding".into(),
        });
    }

    let blocks: Vec<Vec<u8>> = if parallel {
        input
            .par_chunks(chunk_size)
            .enumerate()
            .map(|(index, chunk)| transformer.transform(index, chunk))
            .collect::<RsapipeResult<_>>()?
    } else {
        input
            .chunks(chunk_size)
            .enumerate()
            .map(|(index, chunk)| transformer.transform(index, chunk))
            .collect::<RsapipeResult<_>>()?
    };

    let count = blocks.len();
    Ok((blocks.concat(), count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn fixture_key() -> KeyPair {
        KeyPair::parse(include_bytes!("../tests/fixtures/rsa2048.pem"), b"").unwrap()
    }

    fn make_data(size: usize) -> Vec<u8> {
        (0..size)
            .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
            .collect()
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pipe_roundtrip() {
        let key = fixture_key();
        let plaintext = make_data(1000);

        let mut ciphertext = Vec::new();
        let sealed = CipherPipe::encrypt(&key)
            .pipe(&plaintext[..], &mut ciphertext)
            .unwrap();
        assert_eq!(sealed.chunks, 8); // ceil(1000 / 126)
        assert_eq!(sealed.bytes_out, 8 * 256);

        let mut recovered = Vec::new();
        let opened = CipherPipe::decrypt(&key)
            .pipe(&ciphertext[..], &mut recovered)
            .unwrap();
        assert_eq!(opened.chunks, 8);
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_empty_input_produces_empty_output() {
        let key = fixture_key();
        for pipe in [CipherPipe::encrypt(&key), CipherPipe::decrypt(&key)] {
            let mut out = Vec::new();
            let summary = pipe.pipe(io::empty(), &mut out).unwrap();
            assert!(out.is_empty());
            assert_eq!(summary.chunks, 0);
        }
    }

    #[test]
    fn test_exact_chunk_boundary() {
        let key = fixture_key();
        let enc = CipherPipe::encrypt(&key);
        let dec = CipherPipe::decrypt(&key);

        let max = make_data(126);
        let one = enc.transform(&max).unwrap();
        assert_eq!(one.len(), 256, "max-size plaintext fits in one chunk");
        assert_eq!(dec.transform(&one).unwrap(), max);

        let spill = make_data(127);
        let two = enc.transform(&spill).unwrap();
        assert_eq!(two.len(), 512, "max+1 spills into a second chunk");
        assert_eq!(dec.transform(&two).unwrap(), spill);
    }

    #[test]
    fn test_parallel_matches_sequential_plaintext() {
        let key = fixture_key();
        let plaintext = make_data(2000);

        let sealed = CipherPipe::encrypt(&key)
            .with_parallel(true)
            .transform(&plaintext)
            .unwrap();
        let opened = CipherPipe::decrypt(&key).transform(&sealed).unwrap();
        assert_eq!(opened, plaintext);

        let sealed = CipherPipe::encrypt(&key).transform(&plaintext).unwrap();
        let opened = CipherPipe::decrypt(&key)
            .with_parallel(true)
            .transform(&sealed)
            .unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_corrupt_chunk_writes_nothing() {
        let key = fixture_key();
        let mut ciphertext = CipherPipe::encrypt(&key)
            .transform(&make_data(300))
            .unwrap();
        ciphertext[256 + 10] ^= 0x01;

        let mut out = Vec::new();
        let err = CipherPipe::decrypt(&key)
            .pipe(&ciphertext[..], &mut out)
            .unwrap_err();
        assert_eq!(err.chunk_index(), Some(1));
        assert!(out.is_empty(), "sink must stay untouched on failure");
    }

    #[test]
    fn test_read_failure() {
        let key = fixture_key();
        let err = CipherPipe::encrypt(&key)
            .pipe(FailingReader, Vec::new())
            .unwrap_err();
        assert!(matches!(err, RsapipeError::StreamRead(_)));
    }

    #[test]
    fn test_write_failure() {
        let key = fixture_key();
        let err = CipherPipe::encrypt(&key)
            .pipe(&b"payload"[..], FailingWriter)
            .unwrap_err();
        assert!(matches!(err, RsapipeError::StreamWrite(_)));
    }
}
