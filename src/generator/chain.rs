use super::ChainOptions;
use crate::GeneratorError;
use md5::{Digest, Md5};

/// Size of an MD5 digest in bytes, the upper bound for chain code length
pub const DIGEST_SIZE: usize = 16;

/// Pseudorandom shortcodes from an MD5 hash chain
///
/// Every round replaces the digest with `MD5(digest)`, starting from the seed. The
/// bytes of the new digest are scanned left to right; bytes above the rejection
/// threshold are skipped, the rest index into the charset. As soon as the code under
/// construction reaches the requested length it is emitted and the next round starts.
/// A digest that runs out of bytes first contributes nothing.
#[derive(Debug, Clone)]
pub struct ChainGenerator {
    charset: Vec<char>,
    digest: Vec<u8>,
    threshold: u32,
    length: usize,
    remaining: u64,
}

impl ChainGenerator {
    /// Creates a chain generator
    ///
    /// # Errors
    ///
    /// * `GeneratorError::LengthExceedsDigest` - `length` is larger than [`DIGEST_SIZE`]
    /// * `GeneratorError::ZeroLength` - `length` is zero
    /// * `GeneratorError::EmptyCharset` - the charset has no characters
    pub fn new(options: &ChainOptions) -> Result<Self, GeneratorError> {
        if options.length > DIGEST_SIZE {
            return Err(GeneratorError::LengthExceedsDigest {
                length: options.length,
                digest_size: DIGEST_SIZE,
            });
        }
        if options.length == 0 {
            return Err(GeneratorError::ZeroLength);
        }

        let charset: Vec<char> = options.charset.chars().collect();
        if charset.is_empty() {
            return Err(GeneratorError::EmptyCharset);
        }

        Ok(Self {
            threshold: rejection_threshold(charset.len()),
            charset,
            digest: options.seed.as_bytes().to_vec(),
            length: options.length,
            remaining: options.count,
        })
    }

    /// Runs one hash round, returning a code if the digest yielded enough bytes
    fn round(&mut self) -> Option<String> {
        self.digest = Md5::digest(&self.digest).to_vec();

        let mut code = String::with_capacity(self.length);
        let mut filled = 0;
        for &byte in &self.digest {
            // Bytes equal to the threshold are kept; existing task data depends on it
            if u32::from(byte) > self.threshold {
                continue;
            }
            code.push(self.charset[usize::from(byte) % self.charset.len()]);
            filled += 1;
            if filled == self.length {
                return Some(code);
            }
        }
        None
    }
}

impl Iterator for ChainGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(code) = self.round() {
                self.remaining -= 1;
                return Some(code);
            }
        }
    }
}

/// `256 - (256 mod |charset|)`, the largest multiple of the charset size within a byte
fn rejection_threshold(charset_len: usize) -> u32 {
    let len = charset_len as u32;
    256 - (256 % len)
}
