//! Compressed result stream
//!
//! Accepted results are written as `code|url\n` lines into a gzip stream backed by an
//! anonymous temporary file. Finishing the stream rewinds the file so the tracker
//! client can read it from the start.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// Writer for `code|url` records
pub struct ResultWriter {
    encoder: GzEncoder<File>,
    records: u64,
}

impl ResultWriter {
    /// Creates a writer over a fresh temporary file, in `temp_dir` when given
    pub fn create(temp_dir: Option<&Path>) -> io::Result<Self> {
        let file = match temp_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(Self::new(file))
    }

    /// Wraps an existing writable, seekable file
    pub fn new(file: File) -> Self {
        Self {
            encoder: GzEncoder::new(file, Compression::default()),
            records: 0,
        }
    }

    /// Appends one record
    ///
    /// The caller guarantees that `url` contains neither `\r` nor `\n`.
    pub fn write_record(&mut self, code: &str, url: &[u8]) -> io::Result<()> {
        self.encoder.write_all(code.as_bytes())?;
        self.encoder.write_all(b"|")?;
        self.encoder.write_all(url)?;
        self.encoder.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Completes the gzip stream and returns the file positioned at offset zero
    pub fn finish(self) -> io::Result<File> {
        let mut file = self.encoder.finish()?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

/// Returns true when `url` can be stored without breaking the line format
pub fn is_storable(url: &[u8]) -> bool {
    !url.iter().any(|&b| b == b'\r' || b == b'\n')
}
