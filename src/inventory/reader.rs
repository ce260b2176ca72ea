//! Streaming reader for inventory files.
//!
//! An inventory starts with plain-text header lines and, for version 2,
//! continues with a zlib stream. The reader hands out header lines from its
//! own buffer and then switches to a decoder fed by whatever is left in the
//! buffer followed by the live stream, so decompression proceeds as data
//! arrives instead of after the whole payload is read.

use std::io::{self, BufRead, BufReader, Chain, Cursor, ErrorKind, Read};

use flate2::read::ZlibDecoder;

use crate::error::InventoryError;

const BUFSIZE: usize = 16 * 1024;

/// Line reader over a mixed plain/compressed inventory stream.
pub struct InventoryReader<R> {
    stream: R,
    buffer: Vec<u8>,
    eof: bool,
}

impl<R: Read> InventoryReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            eof: false,
        }
    }

    fn read_buffer(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; BUFSIZE];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Next plain-text line without its terminator. Empty at end of stream.
    pub fn readline(&mut self) -> Result<String, InventoryError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                return Ok(String::from_utf8(line)?);
            }
            if self.eof {
                let line = std::mem::take(&mut self.buffer);
                return Ok(String::from_utf8(line)?);
            }
            self.read_buffer()?;
        }
    }

    /// Remaining plain-text lines, skipping empty ones.
    pub fn readlines(&mut self) -> impl Iterator<Item = Result<String, InventoryError>> + '_ {
        std::iter::from_fn(move || loop {
            if self.eof && self.buffer.is_empty() {
                return None;
            }
            match self.readline() {
                Ok(line) if line.is_empty() => continue,
                other => return Some(other),
            }
        })
    }

    /// Switch to the compressed body. Consumes the reader.
    pub fn into_compressed_lines(self) -> CompressedLines<R> {
        let pending = Cursor::new(self.buffer);
        CompressedLines {
            decoder: BufReader::new(ZlibDecoder::new(pending.chain(self.stream))),
            finished: false,
        }
    }
}

/// Lines of the zlib-compressed inventory body, decoded incrementally.
///
/// Only newline-terminated lines are produced; an unterminated fragment at
/// the very end of the stream is dropped.
pub struct CompressedLines<R> {
    decoder: BufReader<ZlibDecoder<Chain<Cursor<Vec<u8>>, R>>>,
    finished: bool,
}

impl<R: Read> Iterator for CompressedLines<R> {
    type Item = Result<String, InventoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut line = Vec::new();
        match self.decoder.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) if line.last() != Some(&b'\n') => {
                self.finished = true;
                None
            }
            Ok(_) => {
                line.pop();
                Some(String::from_utf8(line).map_err(InventoryError::from))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e.into()))
            }
        }
    }
}
