//! Splits a source file into ordered payloads.

use crate::error::{CoreError, CoreResult};
use crate::upload::{UploadHeader, UploadPayload};
use std::fs::File;
use std::io::Read;
use std::iter::FusedIterator;
use std::path::PathBuf;

/// Lazily reads `[0, size)` of a header's source file in fixed strides.
///
/// Every chunk is exactly `chunk_size` bytes except the last, which holds
/// the remainder. Each buffer is filled completely; if the source shrank
/// since the header was captured the iterator yields an end-of-data error
/// and then stops.
///
/// The iterator holds the source open until it is exhausted, fails,
/// is closed, or is dropped.
///
/// # Example
///
/// ```rust,ignore
/// let header = UploadHeader::from_file("a.bin")?;
/// for payload in PayloadIterator::new(&header, 4096)? {
///     let payload = payload?;
///     // hand to TransactionProcessor::process
/// }
/// ```
#[derive(Debug)]
pub struct PayloadIterator {
    source: PathBuf,
    reader: Option<File>,
    size: u64,
    chunk_size: usize,
    offset: u64,
}

impl PayloadIterator {
    /// Opens the header's source for reading.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for a zero chunk size, and
    /// [`CoreError::InvalidSource`] if the header has no local source or it
    /// cannot be opened.
    pub fn new(header: &UploadHeader, chunk_size: usize) -> CoreResult<Self> {
        if chunk_size == 0 {
            return Err(CoreError::invalid_operation("chunk size must be positive"));
        }
        let source = header.source().ok_or_else(|| {
            CoreError::invalid_source(header.path(), "header has no local source")
        })?;
        let reader = File::open(source)
            .map_err(|e| CoreError::invalid_source(source, format!("unable to open: {e}")))?;

        Ok(Self {
            source: source.to_path_buf(),
            reader: Some(reader),
            size: header.size(),
            chunk_size,
            offset: 0,
        })
    }

    /// Returns the offset of the next chunk.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the number of chunks still to be produced.
    #[must_use]
    pub fn remaining(&self) -> usize {
        if self.reader.is_none() {
            return 0;
        }
        let left = self.size.saturating_sub(self.offset);
        usize::try_from(left.div_ceil(self.chunk_size as u64)).unwrap_or(usize::MAX)
    }

    /// Releases the source file.
    pub fn close(mut self) {
        self.reader = None;
    }
}

impl Iterator for PayloadIterator {
    type Item = CoreResult<UploadPayload>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.size {
            self.reader = None;
            return None;
        }
        let reader = self.reader.as_mut()?;

        let left = self.size - self.offset;
        let len = usize::try_from(left).map_or(self.chunk_size, |left| left.min(self.chunk_size));
        let mut buffer = vec![0u8; len];

        match reader.read_exact(&mut buffer) {
            Ok(()) => {
                let payload = UploadPayload::new(self.offset, buffer);
                self.offset += len as u64;
                Some(Ok(payload))
            }
            Err(source) => {
                self.reader = None;
                Some(Err(CoreError::SourceRead {
                    path: self.source.clone(),
                    offset: self.offset,
                    source,
                }))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (0, Some(remaining))
    }
}

impl FusedIterator for PayloadIterator {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::ErrorKind;
    use tempfile::tempdir;

    fn header_for(bytes: &[u8]) -> (tempfile::TempDir, UploadHeader) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.bin");
        fs::write(&source, bytes).unwrap();
        let header = UploadHeader::from_file(&source).unwrap();
        (dir, header)
    }

    #[test]
    fn chunks_with_remainder() {
        let (_dir, header) = header_for(b"0123456789");
        let chunks: Vec<_> = PayloadIterator::new(&header, 4)
            .unwrap()
            .map(Result::unwrap)
            .collect();

        let shape: Vec<_> = chunks.iter().map(|c| (c.offset(), c.len())).collect();
        assert_eq!(shape, [(0, 4), (4, 4), (8, 2)]);
        assert_eq!(chunks[2].data(), b"89");
    }

    #[test]
    fn exact_multiple_has_no_short_chunk() {
        let (_dir, header) = header_for(b"01234567");
        let lens: Vec<_> = PayloadIterator::new(&header, 4)
            .unwrap()
            .map(|c| c.unwrap().len())
            .collect();
        assert_eq!(lens, [4, 4]);
    }

    #[test]
    fn empty_source_yields_nothing() {
        let (_dir, header) = header_for(b"");
        let mut iter = PayloadIterator::new(&header, 4).unwrap();
        assert_eq!(iter.remaining(), 0);
        assert!(iter.next().is_none());
    }

    #[test]
    fn chunks_carry_checksums() {
        let (_dir, header) = header_for(b"abcdef");
        for chunk in PayloadIterator::new(&header, 4).unwrap() {
            assert!(chunk.unwrap().verify().is_ok());
        }
    }

    #[test]
    fn shrunken_source_fails_then_stops() {
        let (dir, header) = header_for(b"0123456789");
        fs::write(dir.path().join("a.bin"), b"01234").unwrap();

        let mut iter = PayloadIterator::new(&header, 4).unwrap();
        assert!(iter.next().unwrap().is_ok());
        match iter.next().unwrap() {
            Err(CoreError::SourceRead { offset, source, .. }) => {
                assert_eq!(offset, 4);
                assert_eq!(source.kind(), ErrorKind::UnexpectedEof);
            }
            other => panic!("expected SourceRead, got {other:?}"),
        }
        assert!(iter.next().is_none());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let (_dir, header) = header_for(b"abc");
        assert!(matches!(
            PayloadIterator::new(&header, 0),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn header_without_source_rejected() {
        let header = UploadHeader::new("a.bin", 3, 0);
        assert!(matches!(
            PayloadIterator::new(&header, 4),
            Err(CoreError::InvalidSource { .. })
        ));
    }

    #[test]
    fn remaining_counts_down() {
        let (_dir, header) = header_for(b"0123456789");
        let mut iter = PayloadIterator::new(&header, 4).unwrap();
        assert_eq!(iter.remaining(), 3);
        iter.next();
        assert_eq!(iter.remaining(), 2);
        iter.close();
    }
}
