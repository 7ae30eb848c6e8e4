//! Upload payloads.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Computes the CRC-32 checksum carried by payloads.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// One chunk of an upload: bytes destined for an absolute offset.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPayload {
    offset: u64,
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
    checksum: Option<u32>,
}

impl UploadPayload {
    /// Creates a payload and computes its checksum.
    pub fn new(offset: u64, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let checksum = Some(checksum(&data));
        Self {
            offset,
            data,
            checksum,
        }
    }

    /// Creates a payload without a checksum.
    pub fn unchecked(offset: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            data: data.into(),
            checksum: None,
        }
    }

    /// Returns the absolute offset of the first byte.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the offset one past the last byte, or `None` if it does not
    /// fit in a `u64`.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.data.len() as u64)
    }

    /// Returns the checksum, if the sender supplied one.
    #[must_use]
    pub fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    /// Checks the bytes against the carried checksum.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ChecksumMismatch`] if they differ.
    pub fn verify(&self) -> CoreResult<()> {
        match self.checksum {
            Some(expected) => {
                let actual = checksum(&self.data);
                if actual == expected {
                    Ok(())
                } else {
                    Err(CoreError::ChecksumMismatch {
                        offset: self.offset,
                        expected,
                        actual,
                    })
                }
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for UploadPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadPayload")
            .field("offset", &self.offset)
            .field("len", &self.data.len())
            .field("checksum", &self.checksum)
            .finish()
    }
}
