//! Core types shared by the segment file layer

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::IoSlice;

/// I/O capabilities of the filesystem backing a directory
///
/// Computed once per directory by probing; callers cache it for the
/// lifetime of the process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityProfile {
    /// Block size to use for direct I/O, or 0 if direct I/O is unusable
    pub direct_io_block_size: usize,
    /// Whether native asynchronous submission can be relied upon
    pub async_io_supported: bool,
}

impl CapabilityProfile {
    /// Profile of a filesystem where only buffered, synchronous I/O works
    pub const BUFFERED: Self = Self {
        direct_io_block_size: 0,
        async_io_supported: false,
    };

    /// Whether direct I/O can be used at all
    #[must_use]
    pub const fn supports_direct_io(&self) -> bool {
        self.direct_io_block_size != 0
    }
}

/// Outcome of reading a whole file into a fixed-size buffer
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    /// The buffer was filled with the complete file content
    Complete,
    /// The file exists but is empty
    NoData,
}

/// Ordered set of byte regions written or read as one transfer
///
/// The total length is tracked as regions are added, so it always equals
/// the sum of the region lengths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferSet {
    regions: Vec<Bytes>,
    len: usize,
}

impl BufferSet {
    /// Create an empty set
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
            len: 0,
        }
    }

    /// Append a region
    pub fn push(&mut self, region: impl Into<Bytes>) {
        let region = region.into();
        self.len += region.len();
        self.regions.push(region);
    }

    /// Builder-style variant of [`BufferSet::push`]
    #[must_use]
    pub fn with(mut self, region: impl Into<Bytes>) -> Self {
        self.push(region);
        self
    }

    /// Total number of bytes across all regions
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the set transfers no bytes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of regions
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Iterate over the regions in order
    pub fn regions(&self) -> impl Iterator<Item = &Bytes> {
        self.regions.iter()
    }

    /// Borrow the regions as vectored I/O slices
    #[must_use]
    pub fn io_slices(&self) -> Vec<IoSlice<'_>> {
        self.regions.iter().map(|r| IoSlice::new(r)).collect()
    }

    /// Concatenate all regions into one contiguous buffer
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for region in &self.regions {
            out.extend_from_slice(region);
        }
        out
    }
}

impl<B: Into<Bytes>> FromIterator<B> for BufferSet {
    fn from_iter<I: IntoIterator<Item = B>>(iter: I) -> Self {
        let mut set = Self::new();
        for region in iter {
            set.push(region);
        }
        set
    }
}

impl From<Bytes> for BufferSet {
    fn from(region: Bytes) -> Self {
        Self::new().with(region)
    }
}

impl From<Vec<u8>> for BufferSet {
    fn from(region: Vec<u8>) -> Self {
        Self::new().with(region)
    }
}

impl From<&'static [u8]> for BufferSet {
    fn from(region: &'static [u8]) -> Self {
        Self::new().with(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_set_len_tracks_regions() {
        let mut set = BufferSet::new();
        assert!(set.is_empty());

        set.push(&b"header"[..]);
        set.push(vec![7u8; 10]);
        set.push(Bytes::new());

        assert_eq!(set.len(), 16);
        assert_eq!(set.region_count(), 3);
        assert_eq!(set.io_slices().iter().map(|s| s.len()).sum::<usize>(), 16);
    }

    #[test]
    fn test_buffer_set_concat() {
        let set: BufferSet = [&b"ab"[..], &b"cd"[..], &b"e"[..]].into_iter().collect();
        assert_eq!(set.to_vec(), b"abcde");
    }

    #[test]
    fn test_profile() {
        assert!(!CapabilityProfile::BUFFERED.supports_direct_io());
        let profile = CapabilityProfile {
            direct_io_block_size: 4096,
            async_io_supported: true,
        };
        assert!(profile.supports_direct_io());
    }
}
