//! Configuration types for seglog
//!
//! The segment file layer itself only needs a directory and file names;
//! these structures tune how storage is reserved and how a directory's
//! capabilities are probed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration for the segment file layer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// How new segment files reserve their storage
    pub allocation: AllocationMode,
    /// Capability probe tuning
    pub probe: ProbeConfig,
}

impl FsConfig {
    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.probe.validate()
    }
}

/// Storage reservation strategy for newly allocated files
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Reserve blocks with `posix_fallocate`, writing zeros only where the
    /// filesystem does not implement it
    #[default]
    Fallocate,
    /// Always write zeros over the whole file
    ZeroFill,
}

/// Capability probe configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Largest direct I/O block size tried first
    pub max_block_size: usize,
    /// Smallest direct I/O block size tried before giving up
    pub min_block_size: usize,
    /// Whether to test native asynchronous submission at all
    pub check_async: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_block_size: 4096,
            min_block_size: 512,
            check_async: true,
        }
    }
}

impl ProbeConfig {
    /// Check that the block size bounds are usable
    pub fn validate(&self) -> Result<()> {
        if !self.max_block_size.is_power_of_two() || !self.min_block_size.is_power_of_two() {
            return Err(Error::invalid_argument(format!(
                "probe block sizes must be powers of two (min={}, max={})",
                self.min_block_size, self.max_block_size
            )));
        }
        if self.min_block_size > self.max_block_size {
            return Err(Error::invalid_argument(format!(
                "probe min block size {} exceeds max {}",
                self.min_block_size, self.max_block_size
            )));
        }
        Ok(())
    }

    /// Candidate block sizes, largest first
    pub fn block_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(self.max_block_size), |size| Some(size / 2))
            .take_while(|size| *size >= self.min_block_size && *size > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_block_sizes() {
        let config = ProbeConfig::default();
        let sizes: Vec<usize> = config.block_sizes().collect();
        assert_eq!(sizes, vec![4096, 2048, 1024, 512]);
    }

    #[test]
    fn test_validate() {
        assert!(ProbeConfig::default().validate().is_ok());

        let inverted = ProbeConfig {
            max_block_size: 512,
            min_block_size: 4096,
            check_async: true,
        };
        assert!(inverted.validate().is_err());

        let odd = ProbeConfig {
            max_block_size: 3000,
            ..ProbeConfig::default()
        };
        assert!(odd.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: FsConfig = toml::from_str(
            r#"
            allocation = "zero_fill"

            [probe]
            check_async = false
            "#,
        )
        .unwrap();

        assert_eq!(config.allocation, AllocationMode::ZeroFill);
        assert!(!config.probe.check_async);
        assert_eq!(config.probe.max_block_size, 4096);
    }
}
