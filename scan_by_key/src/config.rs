use crate::error::{Result, ScanError};

/// Elements processed by one thread block.
pub const TILE_SIZE: usize = 2048;

/// Lanes per thread block. Each lane owns `TILE_SIZE / BLOCK_SIZE` contiguous
/// elements of its tile.
pub const BLOCK_SIZE: usize = 256;

/// Tile geometry for the device engine.
///
/// The result of a scan never depends on these values; they only change how the
/// work is decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub tile_size: usize,
    pub block_size: usize,
}

impl ScanConfig {
    pub fn new(tile_size: usize, block_size: usize) -> Result<Self> {
        let config = Self {
            tile_size,
            block_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.tile_size == 0 {
            return Err(ScanError::InvalidConfig(format!(
                "tile size {} and block size {} must be positive",
                self.tile_size, self.block_size
            )));
        }
        if self.tile_size % self.block_size != 0 {
            return Err(ScanError::InvalidConfig(format!(
                "tile size {} is not a multiple of block size {}",
                self.tile_size, self.block_size
            )));
        }
        // A carry level must shrink the problem or propagation never ends.
        if self.tile_size < 2 {
            return Err(ScanError::InvalidConfig(
                "tile size must hold at least two elements".to_string(),
            ));
        }
        Ok(())
    }

    /// Elements each lane scans sequentially.
    pub fn items_per_lane(&self) -> usize {
        self.tile_size / self.block_size
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            block_size: BLOCK_SIZE,
        }
    }
}
