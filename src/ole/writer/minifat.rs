//! Small block table (SBAT) and ministream for OLE2 files
//!
//! Streams below the 4096-byte cutoff are packed into 64-byte small blocks.
//! The small blocks are concatenated into the ministream, which is stored
//! as the root entry's data in ordinary big blocks.

use super::fat::FatBuilder;

/// Builder for the ministream and its allocation table
#[derive(Debug)]
pub struct MiniFatBuilder {
    table: FatBuilder,
    small_block_size: usize,
    /// Concatenated small streams, each padded to a small block boundary
    ministream: Vec<u8>,
}

impl MiniFatBuilder {
    pub fn new(small_block_size: usize) -> Self {
        Self {
            table: FatBuilder::new(small_block_size),
            small_block_size,
            ministream: Vec::new(),
        }
    }

    /// Append a small stream and return its first small block.
    ///
    /// Empty streams get ENDOFCHAIN and take no space.
    pub fn allocate_mini_chain(&mut self, data: &[u8]) -> u32 {
        let start = self.table.allocate_bytes(data.len());
        if !data.is_empty() {
            let padded = data.len().div_ceil(self.small_block_size) * self.small_block_size;
            let offset = self.ministream.len();
            self.ministream.extend_from_slice(data);
            self.ministream.resize(offset + padded, 0);
        }
        start
    }

    pub fn is_empty(&self) -> bool {
        self.ministream.is_empty()
    }

    pub fn ministream_data(&self) -> &[u8] {
        &self.ministream
    }

    pub fn small_blocks(&self) -> u32 {
        self.table.total_blocks()
    }

    #[cfg(test)]
    pub fn table(&self) -> &FatBuilder {
        &self.table
    }

    /// SBAT serialized into big blocks
    pub fn generate_sbat_blocks(&self, big_block_size: usize) -> Vec<u8> {
        if self.table.total_blocks() == 0 {
            return Vec::new();
        }
        self.table.to_blocks(big_block_size)
    }
}
