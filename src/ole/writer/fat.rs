//! Allocation table generation for OLE2 files
//!
//! The table maps a block id to the id of the next block of the same
//! chain. The big block table (BAT) and the small block table (SBAT) share
//! this builder; blocks are handed out sequentially, so every chain is a
//! run of consecutive ids ending in ENDOFCHAIN.
//!
//! Special values:
//! - BAT blocks are marked with FATSECT (0xFFFFFFFD)
//! - XBAT blocks are marked with DIFSECT (0xFFFFFFFC)
//! - End of chain is marked with ENDOFCHAIN (0xFFFFFFFE)
//! - Unused entries are FREESECT (0xFFFFFFFF)

use super::super::consts::*;

/// Sequential block allocator producing an allocation table
#[derive(Debug, Clone)]
pub struct FatBuilder {
    /// Next-block entries indexed by block id
    fat: Vec<u32>,
    /// Size of the blocks this table describes
    block_size: usize,
}

impl FatBuilder {
    pub fn new(block_size: usize) -> Self {
        Self {
            fat: Vec::new(),
            block_size,
        }
    }

    /// Allocate a chain of `count` blocks.
    ///
    /// Returns the first block id, or ENDOFCHAIN for an empty chain.
    pub fn allocate_chain(&mut self, count: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }

        let start = self.fat.len() as u32;
        self.fat.reserve(count as usize);
        for block in start..start + count - 1 {
            self.fat.push(block + 1);
        }
        self.fat.push(ENDOFCHAIN);
        start
    }

    /// Allocate enough blocks to hold `len` bytes
    pub fn allocate_bytes(&mut self, len: usize) -> u32 {
        self.allocate_chain(len.div_ceil(self.block_size) as u32)
    }

    /// Reserve `count` blocks marked with `marker` (FATSECT or DIFSECT).
    ///
    /// Returns the first reserved id, or ENDOFCHAIN when `count` is zero.
    pub fn allocate_special(&mut self, count: u32, marker: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }
        let start = self.fat.len() as u32;
        self.fat
            .extend(std::iter::repeat_n(marker, count as usize));
        start
    }

    /// Number of blocks handed out so far
    pub fn total_blocks(&self) -> u32 {
        self.fat.len() as u32
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[u32] {
        &self.fat
    }

    /// Follow the chain starting at `start`.
    ///
    /// Fails if the chain leaves the table, hits a non-chain marker, or
    /// revisits a block.
    #[cfg(test)]
    pub fn chain(&self, start: u32) -> Result<Vec<u32>, String> {
        let mut blocks = Vec::new();
        if start == ENDOFCHAIN {
            return Ok(blocks);
        }
        let mut visited = vec![false; self.fat.len()];
        let mut current = start;
        loop {
            let idx = current as usize;
            if idx >= self.fat.len() {
                return Err(format!("Block {} is outside the table", current));
            }
            if visited[idx] {
                return Err(format!("Chain starting at {} loops at {}", start, current));
            }
            visited[idx] = true;
            blocks.push(current);
            match self.fat[idx] {
                ENDOFCHAIN => return Ok(blocks),
                FREESECT | FATSECT | DIFSECT => {
                    return Err(format!("Block {} is not part of a chain", current));
                },
                next => current = next,
            }
        }
    }

    /// Check that every regular entry points at a block inside the table.
    pub fn validate(&self) -> Result<(), String> {
        let len = self.fat.len() as u32;
        for (block, &next) in self.fat.iter().enumerate() {
            let special = matches!(next, ENDOFCHAIN | FREESECT | FATSECT | DIFSECT);
            if !special && next >= len {
                return Err(format!(
                    "Block {} points to {}, beyond {} blocks",
                    block, next, len
                ));
            }
        }
        Ok(())
    }

    /// Serialize the table as little-endian ids, padded with FREESECT to a
    /// whole number of `table_block_size` blocks.
    pub fn to_blocks(&self, table_block_size: usize) -> Vec<u8> {
        let ids_per_block = table_block_size / BLOCK_ID_SIZE;
        let padded = self.fat.len().div_ceil(ids_per_block) * ids_per_block;
        let mut out = Vec::with_capacity(padded * BLOCK_ID_SIZE);
        for &entry in &self.fat {
            out.extend_from_slice(&entry.to_le_bytes());
        }
        for _ in self.fat.len()..padded {
            out.extend_from_slice(&FREESECT.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_chain() {
        let mut fat = FatBuilder::new(512);

        let start = fat.allocate_bytes(1500);
        assert_eq!(start, 0);
        assert_eq!(fat.entries(), &[1, 2, ENDOFCHAIN]);

        let next = fat.allocate_bytes(100);
        assert_eq!(next, 3);
        assert_eq!(fat.chain(next).unwrap(), vec![3]);
    }

    #[test]
    fn test_empty_chain() {
        let mut fat = FatBuilder::new(512);
        assert_eq!(fat.allocate_bytes(0), ENDOFCHAIN);
        assert_eq!(fat.total_blocks(), 0);
        assert!(fat.chain(ENDOFCHAIN).unwrap().is_empty());
    }

    #[test]
    fn test_special_blocks() {
        let mut fat = FatBuilder::new(512);
        fat.allocate_chain(2);
        assert_eq!(fat.allocate_special(2, FATSECT), 2);
        assert_eq!(fat.allocate_special(1, DIFSECT), 4);
        assert_eq!(fat.entries(), &[1, ENDOFCHAIN, FATSECT, FATSECT, DIFSECT]);
        assert!(fat.validate().is_ok());
        assert!(fat.chain(2).is_err());
    }

    #[test]
    fn test_to_blocks_padding() {
        let mut fat = FatBuilder::new(512);
        fat.allocate_chain(3);
        let bytes = fat.to_blocks(512);
        assert_eq!(bytes.len(), 512);
        assert_eq!(&bytes[8..12], &ENDOFCHAIN.to_le_bytes());
        assert_eq!(&bytes[12..16], &FREESECT.to_le_bytes());
    }
}
